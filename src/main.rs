//! Interactive N×N×N Rubik's cube with iced UI.
//!
//! Blocks are picked with the mouse and turned a slice at a time; each quarter
//! turn is animated over a fixed number of frames before the slice's blocks
//! change places in the grid. Uses iced for UI and wgpu for GPU rendering.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use iced::widget::{Button, Column, PickList, Row, Shader, Slider, text};
use iced::{Element, Length, Size, Subscription, Task};
use rand::SeedableRng;
use rand::rngs::StdRng;

mod block;
mod camera;
mod config;
mod cube;
mod input;
mod math;
mod ray_casting;
mod renderer;
mod rotation;
mod shader_widget;

use config::Settings;
use cube::Cube;
use input::Command;
use shader_widget::CubeProgram;

/// Interactive Rubik's cube simulator.
#[derive(Parser, Debug)]
#[command(name = "rubiks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file to read at startup.
    #[arg(long, default_value = config::DEFAULT_PATH)]
    config: PathBuf,
}

/// Rendering modes for visualization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderMode {
    Standard,
    Normals,
    Depth,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Standard => write!(f, "Standard"),
            RenderMode::Normals => write!(f, "Normal Map"),
            RenderMode::Depth => write!(f, "Depth Map"),
        }
    }
}

impl RenderMode {
    const ALL: [RenderMode; 3] = [RenderMode::Standard, RenderMode::Normals, RenderMode::Depth];
}

/// Application state: the cube plus the control pane's values.
pub(crate) struct CubeApp {
    cube: Cube,
    rng: StdRng,
    mouse_sensitivity: f32,
    selected_scale: f32,
    render_mode: RenderMode,
}

#[derive(Debug, Clone)]
pub(crate) enum Message {
    SelectedScale(f32),
    RenderMode(RenderMode),
    /// One animation frame has elapsed.
    Tick,
    Command(Command),
}

impl CubeApp {
    pub(crate) fn new(settings: &Settings) -> Self {
        Self {
            cube: Cube::new(
                settings.cube_size,
                settings.animation_frames,
                settings.position_update,
            ),
            rng: StdRng::from_entropy(),
            mouse_sensitivity: settings.mouse_sensitivity,
            selected_scale: settings.selected_scale,
            render_mode: RenderMode::Standard,
        }
    }

    pub(crate) fn title(&self) -> String {
        let size = self.cube.size();
        format!("Rubik's Cube {size}×{size}×{size}")
    }

    pub(crate) fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SelectedScale(value) => {
                self.selected_scale = value;
            }
            Message::RenderMode(mode) => {
                self.render_mode = mode;
            }
            Message::Tick => {
                self.cube.update_rotation();
            }
            Message::Command(Command::Rotate(turn)) => {
                self.cube.set_rotation(turn);
            }
            Message::Command(Command::RandomRotation) => {
                self.cube.set_random_rotation(&mut self.rng);
            }
            Message::Command(Command::Pick(ray)) => {
                self.cube.select_block(&ray);
            }
        }

        Task::none()
    }

    /// Drives the animation one step per rendered frame while a turn is in
    /// flight.
    pub(crate) fn subscription(&self) -> Subscription<Message> {
        if self.cube.is_rotating() {
            iced::window::frames().map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    pub(crate) fn view(&self) -> Element<Message> {
        let selection = match self.cube.selection() {
            Some(coord) => format!("Selected: {coord}"),
            None => "Selected: none".to_string(),
        };
        let status = match self.cube.rotation().active() {
            Some(rotation) => format!(
                "Turning {:?} slice {} {}",
                rotation.axis,
                rotation.slice,
                if rotation.clockwise { "clockwise" } else { "counter-clockwise" },
            ),
            None => "Idle".to_string(),
        };

        let controls = Column::new()
            .spacing(20)
            .push(
                Column::new()
                    .spacing(5)
                    .push(text(selection))
                    .push(text(status)),
            )
            .push(
                Column::new()
                    .spacing(5)
                    .push(text("Render Mode"))
                    .push(
                        PickList::new(
                            &RenderMode::ALL[..],
                            Some(self.render_mode),
                            Message::RenderMode,
                        )
                        .width(250),
                    ),
            )
            .push(
                Column::new()
                    .spacing(5)
                    .push(text("Selected Scale"))
                    .push(
                        Slider::new(0.3..=1.2, self.selected_scale, Message::SelectedScale)
                            .step(0.01)
                            .width(250),
                    ),
            )
            .push(
                Button::new(text("Random Turn"))
                    .on_press(Message::Command(Command::RandomRotation))
                    .width(250),
            )
            .push(text(
                "Left click: select\nRight drag: orbit\nWheel: zoom\n\
                 Arrows: turn selected slice\n. / , : turn selected row\nR: random turn",
            ));

        let viewport = Shader::new(CubeProgram::new(
            &self.cube,
            self.selected_scale,
            self.render_mode,
            self.mouse_sensitivity,
        ))
        .width(Length::Fill)
        .height(Length::Fill);

        Row::new()
            .spacing(10)
            .padding(10)
            .push(
                iced::widget::container(controls)
                    .width(Length::Shrink)
                    .height(Length::Fill),
            )
            .push(viewport)
            .into()
    }
}

fn main() -> ExitCode {
    env_logger::builder().format_timestamp(None).init();

    let cli = Cli::parse();
    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(error) => {
            log::error!("{error}");
            eprintln!("Failed to load settings: {error}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("loaded settings from {}: {settings:?}", cli.config.display());
    log::info!("building a {0}x{0}x{0} cube", settings.cube_size);

    let window_size = Size::new(
        settings.window_width as f32,
        settings.window_height as f32,
    );
    let app = CubeApp::new(&settings);
    let result = iced::application(CubeApp::title, CubeApp::update, CubeApp::view)
        .subscription(CubeApp::subscription)
        .settings(iced::Settings {
            antialiasing: true,
            ..iced::Settings::default()
        })
        .window_size(window_size)
        .run_with(move || (app, Task::none()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
