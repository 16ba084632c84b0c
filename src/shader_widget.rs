//! Shader widget that draws the cube and turns pointer and keyboard input
//! into cube commands.
//!
//! The widget owns the camera. The cube itself stays with the application;
//! the widget only borrows it to draw and to resolve key presses, and sends
//! everything that would change it back as a [`Message::Command`].

use iced::widget::shader::{self, wgpu};
use iced::{Point, Rectangle, event, mouse};

use crate::camera::{OrbitCamera, Projection};
use crate::cube::Cube;
use crate::input::{self, Command};
use crate::ray_casting::calculate_mouse_ray;
use crate::renderer::{InstanceRaw, Renderer};
use crate::{Message, RenderMode};

/// Everything the GPU side needs for one frame.
#[derive(Debug, Clone)]
pub(crate) struct CubePrimitive {
    instances: Vec<InstanceRaw>,
    camera: OrbitCamera,
    projection: Projection,
    render_mode: RenderMode,
}

impl shader::Primitive for CubePrimitive {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        storage: &mut shader::Storage,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        if !storage.has::<Renderer>() {
            let renderer = Renderer::new(
                device,
                format,
                viewport.physical_size(),
                self.instances.len(),
            );
            storage.store(renderer);
        }
        let Some(renderer) = storage.get_mut::<Renderer>() else {
            return;
        };
        renderer.resize(
            device,
            *bounds,
            viewport.scale_factor() as f32,
            viewport.physical_size(),
        );
        renderer.update_instances(device, queue, &self.instances);
        renderer.set_render_mode(self.render_mode);
        renderer.update_camera(queue, &self.camera, &self.projection);
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        storage: &shader::Storage,
        target: &wgpu::TextureView,
        _clip_bounds: &Rectangle<u32>,
    ) {
        if let Some(renderer) = storage.get::<Renderer>() {
            renderer.render(encoder, target);
        }
    }
}

/// Camera and pointer state kept by the widget between frames.
pub(crate) struct CubeShaderState {
    camera: OrbitCamera,
    projection: Projection,
    mouse_pressed: bool,
    last_mouse_pos: Option<Point>,
    /// Cube size the camera distance was chosen for.
    framed_size: Option<usize>,
}

impl Default for CubeShaderState {
    fn default() -> Self {
        Self {
            camera: OrbitCamera::new(1.0),
            projection: Projection::default(),
            mouse_pressed: false,
            last_mouse_pos: None,
            framed_size: None,
        }
    }
}

impl CubeShaderState {
    /// Resets the camera to frame a cube of `size` the first time it is seen.
    fn frame(&mut self, size: usize) {
        if self.framed_size != Some(size) {
            self.camera = OrbitCamera::framing(size);
            self.framed_size = Some(size);
        }
    }
}

pub(crate) struct CubeProgram<'a> {
    cube: &'a Cube,
    selected_scale: f32,
    render_mode: RenderMode,
    mouse_sensitivity: f32,
}

impl<'a> CubeProgram<'a> {
    pub(crate) fn new(
        cube: &'a Cube,
        selected_scale: f32,
        render_mode: RenderMode,
        mouse_sensitivity: f32,
    ) -> Self {
        Self {
            cube,
            selected_scale,
            render_mode,
            mouse_sensitivity,
        }
    }
}

impl shader::Program<Message> for CubeProgram<'_> {
    type State = CubeShaderState;
    type Primitive = CubePrimitive;

    fn update(
        &self,
        state: &mut Self::State,
        event: shader::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
        _shell: &mut iced::advanced::Shell<'_, Message>,
    ) -> (event::Status, Option<Message>) {
        state.frame(self.cube.size());

        if bounds.width > 0.0 && bounds.height > 0.0 {
            state.projection.aspect = bounds.width / bounds.height;
        }

        match event {
            shader::Event::Mouse(mouse_event) => {
                self.handle_mouse_event(state, mouse_event, bounds, cursor)
            }
            shader::Event::Keyboard(keyboard_event) => {
                self.handle_keyboard_event(state, keyboard_event)
            }
            _ => (event::Status::Ignored, None),
        }
    }

    fn draw(
        &self,
        state: &Self::State,
        _cursor: mouse::Cursor,
        _bounds: Rectangle,
    ) -> Self::Primitive {
        let size = self.cube.size();
        // Nothing has reached `update` yet; show the default framing.
        let camera = if state.framed_size == Some(size) {
            state.camera.clone()
        } else {
            OrbitCamera::framing(size)
        };

        CubePrimitive {
            instances: self
                .cube
                .instances(self.selected_scale)
                .iter()
                .map(InstanceRaw::from)
                .collect(),
            camera,
            projection: state.projection,
            render_mode: self.render_mode,
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.mouse_pressed {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

impl CubeProgram<'_> {
    /// Right-drag orbits, the wheel zooms and a left click picks a block.
    fn handle_mouse_event(
        &self,
        state: &mut CubeShaderState,
        mouse_event: mouse::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (event::Status, Option<Message>) {
        match mouse_event {
            mouse::Event::CursorMoved { .. } => {
                let Some(position) = cursor.position_in(bounds) else {
                    return (event::Status::Ignored, None);
                };
                if let Some(last_pos) = state.last_mouse_pos {
                    if state.mouse_pressed {
                        state.camera.process_mouse_motion(
                            position.x - last_pos.x,
                            position.y - last_pos.y,
                            self.mouse_sensitivity,
                        );
                    }
                }
                state.last_mouse_pos = Some(position);
                return (event::Status::Captured, None);
            }
            mouse::Event::ButtonPressed(mouse::Button::Right) => {
                if cursor.position_in(bounds).is_some() {
                    state.mouse_pressed = true;
                    return (event::Status::Captured, None);
                }
            }
            mouse::Event::ButtonPressed(mouse::Button::Left) => {
                if let Some(position) = cursor.position_in(bounds) {
                    let pick = calculate_mouse_ray(position, bounds, &state.camera, &state.projection)
                        .map(|ray| Message::Command(Command::Pick(ray)));
                    return (event::Status::Captured, pick);
                }
            }
            mouse::Event::ButtonReleased(mouse::Button::Right) => {
                if state.mouse_pressed {
                    state.mouse_pressed = false;
                    return (event::Status::Captured, None);
                }
            }
            mouse::Event::WheelScrolled { delta } => {
                if cursor.position_in(bounds).is_some() {
                    let scroll_delta = match delta {
                        mouse::ScrollDelta::Lines { y, .. } => y,
                        mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
                    };
                    state.camera.process_scroll(scroll_delta);
                    return (event::Status::Captured, None);
                }
            }
            _ => {}
        }

        (event::Status::Ignored, None)
    }

    fn handle_keyboard_event(
        &self,
        state: &CubeShaderState,
        keyboard_event: iced::keyboard::Event,
    ) -> (event::Status, Option<Message>) {
        let iced::keyboard::Event::KeyPressed { key, .. } = keyboard_event else {
            return (event::Status::Ignored, None);
        };
        let Some(intent) = input::decode_key(&key) else {
            return (event::Status::Ignored, None);
        };

        let command = input::resolve(intent, self.cube.selection(), state.camera.forward());
        (event::Status::Captured, command.map(Message::Command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::GridCoord;
    use crate::rotation::PositionUpdate;
    use iced::advanced::Shell;
    use iced::keyboard::Key;
    use iced::widget::shader::Program;

    const BOUNDS: Rectangle = Rectangle {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    };

    fn send(
        program: &CubeProgram<'_>,
        state: &mut CubeShaderState,
        event: shader::Event,
        cursor: Point,
    ) -> (event::Status, Option<Message>) {
        let mut messages = Vec::new();
        let mut shell = Shell::new(&mut messages);
        program.update(
            state,
            event,
            BOUNDS,
            mouse::Cursor::Available(cursor),
            &mut shell,
        )
    }

    fn key_press(key: Key) -> shader::Event {
        shader::Event::Keyboard(iced::keyboard::Event::KeyPressed {
            key: key.clone(),
            modified_key: key,
            physical_key: iced::keyboard::key::Physical::Unidentified(
                iced::keyboard::key::NativeCode::Unidentified,
            ),
            location: iced::keyboard::Location::Standard,
            modifiers: iced::keyboard::Modifiers::default(),
            text: None,
        })
    }

    #[test]
    fn first_event_frames_the_cube() {
        let cube = Cube::new(5, 4, PositionUpdate::Planar);
        let program = CubeProgram::new(&cube, 0.75, RenderMode::Standard, 0.01);
        let mut state = CubeShaderState::default();
        let center = Point::new(400.0, 300.0);
        send(&program, &mut state, shader::Event::Mouse(mouse::Event::CursorEntered), center);
        assert_eq!(state.framed_size, Some(5));
        let expected = OrbitCamera::framing(5).position();
        assert!((state.camera.position() - expected).norm() < 1e-4);
    }

    #[test]
    fn left_click_emits_a_pick() {
        let mut cube = Cube::new(3, 4, PositionUpdate::Planar);
        let mut state = CubeShaderState::default();
        let center = Point::new(400.0, 300.0);
        let message = {
            let program = CubeProgram::new(&cube, 0.75, RenderMode::Standard, 0.01);
            let click = shader::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left));
            let (status, message) = send(&program, &mut state, click, center);
            assert_eq!(status, event::Status::Captured);
            message
        };

        let Some(Message::Command(Command::Pick(ray))) = message else {
            panic!("left click should pick");
        };
        // The initial view looks straight at the corner nearest the camera.
        assert_eq!(cube.select_block(&ray), Some(GridCoord::new(2, 2, 2)));
    }

    #[test]
    fn right_drag_orbits_the_camera() {
        let cube = Cube::new(3, 4, PositionUpdate::Planar);
        let program = CubeProgram::new(&cube, 0.75, RenderMode::Standard, 0.01);
        let mut state = CubeShaderState::default();

        let start = Point::new(400.0, 300.0);
        send(&program, &mut state, shader::Event::Mouse(mouse::Event::CursorMoved { position: start }), start);
        let before = state.camera.position();

        let press = shader::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Right));
        send(&program, &mut state, press, start);
        let end = Point::new(450.0, 300.0);
        send(&program, &mut state, shader::Event::Mouse(mouse::Event::CursorMoved { position: end }), end);
        assert!((state.camera.position() - before).norm() > 0.1);

        let release = shader::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Right));
        send(&program, &mut state, release, end);
        let after_release = state.camera.position();
        let far = Point::new(600.0, 300.0);
        send(&program, &mut state, shader::Event::Mouse(mouse::Event::CursorMoved { position: far }), far);
        assert_eq!(state.camera.position(), after_release);
    }

    #[test]
    fn keys_become_commands() {
        let cube = Cube::new(3, 4, PositionUpdate::Planar);
        let program = CubeProgram::new(&cube, 0.75, RenderMode::Standard, 0.01);
        let mut state = CubeShaderState::default();
        let center = Point::new(400.0, 300.0);

        let (status, message) = send(&program, &mut state, key_press(Key::Character("r".into())), center);
        assert_eq!(status, event::Status::Captured);
        assert!(matches!(message, Some(Message::Command(Command::RandomRotation))));

        // Layer turns need a selection.
        let (_, message) = send(&program, &mut state, key_press(Key::Character(".".into())), center);
        assert!(message.is_none());

        let (status, _) = send(&program, &mut state, key_press(Key::Character("q".into())), center);
        assert_eq!(status, event::Status::Ignored);
    }
}
