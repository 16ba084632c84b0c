//! Keyboard decoding and camera-relative turn resolution.
//!
//! Key events become [`KeyIntent`]s without touching any state; resolving an
//! intent against the current selection and view direction yields the
//! [`Command`] the cube actually executes.

use iced::keyboard::{Key, key};
use nalgebra::Vector3;

use crate::cube::{Axis, GridCoord};
use crate::ray_casting::Ray;
use crate::rotation::Turn;

/// Requests the surrounding application forwards to the cube.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Rotate(Turn),
    RandomRotation,
    Pick(Ray),
}

/// Turn direction relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelativeTurn {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyIntent {
    RandomTurn,
    /// Turns the horizontal layer holding the selection.
    TurnSelectedLayer { clockwise: bool },
    Relative(RelativeTurn),
}

pub(crate) fn decode_key(key: &Key) -> Option<KeyIntent> {
    match key {
        Key::Character(c) => match c.as_str() {
            "r" | "R" => Some(KeyIntent::RandomTurn),
            "." => Some(KeyIntent::TurnSelectedLayer { clockwise: true }),
            "," => Some(KeyIntent::TurnSelectedLayer { clockwise: false }),
            _ => None,
        },
        Key::Named(key::Named::ArrowLeft) => Some(KeyIntent::Relative(RelativeTurn::Left)),
        Key::Named(key::Named::ArrowRight) => Some(KeyIntent::Relative(RelativeTurn::Right)),
        Key::Named(key::Named::ArrowUp) => Some(KeyIntent::Relative(RelativeTurn::Up)),
        Key::Named(key::Named::ArrowDown) => Some(KeyIntent::Relative(RelativeTurn::Down)),
        _ => None,
    }
}

/// Turns an intent into a command. Layer turns need a selection; without
/// one they are dropped with a warning.
pub(crate) fn resolve(
    intent: KeyIntent,
    selection: Option<GridCoord>,
    forward: Vector3<f32>,
) -> Option<Command> {
    match (intent, selection) {
        (KeyIntent::RandomTurn, _) => Some(Command::RandomRotation),
        (_, None) => {
            log::warn!("{intent:?} ignored: no block selected");
            None
        }
        (KeyIntent::TurnSelectedLayer { clockwise }, Some(selected)) => {
            Some(Command::Rotate(Turn {
                axis: Axis::Y,
                slice: selected.y,
                clockwise,
            }))
        }
        (KeyIntent::Relative(direction), Some(selected)) => Some(Command::Rotate(
            relative_turn(direction, selected, forward),
        )),
    }
}

/// Picks the axis and direction for an arrow-key turn of the slice holding
/// `selected`, as seen from a camera looking along `forward`.
///
/// Left and Right roll the slice facing the viewer, about whichever
/// horizontal axis the view is most aligned with. Up and Down tilt the slice
/// about the other horizontal axis, lifting or lowering the near face.
pub(crate) fn relative_turn(
    direction: RelativeTurn,
    selected: GridCoord,
    forward: Vector3<f32>,
) -> Turn {
    let (facing, across) = if forward.x.abs() > forward.z.abs() {
        (Axis::X, Axis::Z)
    } else {
        (Axis::Z, Axis::X)
    };
    // Horizontal direction pointing to the viewer's right.
    let screen_right = Vector3::new(-forward.z, 0.0, forward.x);

    let (axis, clockwise) = match direction {
        RelativeTurn::Right => (facing, forward[facing.index()] > 0.0),
        RelativeTurn::Left => (facing, forward[facing.index()] <= 0.0),
        RelativeTurn::Up => (across, screen_right[across.index()] < 0.0),
        RelativeTurn::Down => (across, screen_right[across.index()] >= 0.0),
    };

    Turn {
        axis,
        slice: selected.get(axis),
        clockwise,
    }
}
