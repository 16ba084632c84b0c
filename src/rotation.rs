//! Slice rotation engine.
//!
//! A quarter turn is animated over a fixed number of frames. Each frame swings
//! every block of the slice by an equal angle about the cube's axis; on the
//! last frame ownership of the blocks is permuted within the slice so grid
//! coordinates again match where blocks are drawn.

use std::f32::consts::FRAC_PI_2;

use crate::cube::{Axis, BlockGrid, GridCoord};

/// A request to turn one slice a quarter turn.
///
/// `clockwise` turns by a positive angle about the axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Turn {
    pub(crate) axis: Axis,
    pub(crate) slice: usize,
    pub(crate) clockwise: bool,
}

impl Turn {
    pub(crate) fn reversed(self) -> Self {
        Self {
            clockwise: !self.clockwise,
            ..self
        }
    }

    /// Signed angle applied on each animation frame.
    pub(crate) fn frame_angle(self, frames_per_quarter_turn: u32) -> f32 {
        let delta = FRAC_PI_2 / frames_per_quarter_turn as f32;
        if self.clockwise { delta } else { -delta }
    }
}

/// The turn currently being animated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SliceRotation {
    pub(crate) axis: Axis,
    pub(crate) slice: usize,
    pub(crate) clockwise: bool,
    pub(crate) frames_remaining: u32,
}

impl SliceRotation {
    pub(crate) fn turn(&self) -> Turn {
        Turn {
            axis: self.axis,
            slice: self.slice,
            clockwise: self.clockwise,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum RotationState {
    #[default]
    Idle,
    Rotating(SliceRotation),
}

impl RotationState {
    pub(crate) fn active(&self) -> Option<&SliceRotation> {
        match self {
            RotationState::Idle => None,
            RotationState::Rotating(rotation) => Some(rotation),
        }
    }

    /// Moves to `Rotating` if idle and the slice exists. At most one turn is
    /// ever in flight; anything else is ignored.
    pub(crate) fn request(&mut self, turn: Turn, size: usize, frames_per_quarter_turn: u32) -> bool {
        if self.active().is_some() || turn.slice >= size {
            return false;
        }
        *self = RotationState::Rotating(SliceRotation {
            axis: turn.axis,
            slice: turn.slice,
            clockwise: turn.clockwise,
            frames_remaining: frames_per_quarter_turn,
        });
        true
    }
}

/// How block positions are swung around the axis each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum PositionUpdate {
    /// Standard 2D rotation matrix.
    #[default]
    Planar,
    /// Radius/angle form with a one-argument arctangent, as the legacy
    /// animation computed it.
    Polar,
}

/// Advances every block of the active slice by one frame and counts the frame
/// down. Does not commit.
pub(crate) fn advance(
    grid: &mut BlockGrid,
    rotation: &mut SliceRotation,
    frames_per_quarter_turn: u32,
    update: PositionUpdate,
) {
    let turn = rotation.turn();
    let angle = turn.frame_angle(frames_per_quarter_turn);
    let size = grid.size();

    for coord in grid.slice_coords(turn.axis, turn.slice) {
        let block = grid.get_mut(coord);
        block.rotate_about(turn.axis, angle);
        if !coord.is_slice_center(turn.axis, size) {
            block.orbit(turn.axis, angle, update);
        }
    }

    rotation.frames_remaining = rotation.frames_remaining.saturating_sub(1);
}

/// Cell whose block moves into `dest` when `turn` completes.
pub(crate) fn source_cell(dest: GridCoord, turn: Turn, size: usize) -> GridCoord {
    let t = size - 1;
    let GridCoord { x, y, z } = dest;
    match (turn.axis, turn.clockwise) {
        (Axis::X, true) => GridCoord::new(x, z, t - y),
        (Axis::X, false) => GridCoord::new(x, t - z, y),
        (Axis::Y, true) => GridCoord::new(t - z, y, x),
        (Axis::Y, false) => GridCoord::new(z, y, t - x),
        (Axis::Z, true) => GridCoord::new(y, t - x, z),
        (Axis::Z, false) => GridCoord::new(t - y, x, z),
    }
}

/// Cell the block at `source` ends up in when `turn` completes.
pub(crate) fn destination_cell(source: GridCoord, turn: Turn, size: usize) -> GridCoord {
    source_cell(source, turn.reversed(), size)
}

/// Permutes block ownership within the turned slice and carries the
/// selection along with the block it refers to.
pub(crate) fn commit(grid: &mut BlockGrid, turn: Turn, selection: &mut Option<GridCoord>) {
    let size = grid.size();
    let moves: Vec<(GridCoord, GridCoord)> = grid
        .slice_coords(turn.axis, turn.slice)
        .into_iter()
        .map(|dest| (dest, source_cell(dest, turn, size)))
        .collect();
    grid.permute(&moves);

    if let Some(selected) = selection {
        if selected.get(turn.axis) == turn.slice {
            *selected = destination_cell(*selected, turn, size);
        }
    }
}
