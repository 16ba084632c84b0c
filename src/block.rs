//! A single unit cell of the cube.
//!
//! Blocks carry their appearance plus a continuous position and an
//! accumulated orientation. All mutation goes through small commands so the
//! rotation engine is the only thing that moves a block.

use nalgebra::{Rotation3, Vector3, Vector4};

use crate::cube::{Axis, GridCoord};
use crate::math::{axis_rotation, euler_zyx, rotate_planar, rotate_polar};
use crate::rotation::PositionUpdate;

/// Sticker colors, using the standard Rubik's cube scheme plus black for
/// faces hidden inside the cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    White,
    Yellow,
    Blue,
    Green,
    Red,
    Orange,
    Black,
}

impl From<Color> for Vector4<f32> {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Vector4::new(1.0, 1.0, 1.0, 1.0),
            Color::Yellow => Vector4::new(1.0, 1.0, 0.0, 1.0),
            Color::Blue => Vector4::new(0.1, 0.1, 1.0, 1.0),
            Color::Green => Vector4::new(0.0, 1.0, 0.0, 1.0),
            Color::Red => Vector4::new(1.0, 0.0, 0.0, 1.0),
            Color::Orange => Vector4::new(1.0, 0.5, 0.0, 1.0),
            Color::Black => Vector4::new(0.05, 0.05, 0.05, 1.0),
        }
    }
}

/// The six faces of a block in its own (unrotated) frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Face {
    PosX = 0,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub(crate) const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Color this face shows when it lies on the outside of a solved cube.
    fn outer_color(self) -> Color {
        match self {
            Face::PosX => Color::Red,
            Face::NegX => Color::Orange,
            Face::PosY => Color::White,
            Face::NegY => Color::Yellow,
            Face::PosZ => Color::Green,
            Face::NegZ => Color::Blue,
        }
    }
}

/// Appearance of a block: one color per face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockFaces(pub(crate) [Color; 6]);

impl BlockFaces {
    /// Stickers for the block built at `home` in a solved cube of `size`.
    pub(crate) fn for_cell(home: GridCoord, size: usize) -> Self {
        let last = size - 1;
        let mut colors = [Color::Black; 6];
        for face in Face::ALL {
            let exposed = match face {
                Face::PosX => home.x == last,
                Face::NegX => home.x == 0,
                Face::PosY => home.y == last,
                Face::NegY => home.y == 0,
                Face::PosZ => home.z == last,
                Face::NegZ => home.z == 0,
            };
            if exposed {
                colors[face as usize] = face.outer_color();
            }
        }
        Self(colors)
    }

    pub(crate) fn color(&self, face: Face) -> Color {
        self.0[face as usize]
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Block {
    faces: BlockFaces,
    /// Cell the block was built in, kept for logging and tests. Nothing
    /// about placement or turning reads it; the block's place in the cube is
    /// whichever cell of the grid currently holds it.
    home: GridCoord,
    position: Vector3<f32>,
    orientation: Rotation3<f32>,
}

impl Block {
    /// Creates a block at `position` with an initial Euler rotation applied
    /// in X, Y, Z order about the origin.
    pub(crate) fn new(
        faces: BlockFaces,
        home: GridCoord,
        position: Vector3<f32>,
        euler: Vector3<f32>,
    ) -> Self {
        Self {
            faces,
            home,
            position,
            orientation: euler_zyx(euler),
        }
    }

    pub(crate) fn faces(&self) -> &BlockFaces {
        &self.faces
    }

    /// Diagnostic only.
    pub(crate) fn home(&self) -> GridCoord {
        self.home
    }

    pub(crate) fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub(crate) fn orientation(&self) -> &Rotation3<f32> {
        &self.orientation
    }

    /// Pre-multiplies the orientation by a rotation about a world axis.
    pub(crate) fn rotate_about(&mut self, axis: Axis, angle: f32) {
        self.orientation = axis_rotation(axis, angle) * self.orientation;
    }

    /// Swings the position around `axis` through the origin by `angle`.
    pub(crate) fn orbit(&mut self, axis: Axis, angle: f32, update: PositionUpdate) {
        let (adj_index, opp_index) = axis.plane();
        let adj = self.position[adj_index];
        let opp = self.position[opp_index];

        let (adj, opp) = match update {
            PositionUpdate::Planar => rotate_planar(adj, opp, angle),
            PositionUpdate::Polar => rotate_polar(adj, opp, angle),
        };

        self.position[adj_index] = adj;
        self.position[opp_index] = opp;
    }
}
