//! Rotation helpers shared by the block model and the rotation engine.

use nalgebra::{Rotation3, Vector3};

use crate::cube::Axis;

/// Elemental rotation of `angle` radians about a principal axis.
pub(crate) fn axis_rotation(axis: Axis, angle: f32) -> Rotation3<f32> {
    Rotation3::from_axis_angle(&axis.unit(), angle)
}

/// Composes an Euler triple as `Rz * Ry * Rx`, so X is applied first.
pub(crate) fn euler_zyx(angles: Vector3<f32>) -> Rotation3<f32> {
    axis_rotation(Axis::Z, angles.z)
        * axis_rotation(Axis::Y, angles.y)
        * axis_rotation(Axis::X, angles.x)
}

/// Rotates the 2D point `(adj, opp)` by `delta` with a rotation matrix.
pub(crate) fn rotate_planar(adj: f32, opp: f32, delta: f32) -> (f32, f32) {
    let (sin, cos) = delta.sin_cos();
    (adj * cos - opp * sin, adj * sin + opp * cos)
}

/// Rotates the 2D point `(adj, opp)` by `delta` through polar coordinates.
///
/// Uses a one-argument arctangent and folds the quadrant into the sign of the
/// radius, which reproduces the animation rounding of the legacy simulator.
/// The origin has no angle and is returned as is.
pub(crate) fn rotate_polar(adj: f32, opp: f32, delta: f32) -> (f32, f32) {
    if adj == 0.0 && opp == 0.0 {
        return (adj, opp);
    }
    // Negative zero would flip the quadrant below.
    let adj = if adj == 0.0 { 0.0 } else { adj };

    let mut hyp = (adj * adj + opp * opp).sqrt();
    if adj < 0.0 {
        hyp = -hyp;
    }
    // adj == 0 gives ±inf here, which atan maps to ±π/2.
    let theta = (opp / adj).atan();

    (hyp * (theta + delta).cos(), hyp * (theta + delta).sin())
}
