//! Ray casting for mouse-based block selection.
//!
//! A click is turned into a world-space ray from the camera, then a point is
//! marched along the ray in small fixed steps until it comes within reach of
//! a block's current (possibly mid-animation) position.

use iced::{Point, Rectangle};
use nalgebra::{Point3, Vector3};

use crate::camera::{OrbitCamera, Projection};
use crate::cube::{BlockGrid, GridCoord};

/// Marching step as a fraction of the (unit) ray direction.
const STEPS_PER_UNIT: f32 = 100.0;
/// Margin past the cube's faces where marching starts testing blocks.
const SHELL_MARGIN: f32 = 0.1;
/// Margin past the cube's faces where marching gives up.
const BOUND_MARGIN: f32 = 0.2;
/// Per-axis distance from a block center that counts as a hit.
const HIT_TOLERANCE: f32 = 1.0;

/// 3D ray for intersection testing
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ray {
    /// Ray origin point in 3D space
    pub(crate) origin: Point3<f32>,
    /// Ray direction vector (normalized)
    pub(crate) direction: Vector3<f32>,
}

impl Ray {
    pub(crate) fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
}

/// Axis-aligned bounding box in 3D space
#[derive(Debug, Clone)]
pub(crate) struct AABB {
    pub(crate) min: Point3<f32>,
    pub(crate) max: Point3<f32>,
}

impl AABB {
    /// Box spanning `-half_extent..half_extent` on every axis.
    pub(crate) fn centered(half_extent: f32) -> Self {
        Self {
            min: Point3::new(-half_extent, -half_extent, -half_extent),
            max: Point3::new(half_extent, half_extent, half_extent),
        }
    }
}

/// Calculate mouse ray from screen coordinates through the 3D scene.
///
/// Returns `None` if the camera matrices cannot be inverted.
pub(crate) fn calculate_mouse_ray(
    mouse_pos: Point,
    bounds: Rectangle,
    camera: &OrbitCamera,
    projection: &Projection,
) -> Option<Ray> {
    let direction = camera.pick_ray(mouse_pos.x, mouse_pos.y, bounds.size(), projection)?;
    Some(Ray::new(camera.position(), direction))
}

/// Distances along the ray where it enters and leaves the box, using the
/// slab method. `None` when the ray misses or the box is behind it.
pub(crate) fn ray_aabb_span(ray: &Ray, aabb: &AABB) -> Option<(f32, f32)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;

    for axis in 0..3 {
        // Division by zero yields ±inf, which the min/max below handle.
        let inv = 1.0 / ray.direction[axis];
        let t1 = (aabb.min[axis] - ray.origin[axis]) * inv;
        let t2 = (aabb.max[axis] - ray.origin[axis]) * inv;
        t_enter = t_enter.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));
    }

    if t_exit < 0.0 || t_enter > t_exit {
        None
    } else {
        Some((t_enter, t_exit))
    }
}

fn outside(point: &Point3<f32>, limit: f32) -> bool {
    point.iter().any(|c| c.abs() > limit)
}

fn within(point: &Point3<f32>, limit: f32) -> bool {
    point.iter().all(|c| c.abs() < limit)
}

/// First block, in x/y/z scan order, whose center is within the hit
/// tolerance of `point` on every axis.
fn block_near(point: &Point3<f32>, grid: &BlockGrid) -> Option<GridCoord> {
    grid.iter()
        .find(|(_, block)| {
            let offset = point.coords - block.position();
            offset.iter().all(|c| c.abs() < HIT_TOLERANCE)
        })
        .map(|(coord, _)| coord)
}

/// Marches along `ray` and returns the first block it reaches.
///
/// Blocks are matched against their current positions, so a slice that is
/// mid-turn is picked where it is drawn.
pub(crate) fn find_intersected_block(ray: &Ray, grid: &BlockGrid) -> Option<GridCoord> {
    let half_extent = grid.size() as f32;
    let shell = half_extent + SHELL_MARGIN;
    let bound = half_extent + BOUND_MARGIN;

    // Bounds the march; a ray that never meets the cube stops right here.
    let (_, t_exit) = ray_aabb_span(ray, &AABB::centered(bound))?;

    let step = ray.direction / STEPS_PER_UNIT;
    let max_steps = (t_exit * STEPS_PER_UNIT).ceil() as usize + 1;
    let mut point = ray.origin;
    let mut steps = 0;

    while outside(&point, shell) {
        if steps >= max_steps {
            return None;
        }
        point += step;
        steps += 1;
    }

    while within(&point, bound) && steps <= max_steps {
        if let Some(coord) = block_near(&point, grid) {
            return Some(coord);
        }
        point += step;
        steps += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{Axis, Cube, cell_center};
    use crate::rotation::{PositionUpdate, Turn};

    #[test]
    fn slab_reports_entry_and_exit() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -10.0), Vector3::z());
        let (enter, exit) = ray_aabb_span(&ray, &AABB::centered(1.0)).expect("ray hits the box");
        assert!((enter - 9.0).abs() < 1e-5);
        assert!((exit - 11.0).abs() < 1e-5);
    }

    #[test]
    fn slab_misses_box_behind_the_ray() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::z());
        assert_eq!(ray_aabb_span(&ray, &AABB::centered(1.0)), None);
    }

    #[test]
    fn axis_parallel_ray_beside_the_box_misses() {
        let ray = Ray::new(Point3::new(5.0, 0.0, -10.0), Vector3::z());
        assert_eq!(ray_aabb_span(&ray, &AABB::centered(1.0)), None);
    }

    #[test]
    fn picks_nearest_face_block_along_the_ray() {
        let grid = BlockGrid::new(3);
        let ray = Ray::new(Point3::new(2.0, -2.0, 30.0), -Vector3::z());
        assert_eq!(find_intersected_block(&ray, &grid), Some(GridCoord::new(2, 0, 2)));

        let ray = Ray::new(Point3::new(0.0, 25.0, 0.0), -Vector3::y());
        assert_eq!(find_intersected_block(&ray, &grid), Some(GridCoord::new(1, 2, 1)));
    }

    #[test]
    fn diagonal_ray_hits_the_corner() {
        let grid = BlockGrid::new(3);
        let ray = Ray::new(Point3::new(20.0, 20.0, 20.0), Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(find_intersected_block(&ray, &grid), Some(GridCoord::new(2, 2, 2)));
    }

    #[test]
    fn miss_returns_none() {
        let grid = BlockGrid::new(3);
        let away = Ray::new(Point3::new(0.0, 0.0, 20.0), Vector3::z());
        assert_eq!(find_intersected_block(&away, &grid), None);

        let beside = Ray::new(Point3::new(10.0, 10.0, 20.0), -Vector3::z());
        assert_eq!(find_intersected_block(&beside, &grid), None);
    }

    #[test]
    fn miss_clears_selection() {
        let mut cube = Cube::new(3, 4, PositionUpdate::Planar);
        let hit = Ray::new(Point3::new(0.0, 0.0, 20.0), -Vector3::z());
        assert_eq!(cube.select_block(&hit), Some(GridCoord::new(1, 1, 2)));
        let miss = Ray::new(Point3::new(0.0, 0.0, 20.0), Vector3::z());
        assert_eq!(cube.select_block(&miss), None);
        assert_eq!(cube.selection(), None);
    }

    #[test]
    fn even_sized_cube_is_pickable() {
        let grid = BlockGrid::new(4);
        let target = cell_center(GridCoord::new(3, 1, 0), 4);
        let ray = Ray::new(Point3::new(target.x, target.y, -40.0), Vector3::z());
        assert_eq!(find_intersected_block(&ray, &grid), Some(GridCoord::new(3, 1, 0)));
    }

    #[test]
    fn picks_blocks_where_they_are_drawn_mid_turn() {
        let mut cube = Cube::new(3, 2, PositionUpdate::Planar);
        // Half of a quarter turn leaves the front-right column at 45 degrees.
        cube.set_rotation(Turn {
            axis: Axis::Y,
            slice: 2,
            clockwise: true,
        });
        cube.update_rotation();
        let moved = cube.grid().get(GridCoord::new(1, 2, 2)).position();
        let ray = Ray::new(Point3::new(moved.x, 30.0, moved.z), -Vector3::y());
        assert_eq!(cube.select_block(&ray), Some(GridCoord::new(1, 2, 2)));
    }

    #[test]
    fn overlapping_blocks_resolve_in_scan_order() {
        let mut cube = Cube::new(3, 2, PositionUpdate::Planar);
        cube.set_rotation(Turn {
            axis: Axis::Y,
            slice: 2,
            clockwise: true,
        });
        cube.update_rotation();

        // Mid-turn, (1, 2, 2) and (2, 2, 2) are both within reach of the
        // point halfway between them.
        let first = cube.grid().get(GridCoord::new(1, 2, 2)).position();
        let second = cube.grid().get(GridCoord::new(2, 2, 2)).position();
        let between = (first + second) / 2.0;
        for position in [first, second] {
            let offset = between - position;
            assert!(offset.x.abs() < HIT_TOLERANCE && offset.z.abs() < HIT_TOLERANCE);
        }

        // The farther block along x comes later in the scan and loses.
        let ray = Ray::new(Point3::new(between.x, 30.0, between.z), -Vector3::y());
        assert_eq!(
            find_intersected_block(&ray, cube.grid()),
            Some(GridCoord::new(1, 2, 2))
        );
        let point = Point3::new(between.x, first.y + 0.5, between.z);
        assert_eq!(block_near(&point, cube.grid()), Some(GridCoord::new(1, 2, 2)));
    }
}
