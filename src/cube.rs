//! Cube data structures and geometry.
//!
//! This module defines the grid that owns every block of an N×N×N cube, the
//! `Cube` aggregate that couples the grid with the rotation state and the
//! current selection, and the block mesh used by the renderer.

use std::collections::{HashMap, HashSet};

use nalgebra::{Rotation3, Unit, Vector3};
use rand::Rng;

use crate::block::{Block, BlockFaces};
use crate::ray_casting::{self, Ray};
use crate::rotation::{self, PositionUpdate, RotationState, Turn};

/// Distance between the centers of neighbouring blocks.
pub(crate) const BLOCK_SPACING: f32 = 2.0;

/// Principal axes of the cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub(crate) const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub(crate) fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub(crate) fn unit(self) -> Unit<Vector3<f32>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }

    /// Component indices of the plane perpendicular to this axis, ordered so
    /// that a positive angle turns the first toward the second.
    pub(crate) fn plane(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }
}

/// Integer cell coordinate inside the block grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GridCoord {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) z: usize,
}

impl GridCoord {
    pub(crate) const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn get(self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// True for the middle cell of an odd-sized slice about `axis`, which has
    /// zero radius and therefore no position change while the slice turns.
    pub(crate) fn is_slice_center(self, axis: Axis, size: usize) -> bool {
        if size % 2 == 0 {
            return false;
        }
        let middle = size / 2;
        Axis::ALL
            .iter()
            .filter(|&&other| other != axis)
            .all(|&other| self.get(other) == middle)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// World-space center of the cell at `coord`, with the cube centered on the
/// origin.
pub(crate) fn cell_center(coord: GridCoord, size: usize) -> Vector3<f32> {
    let middle = (size as f32 - 1.0) / 2.0;
    Vector3::new(
        BLOCK_SPACING * (coord.x as f32 - middle),
        BLOCK_SPACING * (coord.y as f32 - middle),
        BLOCK_SPACING * (coord.z as f32 - middle),
    )
}

/// Size³ cells, each owning exactly one block.
///
/// Stored flat with x as the slowest-varying coordinate so that iteration
/// order matches an x-outer, y-middle, z-inner scan.
#[derive(Clone, Debug)]
pub(crate) struct BlockGrid {
    size: usize,
    cells: Vec<Block>,
}

impl BlockGrid {
    /// Builds a solved grid with blocks centered on the origin.
    pub(crate) fn new(size: usize) -> Self {
        assert!(size > 0, "cube size must be positive");

        let mut cells = Vec::with_capacity(size * size * size);
        for x in 0..size {
            for y in 0..size {
                for z in 0..size {
                    let home = GridCoord::new(x, y, z);
                    cells.push(Block::new(
                        BlockFaces::for_cell(home, size),
                        home,
                        cell_center(home, size),
                        Vector3::zeros(),
                    ));
                }
            }
        }

        Self { size, cells }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn contains(&self, coord: GridCoord) -> bool {
        coord.x < self.size && coord.y < self.size && coord.z < self.size
    }

    fn index(&self, coord: GridCoord) -> usize {
        debug_assert!(self.contains(coord), "{coord} outside a cube of size {}", self.size);
        (coord.x * self.size + coord.y) * self.size + coord.z
    }

    pub(crate) fn get(&self, coord: GridCoord) -> &Block {
        &self.cells[self.index(coord)]
    }

    pub(crate) fn get_mut(&mut self, coord: GridCoord) -> &mut Block {
        let index = self.index(coord);
        &mut self.cells[index]
    }

    /// Every coordinate in scan order.
    pub(crate) fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        let size = self.size;
        (0..size).flat_map(move |x| {
            (0..size).flat_map(move |y| (0..size).map(move |z| GridCoord::new(x, y, z)))
        })
    }

    /// Coordinates of the slice pinned at `index` along `axis`, in scan order.
    pub(crate) fn slice_coords(&self, axis: Axis, index: usize) -> Vec<GridCoord> {
        let size = self.size;
        let mut coords = Vec::with_capacity(size * size);
        for a in 0..size {
            for b in 0..size {
                coords.push(match axis {
                    Axis::X => GridCoord::new(index, a, b),
                    Axis::Y => GridCoord::new(a, index, b),
                    Axis::Z => GridCoord::new(a, b, index),
                });
            }
        }
        coords
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (GridCoord, &Block)> + '_ {
        self.coords().zip(self.cells.iter())
    }

    /// Moves ownership so that each `(dest, source)` pair ends with `dest`
    /// holding the block `source` held before the call.
    ///
    /// The pairs must describe a permutation of a set of cells.
    pub(crate) fn permute(&mut self, moves: &[(GridCoord, GridCoord)]) {
        let sources: HashMap<usize, usize> = moves
            .iter()
            .map(|&(dest, source)| (self.index(dest), self.index(source)))
            .collect();

        let mut placed = HashSet::with_capacity(sources.len());

        // Walk each cycle once, swapping the wanted block into place.
        for &(dest, _) in moves {
            let start = self.index(dest);
            if placed.contains(&start) {
                continue;
            }
            let mut current = start;
            loop {
                placed.insert(current);
                let source = sources.get(&current).copied().unwrap_or(current);
                if source == start || source == current {
                    break;
                }
                self.cells.swap(current, source);
                current = source;
            }
        }
    }
}

/// Per-block data handed to the renderer.
#[derive(Clone, Debug)]
pub(crate) struct BlockInstance {
    pub(crate) position: Vector3<f32>,
    pub(crate) orientation: Rotation3<f32>,
    pub(crate) scale: f32,
    pub(crate) faces: BlockFaces,
}

/// Scale of an unselected block; leaves a thin gap between neighbours.
pub(crate) const BLOCK_SCALE: f32 = 0.96;

/// A complete N×N×N cube: the block grid, the in-flight slice rotation and
/// the selected cell.
#[derive(Debug)]
pub(crate) struct Cube {
    grid: BlockGrid,
    rotation: RotationState,
    selection: Option<GridCoord>,
    frames_per_quarter_turn: u32,
    position_update: PositionUpdate,
}

impl Cube {
    pub(crate) fn new(
        size: usize,
        frames_per_quarter_turn: u32,
        position_update: PositionUpdate,
    ) -> Self {
        assert!(frames_per_quarter_turn > 0, "a quarter turn needs at least one frame");
        Self {
            grid: BlockGrid::new(size),
            rotation: RotationState::Idle,
            selection: None,
            frames_per_quarter_turn,
            position_update,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.grid.size()
    }

    #[cfg(test)]
    pub(crate) fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub(crate) fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub(crate) fn is_rotating(&self) -> bool {
        self.rotation.active().is_some()
    }

    pub(crate) fn selection(&self) -> Option<GridCoord> {
        self.selection
    }

    /// Starts a quarter turn. Returns `false`, changing nothing, when a turn
    /// is already in flight or the slice index is out of range.
    pub(crate) fn set_rotation(&mut self, turn: Turn) -> bool {
        let accepted = self
            .rotation
            .request(turn, self.grid.size(), self.frames_per_quarter_turn);
        if accepted {
            log::debug!("rotation started: {turn:?}");
        } else {
            log::debug!("rotation rejected: {turn:?}");
        }
        accepted
    }

    /// Starts a quarter turn of a uniformly chosen axis, slice and direction.
    pub(crate) fn set_random_rotation<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let turn = Turn {
            axis: Axis::ALL[rng.gen_range(0..Axis::ALL.len())],
            slice: rng.gen_range(0..self.grid.size()),
            clockwise: rng.gen_bool(0.5),
        };
        self.set_rotation(turn)
    }

    /// Advances the active rotation by one frame. Returns the turn that was
    /// committed on this frame, if any.
    pub(crate) fn update_rotation(&mut self) -> Option<Turn> {
        let RotationState::Rotating(active) = &mut self.rotation else {
            return None;
        };

        rotation::advance(
            &mut self.grid,
            active,
            self.frames_per_quarter_turn,
            self.position_update,
        );

        if active.frames_remaining > 0 {
            return None;
        }

        let turn = active.turn();
        rotation::commit(&mut self.grid, turn, &mut self.selection);
        self.rotation = RotationState::Idle;
        log::debug!("rotation committed: {turn:?}");
        Some(turn)
    }

    /// Selects the first block hit by marching along `ray`, or clears the
    /// selection when nothing is hit.
    pub(crate) fn select_block(&mut self, ray: &Ray) -> Option<GridCoord> {
        self.selection = ray_casting::find_intersected_block(ray, &self.grid);
        match self.selection {
            Some(coord) => {
                let home = self.grid.get(coord).home();
                log::debug!("selected block {coord} (solved position {home})");
            }
            None => log::debug!("selection cleared"),
        }
        self.selection
    }

    /// Render data for every block, enlarging or shrinking the selected one.
    pub(crate) fn instances(&self, selected_scale: f32) -> Vec<BlockInstance> {
        self.grid
            .iter()
            .map(|(coord, block)| BlockInstance {
                position: block.position(),
                orientation: *block.orientation(),
                scale: if Some(coord) == self.selection {
                    selected_scale
                } else {
                    BLOCK_SCALE
                },
                faces: *block.faces(),
            })
            .collect()
    }
}

/// Vertex of the unit block mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Vertex {
    pub(crate) position: [f32; 3],
    pub(crate) normal: [f32; 3],
    /// Index into the instance's face colors, in `Face` order.
    pub(crate) face: u32,
}

const fn vertex(position: [f32; 3], normal: [f32; 3], face: u32) -> Vertex {
    Vertex {
        position,
        normal,
        face,
    }
}

/// 36 vertices for a block (6 faces × 2 triangles), spanning -1..1 on each
/// axis so neighbouring blocks touch at `BLOCK_SPACING`.
#[rustfmt::skip]
pub(crate) const BLOCK_VERTICES: [Vertex; 36] = [
    // +X
    vertex([ 1.0, -1.0, -1.0], [ 1.0,  0.0,  0.0], 0),
    vertex([ 1.0,  1.0, -1.0], [ 1.0,  0.0,  0.0], 0),
    vertex([ 1.0,  1.0,  1.0], [ 1.0,  0.0,  0.0], 0),
    vertex([ 1.0,  1.0,  1.0], [ 1.0,  0.0,  0.0], 0),
    vertex([ 1.0, -1.0,  1.0], [ 1.0,  0.0,  0.0], 0),
    vertex([ 1.0, -1.0, -1.0], [ 1.0,  0.0,  0.0], 0),
    // -X
    vertex([-1.0, -1.0,  1.0], [-1.0,  0.0,  0.0], 1),
    vertex([-1.0,  1.0,  1.0], [-1.0,  0.0,  0.0], 1),
    vertex([-1.0,  1.0, -1.0], [-1.0,  0.0,  0.0], 1),
    vertex([-1.0,  1.0, -1.0], [-1.0,  0.0,  0.0], 1),
    vertex([-1.0, -1.0, -1.0], [-1.0,  0.0,  0.0], 1),
    vertex([-1.0, -1.0,  1.0], [-1.0,  0.0,  0.0], 1),
    // +Y
    vertex([-1.0,  1.0, -1.0], [ 0.0,  1.0,  0.0], 2),
    vertex([-1.0,  1.0,  1.0], [ 0.0,  1.0,  0.0], 2),
    vertex([ 1.0,  1.0,  1.0], [ 0.0,  1.0,  0.0], 2),
    vertex([ 1.0,  1.0,  1.0], [ 0.0,  1.0,  0.0], 2),
    vertex([ 1.0,  1.0, -1.0], [ 0.0,  1.0,  0.0], 2),
    vertex([-1.0,  1.0, -1.0], [ 0.0,  1.0,  0.0], 2),
    // -Y
    vertex([-1.0, -1.0,  1.0], [ 0.0, -1.0,  0.0], 3),
    vertex([-1.0, -1.0, -1.0], [ 0.0, -1.0,  0.0], 3),
    vertex([ 1.0, -1.0, -1.0], [ 0.0, -1.0,  0.0], 3),
    vertex([ 1.0, -1.0, -1.0], [ 0.0, -1.0,  0.0], 3),
    vertex([ 1.0, -1.0,  1.0], [ 0.0, -1.0,  0.0], 3),
    vertex([-1.0, -1.0,  1.0], [ 0.0, -1.0,  0.0], 3),
    // +Z
    vertex([ 1.0, -1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    vertex([ 1.0,  1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    vertex([-1.0,  1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    vertex([-1.0,  1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    vertex([-1.0, -1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    vertex([ 1.0, -1.0,  1.0], [ 0.0,  0.0,  1.0], 4),
    // -Z
    vertex([-1.0, -1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
    vertex([-1.0,  1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
    vertex([ 1.0,  1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
    vertex([ 1.0,  1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
    vertex([ 1.0, -1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
    vertex([-1.0, -1.0, -1.0], [ 0.0,  0.0, -1.0], 5),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cube(size: usize) -> Cube {
        Cube::new(size, 5, PositionUpdate::Planar)
    }

    fn run_to_completion(cube: &mut Cube) -> Option<Turn> {
        for _ in 0..1000 {
            if let Some(turn) = cube.update_rotation() {
                return Some(turn);
            }
        }
        None
    }

    #[test]
    fn grid_is_centered_on_origin() {
        for size in 1..=5 {
            let grid = BlockGrid::new(size);
            let sum: Vector3<f32> = grid.iter().map(|(_, block)| block.position()).sum();
            assert!(sum.norm() < 1e-4, "size {size}");
        }
    }

    #[test]
    fn scan_order_is_x_outer() {
        let grid = BlockGrid::new(2);
        let coords: Vec<_> = grid.coords().collect();
        assert_eq!(coords[0], GridCoord::new(0, 0, 0));
        assert_eq!(coords[1], GridCoord::new(0, 0, 1));
        assert_eq!(coords[2], GridCoord::new(0, 1, 0));
        assert_eq!(coords[4], GridCoord::new(1, 0, 0));
        for (coord, block) in grid.iter() {
            assert_eq!(coord, block.home());
        }
    }

    #[test]
    fn slice_center_only_exists_for_odd_sizes() {
        assert!(GridCoord::new(0, 1, 1).is_slice_center(Axis::X, 3));
        assert!(!GridCoord::new(0, 1, 2).is_slice_center(Axis::X, 3));
        assert!(GridCoord::new(1, 2, 1).is_slice_center(Axis::Y, 3));
        assert!(!GridCoord::new(1, 1, 1).is_slice_center(Axis::Z, 4));
    }

    #[test]
    fn permute_follows_cycles() {
        let mut grid = BlockGrid::new(2);
        let a = GridCoord::new(0, 0, 0);
        let b = GridCoord::new(0, 0, 1);
        let c = GridCoord::new(0, 1, 1);
        // a <- b <- c <- a
        grid.permute(&[(a, b), (b, c), (c, a)]);
        assert_eq!(grid.get(a).home(), b);
        assert_eq!(grid.get(b).home(), c);
        assert_eq!(grid.get(c).home(), a);
        assert_eq!(grid.get(GridCoord::new(1, 1, 1)).home(), GridCoord::new(1, 1, 1));
    }

    #[test]
    fn slice_coords_are_the_pinned_cells_in_scan_order() {
        let grid = BlockGrid::new(4);
        for axis in Axis::ALL {
            for index in 0..4 {
                let scanned: Vec<_> = grid.coords().filter(|coord| coord.get(axis) == index).collect();
                assert_eq!(grid.slice_coords(axis, index), scanned, "{axis:?} {index}");
            }
        }
    }

    #[test]
    fn permute_leaves_cells_outside_the_moves_alone() {
        let mut grid = BlockGrid::new(3);
        let before = grid.clone();
        let a = GridCoord::new(2, 0, 0);
        let b = GridCoord::new(2, 2, 2);
        grid.permute(&[(a, b), (b, a)]);
        assert_eq!(grid.get(a).faces(), before.get(b).faces());
        assert_eq!(grid.get(b).faces(), before.get(a).faces());
        for (coord, block) in grid.iter().filter(|&(coord, _)| coord != a && coord != b) {
            assert_eq!(block.faces(), before.get(coord).faces());
        }
    }

    #[test]
    fn turned_blocks_carry_their_faces_to_the_new_cell() {
        let mut cube = cube(3);
        let before = cube.grid().clone();
        let turn = Turn {
            axis: Axis::Y,
            slice: 2,
            clockwise: true,
        };
        assert!(cube.set_rotation(turn));
        run_to_completion(&mut cube);
        for source in before.slice_coords(Axis::Y, 2) {
            let dest = rotation::destination_cell(source, turn, 3);
            assert_eq!(cube.grid().get(dest).faces(), before.get(source).faces());
        }
    }

    #[test]
    fn every_cell_owns_one_distinct_block_after_turns() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 1..=4 {
            let mut cube = cube(size);
            for _ in 0..12 {
                assert!(cube.set_random_rotation(&mut rng));
                assert!(run_to_completion(&mut cube).is_some());

                let homes: HashSet<GridCoord> =
                    cube.grid().iter().map(|(_, block)| block.home()).collect();
                assert_eq!(homes.len(), size * size * size);
                assert_eq!(cube.grid().iter().count(), size * size * size);
            }
        }
    }

    #[test]
    fn committed_blocks_sit_at_their_cell_centers() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut cube = cube(3);
        for _ in 0..20 {
            cube.set_random_rotation(&mut rng);
            run_to_completion(&mut cube);
        }
        for (coord, block) in cube.grid().iter() {
            let expected = cell_center(coord, 3);
            assert!(
                (block.position() - expected).norm() < 1e-3,
                "{coord}: {:?} vs {:?}",
                block.position(),
                expected
            );
        }
    }

    #[test]
    fn random_rotation_is_rejected_while_rotating() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut cube = cube(3);
        assert!(cube.set_random_rotation(&mut rng));
        let before = cube.rotation().clone();
        assert!(!cube.set_random_rotation(&mut rng));
        assert_eq!(cube.rotation(), &before);
    }

    #[test]
    fn selected_block_is_drawn_at_its_own_scale() {
        let mut cube = cube(3);
        cube.selection = Some(GridCoord::new(2, 2, 2));
        let instances = cube.instances(0.5);
        let scaled: Vec<_> = instances.iter().filter(|instance| instance.scale == 0.5).collect();
        assert_eq!(scaled.len(), 1);
        assert!((scaled[0].position - Vector3::new(2.0, 2.0, 2.0)).norm() < 1e-6);
        assert_eq!(instances.len(), 27);
    }
}
