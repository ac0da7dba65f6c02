//! Square grid coordinate system and tile feature positions.
//!
//! This module provides the foundational coordinate types for the game board:
//! - `GridCoord`: Identifies a single cell of the placement grid
//! - `GridDirection`: One of the nine feature positions on a tile
//!
//! The grid uses screen orientation: `x` increases going right and `y`
//! increases going down, so the cell above `(0, 0)` is `(0, -1)`.

use serde::{Deserialize, Serialize};

/// A feature position on a tile.
///
/// A tile is viewed as a 3x3 block: one centre, four edges and four corners.
/// Only edges are compared against neighbouring tiles when placing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GridDirection {
    /// Top edge
    Top,
    /// Right edge
    Right,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
    /// Top-right corner
    TopRight,
    /// Bottom-right corner
    BottomRight,
    /// Bottom-left corner
    BottomLeft,
    /// Top-left corner
    TopLeft,
    /// Middle of the tile
    Center,
}

impl GridDirection {
    /// All nine positions, in storage order
    pub const ALL: [GridDirection; 9] = [
        GridDirection::Top,
        GridDirection::Right,
        GridDirection::Bottom,
        GridDirection::Left,
        GridDirection::TopRight,
        GridDirection::BottomRight,
        GridDirection::BottomLeft,
        GridDirection::TopLeft,
        GridDirection::Center,
    ];

    /// The four edge positions in clockwise order starting from Top
    pub const EDGES: [GridDirection; 4] = [
        GridDirection::Top,
        GridDirection::Right,
        GridDirection::Bottom,
        GridDirection::Left,
    ];

    /// The four corner positions in clockwise order starting from TopRight
    pub const CORNERS: [GridDirection; 4] = [
        GridDirection::TopRight,
        GridDirection::BottomRight,
        GridDirection::BottomLeft,
        GridDirection::TopLeft,
    ];

    /// Index into per-tile position arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this is one of the four edge positions
    pub fn is_edge(self) -> bool {
        matches!(
            self,
            GridDirection::Top | GridDirection::Right | GridDirection::Bottom | GridDirection::Left
        )
    }

    /// Whether this is one of the four corner positions
    pub fn is_corner(self) -> bool {
        matches!(
            self,
            GridDirection::TopRight
                | GridDirection::BottomRight
                | GridDirection::BottomLeft
                | GridDirection::TopLeft
        )
    }

    /// The position mirrored through the centre
    pub fn opposite(self) -> Self {
        match self {
            GridDirection::Top => GridDirection::Bottom,
            GridDirection::Right => GridDirection::Left,
            GridDirection::Bottom => GridDirection::Top,
            GridDirection::Left => GridDirection::Right,
            GridDirection::TopRight => GridDirection::BottomLeft,
            GridDirection::BottomRight => GridDirection::TopLeft,
            GridDirection::BottomLeft => GridDirection::TopRight,
            GridDirection::TopLeft => GridDirection::BottomRight,
            GridDirection::Center => GridDirection::Center,
        }
    }

    /// Where this position ends up after a quarter turn clockwise
    pub fn rotate_clockwise(self) -> Self {
        match self {
            GridDirection::Top => GridDirection::Right,
            GridDirection::Right => GridDirection::Bottom,
            GridDirection::Bottom => GridDirection::Left,
            GridDirection::Left => GridDirection::Top,
            GridDirection::TopRight => GridDirection::BottomRight,
            GridDirection::BottomRight => GridDirection::BottomLeft,
            GridDirection::BottomLeft => GridDirection::TopLeft,
            GridDirection::TopLeft => GridDirection::TopRight,
            GridDirection::Center => GridDirection::Center,
        }
    }

    /// Where this position ends up after a quarter turn counter-clockwise
    pub fn rotate_counter_clockwise(self) -> Self {
        // Three clockwise turns
        self.rotate_clockwise().rotate_clockwise().rotate_clockwise()
    }

    /// Grid offset `(dx, dy)` of the cell lying in this direction
    pub fn offset(self) -> (i32, i32) {
        match self {
            GridDirection::Top => (0, -1),
            GridDirection::Right => (1, 0),
            GridDirection::Bottom => (0, 1),
            GridDirection::Left => (-1, 0),
            GridDirection::TopRight => (1, -1),
            GridDirection::BottomRight => (1, 1),
            GridDirection::BottomLeft => (-1, 1),
            GridDirection::TopLeft => (-1, -1),
            GridDirection::Center => (0, 0),
        }
    }

    /// Positions sharing a side with this one inside the 3x3 block of a tile
    pub fn adjacent_within_tile(self) -> &'static [GridDirection] {
        use GridDirection::*;
        match self {
            Top => &[TopLeft, TopRight, Center],
            Right => &[TopRight, BottomRight, Center],
            Bottom => &[BottomRight, BottomLeft, Center],
            Left => &[BottomLeft, TopLeft, Center],
            TopRight => &[Top, Right],
            BottomRight => &[Right, Bottom],
            BottomLeft => &[Bottom, Left],
            TopLeft => &[Top, Left],
            Center => &[Top, Right, Bottom, Left],
        }
    }

    /// For a corner, the two tile borders it touches.
    ///
    /// Each entry is the edge to step across and the corner of the neighbouring
    /// tile that meets this one at the shared grid point. Empty for edges and
    /// the centre.
    pub fn corner_crossings(self) -> &'static [(GridDirection, GridDirection)] {
        use GridDirection::*;
        match self {
            TopLeft => &[(Left, TopRight), (Top, BottomLeft)],
            TopRight => &[(Right, TopLeft), (Top, BottomRight)],
            BottomRight => &[(Right, BottomLeft), (Bottom, TopRight)],
            BottomLeft => &[(Left, BottomRight), (Bottom, TopLeft)],
            _ => &[],
        }
    }
}

/// Cell coordinate on the placement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct GridCoord {
    /// Column (increases going right)
    pub x: i32,
    /// Row (increases going down)
    pub y: i32,
}

impl GridCoord {
    /// Create a new grid coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell lying in the given direction
    pub fn step(&self, direction: GridDirection) -> GridCoord {
        let (dx, dy) = direction.offset();
        GridCoord::new(self.x + dx, self.y + dy)
    }

    /// The four cells sharing a side with this one, clockwise from Top
    pub fn direct_neighbors(&self) -> [GridCoord; 4] {
        GridDirection::EDGES.map(|dir| self.step(dir))
    }

    /// The eight surrounding cells: the direct neighbours, then the diagonals
    pub fn neighbors(&self) -> [GridCoord; 8] {
        let [top, right, bottom, left] = self.direct_neighbors();
        let [top_right, bottom_right, bottom_left, top_left] =
            GridDirection::CORNERS.map(|dir| self.step(dir));
        [
            top,
            right,
            bottom,
            left,
            top_right,
            bottom_right,
            bottom_left,
            top_left,
        ]
    }

    /// Chebyshev distance (king moves) to another cell
    pub fn distance_to(&self, other: &GridCoord) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_opposite_is_involution() {
        for dir in GridDirection::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(GridDirection::Center.opposite(), GridDirection::Center);
    }

    #[test]
    fn test_four_rotations_restore_position() {
        for dir in GridDirection::ALL {
            let mut rotated = dir;
            for _ in 0..4 {
                rotated = rotated.rotate_clockwise();
            }
            assert_eq!(rotated, dir);
            assert_eq!(dir.rotate_clockwise().rotate_counter_clockwise(), dir);
        }
    }

    #[test]
    fn test_rotation_keeps_edges_and_corners_apart() {
        for dir in GridDirection::EDGES {
            assert!(dir.rotate_clockwise().is_edge());
        }
        for dir in GridDirection::CORNERS {
            assert!(dir.rotate_clockwise().is_corner());
        }
    }

    #[test]
    fn test_neighbors_are_distinct() {
        let origin = GridCoord::new(0, 0);
        let unique: HashSet<_> = origin.neighbors().into_iter().collect();
        assert_eq!(unique.len(), 8);
        for neighbor in origin.neighbors() {
            assert_eq!(origin.distance_to(&neighbor), 1);
        }
    }

    #[test]
    fn test_step_and_back() {
        let coord = GridCoord::new(3, -2);
        for dir in GridDirection::ALL {
            assert_eq!(coord.step(dir).step(dir.opposite()), coord);
        }
        assert_eq!(coord.step(GridDirection::Top), GridCoord::new(3, -3));
    }

    #[test]
    fn test_adjacency_within_tile_is_symmetric() {
        for a in GridDirection::ALL {
            for &b in a.adjacent_within_tile() {
                assert!(b.adjacent_within_tile().contains(&a), "{a:?} <-> {b:?}");
            }
        }
    }

    #[test]
    fn test_corner_crossings_are_symmetric() {
        let origin = GridCoord::new(0, 0);
        for corner in GridDirection::CORNERS {
            for &(edge, other_corner) in corner.corner_crossings() {
                let neighbor = origin.step(edge);
                let back = other_corner
                    .corner_crossings()
                    .iter()
                    .find(|(e, _)| neighbor.step(*e) == origin)
                    .map(|(_, c)| *c);
                assert_eq!(back, Some(corner));
            }
        }
        assert!(GridDirection::Top.corner_crossings().is_empty());
    }
}
