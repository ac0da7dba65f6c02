//! Tile kinds, their fixed layouts, and rotation.
//!
//! This module contains:
//! - `TileKind`: the 24 tile designs of the base game and how many of each exist
//! - `TileLayout`: terrain and feature connectivity of a design before rotation
//! - `Tile`: a concrete tile with a rotation and an optional meeple
//!
//! Connectivity inside a tile is data, not geometry: every position carries a
//! segment number, and positions with the same segment belong to the same
//! feature. This captures things like the thin strip of field under a castle
//! wall, which a pure 3x3 neighbourhood rule cannot express.

use crate::coord::GridDirection;
use crate::player::PlayerId;
use crate::terrain::TerrainType;
use serde::{Deserialize, Serialize};

const C: TerrainType = TerrainType::Fortification;
const P: TerrainType = TerrainType::Path;
const K: TerrainType = TerrainType::Cloister;
const F: TerrainType = TerrainType::Field;
const O: TerrainType = TerrainType::Other;

/// Terrain and feature segments of a tile design, indexed by `GridDirection::index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    pub terrain: [TerrainType; 9],
    pub segments: [u8; 9],
}

impl TileLayout {
    const fn new(terrain: [TerrainType; 9], segments: [u8; 9]) -> Self {
        Self { terrain, segments }
    }
}

/// Tile designs.
///
/// Layout arrays are in `GridDirection::ALL` order:
/// top, right, bottom, left, top-right, bottom-right, bottom-left, top-left, centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Monastery surrounded by fields
    Monastery,
    /// Monastery with a road leaving at the bottom
    MonasteryRoad,
    /// Castle covering the whole tile
    CastleCenter,
    /// Castle wall on top, straight road from left to right
    CastleWallRoad,
    /// Castle wall on top, fields elsewhere
    CastleWall,
    /// Castle running from left to right through the middle
    CastleTube,
    /// Castle running from left to right through the middle, with emblem
    CastleTubeEmblem,
    /// Two separate castle walls on top and bottom
    CastleSides,
    /// Two separate castle walls on top and left
    CastleSidesEdge,
    /// Castle wall on top, road curving from right to bottom
    CastleWallCurveRight,
    /// Castle wall on top, road curving from left to bottom
    CastleWallCurveLeft,
    /// Castle wall on top, roads leaving right, bottom and left
    CastleWallJunction,
    /// Castle filling the top-left half
    CastleEdge,
    /// Castle filling the top-left half, with emblem
    CastleEdgeEmblem,
    /// Castle filling the top-left half, road curving from right to bottom
    CastleEdgeRoad,
    /// Castle filling the top-left half, road curving from right to bottom, with emblem
    CastleEdgeRoadEmblem,
    /// Castle open on top, left and right
    CastleThreeSides,
    /// Castle open on top, left and right, with emblem
    CastleThreeSidesEmblem,
    /// Castle open on top, left and right, road leaving at the bottom
    CastleThreeSidesRoad,
    /// Castle open on top, left and right, road leaving at the bottom, with emblem
    CastleThreeSidesRoadEmblem,
    /// Straight road from left to right
    Road,
    /// Road curving from left to bottom
    RoadCurve,
    /// Three roads meeting at a junction
    RoadJunctionSmall,
    /// Four roads meeting at a crossroads
    RoadJunctionLarge,
}

impl TileKind {
    /// All tile designs
    pub const ALL: [TileKind; 24] = [
        TileKind::Monastery,
        TileKind::MonasteryRoad,
        TileKind::CastleCenter,
        TileKind::CastleWallRoad,
        TileKind::CastleWall,
        TileKind::CastleTube,
        TileKind::CastleTubeEmblem,
        TileKind::CastleSides,
        TileKind::CastleSidesEdge,
        TileKind::CastleWallCurveRight,
        TileKind::CastleWallCurveLeft,
        TileKind::CastleWallJunction,
        TileKind::CastleEdge,
        TileKind::CastleEdgeEmblem,
        TileKind::CastleEdgeRoad,
        TileKind::CastleEdgeRoadEmblem,
        TileKind::CastleThreeSides,
        TileKind::CastleThreeSidesEmblem,
        TileKind::CastleThreeSidesRoad,
        TileKind::CastleThreeSidesRoadEmblem,
        TileKind::Road,
        TileKind::RoadCurve,
        TileKind::RoadJunctionSmall,
        TileKind::RoadJunctionLarge,
    ];

    /// Base layout before rotation
    pub fn layout(self) -> TileLayout {
        match self {
            TileKind::Monastery => {
                TileLayout::new([F, F, F, F, F, F, F, F, K], [0, 0, 0, 0, 0, 0, 0, 0, 1])
            }
            TileKind::MonasteryRoad => {
                TileLayout::new([F, F, P, F, F, F, F, F, K], [0, 0, 1, 0, 0, 0, 0, 0, 2])
            }
            TileKind::CastleCenter => TileLayout::new([C; 9], [0; 9]),
            TileKind::CastleWallRoad => {
                TileLayout::new([C, P, F, P, F, F, F, F, P], [0, 1, 2, 1, 3, 2, 2, 3, 1])
            }
            TileKind::CastleWall => {
                TileLayout::new([C, F, F, F, F, F, F, F, F], [0, 1, 1, 1, 1, 1, 1, 1, 1])
            }
            TileKind::CastleTube | TileKind::CastleTubeEmblem => {
                TileLayout::new([F, C, F, C, F, F, F, F, C], [0, 1, 2, 1, 0, 2, 2, 0, 1])
            }
            TileKind::CastleSides => {
                TileLayout::new([C, F, C, F, F, F, F, F, F], [0, 1, 2, 1, 1, 1, 1, 1, 1])
            }
            TileKind::CastleSidesEdge => {
                TileLayout::new([C, F, F, C, F, F, F, F, F], [0, 1, 1, 2, 1, 1, 1, 1, 1])
            }
            TileKind::CastleWallCurveRight => {
                TileLayout::new([C, P, P, F, F, F, F, F, P], [0, 1, 1, 2, 2, 3, 2, 2, 1])
            }
            TileKind::CastleWallCurveLeft => {
                TileLayout::new([C, F, P, P, F, F, F, F, P], [0, 1, 2, 2, 1, 1, 3, 1, 2])
            }
            TileKind::CastleWallJunction => {
                TileLayout::new([C, P, P, P, F, F, F, F, O], [0, 1, 2, 3, 4, 5, 6, 4, 7])
            }
            TileKind::CastleEdge | TileKind::CastleEdgeEmblem => {
                TileLayout::new([C, F, F, C, F, F, F, C, C], [0, 1, 1, 0, 1, 1, 1, 0, 0])
            }
            TileKind::CastleEdgeRoad | TileKind::CastleEdgeRoadEmblem => {
                TileLayout::new([C, P, P, C, F, F, F, C, P], [0, 1, 1, 0, 2, 3, 2, 0, 1])
            }
            TileKind::CastleThreeSides | TileKind::CastleThreeSidesEmblem => {
                TileLayout::new([C, C, F, C, C, F, F, C, C], [0, 0, 1, 0, 0, 1, 1, 0, 0])
            }
            TileKind::CastleThreeSidesRoad | TileKind::CastleThreeSidesRoadEmblem => {
                TileLayout::new([C, C, P, C, C, F, F, C, C], [0, 0, 1, 0, 0, 2, 3, 0, 0])
            }
            TileKind::Road => {
                TileLayout::new([F, P, F, P, F, F, F, F, P], [0, 1, 2, 1, 0, 2, 2, 0, 1])
            }
            TileKind::RoadCurve => {
                TileLayout::new([F, F, P, P, F, F, F, F, P], [0, 0, 1, 1, 0, 0, 2, 0, 1])
            }
            TileKind::RoadJunctionSmall => {
                TileLayout::new([F, P, P, P, F, F, F, F, O], [0, 1, 2, 3, 0, 4, 5, 0, 6])
            }
            TileKind::RoadJunctionLarge => {
                TileLayout::new([P, P, P, P, F, F, F, F, O], [0, 1, 2, 3, 4, 5, 6, 7, 8])
            }
        }
    }

    /// Whether the castle on this tile carries an emblem (pennant)
    pub fn has_emblem(self) -> bool {
        matches!(
            self,
            TileKind::CastleCenter
                | TileKind::CastleTubeEmblem
                | TileKind::CastleEdgeEmblem
                | TileKind::CastleEdgeRoadEmblem
                | TileKind::CastleThreeSidesEmblem
                | TileKind::CastleThreeSidesRoadEmblem
        )
    }

    /// Number of copies in the base game, including the start tile
    pub fn standard_count(self) -> usize {
        match self {
            TileKind::Monastery => 4,
            TileKind::MonasteryRoad => 2,
            TileKind::CastleCenter => 1,
            TileKind::CastleWallRoad => 4,
            TileKind::CastleWall => 5,
            TileKind::CastleTube => 1,
            TileKind::CastleTubeEmblem => 2,
            TileKind::CastleSides => 3,
            TileKind::CastleSidesEdge => 2,
            TileKind::CastleWallCurveRight => 3,
            TileKind::CastleWallCurveLeft => 3,
            TileKind::CastleWallJunction => 3,
            TileKind::CastleEdge => 3,
            TileKind::CastleEdgeEmblem => 2,
            TileKind::CastleEdgeRoad => 3,
            TileKind::CastleEdgeRoadEmblem => 2,
            TileKind::CastleThreeSides => 3,
            TileKind::CastleThreeSidesEmblem => 1,
            TileKind::CastleThreeSidesRoad => 1,
            TileKind::CastleThreeSidesRoadEmblem => 2,
            TileKind::Road => 8,
            TileKind::RoadCurve => 9,
            TileKind::RoadJunctionSmall => 4,
            TileKind::RoadJunctionLarge => 1,
        }
    }
}

/// Quarter-turn rotation state of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// All rotations in clockwise order
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Number of clockwise quarter turns from the base layout
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// Rotation after `turns` further clockwise quarter turns
    pub fn turned(self, turns: u8) -> Rotation {
        Rotation::ALL[((self.quarter_turns() + turns) % 4) as usize]
    }

    /// Rotation in degrees
    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }
}

/// Which way to turn the tile in hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// A meeple standing on a tile feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meeple {
    /// Player who owns the meeple
    pub owner: PlayerId,
    /// Feature position the meeple stands on
    pub position: GridDirection,
}

/// A concrete tile: a design, its current rotation, and at most one meeple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    kind: TileKind,
    rotation: Rotation,
    terrain: [TerrainType; 9],
    segments: [u8; 9],
    meeple: Option<Meeple>,
}

impl Tile {
    /// Create a tile in its base orientation
    pub fn new(kind: TileKind) -> Self {
        let layout = kind.layout();
        Self {
            kind,
            rotation: Rotation::R0,
            terrain: layout.terrain,
            segments: layout.segments,
            meeple: None,
        }
    }

    /// Create a tile already turned to `rotation`
    pub fn with_rotation(kind: TileKind, rotation: Rotation) -> Self {
        let mut tile = Self::new(kind);
        tile.set_rotation(rotation);
        tile
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn has_emblem(&self) -> bool {
        self.kind.has_emblem()
    }

    /// Terrain at a position, taking rotation into account
    pub fn terrain(&self, direction: GridDirection) -> TerrainType {
        self.terrain[direction.index()]
    }

    /// Whether two positions belong to the same feature of this tile
    pub fn is_connected(&self, a: GridDirection, b: GridDirection) -> bool {
        self.segments[a.index()] == self.segments[b.index()]
    }

    /// All positions belonging to the same feature as `direction`, itself included
    pub fn connected_positions(&self, direction: GridDirection) -> Vec<GridDirection> {
        GridDirection::ALL
            .into_iter()
            .filter(|other| self.is_connected(direction, *other))
            .collect()
    }

    /// The features of this tile as (terrain, positions), skipping `Other`
    pub fn features(&self) -> Vec<(TerrainType, Vec<GridDirection>)> {
        let mut features: Vec<(u8, TerrainType, Vec<GridDirection>)> = Vec::new();
        for dir in GridDirection::ALL {
            let terrain = self.terrain(dir);
            if terrain == TerrainType::Other {
                continue;
            }
            let segment = self.segments[dir.index()];
            match features.iter_mut().find(|(s, _, _)| *s == segment) {
                Some((_, _, positions)) => positions.push(dir),
                None => features.push((segment, terrain, vec![dir])),
            }
        }
        features
            .into_iter()
            .map(|(_, terrain, positions)| (terrain, positions))
            .collect()
    }

    /// Turn the tile a quarter clockwise
    pub fn rotate_clockwise(&mut self) {
        let mut terrain = self.terrain;
        let mut segments = self.segments;
        for dir in GridDirection::ALL {
            let target = dir.rotate_clockwise().index();
            terrain[target] = self.terrain[dir.index()];
            segments[target] = self.segments[dir.index()];
        }
        self.terrain = terrain;
        self.segments = segments;
        if let Some(meeple) = &mut self.meeple {
            meeple.position = meeple.position.rotate_clockwise();
        }
        self.rotation = self.rotation.turned(1);
    }

    /// Turn the tile a quarter counter-clockwise
    pub fn rotate_counter_clockwise(&mut self) {
        for _ in 0..3 {
            self.rotate_clockwise();
        }
    }

    /// Turn the tile until it reaches `rotation`
    pub fn set_rotation(&mut self, rotation: Rotation) {
        while self.rotation != rotation {
            self.rotate_clockwise();
        }
    }

    /// Apply a single turn in the given direction
    pub fn rotate(&mut self, direction: RotationDirection) {
        match direction {
            RotationDirection::Clockwise => self.rotate_clockwise(),
            RotationDirection::CounterClockwise => self.rotate_counter_clockwise(),
        }
    }

    /// The meeple standing on this tile, if any
    pub fn meeple(&self) -> Option<Meeple> {
        self.meeple
    }

    pub(crate) fn set_meeple(&mut self, meeple: Meeple) {
        self.meeple = Some(meeple);
    }

    pub(crate) fn take_meeple(&mut self) -> Option<Meeple> {
        self.meeple.take()
    }

    /// Whether this tile's edge fits next to `other` placed in direction `side`
    pub fn fits_beside(&self, side: GridDirection, other: &Tile) -> bool {
        self.terrain(side) == other.terrain(side.opposite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_set_has_72_tiles() {
        let total: usize = TileKind::ALL.iter().map(|k| k.standard_count()).sum();
        assert_eq!(total, 72);
    }

    #[test]
    fn test_segments_never_mix_terrain() {
        for kind in TileKind::ALL {
            let layout = kind.layout();
            for a in GridDirection::ALL {
                for b in GridDirection::ALL {
                    if layout.segments[a.index()] == layout.segments[b.index()] {
                        assert_eq!(
                            layout.terrain[a.index()],
                            layout.terrain[b.index()],
                            "{kind:?}: {a:?} and {b:?} share a segment"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_four_rotations_restore_layout() {
        for kind in TileKind::ALL {
            let original = Tile::new(kind);
            let mut tile = original;
            for _ in 0..4 {
                tile.rotate_clockwise();
            }
            assert_eq!(tile, original, "{kind:?}");
        }
    }

    #[test]
    fn test_rotation_moves_edges() {
        let mut tile = Tile::new(TileKind::CastleWall);
        assert_eq!(tile.terrain(GridDirection::Top), TerrainType::Fortification);

        tile.rotate_clockwise();
        assert_eq!(tile.rotation(), Rotation::R90);
        assert_eq!(tile.terrain(GridDirection::Right), TerrainType::Fortification);
        assert_eq!(tile.terrain(GridDirection::Top), TerrainType::Field);

        tile.rotate_counter_clockwise();
        tile.rotate_counter_clockwise();
        assert_eq!(tile.rotation(), Rotation::R270);
        assert_eq!(tile.rotation().degrees(), 270);
        assert_eq!(tile.terrain(GridDirection::Left), TerrainType::Fortification);
    }

    #[test]
    fn test_rotation_keeps_connectivity() {
        let mut tile = Tile::new(TileKind::RoadCurve);
        assert!(tile.is_connected(GridDirection::Left, GridDirection::Bottom));
        tile.set_rotation(Rotation::R90);
        assert!(tile.is_connected(GridDirection::Top, GridDirection::Left));
        assert!(!tile.is_connected(GridDirection::Top, GridDirection::Right));
    }

    #[test]
    fn test_wall_strip_is_one_field() {
        let tile = Tile::new(TileKind::CastleWallRoad);
        assert!(tile.is_connected(GridDirection::TopLeft, GridDirection::TopRight));
        assert!(!tile.is_connected(GridDirection::TopLeft, GridDirection::BottomLeft));
        assert!(tile.is_connected(GridDirection::Left, GridDirection::Right));
    }

    #[test]
    fn test_features_grouping() {
        let tile = Tile::new(TileKind::RoadJunctionLarge);
        let features = tile.features();
        let paths = features
            .iter()
            .filter(|(t, _)| *t == TerrainType::Path)
            .count();
        let fields = features
            .iter()
            .filter(|(t, _)| *t == TerrainType::Field)
            .count();
        assert_eq!(paths, 4);
        assert_eq!(fields, 4);

        let cloister = Tile::new(TileKind::Monastery).features();
        assert_eq!(cloister.len(), 2);
    }

    #[test]
    fn test_emblems() {
        assert!(TileKind::CastleCenter.has_emblem());
        assert!(!TileKind::CastleTube.has_emblem());
        let emblem_tiles: usize = TileKind::ALL
            .iter()
            .filter(|k| k.has_emblem())
            .map(|k| k.standard_count())
            .sum();
        assert_eq!(emblem_tiles, 10);
    }
}
