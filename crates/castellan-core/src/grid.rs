//! The placement grid.
//!
//! This module contains:
//! - `Grid`: a bounded square grid of placed tiles, centred on the origin
//! - `GridSpot`: a view of one grid cell, free or occupied
//! - Placement validation, including the optional enclave rule
//! - Meeple placement onto tracked patterns and fields
//!
//! Placed tiles are registered with the `RegionTracker` so completed patterns
//! are known the moment the completing tile lands.

use crate::config::GameConfig;
use crate::coord::{GridCoord, GridDirection};
use crate::game::GameError;
use crate::player::PlayerId;
use crate::region::{FeatureCell, FieldRegion, PatternId, RegionTracker};
use crate::terrain::TerrainType;
use crate::tile::{Meeple, Rotation, Tile, TileKind};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

/// One cell of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpot {
    pub coord: GridCoord,
    tile: Option<Tile>,
}

impl GridSpot {
    pub fn tile(&self) -> Option<&Tile> {
        self.tile.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.tile.is_none()
    }

    pub fn is_occupied(&self) -> bool {
        self.tile.is_some()
    }
}

/// What a meeple ended up standing on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeepleTarget {
    /// A tracked fortification, path or cloister
    Pattern(PatternId),
    /// A field region
    Field,
}

/// Bounded grid of placed tiles
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    min: GridCoord,
    max: GridCoord,
    allow_enclaves: bool,
    tiles: HashMap<GridCoord, Tile>,
    regions: RegionTracker,
}

impl Grid {
    /// Create a grid of the given size with `foundation` placed at the origin
    pub fn new(width: u32, height: u32, foundation: Tile, allow_enclaves: bool) -> Result<Self, GameError> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(GameError::InvalidConfig(format!(
                "unsupported grid size {width}x{height}"
            )));
        }

        // Centre the grid on the origin; even sizes extend one further left/up
        let min = GridCoord::new(-((width / 2) as i32), -((height / 2) as i32));
        let max = GridCoord::new(min.x + (width as i32 - 1), min.y + (height as i32 - 1));

        let mut grid = Self {
            width,
            height,
            min,
            max,
            allow_enclaves,
            tiles: HashMap::new(),
            regions: RegionTracker::new(),
        };
        grid.insert(GridCoord::default(), foundation);
        debug!(width, height, foundation = ?foundation.kind(), "grid created");
        Ok(grid)
    }

    /// Create the grid a round with `config` starts with
    pub fn from_config(config: &GameConfig) -> Result<Self, GameError> {
        Self::new(
            config.grid_width,
            config.grid_height,
            Tile::new(config.foundation),
            config.allow_enclaves,
        )
    }

    // ==================== Query Methods ====================

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Smallest and largest valid coordinates
    pub fn bounds(&self) -> (GridCoord, GridCoord) {
        (self.min, self.max)
    }

    pub fn allows_enclaves(&self) -> bool {
        self.allow_enclaves
    }

    /// Whether a coordinate lies on the grid
    pub fn contains(&self, coord: GridCoord) -> bool {
        (self.min.x..=self.max.x).contains(&coord.x) && (self.min.y..=self.max.y).contains(&coord.y)
    }

    fn check_coord(&self, coord: GridCoord) -> Result<(), GameError> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(GameError::InvalidCoordinate {
                x: coord.x,
                y: coord.y,
            })
        }
    }

    /// The spot at a coordinate
    pub fn spot(&self, coord: GridCoord) -> Result<GridSpot, GameError> {
        self.check_coord(coord)?;
        Ok(GridSpot {
            coord,
            tile: self.tiles.get(&coord).copied(),
        })
    }

    pub fn tile(&self, coord: GridCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    /// Whether a tile sits at `coord` (false off the grid)
    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Number of placed tiles, foundation included
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// All placed tiles
    pub fn tiles(&self) -> &HashMap<GridCoord, Tile> {
        &self.tiles
    }

    pub fn regions(&self) -> &RegionTracker {
        &self.regions
    }

    /// Occupied spots sharing a side with `coord`
    pub fn direct_neighbors(&self, coord: GridCoord) -> Vec<GridSpot> {
        self.occupied_among(coord.direct_neighbors())
    }

    /// Occupied spots among the eight surrounding `coord`
    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridSpot> {
        self.occupied_among(coord.neighbors())
    }

    fn occupied_among(&self, coords: impl IntoIterator<Item = GridCoord>) -> Vec<GridSpot> {
        coords
            .into_iter()
            .filter_map(|coord| {
                self.tiles.get(&coord).map(|tile| GridSpot {
                    coord,
                    tile: Some(*tile),
                })
            })
            .collect()
    }

    /// Free in-bounds spots next to at least one placed tile, in coordinate order
    pub fn frontier(&self) -> BTreeSet<GridCoord> {
        self.tiles
            .keys()
            .flat_map(|coord| coord.direct_neighbors())
            .filter(|coord| self.contains(*coord) && !self.is_occupied(*coord))
            .collect()
    }

    // ==================== Placement ====================

    /// Whether `tile` may be placed at `coord` in its current rotation.
    ///
    /// The spot must be free, touch at least one placed tile, and match every
    /// occupied neighbour edge for edge. With `allow_enclaves` off the
    /// placement must also not leave a neighbouring free spot that no tile
    /// design could ever fill.
    pub fn is_placeable(&self, coord: GridCoord, tile: &Tile, allow_enclaves: bool) -> Result<bool, GameError> {
        self.check_coord(coord)?;
        if self.is_occupied(coord) {
            return Ok(false);
        }

        let mut touches = false;
        for side in GridDirection::EDGES {
            if let Some(other) = self.tiles.get(&coord.step(side)) {
                touches = true;
                if !tile.fits_beside(side, other) {
                    return Ok(false);
                }
            }
        }
        if !touches {
            return Ok(false);
        }

        if !allow_enclaves && self.creates_enclave(coord, tile) {
            trace!(%coord, kind = ?tile.kind(), "placement would create an enclave");
            return Ok(false);
        }
        Ok(true)
    }

    /// Place a tile if the placement is legal under this grid's enclave rule.
    ///
    /// Returns `Ok(false)` and leaves the grid untouched for illegal placements.
    pub fn place(&mut self, coord: GridCoord, tile: Tile) -> Result<bool, GameError> {
        if !self.is_placeable(coord, &tile, self.allow_enclaves)? {
            debug!(%coord, kind = ?tile.kind(), rotation = ?tile.rotation(), "placement rejected");
            return Ok(false);
        }
        self.insert(coord, tile);
        debug!(%coord, kind = ?tile.kind(), rotation = ?tile.rotation(), "tile placed");
        Ok(true)
    }

    fn insert(&mut self, coord: GridCoord, tile: Tile) {
        self.tiles.insert(coord, tile);
        let tiles = &self.tiles;
        self.regions
            .add_tile(coord, &tile, |c| tiles.contains_key(&c));
    }

    /// Every (spot, rotation) where `kind` could be placed right now
    pub fn valid_placements(&self, kind: TileKind) -> Vec<(GridCoord, Rotation)> {
        let mut placements = Vec::new();
        for coord in self.frontier() {
            for rotation in Rotation::ALL {
                let tile = Tile::with_rotation(kind, rotation);
                if matches!(self.is_placeable(coord, &tile, self.allow_enclaves), Ok(true)) {
                    placements.push((coord, rotation));
                }
            }
        }
        placements
    }

    /// Whether `kind` fits anywhere in any rotation
    pub fn has_any_placement(&self, kind: TileKind) -> bool {
        self.frontier().into_iter().any(|coord| {
            Rotation::ALL.into_iter().any(|rotation| {
                let tile = Tile::with_rotation(kind, rotation);
                matches!(self.is_placeable(coord, &tile, self.allow_enclaves), Ok(true))
            })
        })
    }

    /// Whether putting `tile` at `coord` leaves a neighbouring free spot unfillable
    fn creates_enclave(&self, coord: GridCoord, tile: &Tile) -> bool {
        coord
            .direct_neighbors()
            .into_iter()
            .filter(|spot| self.contains(*spot) && !self.is_occupied(*spot))
            .any(|spot| !self.spot_fillable(spot, (coord, tile)))
    }

    /// Whether any tile design fits `spot` given the placed tiles plus `extra`
    fn spot_fillable(&self, spot: GridCoord, extra: (GridCoord, &Tile)) -> bool {
        let constraints: Vec<(GridDirection, TerrainType)> = GridDirection::EDGES
            .into_iter()
            .filter_map(|side| {
                let neighbour = spot.step(side);
                let facing = side.opposite();
                if neighbour == extra.0 {
                    Some((side, extra.1.terrain(facing)))
                } else {
                    self.tiles.get(&neighbour).map(|t| (side, t.terrain(facing)))
                }
            })
            .collect();

        TileKind::ALL.into_iter().any(|kind| {
            Rotation::ALL.into_iter().any(|rotation| {
                let candidate = Tile::with_rotation(kind, rotation);
                constraints
                    .iter()
                    .all(|(side, terrain)| candidate.terrain(*side) == *terrain)
            })
        })
    }

    // ==================== Meeples ====================

    /// Whether a meeple could stand on `direction` of the tile at `coord`
    pub fn can_place_meeple(&self, coord: GridCoord, direction: GridDirection) -> bool {
        let Some(tile) = self.tiles.get(&coord) else {
            return false;
        };
        if tile.meeple().is_some() {
            return false;
        }
        let terrain = tile.terrain(direction);
        if !terrain.can_hold_meeple() {
            return false;
        }
        let cell = FeatureCell::new(coord, direction);
        match terrain {
            TerrainType::Field => self
                .regions
                .field_region(&self.tiles, cell)
                .is_some_and(|region| region.claims.is_empty()),
            _ => self
                .regions
                .pattern_at(cell)
                .is_some_and(|pattern| !pattern.is_claimed()),
        }
    }

    /// One position per unclaimed feature of the tile at `coord`
    pub fn meeple_spots(&self, coord: GridCoord) -> Vec<GridDirection> {
        let Some(tile) = self.tiles.get(&coord) else {
            return Vec::new();
        };
        tile.features()
            .into_iter()
            .filter_map(|(_, positions)| positions.first().copied())
            .filter(|direction| self.can_place_meeple(coord, *direction))
            .collect()
    }

    /// Stand a meeple on a feature of the tile at `coord`
    pub fn place_meeple(
        &mut self,
        coord: GridCoord,
        direction: GridDirection,
        owner: PlayerId,
    ) -> Result<MeepleTarget, GameError> {
        self.check_coord(coord)?;
        if !self.can_place_meeple(coord, direction) {
            return Err(GameError::InvalidMeeplePosition);
        }

        let cell = FeatureCell::new(coord, direction);
        let terrain = self
            .tiles
            .get(&coord)
            .map(|t| t.terrain(direction))
            .ok_or(GameError::InvalidMeeplePosition)?;
        let target = match terrain {
            TerrainType::Field => MeepleTarget::Field,
            _ => MeepleTarget::Pattern(self.regions.claim(cell, owner)?),
        };

        if let Some(tile) = self.tiles.get_mut(&coord) {
            tile.set_meeple(Meeple {
                owner,
                position: direction,
            });
        }
        debug!(%coord, ?direction, owner, role = terrain.meeple_role(), "meeple placed");
        Ok(target)
    }

    /// Lift the meeple off the tile at `coord`
    pub(crate) fn remove_meeple(&mut self, coord: GridCoord) -> Option<Meeple> {
        self.tiles.get_mut(&coord).and_then(|tile| tile.take_meeple())
    }

    // ==================== Regions ====================

    /// Patterns completed since the last call
    pub fn drain_completed(&mut self) -> Vec<PatternId> {
        self.regions.drain_completed()
    }

    pub(crate) fn regions_mut(&mut self) -> &mut RegionTracker {
        &mut self.regions
    }

    /// The field region a field position belongs to
    pub fn field_region(&self, coord: GridCoord, direction: GridDirection) -> Option<FieldRegion> {
        self.regions
            .field_region(&self.tiles, FeatureCell::new(coord, direction))
    }

    /// Every field region on the grid
    pub fn field_regions(&self) -> Vec<FieldRegion> {
        self.regions.field_regions(&self.tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::pattern_points;

    fn grid(width: u32, height: u32, foundation: TileKind) -> Grid {
        Grid::new(width, height, Tile::new(foundation), true).unwrap()
    }

    #[test]
    fn test_grid_is_centred() {
        let g = grid(3, 3, TileKind::CastleWallRoad);
        assert_eq!(g.bounds(), (GridCoord::new(-1, -1), GridCoord::new(1, 1)));
        assert!(g.spot(GridCoord::new(0, 0)).unwrap().is_occupied());
        assert_eq!(g.tile_count(), 1);

        let even = grid(4, 2, TileKind::Road);
        assert_eq!(even.bounds(), (GridCoord::new(-2, -1), GridCoord::new(1, 0)));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let result = Grid::new(0, 3, Tile::new(TileKind::Road), true);
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_out_of_bounds_is_invalid_coordinate() {
        let g = grid(3, 3, TileKind::Road);
        let tile = Tile::new(TileKind::Road);
        assert_eq!(
            g.is_placeable(GridCoord::new(2, 0), &tile, true),
            Err(GameError::InvalidCoordinate { x: 2, y: 0 })
        );
        assert_eq!(
            g.spot(GridCoord::new(0, -2)).unwrap_err(),
            GameError::InvalidCoordinate { x: 0, y: -2 }
        );
    }

    #[test]
    fn test_placement_requires_neighbor_and_matching_edges() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        let wall_down = Tile::with_rotation(TileKind::CastleWall, Rotation::R180);
        let wall_up = Tile::new(TileKind::CastleWall);

        // Not adjacent
        assert!(!g.is_placeable(GridCoord::new(2, 2), &wall_down, true).unwrap());
        // Field facing castle
        assert!(!g.is_placeable(GridCoord::new(0, -1), &wall_up, true).unwrap());
        // Occupied
        assert!(!g.is_placeable(GridCoord::new(0, 0), &wall_down, true).unwrap());

        assert!(g.place(GridCoord::new(0, -1), wall_down).unwrap());
        assert_eq!(g.tile_count(), 2);
        assert!(!g.place(GridCoord::new(0, -1), wall_down).unwrap());
    }

    #[test]
    fn test_rejected_placement_leaves_grid_untouched() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        let before = g.frontier();
        assert!(!g.place(GridCoord::new(0, -1), Tile::new(TileKind::Road)).unwrap());
        assert_eq!(g.tile_count(), 1);
        assert_eq!(g.frontier(), before);
        assert_eq!(g.regions().len(), 2);
    }

    #[test]
    fn test_neighbor_queries() {
        let mut g = grid(5, 5, TileKind::Road);
        assert!(g.place(GridCoord::new(1, 0), Tile::new(TileKind::Road)).unwrap());
        assert!(g
            .place(GridCoord::new(1, 1), Tile::with_rotation(TileKind::Road, Rotation::R0))
            .unwrap());

        let origin = GridCoord::new(0, 0);
        assert_eq!(g.direct_neighbors(origin).len(), 1);
        assert_eq!(g.neighbors(origin).len(), 2);
        assert!(g.neighbors(origin).iter().all(|spot| spot.is_occupied()));
    }

    #[test]
    fn test_valid_placements_cover_rotations() {
        let g = grid(3, 3, TileKind::Road);
        let placements = g.valid_placements(TileKind::Road);
        // Road ends take the horizontal rotations, the field sides too
        assert!(placements.contains(&(GridCoord::new(1, 0), Rotation::R0)));
        assert!(placements.contains(&(GridCoord::new(1, 0), Rotation::R180)));
        assert!(!placements.contains(&(GridCoord::new(1, 0), Rotation::R90)));
        assert!(placements.contains(&(GridCoord::new(0, -1), Rotation::R0)));
        assert!(!placements.contains(&(GridCoord::new(0, -1), Rotation::R90)));
        assert!(g.has_any_placement(TileKind::CastleWall));
    }

    #[test]
    fn test_full_grid_has_no_placements() {
        let g = grid(1, 1, TileKind::Monastery);
        assert!(g.frontier().is_empty());
        assert!(!g.has_any_placement(TileKind::Road));
    }

    /// Builds a ring around (1, 0) that needs castle above and below plus road
    /// left and right once a wall lands at (1, 1). No design has that.
    fn strand_spot(allow_enclaves: bool) -> Grid {
        let mut g = Grid::new(5, 5, Tile::new(TileKind::Road), allow_enclaves).unwrap();
        let steps = [
            (0, -1, Tile::new(TileKind::Monastery)),
            (1, -1, Tile::with_rotation(TileKind::CastleWall, Rotation::R180)),
            (2, -1, Tile::new(TileKind::Monastery)),
            (2, 0, Tile::new(TileKind::Road)),
            (0, 1, Tile::new(TileKind::Monastery)),
        ];
        for (x, y, tile) in steps {
            assert!(g.place(GridCoord::new(x, y), tile).unwrap(), "({x}, {y})");
        }
        g
    }

    #[test]
    fn test_enclave_rule() {
        let wall_up = Tile::new(TileKind::CastleWall);
        let target = GridCoord::new(1, 1);

        let mut strict = strand_spot(false);
        assert!(!strict.allows_enclaves());
        assert!(!strict.is_placeable(target, &wall_up, false).unwrap());
        assert!(strict.is_placeable(target, &wall_up, true).unwrap());
        assert!(!strict.place(target, wall_up).unwrap());

        let mut relaxed = strand_spot(true);
        assert!(relaxed.place(target, wall_up).unwrap());
        assert!(relaxed.spot(GridCoord::new(1, 0)).unwrap().is_free());
    }

    #[test]
    fn test_meeple_on_pattern_and_field() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        let origin = GridCoord::new(0, 0);
        let road = g
            .regions()
            .pattern_at(FeatureCell::new(origin, GridDirection::Left))
            .unwrap()
            .id();

        assert_eq!(
            g.place_meeple(origin, GridDirection::Center, 0),
            Ok(MeepleTarget::Pattern(road))
        );
        // One meeple per tile
        assert_eq!(
            g.place_meeple(origin, GridDirection::Top, 0),
            Err(GameError::InvalidMeeplePosition)
        );

        assert!(g.place(GridCoord::new(1, 0), Tile::new(TileKind::Road)).unwrap());
        // Road already claimed through the origin tile
        assert!(!g.can_place_meeple(GridCoord::new(1, 0), GridDirection::Left));
        // Field below the road is free
        assert_eq!(
            g.place_meeple(GridCoord::new(1, 0), GridDirection::Bottom, 1),
            Ok(MeepleTarget::Field)
        );
        assert_eq!(g.tile(GridCoord::new(1, 0)).unwrap().meeple().unwrap().owner, 1);
    }

    #[test]
    fn test_meeple_spots_skip_claimed_features() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        // Castle, road and two fields
        assert_eq!(g.meeple_spots(GridCoord::new(0, 0)).len(), 4);

        assert!(g.place(GridCoord::new(1, 0), Tile::new(TileKind::Road)).unwrap());
        g.place_meeple(GridCoord::new(1, 0), GridDirection::Center, 0)
            .unwrap();
        let spots = g.meeple_spots(GridCoord::new(0, 0));
        assert_eq!(spots.len(), 3);
        assert!(!spots.contains(&GridDirection::Right));

        assert_eq!(
            g.place_meeple(GridCoord::new(3, 3), GridDirection::Center, 0),
            Err(GameError::InvalidCoordinate { x: 3, y: 3 })
        );
    }

    #[test]
    fn test_completed_patterns_are_drained_once() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        assert!(g
            .place(GridCoord::new(0, -1), Tile::with_rotation(TileKind::CastleWall, Rotation::R180))
            .unwrap());
        assert_eq!(g.drain_completed().len(), 1);
        assert!(g.drain_completed().is_empty());
    }
    #[test]
    fn test_one_tile_completes_path_and_castle() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        let steps = [
            (-1, 0, Tile::new(TileKind::RoadJunctionSmall)),
            (0, -1, Tile::with_rotation(TileKind::CastleWall, Rotation::R180)),
            (1, -1, Tile::with_rotation(TileKind::CastleWall, Rotation::R180)),
        ];
        for (x, y, tile) in steps {
            assert!(g.place(GridCoord::new(x, y), tile).unwrap(), "({x}, {y})");
        }
        // Only the castle at the origin closed so far
        assert_eq!(g.drain_completed().len(), 1);

        assert!(g
            .place(GridCoord::new(1, 0), Tile::new(TileKind::CastleWallJunction))
            .unwrap());
        let mut closed: Vec<(TerrainType, usize, u32)> = g
            .drain_completed()
            .into_iter()
            .map(|id| {
                let pattern = g.regions().get(id).unwrap();
                (pattern.terrain(), pattern.tile_count(), pattern_points(pattern, &g, true))
            })
            .collect();
        closed.sort_by_key(|(terrain, _, _)| *terrain != TerrainType::Path);
        assert_eq!(
            closed,
            vec![
                (TerrainType::Path, 3, 3),
                (TerrainType::Fortification, 2, 4),
            ]
        );
        // Roads leaving the junction downward and to the right stay open
        let open = g
            .regions()
            .pattern_at(FeatureCell::new(GridCoord::new(1, 0), GridDirection::Bottom))
            .unwrap();
        assert!(!open.is_complete());
    }

    #[test]
    fn test_no_meeple_on_junction_centre() {
        let mut g = grid(5, 5, TileKind::CastleWallRoad);
        let junction = GridCoord::new(-1, 0);
        assert!(g.place(junction, Tile::new(TileKind::RoadJunctionSmall)).unwrap());

        assert!(!g.can_place_meeple(junction, GridDirection::Center));
        assert_eq!(
            g.place_meeple(junction, GridDirection::Center, 0),
            Err(GameError::InvalidMeeplePosition)
        );
        assert!(!g.meeple_spots(junction).contains(&GridDirection::Center));
        assert!(g.can_place_meeple(junction, GridDirection::Bottom));
    }
}
