//! Incremental tracking of connected features ("patterns") across tiles.
//!
//! Fortifications, paths and cloisters are tracked as tiles are placed. Each
//! pattern lives in a central table and is addressed by a `PatternId`; a
//! separate index maps every `(coord, direction)` feature cell to the pattern
//! that currently owns it. Merging moves the cells of the smaller pattern into
//! the larger one and rewrites their index entries.
//!
//! Fields are not tracked. They can cover most of the grid and are only needed
//! when claiming a field or when the round ends, so they are flood-filled on
//! demand.

use crate::coord::{GridCoord, GridDirection};
use crate::game::GameError;
use crate::player::PlayerId;
use crate::terrain::TerrainType;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, trace, warn};

/// One feature position on one placed tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureCell {
    pub coord: GridCoord,
    pub direction: GridDirection,
}

impl FeatureCell {
    pub const fn new(coord: GridCoord, direction: GridDirection) -> Self {
        Self { coord, direction }
    }
}

/// Handle into the pattern table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(u32);

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A meeple claiming a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub owner: PlayerId,
    pub cell: FeatureCell,
}

/// A maximal connected group of same-terrain feature cells
#[derive(Debug, Clone)]
pub struct Pattern {
    id: PatternId,
    terrain: TerrainType,
    cells: HashSet<FeatureCell>,
    tiles: BTreeSet<GridCoord>,
    /// Edge cells that do not face a placed tile yet
    open_edges: HashSet<FeatureCell>,
    claims: Vec<Claim>,
    complete: bool,
}

impl Pattern {
    fn new(id: PatternId, terrain: TerrainType, coord: GridCoord) -> Self {
        Self {
            id,
            terrain,
            cells: HashSet::new(),
            tiles: BTreeSet::from([coord]),
            open_edges: HashSet::new(),
            claims: Vec::new(),
            complete: false,
        }
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn terrain(&self) -> TerrainType {
        self.terrain
    }

    pub fn cells(&self) -> &HashSet<FeatureCell> {
        &self.cells
    }

    /// Coordinates of the tiles this pattern spans
    pub fn tiles(&self) -> &BTreeSet<GridCoord> {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn open_edge_count(&self) -> usize {
        self.open_edges.len()
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn is_claimed(&self) -> bool {
        !self.claims.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The tile a cloister sits on (the first tile for other patterns)
    pub fn anchor(&self) -> Option<GridCoord> {
        self.tiles.iter().next().copied()
    }

    fn absorb(&mut self, other: Pattern) {
        self.cells.extend(other.cells);
        self.tiles.extend(other.tiles);
        self.open_edges.extend(other.open_edges);
        self.claims.extend(other.claims);
    }
}

/// A connected field region, resolved on demand
#[derive(Debug, Clone, Default)]
pub struct FieldRegion {
    pub cells: HashSet<FeatureCell>,
    pub claims: Vec<Claim>,
    /// Completed fortifications touching this field
    pub bordering_fortifications: BTreeSet<PatternId>,
}

/// Central pattern table plus the cell index
#[derive(Debug, Clone, Default)]
pub struct RegionTracker {
    patterns: BTreeMap<PatternId, Pattern>,
    index: HashMap<FeatureCell, PatternId>,
    /// Cells of every fortification that has been completed, kept after scoring
    closed_fortifications: HashMap<FeatureCell, PatternId>,
    completed: Vec<PatternId>,
    next_id: u32,
}

impl RegionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of patterns still tracked
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(&id)
    }

    /// The tracked pattern containing a feature cell
    pub fn pattern_at(&self, cell: FeatureCell) -> Option<&Pattern> {
        self.index.get(&cell).and_then(|id| self.patterns.get(id))
    }

    /// All tracked patterns in creation order
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    /// The completed fortification a cell belonged to, even after scoring
    pub fn closed_fortification_at(&self, cell: FeatureCell) -> Option<PatternId> {
        self.closed_fortifications.get(&cell).copied()
    }

    /// Take the patterns completed since the last call
    pub fn drain_completed(&mut self) -> Vec<PatternId> {
        std::mem::take(&mut self.completed)
    }

    /// Register a freshly placed tile.
    ///
    /// `is_occupied` must already report the new tile. Returns the patterns
    /// this placement completed.
    pub fn add_tile<F>(&mut self, coord: GridCoord, tile: &Tile, is_occupied: F) -> Vec<PatternId>
    where
        F: Fn(GridCoord) -> bool,
    {
        let mut tracked_cells = Vec::new();

        for (terrain, positions) in tile.features() {
            if !terrain.is_tracked() {
                continue;
            }

            let id = self.allocate(terrain, coord);
            let mut neighbours = Vec::new();

            for &direction in &positions {
                let cell = FeatureCell::new(coord, direction);
                self.index.insert(cell, id);
                tracked_cells.push(cell);

                if let Some(pattern) = self.patterns.get_mut(&id) {
                    pattern.cells.insert(cell);
                }

                if terrain == TerrainType::Cloister || !direction.is_edge() {
                    continue;
                }

                let neighbour = coord.step(direction);
                if !is_occupied(neighbour) {
                    if let Some(pattern) = self.patterns.get_mut(&id) {
                        pattern.open_edges.insert(cell);
                    }
                    continue;
                }

                let facing = FeatureCell::new(neighbour, direction.opposite());
                match self.index.get(&facing).copied() {
                    Some(other) => {
                        if let Some(pattern) = self.patterns.get_mut(&other) {
                            pattern.open_edges.remove(&facing);
                        }
                        neighbours.push(other);
                    }
                    None => warn!(%coord, ?direction, "facing {} cell is not tracked", terrain),
                }
            }

            neighbours.sort();
            neighbours.dedup();
            neighbours
                .into_iter()
                .fold(id, |survivor, other| self.merge(survivor, other));
        }

        let mut touched: BTreeSet<PatternId> = tracked_cells
            .iter()
            .filter_map(|cell| self.index.get(cell).copied())
            .collect();

        for nearby in std::iter::once(coord).chain(coord.neighbors()) {
            if let Some(pattern) = self.pattern_at(FeatureCell::new(nearby, GridDirection::Center)) {
                if pattern.terrain == TerrainType::Cloister {
                    touched.insert(pattern.id);
                }
            }
        }

        let mut completed = Vec::new();
        for id in touched {
            let Some(pattern) = self.patterns.get_mut(&id) else {
                continue;
            };
            if pattern.complete {
                continue;
            }
            let done = match pattern.terrain {
                TerrainType::Cloister => pattern
                    .anchor()
                    .map(|anchor| anchor.neighbors().into_iter().all(&is_occupied))
                    .unwrap_or(false),
                _ => pattern.open_edges.is_empty(),
            };
            if !done {
                continue;
            }

            pattern.complete = true;
            debug!(
                pattern = %id,
                terrain = %pattern.terrain,
                tiles = pattern.tiles.len(),
                "pattern completed"
            );
            if pattern.terrain == TerrainType::Fortification {
                for cell in &pattern.cells {
                    self.closed_fortifications.insert(*cell, id);
                }
            }
            completed.push(id);
        }

        self.completed.extend(completed.iter().copied());
        completed
    }

    /// Put a meeple on the pattern containing `cell`
    pub fn claim(&mut self, cell: FeatureCell, owner: PlayerId) -> Result<PatternId, GameError> {
        let id = *self
            .index
            .get(&cell)
            .ok_or(GameError::InvalidMeeplePosition)?;
        let pattern = self
            .patterns
            .get_mut(&id)
            .ok_or(GameError::InvalidMeeplePosition)?;
        if pattern.is_claimed() {
            return Err(GameError::InvalidMeeplePosition);
        }
        pattern.claims.push(Claim { owner, cell });
        trace!(pattern = %id, owner, "pattern claimed");
        Ok(id)
    }

    /// Stop tracking a pattern, typically after it has been scored
    pub fn remove(&mut self, id: PatternId) -> Option<Pattern> {
        let pattern = self.patterns.remove(&id)?;
        for cell in &pattern.cells {
            self.index.remove(cell);
        }
        Some(pattern)
    }

    /// The field region containing `start`, or `None` if it is not a placed field cell
    pub fn field_region(&self, tiles: &HashMap<GridCoord, Tile>, start: FeatureCell) -> Option<FieldRegion> {
        let tile = tiles.get(&start.coord)?;
        if tile.terrain(start.direction) != TerrainType::Field {
            return None;
        }
        let mut visited = HashSet::new();
        Some(self.flood_field(tiles, start, &mut visited))
    }

    /// Every field region on the grid
    pub fn field_regions(&self, tiles: &HashMap<GridCoord, Tile>) -> Vec<FieldRegion> {
        let mut coords: Vec<&GridCoord> = tiles.keys().collect();
        coords.sort();

        let mut visited = HashSet::new();
        let mut regions = Vec::new();
        for coord in coords {
            let tile = &tiles[coord];
            for direction in GridDirection::ALL {
                let cell = FeatureCell::new(*coord, direction);
                if tile.terrain(direction) == TerrainType::Field && !visited.contains(&cell) {
                    regions.push(self.flood_field(tiles, cell, &mut visited));
                }
            }
        }
        regions
    }

    fn flood_field(
        &self,
        tiles: &HashMap<GridCoord, Tile>,
        start: FeatureCell,
        visited: &mut HashSet<FeatureCell>,
    ) -> FieldRegion {
        let mut region = FieldRegion::default();
        let mut stack = vec![start];

        while let Some(cell) = stack.pop() {
            if !visited.insert(cell) {
                continue;
            }
            let Some(tile) = tiles.get(&cell.coord) else {
                continue;
            };
            region.cells.insert(cell);

            for direction in tile.connected_positions(cell.direction) {
                stack.push(FeatureCell::new(cell.coord, direction));
            }

            if cell.direction.is_edge() {
                let neighbour = cell.coord.step(cell.direction);
                let facing = cell.direction.opposite();
                if tiles
                    .get(&neighbour)
                    .is_some_and(|t| t.terrain(facing) == TerrainType::Field)
                {
                    stack.push(FeatureCell::new(neighbour, facing));
                }
            }

            for &(edge, corner) in cell.direction.corner_crossings() {
                let neighbour = cell.coord.step(edge);
                if tiles
                    .get(&neighbour)
                    .is_some_and(|t| t.terrain(corner) == TerrainType::Field)
                {
                    stack.push(FeatureCell::new(neighbour, corner));
                }
            }

            for &adjacent in cell.direction.adjacent_within_tile() {
                if tile.terrain(adjacent) != TerrainType::Fortification {
                    continue;
                }
                if let Some(id) = self.closed_fortification_at(FeatureCell::new(cell.coord, adjacent)) {
                    region.bordering_fortifications.insert(id);
                }
            }
        }

        let region_tiles: BTreeSet<GridCoord> = region.cells.iter().map(|c| c.coord).collect();
        for coord in region_tiles {
            if let Some(meeple) = tiles.get(&coord).and_then(|t| t.meeple()) {
                let cell = FeatureCell::new(coord, meeple.position);
                if region.cells.contains(&cell) {
                    region.claims.push(Claim {
                        owner: meeple.owner,
                        cell,
                    });
                }
            }
        }

        region
    }

    fn allocate(&mut self, terrain: TerrainType, coord: GridCoord) -> PatternId {
        let id = PatternId(self.next_id);
        self.next_id += 1;
        self.patterns.insert(id, Pattern::new(id, terrain, coord));
        id
    }

    /// Union two patterns, returning the surviving handle
    fn merge(&mut self, a: PatternId, b: PatternId) -> PatternId {
        if a == b {
            return a;
        }
        let size = |id: &PatternId| self.patterns.get(id).map_or(0, |p| p.cells.len());
        let (survivor, absorbed) = if size(&a) >= size(&b) { (a, b) } else { (b, a) };

        let Some(absorbed_pattern) = self.patterns.remove(&absorbed) else {
            return survivor;
        };
        for cell in &absorbed_pattern.cells {
            self.index.insert(*cell, survivor);
        }
        if let Some(pattern) = self.patterns.get_mut(&survivor) {
            trace!(survivor = %survivor, absorbed = %absorbed, "patterns merged");
            pattern.absorb(absorbed_pattern);
        }
        survivor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Rotation, TileKind};

    /// Minimal stand-in for the grid: stores tiles and feeds the tracker
    struct Board {
        tiles: HashMap<GridCoord, Tile>,
        tracker: RegionTracker,
    }

    impl Board {
        fn new() -> Self {
            Self {
                tiles: HashMap::new(),
                tracker: RegionTracker::new(),
            }
        }

        fn put(&mut self, x: i32, y: i32, kind: TileKind, rotation: Rotation) -> Vec<PatternId> {
            let coord = GridCoord::new(x, y);
            let tile = Tile::with_rotation(kind, rotation);
            self.tiles.insert(coord, tile);
            let tiles = &self.tiles;
            self.tracker
                .add_tile(coord, &tile, |c| tiles.contains_key(&c))
        }

        fn at(&self, x: i32, y: i32, direction: GridDirection) -> &Pattern {
            self.tracker
                .pattern_at(FeatureCell::new(GridCoord::new(x, y), direction))
                .unwrap()
        }
    }

    #[test]
    fn test_single_tile_starts_patterns() {
        let mut board = Board::new();
        let completed = board.put(0, 0, TileKind::CastleWallRoad, Rotation::R0);
        assert!(completed.is_empty());
        // One fortification and one path
        assert_eq!(board.tracker.len(), 2);

        let castle = board.at(0, 0, GridDirection::Top);
        assert_eq!(castle.terrain(), TerrainType::Fortification);
        assert_eq!(castle.open_edge_count(), 1);

        let road = board.at(0, 0, GridDirection::Left);
        assert_eq!(road.terrain(), TerrainType::Path);
        assert_eq!(road.open_edge_count(), 2);
    }

    #[test]
    fn test_two_walls_close_a_castle() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::CastleWallRoad, Rotation::R0);
        let completed = board.put(0, -1, TileKind::CastleWall, Rotation::R180);

        assert_eq!(completed.len(), 1);
        let castle = board.tracker.get(completed[0]).unwrap();
        assert_eq!(castle.terrain(), TerrainType::Fortification);
        assert_eq!(castle.tile_count(), 2);
        assert!(castle.is_complete());

        // Reported once
        assert_eq!(board.tracker.drain_completed(), completed);
        assert!(board.tracker.drain_completed().is_empty());
    }

    #[test]
    fn test_bridge_merges_patterns_and_claims() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::Road, Rotation::R0);
        board.put(-1, 0, TileKind::Road, Rotation::R0);
        board.put(1, 0, TileKind::Road, Rotation::R0);
        board.put(-1, -1, TileKind::CastleWall, Rotation::R90);
        board.put(1, -1, TileKind::CastleWall, Rotation::R270);

        let left = FeatureCell::new(GridCoord::new(-1, -1), GridDirection::Right);
        let right = FeatureCell::new(GridCoord::new(1, -1), GridDirection::Left);
        board.tracker.claim(left, 0).unwrap();
        board.tracker.claim(right, 1).unwrap();
        assert_ne!(
            board.tracker.pattern_at(left).unwrap().id(),
            board.tracker.pattern_at(right).unwrap().id()
        );

        let completed = board.put(0, -1, TileKind::CastleTube, Rotation::R0);
        assert_eq!(completed.len(), 1);

        let merged = board.tracker.get(completed[0]).unwrap();
        assert_eq!(merged.tile_count(), 3);
        let mut owners: Vec<_> = merged.claims().iter().map(|c| c.owner).collect();
        owners.sort();
        assert_eq!(owners, vec![0, 1]);
        assert_eq!(board.tracker.pattern_at(left).unwrap().id(), merged.id());
    }

    #[test]
    fn test_claiming_a_claimed_pattern_fails() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::Road, Rotation::R0);
        board.put(1, 0, TileKind::Road, Rotation::R0);
        let cell = FeatureCell::new(GridCoord::new(0, 0), GridDirection::Left);
        let other = FeatureCell::new(GridCoord::new(1, 0), GridDirection::Right);
        board.tracker.claim(cell, 0).unwrap();
        assert_eq!(
            board.tracker.claim(other, 1),
            Err(GameError::InvalidMeeplePosition)
        );
    }

    #[test]
    fn test_road_closed_by_junctions() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::Road, Rotation::R0);
        board.put(-1, 0, TileKind::RoadJunctionLarge, Rotation::R0);
        let completed = board.put(1, 0, TileKind::RoadJunctionSmall, Rotation::R0);

        let road = board.at(0, 0, GridDirection::Center);
        assert!(road.is_complete());
        assert_eq!(road.tile_count(), 3);
        assert!(completed.contains(&road.id()));
    }

    #[test]
    fn test_cloister_completes_when_surrounded() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::Monastery, Rotation::R0);
        let mut last = Vec::new();
        for (x, y) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1)] {
            last = board.put(x, y, TileKind::Monastery, Rotation::R0);
        }
        assert!(!board.at(0, 0, GridDirection::Center).is_complete());
        assert!(last.is_empty());

        let completed = board.put(1, 1, TileKind::Monastery, Rotation::R0);
        let cloister = board.at(0, 0, GridDirection::Center);
        assert!(cloister.is_complete());
        assert_eq!(completed, vec![cloister.id()]);
    }

    #[test]
    fn test_removed_pattern_keeps_fortification_archive() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::CastleWallRoad, Rotation::R0);
        let completed = board.put(0, -1, TileKind::CastleWall, Rotation::R180);
        let removed = board.tracker.remove(completed[0]).unwrap();

        let cell = FeatureCell::new(GridCoord::new(0, 0), GridDirection::Top);
        assert!(board.tracker.pattern_at(cell).is_none());
        assert_eq!(board.tracker.closed_fortification_at(cell), Some(removed.id()));
    }

    #[test]
    fn test_field_regions_split_by_road() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::Road, Rotation::R0);
        board.put(1, 0, TileKind::Road, Rotation::R0);
        let regions = board.tracker.field_regions(&board.tiles);
        // Above and below the road
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.cells.len() == 6));
    }

    #[test]
    fn test_field_borders_closed_castle() {
        let mut board = Board::new();
        board.put(0, 0, TileKind::CastleWallRoad, Rotation::R0);
        board.put(0, -1, TileKind::CastleWall, Rotation::R180);

        let start = FeatureCell::new(GridCoord::new(0, -1), GridDirection::Top);
        let region = board.tracker.field_region(&board.tiles, start).unwrap();
        assert_eq!(region.bordering_fortifications.len(), 1);

        // Field below the road does not touch the castle
        let below = FeatureCell::new(GridCoord::new(0, 0), GridDirection::Bottom);
        let region = board.tracker.field_region(&board.tiles, below).unwrap();
        assert!(region.bordering_fortifications.is_empty());
    }
}
