//! Point values for patterns and fields.
//!
//! Everything here is read-only: scoring functions return `ScoreAward`s
//! describing who earns what, and the game state applies them.
//!
//! Point table:
//! - Completed fortification: 2 per tile, plus 2 per emblem tile
//! - Completed path: 1 per tile
//! - Completed cloister: 9
//! - Incomplete fortification or path at round end: 1 per tile
//! - Incomplete cloister at round end: 1 plus 1 per surrounding tile
//! - Field at round end: 3 per completed fortification it borders

use crate::grid::Grid;
use crate::player::PlayerId;
use crate::region::{Pattern, PatternId};
use crate::terrain::TerrainType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Points per completed fortification bordering a scored field
pub const FIELD_POINTS_PER_FORTIFICATION: u32 = 3;

/// Points for a completed cloister
pub const COMPLETED_CLOISTER_POINTS: u32 = 9;

/// Result of scoring one pattern or field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAward {
    /// Pattern scored, `None` for fields
    pub pattern: Option<PatternId>,
    pub terrain: TerrainType,
    /// Base value before any tie split
    pub points: u32,
    /// Players with the most meeples on the feature
    pub owners: Vec<PlayerId>,
    /// Points each owner receives
    pub payouts: Vec<(PlayerId, u32)>,
    pub complete: bool,
}

/// Players holding the most meeples among `claims`, in id order.
///
/// Empty when nobody has a meeple on the feature.
pub fn majority_owners(claims: impl IntoIterator<Item = PlayerId>) -> Vec<PlayerId> {
    let mut counts: BTreeMap<PlayerId, u32> = BTreeMap::new();
    for owner in claims {
        *counts.entry(owner).or_insert(0) += 1;
    }
    let Some(&max) = counts.values().max() else {
        return Vec::new();
    };
    counts
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(owner, _)| owner)
        .collect()
}

/// Pay `points` to each owner, or split them evenly (rounded down) when `split` is set
pub fn distribute(points: u32, owners: &[PlayerId], split: bool) -> Vec<(PlayerId, u32)> {
    if owners.is_empty() {
        return Vec::new();
    }
    let share = if split {
        points / owners.len() as u32
    } else {
        points
    };
    owners.iter().map(|owner| (*owner, share)).collect()
}

/// Value of a tracked pattern.
///
/// `complete` selects the completed or the round-end table.
pub fn pattern_points(pattern: &Pattern, grid: &Grid, complete: bool) -> u32 {
    let tiles = pattern.tile_count() as u32;
    match pattern.terrain() {
        TerrainType::Fortification if complete => {
            let emblems = pattern
                .tiles()
                .iter()
                .filter(|coord| grid.tile(**coord).is_some_and(|t| t.has_emblem()))
                .count() as u32;
            2 * tiles + 2 * emblems
        }
        TerrainType::Fortification | TerrainType::Path => tiles,
        TerrainType::Cloister if complete => COMPLETED_CLOISTER_POINTS,
        TerrainType::Cloister => {
            let surrounding = pattern
                .anchor()
                .map_or(0, |anchor| grid.neighbors(anchor).len() as u32);
            1 + surrounding
        }
        TerrainType::Field | TerrainType::Other => 0,
    }
}

/// Score a tracked pattern for whoever holds the majority on it
pub fn score_pattern(pattern: &Pattern, grid: &Grid, complete: bool, split: bool) -> ScoreAward {
    let points = pattern_points(pattern, grid, complete);
    let owners = majority_owners(pattern.claims().iter().map(|claim| claim.owner));
    let payouts = distribute(points, &owners, split);
    ScoreAward {
        pattern: Some(pattern.id()),
        terrain: pattern.terrain(),
        points,
        owners,
        payouts,
        complete,
    }
}

/// Score every claimed field region on the grid
pub fn score_fields(grid: &Grid, split: bool) -> Vec<ScoreAward> {
    grid.field_regions()
        .into_iter()
        .filter(|region| !region.claims.is_empty())
        .map(|region| {
            let points = FIELD_POINTS_PER_FORTIFICATION * region.bordering_fortifications.len() as u32;
            let owners = majority_owners(region.claims.iter().map(|claim| claim.owner));
            let payouts = distribute(points, &owners, split);
            ScoreAward {
                pattern: None,
                terrain: TerrainType::Field,
                points,
                owners,
                payouts,
                complete: false,
            }
        })
        .collect()
}
