//! Round configuration.
//!
//! Every session carries its own `GameConfig`; nothing is process-wide. The
//! grid and scoring engine read their switches from the config handed to them.

use crate::game::GameError;
use crate::player::DEFAULT_MEEPLES;
use crate::tile::TileKind;
use serde::{Deserialize, Serialize};

/// Largest supported number of players in one round
pub const MAX_PLAYERS: usize = 6;

/// Settings for a round.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of grid columns, centred on the foundation tile
    pub grid_width: u32,
    /// Number of grid rows, centred on the foundation tile
    pub grid_height: u32,
    /// Allow placements that leave a free spot no tile could ever fill
    pub allow_enclaves: bool,
    /// Divide points evenly between tied owners instead of paying each in full
    pub split_pattern_score: bool,
    /// Score farmers on fields when the round ends
    pub score_fields: bool,
    /// Size of each player's meeple supply
    pub meeples_per_player: u32,
    /// Tile placed at the origin when the round starts
    pub foundation: TileKind,
    /// Throw away drawn tiles that fit nowhere on the grid
    pub discard_unplaceable: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 145,
            grid_height: 145,
            allow_enclaves: true,
            split_pattern_score: false,
            score_fields: true,
            meeples_per_player: DEFAULT_MEEPLES,
            foundation: TileKind::CastleWallRoad,
            discard_unplaceable: true,
        }
    }
}

impl GameConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grid dimensions.
    #[must_use]
    pub fn with_grid_size(mut self, width: u32, height: u32) -> Self {
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    /// Allow or forbid enclaves.
    #[must_use]
    pub fn with_enclaves(mut self, allow: bool) -> Self {
        self.allow_enclaves = allow;
        self
    }

    /// Enable or disable splitting of tied scores.
    #[must_use]
    pub fn with_split_score(mut self, split: bool) -> Self {
        self.split_pattern_score = split;
        self
    }

    /// Enable or disable field scoring at round end.
    #[must_use]
    pub fn with_field_scoring(mut self, enabled: bool) -> Self {
        self.score_fields = enabled;
        self
    }

    /// Set the meeple supply size.
    #[must_use]
    pub fn with_meeples(mut self, meeples: u32) -> Self {
        self.meeples_per_player = meeples;
        self
    }

    /// Set the foundation tile.
    #[must_use]
    pub fn with_foundation(mut self, foundation: TileKind) -> Self {
        self.foundation = foundation;
        self
    }

    /// Keep or discard drawn tiles that cannot be placed.
    #[must_use]
    pub fn with_discard_unplaceable(mut self, discard: bool) -> Self {
        self.discard_unplaceable = discard;
        self
    }

    /// Check the configuration can start a round
    pub fn validate(&self) -> Result<(), GameError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(GameError::InvalidConfig(
                "grid dimensions must be positive".into(),
            ));
        }
        if self.grid_width > i32::MAX as u32 || self.grid_height > i32::MAX as u32 {
            return Err(GameError::InvalidConfig("grid dimensions too large".into()));
        }
        Ok(())
    }
}
