//! Player state and meeple supply.
//!
//! This module contains:
//! - Player struct with score and meeple supply
//! - The default supply size

use crate::game::GameError;
use serde::{Deserialize, Serialize};

/// Player identifier (turn order index, starting at 0)
pub type PlayerId = u8;

/// Meeples each player starts a round with
pub const DEFAULT_MEEPLES: u32 = 7;

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player ID, equal to the turn order position
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Meeples still in the supply
    pub meeples_remaining: u32,
    /// Size of the supply at round start
    pub meeple_pool: u32,
    /// Points scored this round
    pub score: u32,
}

impl Player {
    /// Create a new player with a full supply
    pub fn new(id: PlayerId, name: String, meeples: u32) -> Self {
        Self {
            id,
            name,
            meeples_remaining: meeples,
            meeple_pool: meeples,
            score: 0,
        }
    }

    /// Whether at least one meeple is left in the supply
    pub fn has_free_meeples(&self) -> bool {
        self.meeples_remaining > 0
    }

    /// Meeples currently standing on the grid
    pub fn meeples_on_grid(&self) -> u32 {
        self.meeple_pool - self.meeples_remaining
    }

    /// Take one meeple from the supply
    pub fn take_meeple(&mut self) -> Result<(), GameError> {
        if self.meeples_remaining == 0 {
            return Err(GameError::ResourceExhausted);
        }
        self.meeples_remaining -= 1;
        Ok(())
    }

    /// Put meeples back into the supply
    pub fn return_meeples(&mut self, count: u32) {
        self.meeples_remaining = (self.meeples_remaining + count).min(self.meeple_pool);
    }

    /// Add points to the score, returning the new total
    pub fn add_points(&mut self, points: u32) -> u32 {
        self.score += points;
        self.score
    }
}
