//! Game actions that players can take.
//!
//! This module defines all possible actions in a round and the events
//! that result from those actions.

use crate::coord::{GridCoord, GridDirection};
use crate::game::PhaseKind;
use crate::player::PlayerId;
use crate::region::PatternId;
use crate::terrain::TerrainType;
use crate::tile::{Rotation, RotationDirection, TileKind};
use serde::{Deserialize, Serialize};

/// All possible actions the active player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Placing ====================
    /// Turn the tile in hand one quarter
    RotateTile(RotationDirection),
    /// Place the tile in hand at `coord`, turned to `rotation`
    PlaceTile {
        coord: GridCoord,
        rotation: Rotation,
    },

    // ==================== Manning ====================
    /// Put a meeple on a feature of the tile just placed
    PlaceMeeple { direction: GridDirection },

    // ==================== Any Phase ====================
    /// Discard the tile in hand, decline to place a meeple, or leave the
    /// finished round, depending on the phase
    Skip,
    /// End the round early
    Abort,
}

/// Final result for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub name: String,
    pub score: u32,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The state machine moved between phases
    StateChanged { from: PhaseKind, to: PhaseKind },

    /// A new round started
    RoundStarted {
        players: Vec<PlayerId>,
        foundation: TileKind,
        tiles_in_supply: usize,
    },

    /// The active player drew a tile
    TileDrawn { player: PlayerId, kind: TileKind },

    /// A tile was thrown away without being placed
    TileDiscarded { player: PlayerId, kind: TileKind },

    /// The tile in hand was rotated
    TileRotated { player: PlayerId, rotation: Rotation },

    /// A tile was placed on the grid
    TilePlaced {
        player: PlayerId,
        kind: TileKind,
        coord: GridCoord,
        rotation: Rotation,
    },

    /// A meeple was put on a feature
    MeeplePlaced {
        player: PlayerId,
        coord: GridCoord,
        direction: GridDirection,
        terrain: TerrainType,
    },

    /// A placement completed a pattern
    PatternCompleted {
        pattern: PatternId,
        terrain: TerrainType,
        tiles: usize,
    },

    /// A pattern or field was scored
    PatternScored {
        /// `None` for fields
        pattern: Option<PatternId>,
        terrain: TerrainType,
        points: u32,
        owners: Vec<PlayerId>,
        complete: bool,
    },

    /// A player's score changed
    ScoreUpdated {
        player: PlayerId,
        points: u32,
        total: u32,
    },

    /// Meeples went back to a player's supply
    MeeplesReturned { player: PlayerId, count: u32 },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// The round finished, with final standings best first
    RoundOver {
        standings: Vec<Standing>,
        aborted: bool,
    },
}
