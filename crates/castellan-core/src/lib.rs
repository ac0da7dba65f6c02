//! Castellan - a tile-laying castle building game engine
//!
//! This crate provides the core game logic for Castellan, including:
//! - Square grid coordinates and the nine feature positions of a tile
//! - The base game tile set with rotation
//! - Placement validation on a bounded grid, with an optional enclave rule
//! - Incremental tracking of fortifications, paths and cloisters
//! - Scoring of completed patterns, and of unfinished ones and fields at round end
//! - Game state machine driven by a transition table
//!
//! # Architecture
//!
//! The engine is synchronous and owns no I/O. Hosts drive one `GameState` per
//! session and serialize access to it themselves.
//!
//! # Modules
//!
//! - [`coord`]: Grid coordinates and tile positions
//! - [`tile`]: Tile kinds, layouts and rotation
//! - [`grid`]: The placement grid
//! - [`region`]: Pattern tracking and field regions
//! - [`scoring`]: Point values and owner resolution
//! - [`game`]: Game state machine

pub mod actions;
pub mod bot;
pub mod config;
pub mod coord;
pub mod game;
pub mod grid;
pub mod player;
pub mod region;
pub mod round;
pub mod scoring;
pub mod stack;
pub mod terrain;
pub mod tile;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, Standing};
pub use bot::{Bot, BotDifficulty};
pub use config::{GameConfig, MAX_PLAYERS};
pub use coord::{GridCoord, GridDirection};
pub use game::{GameError, GamePhase, GameState, Operation, PhaseKind};
pub use grid::{Grid, GridSpot, MeepleTarget};
pub use player::{Player, PlayerId, DEFAULT_MEEPLES};
pub use region::{FeatureCell, Pattern, PatternId, RegionTracker};
pub use round::Round;
pub use scoring::ScoreAward;
pub use stack::{TileStack, TileSupply};
pub use terrain::TerrainType;
pub use tile::{Meeple, Rotation, RotationDirection, Tile, TileKind};
