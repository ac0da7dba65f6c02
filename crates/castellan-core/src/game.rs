//! Core game state machine.
//!
//! This module contains the main `GameState` struct, its phases, and the
//! table that decides which operation is legal in which phase.
//!
//! ```text
//! Idle --new round--> Placing --place tile--> Manning --meeple/skip--> Placing
//!                        |  ^                    |
//!                        |  +------skip----------+ (no tiles left) --> GameOver
//!                        +---abort / supply empty--------------------> GameOver --skip--> Idle
//! ```

use crate::actions::{GameAction, GameEvent, Standing};
use crate::config::GameConfig;
use crate::coord::{GridCoord, GridDirection};
use crate::grid::Grid;
use crate::player::{Player, PlayerId};
use crate::region::PatternId;
use crate::round::Round;
use crate::scoring::{score_fields, score_pattern, ScoreAward};
use crate::stack::TileSupply;
use crate::terrain::TerrainType;
use crate::tile::{Rotation, RotationDirection, Tile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No round running
    Idle,
    /// Active player holds a tile and must place it
    Placing,
    /// Active player may put a meeple on the tile just placed
    Manning {
        /// Where the tile went
        coord: GridCoord,
    },
    /// Round finished and final scores applied
    GameOver,
}

impl GamePhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            GamePhase::Idle => PhaseKind::Idle,
            GamePhase::Placing => PhaseKind::Placing,
            GamePhase::Manning { .. } => PhaseKind::Manning,
            GamePhase::GameOver => PhaseKind::GameOver,
        }
    }
}

/// Phase without its payload, used for the transition table and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseKind {
    Idle,
    Placing,
    Manning,
    GameOver,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Idle => "idle",
            PhaseKind::Placing => "placing a tile",
            PhaseKind::Manning => "placing a meeple",
            PhaseKind::GameOver => "the round is over",
        };
        f.write_str(name)
    }
}

/// Requests the state machine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    NewRound,
    RotateTile,
    PlaceTile,
    PlaceMeeple,
    Skip,
    Abort,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::NewRound => "start a new round",
            Operation::RotateTile => "rotate a tile",
            Operation::PlaceTile => "place a tile",
            Operation::PlaceMeeple => "place a meeple",
            Operation::Skip => "skip",
            Operation::Abort => "abort",
        };
        f.write_str(name)
    }
}

impl From<&GameAction> for Operation {
    fn from(action: &GameAction) -> Self {
        match action {
            GameAction::RotateTile(_) => Operation::RotateTile,
            GameAction::PlaceTile { .. } => Operation::PlaceTile,
            GameAction::PlaceMeeple { .. } => Operation::PlaceMeeple,
            GameAction::Skip => Operation::Skip,
            GameAction::Abort => Operation::Abort,
        }
    }
}

/// How an operation is treated in a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Carry the operation out
    Apply,
    /// Accept and do nothing
    Ignore,
}

/// Legal (phase, operation) pairs. Anything missing is an illegal transition.
const TRANSITIONS: &[(PhaseKind, Operation, Rule)] = &[
    (PhaseKind::Idle, Operation::NewRound, Rule::Apply),
    (PhaseKind::Idle, Operation::RotateTile, Rule::Ignore),
    (PhaseKind::Idle, Operation::Skip, Rule::Ignore),
    (PhaseKind::Idle, Operation::Abort, Rule::Ignore),
    (PhaseKind::Placing, Operation::NewRound, Rule::Ignore),
    (PhaseKind::Placing, Operation::RotateTile, Rule::Apply),
    (PhaseKind::Placing, Operation::PlaceTile, Rule::Apply),
    (PhaseKind::Placing, Operation::Skip, Rule::Apply),
    (PhaseKind::Placing, Operation::Abort, Rule::Apply),
    (PhaseKind::Manning, Operation::NewRound, Rule::Ignore),
    (PhaseKind::Manning, Operation::RotateTile, Rule::Ignore),
    (PhaseKind::Manning, Operation::PlaceMeeple, Rule::Apply),
    (PhaseKind::Manning, Operation::Skip, Rule::Apply),
    (PhaseKind::Manning, Operation::Abort, Rule::Apply),
    (PhaseKind::GameOver, Operation::NewRound, Rule::Ignore),
    (PhaseKind::GameOver, Operation::RotateTile, Rule::Ignore),
    (PhaseKind::GameOver, Operation::Skip, Rule::Apply),
    (PhaseKind::GameOver, Operation::Abort, Rule::Ignore),
];

/// Look up how `operation` is treated in `phase`
pub fn transition_rule(phase: PhaseKind, operation: Operation) -> Option<Rule> {
    TRANSITIONS
        .iter()
        .find(|(p, o, _)| *p == phase && *o == operation)
        .map(|(_, _, rule)| *rule)
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Coordinate ({x}, {y}) is outside the grid")]
    InvalidCoordinate { x: i32, y: i32 },

    #[error("Tile does not fit there")]
    IllegalPlacement,

    #[error("Cannot {operation} while {state}")]
    IllegalStateTransition { state: PhaseKind, operation: Operation },

    #[error("No meeples left in supply")]
    ResourceExhausted,

    #[error("No free feature at that position")]
    InvalidMeeplePosition,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The complete game state for one session
#[derive(Debug)]
pub struct GameState {
    config: GameConfig,
    phase: GamePhase,
    round: Option<Round>,
    /// Patterns completed this turn, scored when the turn ends
    pending: Vec<PatternId>,
    /// Standings of the last finished round, kept after returning to Idle
    last_standings: Vec<Standing>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            config: GameConfig::default(),
            phase: GamePhase::Idle,
            round: None,
            pending: Vec::new(),
            last_standings: Vec::new(),
        }
    }
}

impl GameState {
    /// Create an idle session with the given configuration
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.round.as_ref().map(|r| r.grid())
    }

    /// Players of the running round (empty while Idle)
    pub fn players(&self) -> &[Player] {
        self.round.as_ref().map(|r| r.players()).unwrap_or(&[])
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.round.as_ref().and_then(|r| r.player(id))
    }

    /// Whose turn it is, if a round is running
    pub fn active_player(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::Placing | GamePhase::Manning { .. } => {
                self.round.as_ref().map(|r| r.active_player())
            }
            _ => None,
        }
    }

    /// The tile waiting to be placed
    pub fn current_tile(&self) -> Option<&Tile> {
        self.round.as_ref().and_then(|r| r.current_tile())
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Scores ordered best first; after the round is left, the last result
    pub fn standings(&self) -> Vec<Standing> {
        match &self.round {
            Some(round) => round.standings(),
            None => self.last_standings.clone(),
        }
    }

    /// Whether the tile in hand could go to `coord` turned to `rotation`
    pub fn is_placeable(&self, coord: GridCoord, rotation: Rotation) -> Result<bool, GameError> {
        let (Some(round), Some(tile)) = (&self.round, self.current_tile()) else {
            return Ok(false);
        };
        let grid = round.grid();
        grid.is_placeable(
            coord,
            &Tile::with_rotation(tile.kind(), rotation),
            grid.allows_enclaves(),
        )
    }

    /// Every legal (coord, rotation) for the tile in hand
    pub fn valid_placements(&self) -> Vec<(GridCoord, Rotation)> {
        match (&self.phase, &self.round) {
            (GamePhase::Placing, Some(round)) => round
                .current_tile()
                .map(|tile| round.grid().valid_placements(tile.kind()))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Positions on the tile just placed where the active player may put a meeple
    pub fn valid_meeple_positions(&self) -> Vec<GridDirection> {
        let (GamePhase::Manning { coord }, Some(round)) = (&self.phase, &self.round) else {
            return Vec::new();
        };
        let has_meeple = round
            .player(round.active_player())
            .is_some_and(|p| p.has_free_meeples());
        if !has_meeple {
            return Vec::new();
        }
        round.grid().meeple_spots(*coord)
    }

    // ==================== Operations ====================

    /// Start a round with the named players, drawing tiles from `supply`.
    ///
    /// Ignored while a round is running.
    pub fn new_round(
        &mut self,
        names: Vec<String>,
        supply: impl TileSupply + 'static,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.check(Operation::NewRound)? == Rule::Ignore {
            debug!(phase = %self.phase_kind(), "new round ignored");
            return Ok(Vec::new());
        }

        let mut round = Round::new(names, &self.config, Box::new(supply))?;
        let mut events = vec![GameEvent::RoundStarted {
            players: round.players().iter().map(|p| p.id).collect(),
            foundation: self.config.foundation,
            tiles_in_supply: round.tiles_remaining(),
        }];
        info!(
            players = round.players().len(),
            tiles = round.tiles_remaining(),
            "round started"
        );

        let drew = round.draw(self.config.discard_unplaceable, &mut events);
        self.round = Some(round);
        self.pending.clear();
        self.set_phase(GamePhase::Placing, &mut events);
        if !drew {
            self.enter_game_over(false, &mut events);
        }
        Ok(events)
    }

    /// Apply an action for the active player
    pub fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        let operation = Operation::from(&action);
        if self.check(operation)? == Rule::Ignore {
            debug!(phase = %self.phase_kind(), %operation, "operation ignored");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();

        match action {
            // ==================== Placing ====================
            GameAction::RotateTile(direction) => {
                self.rotate_tile(direction, &mut events)?;
            }

            GameAction::PlaceTile { coord, rotation } => {
                self.place_tile(coord, rotation, &mut events)?;
            }

            // ==================== Manning ====================
            GameAction::PlaceMeeple { direction } => {
                self.place_meeple(direction, &mut events)?;
            }

            // ==================== Any Phase ====================
            GameAction::Skip => match self.phase {
                GamePhase::Placing => self.discard_tile(&mut events)?,
                GamePhase::Manning { .. } => self.finish_turn(&mut events)?,
                GamePhase::GameOver => {
                    if let Some(round) = self.round.take() {
                        self.last_standings = round.standings();
                    }
                    self.set_phase(GamePhase::Idle, &mut events);
                }
                GamePhase::Idle => {}
            },

            GameAction::Abort => {
                info!(phase = %self.phase_kind(), "round aborted");
                self.enter_game_over(true, &mut events);
            }
        }

        Ok(events)
    }

    fn check(&self, operation: Operation) -> Result<Rule, GameError> {
        let state = self.phase_kind();
        transition_rule(state, operation)
            .ok_or(GameError::IllegalStateTransition { state, operation })
    }

    fn round_mut(&mut self, operation: Operation) -> Result<&mut Round, GameError> {
        let state = self.phase.kind();
        self.round
            .as_mut()
            .ok_or(GameError::IllegalStateTransition { state, operation })
    }

    fn set_phase(&mut self, phase: GamePhase, events: &mut Vec<GameEvent>) {
        let from = self.phase.kind();
        let to = phase.kind();
        self.phase = phase;
        if from != to {
            debug!(%from, %to, "phase changed");
            events.push(GameEvent::StateChanged { from, to });
        }
    }

    fn rotate_tile(&mut self, direction: RotationDirection, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let round = self.round_mut(Operation::RotateTile)?;
        let player = round.active_player();
        if let Some(tile) = round.current_tile_mut() {
            tile.rotate(direction);
            debug!(player, degrees = tile.rotation().degrees(), "tile rotated");
            events.push(GameEvent::TileRotated {
                player,
                rotation: tile.rotation(),
            });
        }
        Ok(())
    }

    fn place_tile(&mut self, coord: GridCoord, rotation: Rotation, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let round = self.round_mut(Operation::PlaceTile)?;
        let player = round.active_player();
        let mut tile = *round.current_tile().ok_or(GameError::IllegalPlacement)?;
        tile.set_rotation(rotation);

        if !round.grid_mut().place(coord, tile)? {
            return Err(GameError::IllegalPlacement);
        }
        round.take_current_tile();
        events.push(GameEvent::TilePlaced {
            player,
            kind: tile.kind(),
            coord,
            rotation,
        });

        let completed = round.grid_mut().drain_completed();
        for id in &completed {
            if let Some(pattern) = round.grid().regions().get(*id) {
                events.push(GameEvent::PatternCompleted {
                    pattern: *id,
                    terrain: pattern.terrain(),
                    tiles: pattern.tile_count(),
                });
            }
        }
        let has_spot = round.player(player).is_some_and(|p| p.has_free_meeples())
            && !round.grid().meeple_spots(coord).is_empty();
        self.pending.extend(completed);

        if has_spot {
            self.set_phase(GamePhase::Manning { coord }, events);
            Ok(())
        } else {
            debug!(%coord, "no free feature on placed tile, skipping meeple");
            self.finish_turn(events)
        }
    }

    fn place_meeple(&mut self, direction: GridDirection, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let GamePhase::Manning { coord } = self.phase else {
            return Err(GameError::IllegalStateTransition {
                state: self.phase_kind(),
                operation: Operation::PlaceMeeple,
            });
        };
        let round = self.round_mut(Operation::PlaceMeeple)?;
        let player = round.active_player();

        round.grid_mut().place_meeple(coord, direction, player)?;
        if let Some(p) = round.player_mut(player) {
            p.take_meeple()?;
        }

        let terrain = round
            .grid()
            .tile(coord)
            .map(|t| t.terrain(direction))
            .unwrap_or(TerrainType::Other);
        events.push(GameEvent::MeeplePlaced {
            player,
            coord,
            direction,
            terrain,
        });

        self.finish_turn(events)
    }

    /// Throw away the tile in hand and draw another for the same player
    fn discard_tile(&mut self, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let discard_unplaceable = self.config.discard_unplaceable;
        let round = self.round_mut(Operation::Skip)?;
        let player = round.active_player();
        if let Some(tile) = round.take_current_tile() {
            debug!(player, kind = ?tile.kind(), "tile skipped");
            events.push(GameEvent::TileDiscarded {
                player,
                kind: tile.kind(),
            });
        }
        if !round.draw(discard_unplaceable, events) {
            self.enter_game_over(false, events);
        }
        Ok(())
    }

    /// Score what the turn completed, pass to the next player and draw
    fn finish_turn(&mut self, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let split = self.config.split_pattern_score;
        let discard_unplaceable = self.config.discard_unplaceable;
        let pending = std::mem::take(&mut self.pending);

        let round = self.round_mut(Operation::Skip)?;
        score_patterns(round, pending, split, events);

        let player = round.active_player();
        let next_player = round.advance();
        debug!(player, next_player, turn = round.turn(), "turn ended");
        events.push(GameEvent::TurnEnded {
            player,
            next_player,
        });

        if round.draw(discard_unplaceable, events) {
            self.set_phase(GamePhase::Placing, events);
        } else {
            self.enter_game_over(false, events);
        }
        Ok(())
    }

    /// Apply final scoring and move to GameOver
    fn enter_game_over(&mut self, aborted: bool, events: &mut Vec<GameEvent>) {
        let split = self.config.split_pattern_score;
        let with_fields = self.config.score_fields;
        let pending = std::mem::take(&mut self.pending);

        if let Some(round) = self.round.as_mut() {
            let player = round.active_player();
            if let Some(tile) = round.take_current_tile() {
                events.push(GameEvent::TileDiscarded {
                    player,
                    kind: tile.kind(),
                });
            }

            score_patterns(round, pending, split, events);

            let claimed: Vec<PatternId> = round
                .grid()
                .regions()
                .patterns()
                .filter(|p| p.is_claimed())
                .map(|p| p.id())
                .collect();
            score_patterns(round, claimed, split, events);

            if with_fields {
                for award in score_fields(round.grid(), split) {
                    apply_award(round, &award, events);
                }
            }
            return_all_meeples(round, events);
        }

        self.set_phase(GamePhase::GameOver, events);
        let standings = self.standings();
        info!(
            aborted,
            winner = standings.first().map(|s| s.name.as_str()).unwrap_or(""),
            "round over"
        );
        events.push(GameEvent::RoundOver { standings, aborted });
    }
}

/// Score and retire tracked patterns, returning their meeples
fn score_patterns(round: &mut Round, ids: Vec<PatternId>, split: bool, events: &mut Vec<GameEvent>) {
    for id in ids {
        let Some(pattern) = round.grid_mut().regions_mut().remove(id) else {
            continue;
        };
        let award = score_pattern(&pattern, round.grid(), pattern.is_complete(), split);
        apply_award(round, &award, events);

        let mut returned: BTreeMap<PlayerId, u32> = BTreeMap::new();
        for claim in pattern.claims() {
            if round.grid_mut().remove_meeple(claim.cell.coord).is_some() {
                *returned.entry(claim.owner).or_insert(0) += 1;
            }
        }
        for (player, count) in returned {
            if let Some(p) = round.player_mut(player) {
                p.return_meeples(count);
            }
            events.push(GameEvent::MeeplesReturned { player, count });
        }
    }
}

/// Credit an award's payouts
fn apply_award(round: &mut Round, award: &ScoreAward, events: &mut Vec<GameEvent>) {
    debug!(
        terrain = %award.terrain,
        points = award.points,
        owners = ?award.owners,
        complete = award.complete,
        "scored"
    );
    events.push(GameEvent::PatternScored {
        pattern: award.pattern,
        terrain: award.terrain,
        points: award.points,
        owners: award.owners.clone(),
        complete: award.complete,
    });
    for &(player, points) in &award.payouts {
        if points == 0 {
            continue;
        }
        if let Some(p) = round.player_mut(player) {
            let total = p.add_points(points);
            events.push(GameEvent::ScoreUpdated {
                player,
                points,
                total,
            });
        }
    }
}

/// Lift every remaining meeple off the grid at round end
fn return_all_meeples(round: &mut Round, events: &mut Vec<GameEvent>) {
    let mut coords: Vec<GridCoord> = round
        .grid()
        .tiles()
        .iter()
        .filter(|(_, tile)| tile.meeple().is_some())
        .map(|(coord, _)| *coord)
        .collect();
    coords.sort();

    let mut returned: BTreeMap<PlayerId, u32> = BTreeMap::new();
    for coord in coords {
        if let Some(meeple) = round.grid_mut().remove_meeple(coord) {
            *returned.entry(meeple.owner).or_insert(0) += 1;
        }
    }
    for (player, count) in returned {
        if let Some(p) = round.player_mut(player) {
            p.return_meeples(count);
        }
        events.push(GameEvent::MeeplesReturned { player, count });
    }
}
