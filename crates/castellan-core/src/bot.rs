//! AI bot players for Castellan.
//!
//! This module provides two difficulty levels:
//! - Easy: Random legal moves
//! - Medium: Greedy placement that closes its own patterns, and selective meeples
//!
//! Bots only look at the public queries of `GameState`.

use crate::actions::GameAction;
use crate::coord::{GridCoord, GridDirection};
use crate::game::{GamePhase, GameState};
use crate::grid::Grid;
use crate::player::PlayerId;
use crate::region::FeatureCell;
use crate::scoring::{majority_owners, pattern_points};
use crate::terrain::TerrainType;
use crate::tile::{Rotation, Tile};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
}

/// A bot player that can decide on actions
#[derive(Debug)]
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action, or `None` when it is not this bot's turn
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        if game.active_player() != Some(self.player_id) {
            return None;
        }

        match game.phase() {
            GamePhase::Placing => {
                let placements = game.valid_placements();
                if placements.is_empty() {
                    return Some(GameAction::Skip);
                }
                let (coord, rotation) = match self.difficulty {
                    BotDifficulty::Easy => *placements.choose(&mut self.rng)?,
                    BotDifficulty::Medium => self.choose_placement(game, &placements)?,
                };
                Some(GameAction::PlaceTile { coord, rotation })
            }
            GamePhase::Manning { coord } => {
                let positions = game.valid_meeple_positions();
                let direction = match self.difficulty {
                    BotDifficulty::Easy => self.choose_easy_meeple(&positions),
                    BotDifficulty::Medium => self.choose_meeple(game, *coord, &positions),
                };
                Some(direction.map_or(GameAction::Skip, |direction| GameAction::PlaceMeeple { direction }))
            }
            GamePhase::Idle | GamePhase::GameOver => None,
        }
    }

    /// Easy: a meeple on a random feature half of the time
    fn choose_easy_meeple(&mut self, positions: &[GridDirection]) -> Option<GridDirection> {
        if self.rng.gen_bool(0.5) {
            positions.choose(&mut self.rng).copied()
        } else {
            None
        }
    }

    /// Medium: try every placement on a copy of the grid and keep the best
    fn choose_placement(&mut self, game: &GameState, placements: &[(GridCoord, Rotation)]) -> Option<(GridCoord, Rotation)> {
        let grid = game.grid()?;
        let kind = game.current_tile()?.kind();

        let scored: Vec<((GridCoord, Rotation), i32)> = placements
            .iter()
            .map(|&(coord, rotation)| {
                let value = self.score_placement(grid, coord, Tile::with_rotation(kind, rotation));
                ((coord, rotation), value)
            })
            .collect();

        let best = scored.iter().map(|(_, value)| *value).max()?;
        let candidates: Vec<(GridCoord, Rotation)> = scored
            .into_iter()
            .filter(|(_, value)| *value == best)
            .map(|(placement, _)| placement)
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    /// Value of a placement: own completions count double, opponents' count against
    fn score_placement(&self, grid: &Grid, coord: GridCoord, tile: Tile) -> i32 {
        let mut trial = grid.clone();
        if !matches!(trial.place(coord, tile), Ok(true)) {
            return i32::MIN;
        }

        let mut value = trial.direct_neighbors(coord).len() as i32;
        for id in trial.drain_completed() {
            let Some(pattern) = trial.regions().get(id) else {
                continue;
            };
            let points = pattern_points(pattern, &trial, true) as i32;
            let owners = majority_owners(pattern.claims().iter().map(|c| c.owner));
            if owners.contains(&self.player_id) {
                value += 2 * points;
            } else if owners.is_empty() {
                // Still claimable with the meeple this turn
                value += points;
            } else {
                value -= points;
            }
        }
        // Keep a claim possible on the new tile
        if !trial.meeple_spots(coord).is_empty() {
            value += 1;
        }
        value
    }

    /// Medium: claim completed patterns first, then cloisters, castles and roads.
    /// Fields and the last meeple are kept back.
    fn choose_meeple(&mut self, game: &GameState, coord: GridCoord, positions: &[GridDirection]) -> Option<GridDirection> {
        let grid = game.grid()?;
        let tile = grid.tile(coord)?;
        let supply = game
            .get_player(self.player_id)
            .map_or(0, |p| p.meeples_remaining);

        let mut ranked: Vec<(i32, GridDirection)> = positions
            .iter()
            .filter_map(|&direction| {
                let terrain = tile.terrain(direction);
                let pattern = grid.regions().pattern_at(FeatureCell::new(coord, direction));
                if pattern.is_some_and(|p| p.is_complete()) {
                    return Some((100, direction));
                }
                if supply <= 1 {
                    return None;
                }
                let size = pattern.map_or(0, |p| p.tile_count() as i32);
                match terrain {
                    TerrainType::Cloister => Some((30 + grid.neighbors(coord).len() as i32, direction)),
                    TerrainType::Fortification => Some((20 + 2 * size, direction)),
                    TerrainType::Path => Some((10 + size, direction)),
                    TerrainType::Field | TerrainType::Other => None,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.first().map(|(_, direction)| *direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::stack::TileStack;
    use crate::tile::TileKind;

    fn game_with(kinds: Vec<TileKind>) -> GameState {
        let mut game = GameState::new(GameConfig::new().with_grid_size(9, 9)).unwrap();
        game.new_round(vec!["Bot".into(), "Human".into()], TileStack::from_kinds(kinds))
            .unwrap();
        game
    }

    #[test]
    fn test_bot_creation() {
        let bot = Bot::new(0, BotDifficulty::Easy);
        assert_eq!(bot.player_id, 0);
        assert_eq!(bot.difficulty, BotDifficulty::Easy);
    }

    #[test]
    fn test_bot_waits_for_its_turn() {
        let game = game_with(vec![TileKind::Road]);
        let mut bot = Bot::with_seed(1, BotDifficulty::Easy, 1);
        assert_eq!(bot.choose_action(&game), None);
    }

    #[test]
    fn test_easy_bot_places_legally() {
        let mut game = game_with(vec![TileKind::Road, TileKind::RoadCurve]);
        let mut bot = Bot::with_seed(0, BotDifficulty::Easy, 7);
        let action = bot.choose_action(&game).unwrap();
        assert!(matches!(action, GameAction::PlaceTile { .. }));
        assert!(game.apply(action).is_ok());
    }

    #[test]
    fn test_medium_bot_closes_castle_and_claims_it() {
        let mut game = game_with(vec![TileKind::CastleWall, TileKind::Road]);
        let mut bot = Bot::with_seed(0, BotDifficulty::Medium, 3);

        let action = bot.choose_action(&game).unwrap();
        assert_eq!(
            action,
            GameAction::PlaceTile {
                coord: GridCoord::new(0, -1),
                rotation: Rotation::R180
            }
        );
        game.apply(action).unwrap();

        let action = bot.choose_action(&game).unwrap();
        assert_eq!(
            action,
            GameAction::PlaceMeeple {
                direction: GridDirection::Bottom
            }
        );
        game.apply(action).unwrap();
        assert_eq!(game.get_player(0).unwrap().score, 4);
    }

    #[test]
    fn test_bots_finish_a_round() {
        let mut game = GameState::new(GameConfig::new().with_grid_size(21, 21)).unwrap();
        game.new_round(
            vec!["A".into(), "B".into()],
            TileStack::shuffled(TileKind::CastleWallRoad, 11),
        )
        .unwrap();
        let mut bots = [
            Bot::with_seed(0, BotDifficulty::Easy, 1),
            Bot::with_seed(1, BotDifficulty::Medium, 2),
        ];

        let mut steps = 0;
        while !game.is_over() {
            let player = game.active_player().unwrap();
            let action = bots[player as usize].choose_action(&game).unwrap();
            game.apply(action).unwrap();
            steps += 1;
            assert!(steps < 1000, "round did not finish");
        }

        for player in game.players() {
            assert_eq!(player.meeples_remaining, player.meeple_pool);
        }
    }
}
