//! One round of play: the players, the grid and the tile supply.
//!
//! A `Round` exists from "new round" until the state machine returns to Idle.
//! It owns everything that is thrown away afterwards; the state machine in
//! `game` decides when its methods are called.

use crate::actions::{GameEvent, Standing};
use crate::config::{GameConfig, MAX_PLAYERS};
use crate::game::GameError;
use crate::grid::Grid;
use crate::player::{Player, PlayerId};
use crate::stack::TileSupply;
use crate::tile::Tile;
use tracing::debug;

/// State of a running round
#[derive(Debug)]
pub struct Round {
    players: Vec<Player>,
    active: usize,
    grid: Grid,
    supply: Box<dyn TileSupply>,
    current_tile: Option<Tile>,
    turn: u32,
}

impl Round {
    /// Set up players and grid. Nothing is drawn yet.
    pub fn new(names: Vec<String>, config: &GameConfig, supply: Box<dyn TileSupply>) -> Result<Self, GameError> {
        if names.is_empty() || names.len() > MAX_PLAYERS {
            return Err(GameError::InvalidConfig(format!(
                "a round needs 1 to {MAX_PLAYERS} players, got {}",
                names.len()
            )));
        }
        config.validate()?;

        let players = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name, config.meeples_per_player))
            .collect();

        Ok(Self {
            players,
            active: 0,
            grid: Grid::from_config(config)?,
            supply,
            current_tile: None,
            turn: 1,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    /// Whose turn it is
    pub fn active_player(&self) -> PlayerId {
        self.active as PlayerId
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// The drawn tile waiting to be placed
    pub fn current_tile(&self) -> Option<&Tile> {
        self.current_tile.as_ref()
    }

    pub(crate) fn current_tile_mut(&mut self) -> Option<&mut Tile> {
        self.current_tile.as_mut()
    }

    pub(crate) fn take_current_tile(&mut self) -> Option<Tile> {
        self.current_tile.take()
    }

    /// Tiles left in the supply, not counting the one in hand
    pub fn tiles_remaining(&self) -> usize {
        self.supply.remaining()
    }

    /// Turn number, starting at 1
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Pass the turn to the next player in order
    pub(crate) fn advance(&mut self) -> PlayerId {
        self.active = (self.active + 1) % self.players.len();
        self.turn += 1;
        self.active_player()
    }

    /// Draw a tile for the active player.
    ///
    /// With `discard_unplaceable` set, tiles that fit nowhere on the grid are
    /// thrown away and the next one is drawn. Returns `false` once the supply
    /// is exhausted.
    pub(crate) fn draw(&mut self, discard_unplaceable: bool, events: &mut Vec<GameEvent>) -> bool {
        let player = self.active_player();
        while let Some(tile) = self.supply.next_tile() {
            if discard_unplaceable && !self.grid.has_any_placement(tile.kind()) {
                debug!(player, kind = ?tile.kind(), "drawn tile fits nowhere, discarding");
                events.push(GameEvent::TileDiscarded {
                    player,
                    kind: tile.kind(),
                });
                continue;
            }
            debug!(player, kind = ?tile.kind(), remaining = self.supply.remaining(), "tile drawn");
            events.push(GameEvent::TileDrawn {
                player,
                kind: tile.kind(),
            });
            self.current_tile = Some(tile);
            return true;
        }
        false
    }

    /// Players ordered by score, best first; ties keep turn order
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player: p.id,
                name: p.name.clone(),
                score: p.score,
            })
            .collect();
        standings.sort_by(|a, b| b.score.cmp(&a.score).then(a.player.cmp(&b.player)));
        standings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::TileStack;
    use crate::tile::TileKind;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Player {}", i + 1)).collect()
    }

    fn small_config() -> GameConfig {
        GameConfig::new().with_grid_size(3, 3)
    }

    #[test]
    fn test_player_count_limits() {
        let supply = || Box::new(TileStack::from_kinds(vec![])) as Box<dyn TileSupply>;
        assert!(matches!(
            Round::new(names(0), &small_config(), supply()),
            Err(GameError::InvalidConfig(_))
        ));
        assert!(matches!(
            Round::new(names(MAX_PLAYERS + 1), &small_config(), supply()),
            Err(GameError::InvalidConfig(_))
        ));
        assert!(Round::new(names(1), &small_config(), supply()).is_ok());
        assert!(Round::new(names(MAX_PLAYERS), &small_config(), supply()).is_ok());
    }

    #[test]
    fn test_advance_wraps() {
        let mut round = Round::new(
            names(3),
            &small_config(),
            Box::new(TileStack::from_kinds(vec![])),
        )
        .unwrap();
        assert_eq!(round.active_player(), 0);
        assert_eq!(round.advance(), 1);
        assert_eq!(round.advance(), 2);
        assert_eq!(round.advance(), 0);
        assert_eq!(round.turn(), 4);
    }

    #[test]
    fn test_draw_discards_unplaceable_tiles() {
        // A 1x1 grid has no free spot, so everything is discarded
        let config = GameConfig::new().with_grid_size(1, 1);
        let stack = TileStack::from_kinds(vec![TileKind::Road, TileKind::Monastery]);
        let mut round = Round::new(names(2), &config, Box::new(stack)).unwrap();

        let mut events = Vec::new();
        assert!(!round.draw(true, &mut events));
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, GameEvent::TileDiscarded { .. })));
        assert_eq!(round.tiles_remaining(), 0);
    }

    #[test]
    fn test_draw_keeps_unplaceable_when_allowed() {
        let config = GameConfig::new().with_grid_size(1, 1);
        let stack = TileStack::from_kinds(vec![TileKind::Road]);
        let mut round = Round::new(names(2), &config, Box::new(stack)).unwrap();

        let mut events = Vec::new();
        assert!(round.draw(false, &mut events));
        assert_eq!(round.current_tile().map(|t| t.kind()), Some(TileKind::Road));
    }

    #[test]
    fn test_standings_order() {
        let mut round = Round::new(
            names(3),
            &small_config(),
            Box::new(TileStack::from_kinds(vec![])),
        )
        .unwrap();
        round.player_mut(2).unwrap().add_points(5);
        round.player_mut(0).unwrap().add_points(1);
        round.player_mut(1).unwrap().add_points(5);
        let order: Vec<PlayerId> = round.standings().iter().map(|s| s.player).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
