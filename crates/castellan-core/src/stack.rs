//! Tile supply.
//!
//! The round draws tiles through the `TileSupply` trait, so tests and bots can
//! feed a fixed sequence while normal play uses a shuffled standard set.

use crate::tile::{Tile, TileKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Source of tiles for a round
pub trait TileSupply: Debug + Send {
    /// Draw the next tile, `None` once the supply is used up
    fn next_tile(&mut self) -> Option<Tile>;

    /// Tiles left to draw
    fn remaining(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// A finite stack of tiles drawn front to back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileStack {
    kinds: Vec<TileKind>,
    drawn: usize,
}

impl TileStack {
    /// A stack that yields `kinds` in order
    pub fn from_kinds(kinds: Vec<TileKind>) -> Self {
        Self { kinds, drawn: 0 }
    }

    /// The base game set without the copy of `foundation` already on the grid.
    ///
    /// Unshuffled; call `shuffle` before play.
    pub fn standard(foundation: TileKind) -> Self {
        let mut kinds: Vec<TileKind> = TileKind::ALL
            .iter()
            .flat_map(|kind| std::iter::repeat(*kind).take(kind.standard_count()))
            .collect();
        if let Some(index) = kinds.iter().position(|kind| *kind == foundation) {
            kinds.remove(index);
        }
        Self::from_kinds(kinds)
    }

    /// The standard set shuffled with a seeded generator
    pub fn shuffled(foundation: TileKind, seed: u64) -> Self {
        let mut stack = Self::standard(foundation);
        stack.shuffle(&mut StdRng::seed_from_u64(seed));
        stack
    }

    /// Shuffle the tiles not yet drawn
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.kinds[self.drawn..].shuffle(rng);
    }

    /// Put every drawn tile back, keeping the current order
    pub fn reset(&mut self) {
        self.drawn = 0;
    }

    /// Tiles in the stack, drawn or not
    pub fn total(&self) -> usize {
        self.kinds.len()
    }

    /// The next tile without drawing it
    pub fn peek(&self) -> Option<TileKind> {
        self.kinds.get(self.drawn).copied()
    }

    /// Undrawn copies of `kind`
    pub fn count_of(&self, kind: TileKind) -> usize {
        self.kinds[self.drawn..]
            .iter()
            .filter(|k| **k == kind)
            .count()
    }
}

impl TileSupply for TileStack {
    fn next_tile(&mut self) -> Option<Tile> {
        let kind = self.peek()?;
        self.drawn += 1;
        Some(Tile::new(kind))
    }

    fn remaining(&self) -> usize {
        self.kinds.len() - self.drawn
    }
}
