//! Bot-only game sessions.
//!
//! Each session is an actor: one task owns the `GameState` and its bots, and
//! handles commands from an `mpsc` queue one at a time. Callers talk to it
//! through a cloneable `SessionHandle`.

use castellan_core::{
    Bot, BotDifficulty, GameAction, GameConfig, GameError, GameEvent, GameState, PlayerId, Standing, TileStack,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queue depth per session
const COMMAND_BUFFER: usize = 32;

/// Upper bound on actions in one round; the standard set needs a few hundred
const MAX_ACTIONS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Session {0} is closed")]
    Closed(Uuid),

    #[error("No bot acted for player {0}")]
    Stalled(PlayerId),

    #[error("Round exceeded {0} actions")]
    TooLong(u32),
}

/// How a session is set up
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub game: GameConfig,
    pub players: usize,
    pub difficulty: BotDifficulty,
    /// Seeds the tile stack and the bots
    pub seed: u64,
}

/// Result of one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A bot acted and the round goes on
    Acted(Vec<GameEvent>),
    /// The round is over
    Finished(Vec<GameEvent>),
}

/// Serializable report on a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub seed: u64,
    pub finished: bool,
    pub actions: u32,
    pub tiles_placed: usize,
    pub tiles_remaining: usize,
    pub standings: Vec<Standing>,
}

/// Commands understood by the session actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Let the active bot take one action
    Step {
        reply: oneshot::Sender<Result<StepOutcome, SessionError>>,
    },
    /// End the round now and apply final scoring
    Abort {
        reply: oneshot::Sender<Result<Vec<GameEvent>, SessionError>>,
    },
    /// Report the current state
    Summary { reply: oneshot::Sender<SessionSummary> },
}

/// Cheap handle for sending commands to a session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn step(&self) -> Result<StepOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Step { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id))?
    }

    pub async fn abort(&self) -> Result<Vec<GameEvent>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Abort { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id))?
    }

    pub async fn summary(&self) -> Result<SessionSummary, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Summary { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id))
    }

    /// Step until the round is over and return the final summary
    pub async fn run_to_end(&self) -> Result<SessionSummary, SessionError> {
        loop {
            if let StepOutcome::Finished(_) = self.step().await? {
                return self.summary().await;
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed(self.id))
    }
}

/// State owned by the actor task
struct Session {
    id: Uuid,
    seed: u64,
    game: GameState,
    bots: Vec<Bot>,
    actions: u32,
}

impl Session {
    fn new(id: Uuid, settings: &SessionSettings) -> Result<Self, SessionError> {
        let mut game = GameState::new(settings.game.clone())?;
        let names = (0..settings.players).map(|i| format!("Bot {}", i + 1)).collect();
        let stack = TileStack::shuffled(settings.game.foundation, settings.seed);
        game.new_round(names, stack)?;

        let bots = (0..settings.players)
            .map(|i| {
                let seed = settings.seed.wrapping_add(1 + i as u64);
                Bot::with_seed(i as PlayerId, settings.difficulty, seed)
            })
            .collect();

        Ok(Self {
            id,
            seed: settings.seed,
            game,
            bots,
            actions: 0,
        })
    }

    fn step(&mut self) -> Result<StepOutcome, SessionError> {
        if self.game.is_over() {
            return Ok(StepOutcome::Finished(Vec::new()));
        }
        if self.actions >= MAX_ACTIONS {
            return Err(SessionError::TooLong(MAX_ACTIONS));
        }

        let player = self.game.active_player().ok_or(SessionError::Stalled(0))?;
        let action = self
            .bots
            .get_mut(player as usize)
            .and_then(|bot| bot.choose_action(&self.game))
            .ok_or(SessionError::Stalled(player))?;
        debug!(session = %self.id, player, ?action, "bot action");

        let events = self.game.apply(action)?;
        self.actions += 1;

        if self.game.is_over() {
            Ok(StepOutcome::Finished(events))
        } else {
            Ok(StepOutcome::Acted(events))
        }
    }

    fn abort(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        Ok(self.game.apply(GameAction::Abort)?)
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            seed: self.seed,
            finished: self.game.is_over(),
            actions: self.actions,
            tiles_placed: self.game.grid().map_or(0, |g| g.tile_count()),
            tiles_remaining: self.game.round().map_or(0, |r| r.tiles_remaining()),
            standings: self.game.standings(),
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        info!(session = %self.id, seed = self.seed, players = self.bots.len(), "session started");

        while let Some(command) = rx.recv().await {
            match command {
                SessionCommand::Step { reply } => {
                    let outcome = self.step();
                    if let Err(e) = &outcome {
                        warn!(session = %self.id, "step failed: {}", e);
                    }
                    let _ = reply.send(outcome);
                }
                SessionCommand::Abort { reply } => {
                    let _ = reply.send(self.abort());
                }
                SessionCommand::Summary { reply } => {
                    let _ = reply.send(self.summary());
                }
            }
        }

        info!(session = %self.id, actions = self.actions, "session closed");
    }
}

/// Set up a session and start its actor task
pub fn spawn_session(settings: &SessionSettings) -> Result<(SessionHandle, JoinHandle<()>), SessionError> {
    let id = Uuid::new_v4();
    let session = Session::new(id, settings)?;
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(session.run(rx));
    Ok((SessionHandle { id, tx }, task))
}
