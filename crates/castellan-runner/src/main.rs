//! Castellan headless match runner.
//!
//! Plays a batch of bot-only rounds concurrently and prints one JSON summary
//! per finished session on stdout.

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod registry;
mod session;

use config::RunnerConfig;
use registry::SessionRegistry;
use session::SessionSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RunnerConfig::from_env()?;
    let base_seed = config.seed.unwrap_or_else(|| Uuid::new_v4().as_u64_pair().0);

    info!(
        games = config.games,
        players = config.players,
        seed = base_seed,
        difficulty = ?config.difficulty,
        "Starting Castellan runner..."
    );

    let registry = Arc::new(SessionRegistry::new());
    let mut drivers = Vec::with_capacity(config.games);

    for game in 0..config.games {
        let settings = SessionSettings {
            game: config.game.clone(),
            players: config.players,
            difficulty: config.difficulty,
            seed: base_seed.wrapping_add((game as u64) << 8),
        };
        let (handle, _task) = registry.create(&settings)?;

        let registry = Arc::clone(&registry);
        drivers.push(tokio::spawn(async move {
            let result = handle.run_to_end().await;
            registry.remove(handle.id());
            result
        }));
    }

    // Ctrl-C ends every running round with final scoring; drivers then report as usual
    let interrupt = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(active = registry.len(), "Interrupted, aborting sessions");
                let aborted = registry.abort_all().await;
                info!(aborted, "Sessions aborted");
            }
        })
    };

    let mut failed = 0;
    for driver in drivers {
        match driver.await? {
            Ok(summary) => println!("{}", serde_json::to_string(&summary)?),
            Err(e) => {
                error!("Session failed: {}", e);
                failed += 1;
            }
        }
    }

    interrupt.abort();

    if !registry.is_empty() {
        warn!(remaining = registry.len(), "Sessions still registered at exit");
    }
    info!(failed, "Runner finished");
    if failed > 0 {
        anyhow::bail!("{failed} of {} sessions failed", config.games);
    }
    Ok(())
}
