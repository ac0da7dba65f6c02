//! Runner settings read from the environment.

use castellan_core::{BotDifficulty, GameConfig, MAX_PLAYERS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("Unknown difficulty {0:?}, expected \"easy\" or \"medium\"")]
    UnknownDifficulty(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid game config in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Everything one runner invocation needs
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Number of sessions played concurrently
    pub games: usize,
    /// Bots per session
    pub players: usize,
    /// Base seed; each session and bot derives its own from it
    pub seed: Option<u64>,
    pub difficulty: BotDifficulty,
    pub game: GameConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            games: 4,
            players: 2,
            seed: None,
            difficulty: BotDifficulty::Medium,
            game: GameConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Read `CASTELLAN_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("CASTELLAN_GAMES") {
            config.games = parse_count("CASTELLAN_GAMES", &value, 1, 10_000)?;
        }
        if let Some(value) = lookup("CASTELLAN_PLAYERS") {
            config.players = parse_count("CASTELLAN_PLAYERS", &value, 1, MAX_PLAYERS)?;
        }
        if let Some(value) = lookup("CASTELLAN_SEED") {
            let seed = value.trim().parse().map_err(|_| ConfigError::NotANumber {
                name: "CASTELLAN_SEED",
                value: value.clone(),
            })?;
            config.seed = Some(seed);
        }
        if let Some(value) = lookup("CASTELLAN_DIFFICULTY") {
            config.difficulty = parse_difficulty(&value)?;
        }
        if let Some(path) = lookup("CASTELLAN_CONFIG") {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            config.game = serde_json::from_str(&text).map_err(|source| ConfigError::Json { path, source })?;
        }

        Ok(config)
    }
}

fn parse_count(name: &'static str, value: &str, min: usize, max: usize) -> Result<usize, ConfigError> {
    let parsed: usize = value.trim().parse().map_err(|_| ConfigError::NotANumber {
        name,
        value: value.to_string(),
    })?;
    if parsed < min || parsed > max {
        return Err(ConfigError::OutOfRange {
            name,
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}

fn parse_difficulty(value: &str) -> Result<BotDifficulty, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "easy" => Ok(BotDifficulty::Easy),
        "medium" => Ok(BotDifficulty::Medium),
        _ => Err(ConfigError::UnknownDifficulty(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_reads_variables() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("CASTELLAN_GAMES", "10"),
            ("CASTELLAN_PLAYERS", "3"),
            ("CASTELLAN_SEED", "42"),
            ("CASTELLAN_DIFFICULTY", "Easy"),
        ]))
        .unwrap();
        assert_eq!(config.games, 10);
        assert_eq!(config.players, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.difficulty, BotDifficulty::Easy);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RunnerConfig::from_lookup(lookup(&[("CASTELLAN_PLAYERS", "0")])),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            RunnerConfig::from_lookup(lookup(&[("CASTELLAN_GAMES", "many")])),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            RunnerConfig::from_lookup(lookup(&[("CASTELLAN_DIFFICULTY", "hard")])),
            Err(ConfigError::UnknownDifficulty(_))
        ));
        assert!(matches!(
            RunnerConfig::from_lookup(lookup(&[("CASTELLAN_CONFIG", "/nonexistent/castellan.json")])),
            Err(ConfigError::Io { .. })
        ));
    }
}
