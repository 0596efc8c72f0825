use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

use crate::{
    game::{generator::DEFAULT_MAX_ATTEMPTS, GeneratorConfig, RoundRequest},
    models::{Difficulty, GameMode, RoundId},
    session::{SessionConfig, DEFAULT_EVENT_CAPACITY},
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Rounds are kept in memory when unset
    pub database: Option<DatabaseConfig>,
    pub game: GameConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// JSON word bank; the builtin themes are used when unset
    pub word_bank_path: Option<String>,
    /// Saved round to resume instead of generating a new one
    pub round_id: Option<RoundId>,
    pub tick_interval_ms: u64,
    pub max_placement_attempts: usize,
    pub event_capacity: usize,
    pub default_rows: usize,
    pub default_cols: usize,
    pub default_theme_id: i32,
    pub default_game_mode: GameMode,
    pub default_difficulty: Difficulty,
    pub reverse_matching: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            }),
            None => None,
        };

        let game_mode = lookup("DEFAULT_GAME_MODE").unwrap_or_else(|| "normal".to_string());
        let difficulty = lookup("DEFAULT_DIFFICULTY").unwrap_or_else(|| "medium".to_string());

        let game = GameConfig {
            word_bank_path: lookup("WORD_BANK_PATH").filter(|path| !path.trim().is_empty()),
            round_id: lookup("ROUND_ID")
                .map(|v| v.trim().parse())
                .transpose()
                .context("ROUND_ID must be a number")?,
            tick_interval_ms: lookup("TICK_INTERVAL_MS")
                .unwrap_or_else(|| "1000".to_string())
                .parse()
                .context("TICK_INTERVAL_MS must be a number")?,
            max_placement_attempts: lookup("MAX_PLACEMENT_ATTEMPTS")
                .map(|v| v.parse())
                .transpose()
                .context("MAX_PLACEMENT_ATTEMPTS must be a number")?
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            event_capacity: lookup("EVENT_CAPACITY")
                .map(|v| v.parse())
                .transpose()
                .context("EVENT_CAPACITY must be a number")?
                .unwrap_or(DEFAULT_EVENT_CAPACITY),
            default_rows: lookup("DEFAULT_ROWS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DEFAULT_ROWS must be a number")?,
            default_cols: lookup("DEFAULT_COLS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DEFAULT_COLS must be a number")?,
            default_theme_id: lookup("DEFAULT_THEME_ID")
                .unwrap_or_else(|| "1".to_string())
                .parse()
                .context("DEFAULT_THEME_ID must be a number")?,
            default_game_mode: GameMode::parse(&game_mode)
                .ok_or_else(|| anyhow!("Unknown DEFAULT_GAME_MODE '{}'", game_mode))?,
            default_difficulty: Difficulty::parse(&difficulty)
                .ok_or_else(|| anyhow!("Unknown DEFAULT_DIFFICULTY '{}'", difficulty))?,
            reverse_matching: lookup("REVERSE_MATCHING")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        if game.tick_interval_ms == 0 {
            return Err(anyhow!("TICK_INTERVAL_MS must be greater than zero"));
        }
        if game.event_capacity == 0 {
            return Err(anyhow!("EVENT_CAPACITY must be greater than zero"));
        }

        Ok(Config { database, game })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: Duration::from_millis(self.game.tick_interval_ms),
            event_capacity: self.game.event_capacity,
            generator: GeneratorConfig {
                max_attempts: self.game.max_placement_attempts,
            },
        }
    }

    /// Round built from the configured defaults
    pub fn default_round(&self) -> RoundRequest {
        RoundRequest {
            rows: self.game.default_rows,
            cols: self.game.default_cols,
            theme_id: self.game.default_theme_id,
            game_mode: self.game.default_game_mode,
            difficulty: self.game.default_difficulty,
        }
    }
}
