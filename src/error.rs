use thiserror::Error;

use crate::models::RoundId;

/// Puzzle generation failures. No partial round is ever produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("grid size {rows}x{cols} is outside 2..={max}")]
    InvalidDimensions { rows: usize, cols: usize, max: usize },

    #[error("unknown theme {0}")]
    UnknownTheme(i32),

    #[error("no word of theme {theme_id} fits a {rows}x{cols} grid")]
    NoWordsFit { theme_id: i32, rows: usize, cols: usize },

    #[error("could not pack {word_count} words into a {rows}x{cols} grid after {attempts} attempts")]
    Unpackable {
        word_count: usize,
        rows: usize,
        cols: usize,
        attempts: usize,
    },
}

/// Round storage failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("game round {0} not found")]
    RoundNotFound(RoundId),

    #[error("a game round is already attached to this session")]
    AlreadyStarted,

    #[error("game session is closed")]
    Closed,

    #[error("failed to generate game round: {0}")]
    Generation(#[from] GenerationError),

    #[error("generation task failed: {0}")]
    GenerationTask(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
