pub mod config;
pub mod db;
pub mod dictionary;
pub mod error;
pub mod game;
pub mod models;
pub mod session;
pub mod utils;

pub use config::Config;
pub use error::{GenerationError, RepositoryError, SessionError};
pub use session::{GameSession, GameState, SessionConfig, SessionHandle};
