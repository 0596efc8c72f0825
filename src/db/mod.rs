use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::RepositoryError,
    models::{GameData, RoundId},
};

pub mod memory;
pub mod queries;

pub use memory::MemoryRepository;
pub use queries::PgRepository;

/// Storage for rounds, addressed by id
#[async_trait]
pub trait GameDataRepository: Send + Sync {
    async fn find(&self, id: RoundId) -> Result<Option<GameData>, RepositoryError>;

    /// Insert when `game.id` is `0`, update otherwise. Returns the round id.
    async fn save(&self, game: &GameData) -> Result<RoundId, RepositoryError>;
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
