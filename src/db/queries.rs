use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};

use super::GameDataRepository;
use crate::{
    error::RepositoryError,
    models::{Difficulty, GameData, GameMode, Grid, RoundId, UsedWord},
};

/// Row of the `game_rounds` table. Grid and words are stored as JSON.
#[derive(Debug, FromRow)]
struct GameRoundRow {
    id: i64,
    name: String,
    theme_id: i32,
    game_mode: GameMode,
    difficulty: Difficulty,
    grid: Json<Grid>,
    used_words: Json<Vec<UsedWord>>,
    max_duration: i32,
    duration: i32,
    created_at: DateTime<Utc>,
}

impl From<GameRoundRow> for GameData {
    fn from(row: GameRoundRow) -> Self {
        GameData {
            id: row.id,
            name: row.name,
            theme_id: row.theme_id,
            game_mode: row.game_mode,
            difficulty: row.difficulty,
            grid: row.grid.0,
            used_words: row.used_words.0,
            max_duration: u32::try_from(row.max_duration).unwrap_or(0),
            duration: u32::try_from(row.duration).unwrap_or(0),
            created_at: row.created_at,
        }
    }
}

fn to_db_seconds(seconds: u32) -> i32 {
    i32::try_from(seconds).unwrap_or(i32::MAX)
}

/// Postgres-backed round storage
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, game: &GameData) -> sqlx::Result<RoundId> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO game_rounds
                (name, theme_id, game_mode, difficulty, grid, used_words, max_duration, duration, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&game.name)
        .bind(game.theme_id)
        .bind(game.game_mode)
        .bind(game.difficulty)
        .bind(Json(&game.grid))
        .bind(Json(&game.used_words))
        .bind(to_db_seconds(game.max_duration))
        .bind(to_db_seconds(game.duration))
        .bind(game.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update(&self, game: &GameData) -> sqlx::Result<RoundId> {
        let result = sqlx::query(
            r#"
            UPDATE game_rounds
            SET used_words = $2, duration = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(game.id)
        .bind(Json(&game.used_words))
        .bind(to_db_seconds(game.duration))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(game.id)
    }
}

#[async_trait]
impl GameDataRepository for PgRepository {
    async fn find(&self, id: RoundId) -> Result<Option<GameData>, RepositoryError> {
        let row = sqlx::query_as::<_, GameRoundRow>(
            r#"
            SELECT id, name, theme_id, game_mode, difficulty, grid, used_words,
                   max_duration, duration, created_at
            FROM game_rounds
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GameData::from))
    }

    async fn save(&self, game: &GameData) -> Result<RoundId, RepositoryError> {
        let id = if game.id == 0 {
            let id = self.insert(game).await?;
            tracing::info!("Created game round {}", id);
            id
        } else {
            self.update(game).await?
        };
        Ok(id)
    }
}
