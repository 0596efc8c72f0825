use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::GameDataRepository;
use crate::{
    error::RepositoryError,
    models::{GameData, RoundId},
};

/// Process-local round storage
#[derive(Debug)]
pub struct MemoryRepository {
    rounds: DashMap<RoundId, GameData>,
    next_id: AtomicI64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            rounds: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameDataRepository for MemoryRepository {
    async fn find(&self, id: RoundId) -> Result<Option<GameData>, RepositoryError> {
        Ok(self.rounds.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, game: &GameData) -> Result<RoundId, RepositoryError> {
        let id = if game.id == 0 {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        } else {
            game.id
        };

        let mut stored = game.clone();
        stored.id = id;
        self.rounds.insert(id, stored);

        tracing::trace!("Saved round {} in memory", id);
        Ok(id)
    }
}
