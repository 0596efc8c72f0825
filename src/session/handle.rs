use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{
    actor::Command,
    events::{GameState, SessionEvents, Subscription},
};
use crate::{
    error::SessionError,
    game::{AnswerResult, RoundRequest},
    models::{GridLine, RoundId},
};

/// Client-facing handle to a running game session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    events: Arc<SessionEvents>,
}

impl SessionHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, events: Arc<SessionEvents>) -> Self {
        Self { command_tx, events }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;

        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Restore a saved round. Fails with `RoundNotFound` for unknown ids.
    pub async fn load_game_round(&self, id: RoundId) -> Result<(), SessionError> {
        self.request(|reply| Command::Load { id, reply }).await?
    }

    /// Build, save and attach a new round. Returns the id it was saved under.
    pub async fn generate_new_game_round(&self, request: RoundRequest) -> Result<RoundId, SessionError> {
        self.request(|reply| Command::Generate { request, reply })
            .await?
    }

    pub async fn resume_game(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    pub async fn pause_game(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Save the round and shut the session down
    pub async fn stop_game(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Submit a selection. Only fails when the session is closed; a wrong
    /// answer is reported through `AnswerResult::correct`.
    pub async fn answer_word(
        &self,
        candidate: impl Into<String>,
        line: GridLine,
        reverse_matching: bool,
    ) -> Result<AnswerResult, SessionError> {
        let candidate = candidate.into();
        self.request(|reply| Command::Answer {
            candidate,
            line,
            reverse_matching,
            reply,
        })
        .await
    }

    /// Elapsed seconds, one value per tick
    pub fn on_timer(&self) -> Subscription<u32> {
        self.events.timer.subscribe()
    }

    /// Remaining seconds, one value per tick in countdown mode
    pub fn on_count_down(&self) -> Subscription<u32> {
        self.events.count_down.subscribe()
    }

    pub fn on_game_state(&self) -> Subscription<GameState> {
        self.events.game_state.subscribe()
    }

    pub fn on_answer_result(&self) -> Subscription<AnswerResult> {
        self.events.answer_result.subscribe()
    }

    pub fn current_state(&self) -> Option<GameState> {
        self.events.game_state.latest()
    }
}
