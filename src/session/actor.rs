use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{
    events::{GameState, SessionEvents},
    handle::SessionHandle,
    SessionConfig,
};
use crate::{
    db::GameDataRepository,
    dictionary::WordBank,
    error::SessionError,
    game::{AnswerResult, PuzzleGenerator, RoundRequest, SessionClock, WordMatcher},
    models::{GameData, GridLine, RoundId},
};

const COMMAND_CAPACITY: usize = 32;

/// Messages processed by the session task, in arrival order
#[derive(Debug)]
pub(crate) enum Command {
    Load {
        id: RoundId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Generate {
        request: RoundRequest,
        reply: oneshot::Sender<Result<RoundId, SessionError>>,
    },
    /// Posted back by the generation task
    Generated {
        result: Result<GameData, SessionError>,
        reply: oneshot::Sender<Result<RoundId, SessionError>>,
    },
    Resume {
        reply: oneshot::Sender<()>,
    },
    Pause {
        reply: oneshot::Sender<()>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Answer {
        candidate: String,
        line: GridLine,
        reverse_matching: bool,
        reply: oneshot::Sender<AnswerResult>,
    },
    Tick {
        epoch: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No round attached yet
    Idle,
    Generating,
    Loading,
    Playing,
    Paused,
    /// Finished or game over
    Ended,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Finished,
    GameOver,
}

/// Owner of one round and the only place it is mutated
pub struct GameSession {
    phase: Phase,
    /// Last visibility reported by the host, remembered before a round exists
    host_visible: bool,
    game: Option<GameData>,
    clock: SessionClock,
    matcher: WordMatcher,
    generator: Arc<PuzzleGenerator>,
    word_bank: Arc<WordBank>,
    repository: Arc<dyn GameDataRepository>,
    events: Arc<SessionEvents>,
    command_tx: mpsc::WeakSender<Command>,
}

impl GameSession {
    /// Start a session task and return its handle
    pub fn spawn(
        repository: Arc<dyn GameDataRepository>,
        word_bank: Arc<WordBank>,
        config: SessionConfig,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let events = Arc::new(SessionEvents::new(config.event_capacity));

        let session = GameSession {
            phase: Phase::Idle,
            host_visible: true,
            game: None,
            clock: SessionClock::new(config.tick_interval),
            matcher: WordMatcher::new(),
            generator: Arc::new(PuzzleGenerator::new(config.generator)),
            word_bank,
            repository,
            events: events.clone(),
            command_tx: command_tx.downgrade(),
        };
        tokio::spawn(session.run(command_rx));

        SessionHandle::new(command_tx, events)
    }

    async fn run(mut self, mut command_rx: mpsc::Receiver<Command>) {
        tracing::debug!("Game session started");

        while let Some(command) = command_rx.recv().await {
            if !self.handle(command).await {
                tracing::info!("Game session stopped");
                return;
            }
        }

        // Every handle was dropped without an explicit stop
        self.shutdown().await;
        tracing::debug!("Game session closed");
    }

    /// Returns `false` once the session should stop
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Load { id, reply } => {
                let result = self.load(id).await;
                let _ = reply.send(result);
            }
            Command::Generate { request, reply } => self.generate(request, reply),
            Command::Generated { result, reply } => {
                let result = self.attach_generated(result).await;
                let _ = reply.send(result);
            }
            Command::Resume { reply } => {
                self.resume();
                let _ = reply.send(());
            }
            Command::Pause { reply } => {
                self.pause().await;
                let _ = reply.send(());
            }
            Command::Answer {
                candidate,
                line,
                reverse_matching,
                reply,
            } => {
                let result = self.answer(&candidate, &line, reverse_matching).await;
                let _ = reply.send(result);
            }
            Command::Tick { epoch } => self.tick(epoch).await,
            Command::Stop { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn can_start(&self) -> bool {
        self.phase == Phase::Idle && self.game.is_none()
    }

    async fn load(&mut self, id: RoundId) -> Result<(), SessionError> {
        if !self.can_start() {
            return Err(SessionError::AlreadyStarted);
        }

        self.phase = Phase::Loading;
        self.events
            .game_state
            .publish(GameState::Loading { round_id: id });

        match self.repository.find(id).await {
            Ok(Some(game)) => {
                tracing::info!("Loaded game round {} ({})", id, game.name);
                self.begin_round(game);
                Ok(())
            }
            Ok(None) => {
                self.phase = Phase::Idle;
                tracing::warn!("Game round {} not found", id);
                Err(SessionError::RoundNotFound(id))
            }
            Err(e) => {
                self.phase = Phase::Idle;
                tracing::error!("Failed to load game round {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Kick off generation on a blocking thread; the result comes back as
    /// `Command::Generated` so the round is attached on this task
    fn generate(
        &mut self,
        request: RoundRequest,
        reply: oneshot::Sender<Result<RoundId, SessionError>>,
    ) {
        if !self.can_start() {
            let _ = reply.send(Err(SessionError::AlreadyStarted));
            return;
        }
        let Some(command_tx) = self.command_tx.upgrade() else {
            let _ = reply.send(Err(SessionError::Closed));
            return;
        };

        self.phase = Phase::Generating;
        self.events.game_state.publish(GameState::Generating {
            row_count: request.rows,
            col_count: request.cols,
        });
        tracing::info!(
            "Generating {}x{} round (theme {}, {:?}, {:?})",
            request.rows,
            request.cols,
            request.theme_id,
            request.game_mode,
            request.difficulty
        );

        let generator = self.generator.clone();
        let word_bank = self.word_bank.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                generator.generate(&request, &word_bank, &mut rand::rng())
            })
            .await;

            let result = match result {
                Ok(generated) => generated.map_err(SessionError::from),
                Err(e) => Err(SessionError::from(e)),
            };
            let _ = command_tx.send(Command::Generated { result, reply }).await;
        });
    }

    async fn attach_generated(
        &mut self,
        result: Result<GameData, SessionError>,
    ) -> Result<RoundId, SessionError> {
        let mut game = match result {
            Ok(game) => game,
            Err(e) => {
                self.phase = Phase::Idle;
                tracing::warn!("Round generation failed: {}", e);
                return Err(e);
            }
        };

        match self.repository.save(&game).await {
            Ok(id) => game.id = id,
            Err(e) => tracing::warn!("Failed to save generated round: {}", e),
        }

        let id = game.id;
        self.begin_round(game);
        Ok(id)
    }

    fn begin_round(&mut self, game: GameData) {
        if game.is_finished() {
            self.end_without_saving(game, Outcome::Finished);
            return;
        }
        if game.is_game_over() {
            self.end_without_saving(game, Outcome::GameOver);
            return;
        }

        self.events.game_state.publish(GameState::Playing {
            game: Box::new(game.clone()),
        });
        self.game = Some(game);

        if self.host_visible {
            self.phase = Phase::Playing;
            self.start_clock();
        } else {
            self.phase = Phase::Paused;
            self.events.game_state.publish(GameState::Paused);
        }
    }

    fn end_without_saving(&mut self, game: GameData, outcome: Outcome) {
        self.phase = Phase::Ended;
        self.events.game_state.publish(Self::terminal_state(&game, outcome));
        self.game = Some(game);
    }

    fn start_clock(&mut self) {
        self.clock
            .start(self.command_tx.clone(), |epoch| Command::Tick { epoch });
    }

    fn resume(&mut self) {
        self.host_visible = true;
        if self.phase != Phase::Paused {
            return;
        }

        self.phase = Phase::Playing;
        self.start_clock();
        if let Some(game) = &self.game {
            self.events.game_state.publish(GameState::Playing {
                game: Box::new(game.clone()),
            });
        }
        tracing::debug!("Game resumed");
    }

    async fn pause(&mut self) {
        self.host_visible = false;
        if self.phase != Phase::Playing {
            return;
        }

        self.clock.stop();
        self.phase = Phase::Paused;
        self.persist().await;
        self.events.game_state.publish(GameState::Paused);
        tracing::debug!("Game paused");
    }

    async fn tick(&mut self, epoch: u64) {
        if self.phase != Phase::Playing || !self.clock.accepts(epoch) {
            tracing::trace!("Discarding stale tick (epoch {})", epoch);
            return;
        }
        let Some(game) = self.game.as_mut() else {
            return;
        };

        let tick = SessionClock::advance(game);
        let finished = game.is_finished();

        self.events.timer.publish(tick.elapsed);
        if let Some(remaining) = tick.remaining {
            self.events.count_down.publish(remaining);
        }

        if tick.expired && !finished {
            tracing::info!("Countdown expired");
            self.end_round(Outcome::GameOver).await;
        } else {
            self.refresh_snapshot();
        }
    }

    /// Answers outside `Playing` are rejected without an event
    async fn answer(&mut self, candidate: &str, line: &GridLine, reverse_matching: bool) -> AnswerResult {
        if self.phase != Phase::Playing {
            let answered = self.game.as_ref().map_or(0, GameData::answered_words_count);
            return AnswerResult::rejected(answered);
        }
        let Some(game) = self.game.as_mut() else {
            return AnswerResult::rejected(0);
        };

        let result = self
            .matcher
            .answer(game, candidate, line, reverse_matching, &mut rand::rng());
        let finished = game.is_finished();
        self.events.answer_result.publish(result.clone());

        if result.correct {
            tracing::debug!("Answered '{}' ({} total)", candidate, result.total_answered);
            if finished {
                self.end_round(Outcome::Finished).await;
            } else {
                self.persist().await;
                self.refresh_snapshot();
            }
        }
        result
    }

    /// Keep the cached `Playing` state current for late subscribers
    fn refresh_snapshot(&self) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Some(game) = &self.game {
            self.events.game_state.replace_latest(GameState::Playing {
                game: Box::new(game.clone()),
            });
        }
    }

    async fn end_round(&mut self, outcome: Outcome) {
        self.clock.stop();
        self.phase = Phase::Ended;
        self.persist().await;

        if let Some(game) = &self.game {
            tracing::info!(
                "Round {} ended: {:?} ({}/{} words, {}s)",
                game.id,
                outcome,
                game.answered_words_count(),
                game.used_words.len(),
                game.duration
            );
            self.events
                .game_state
                .publish(Self::terminal_state(game, outcome));
        }
    }

    fn terminal_state(game: &GameData, outcome: Outcome) -> GameState {
        let game = Box::new(game.clone());
        match outcome {
            Outcome::Finished => GameState::Finished { game },
            Outcome::GameOver => GameState::GameOver { game },
        }
    }

    async fn shutdown(&mut self) {
        self.clock.stop();
        self.persist().await;
    }

    async fn persist(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };

        match self.repository.save(game).await {
            Ok(id) => game.id = id,
            Err(e) => tracing::warn!("Failed to save game round {}: {}", game.id, e),
        }
    }
}
