use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::{
    game::AnswerResult,
    models::{GameData, RoundId},
};

/// Session lifecycle as seen by observers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameState {
    /// A new puzzle is being built. Stays cached if generation fails, since
    /// the error only goes back to the caller that asked for the round
    Generating { row_count: usize, col_count: usize },
    /// A saved round is being restored
    Loading { round_id: RoundId },
    /// The cached value is refreshed after every tick and correct answer
    Playing { game: Box<GameData> },
    Paused,
    /// Every word was answered
    Finished { game: Box<GameData> },
    /// The countdown ran out first
    GameOver { game: Box<GameData> },
}

impl GameState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::GameOver { .. })
    }
}

/// Single-writer, multi-reader stream that remembers its latest value.
///
/// A new subscriber first receives the latest value (if any) and then every
/// value published after it subscribed, in order.
#[derive(Debug)]
pub struct EventStream<T> {
    tx: broadcast::Sender<T>,
    latest: Mutex<Option<T>>,
}

impl<T: Clone> EventStream<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            latest: Mutex::new(None),
        }
    }

    pub fn publish(&self, value: T) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(value.clone());
        // No subscribers is normal, the value stays cached
        let _ = self.tx.send(value);
    }

    /// Swap the cached value without notifying current subscribers
    pub fn replace_latest(&self, value: T) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn latest(&self) -> Option<T> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        // Holding the lock keeps publish from slipping in between the
        // snapshot and the receiver
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        Subscription {
            pending: latest.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Next value, or `None` once the stream is closed
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next value if one is ready
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything currently ready
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// The four output streams of a session
#[derive(Debug)]
pub struct SessionEvents {
    pub timer: EventStream<u32>,
    pub count_down: EventStream<u32>,
    pub game_state: EventStream<GameState>,
    pub answer_result: EventStream<AnswerResult>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            timer: EventStream::new(capacity),
            count_down: EventStream::new(capacity),
            game_state: EventStream::new(capacity),
            answer_result: EventStream::new(capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_subscriber_sees_latest_only() {
        let stream = EventStream::new(8);
        stream.publish(1);
        stream.publish(2);

        let mut sub = stream.subscribe();
        assert_eq!(sub.try_recv(), Some(2));
        assert_eq!(sub.try_recv(), None);

        stream.publish(3);
        assert_eq!(sub.try_recv(), Some(3));
    }

    #[test]
    fn test_early_subscriber_sees_every_value_in_order() {
        let stream = EventStream::new(8);
        let mut first = stream.subscribe();
        let mut second = stream.subscribe();

        for value in 1..=4 {
            stream.publish(value);
        }

        assert_eq!(first.drain(), vec![1, 2, 3, 4]);
        assert_eq!(second.drain(), vec![1, 2, 3, 4]);
        assert_eq!(stream.latest(), Some(4));
    }

    #[test]
    fn test_replace_latest_is_silent() {
        let stream = EventStream::new(8);
        stream.publish(1);
        let mut early = stream.subscribe();
        assert_eq!(early.try_recv(), Some(1));

        stream.replace_latest(5);
        assert_eq!(early.try_recv(), None);
        assert_eq!(stream.latest(), Some(5));
        assert_eq!(stream.subscribe().try_recv(), Some(5));
    }

    #[test]
    fn test_empty_stream_has_no_latest() {
        let stream: EventStream<u32> = EventStream::new(4);
        assert_eq!(stream.latest(), None);
        assert_eq!(stream.subscribe().try_recv(), None);
    }

    #[tokio::test]
    async fn test_recv_waits_for_publish() {
        let stream = std::sync::Arc::new(EventStream::new(4));
        let mut sub = stream.subscribe();

        let publisher = stream.clone();
        tokio::spawn(async move {
            publisher.publish("ready".to_string());
        });

        assert_eq!(sub.recv().await.as_deref(), Some("ready"));
    }

    #[test]
    fn test_game_state_terminal() {
        assert!(!GameState::Paused.is_terminal());
        assert!(!GameState::Loading { round_id: 1 }.is_terminal());
    }
}
