use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::models::{GameData, GameMode};

/// Wall-clock time between two ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Clock values after one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub elapsed: u32,
    /// Only set in countdown mode
    pub remaining: Option<u32>,
    /// Countdown reached zero on this tick
    pub expired: bool,
}

/// Drives the per-second tick of a running round.
///
/// Ticks are delivered as messages tagged with the epoch that was current when
/// the ticker started. `stop` bumps the epoch, so a tick already queued when
/// the clock stops is recognised as stale by `accepts` and dropped.
#[derive(Debug)]
pub struct SessionClock {
    interval: Duration,
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
}

impl SessionClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            epoch: 0,
            ticker: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Whether a tick stamped with `epoch` should still be applied
    pub fn accepts(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }

    /// Start ticking into `tx`. The ticker only holds a weak sender and exits
    /// once every strong sender is gone.
    pub fn start<T: Send + 'static>(&mut self, tx: mpsc::WeakSender<T>, make_tick: fn(u64) -> T) {
        self.stop();
        let epoch = self.epoch;
        let period = self.interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else {
                    break;
                };
                if tx.send(make_tick(epoch)).await.is_err() {
                    break;
                }
            }
            tracing::trace!("Clock ticker for epoch {} exited", epoch);
        }));
        tracing::debug!("Clock started (epoch {})", epoch);
    }

    pub fn stop(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            tracing::debug!("Clock stopped (epoch now {})", self.epoch);
        }
    }

    /// Apply one tick to the round
    pub fn advance(game: &mut GameData) -> Tick {
        game.duration = game.duration.saturating_add(1);

        match game.game_mode {
            GameMode::CountDown => {
                let remaining = game.remaining_duration();
                Tick {
                    elapsed: game.duration,
                    remaining: Some(remaining),
                    expired: remaining == 0,
                }
            }
            GameMode::Normal | GameMode::Hidden => Tick {
                elapsed: game.duration,
                remaining: None,
                expired: false,
            },
        }
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Grid};
    use chrono::Utc;

    fn game(mode: GameMode, max_duration: u32) -> GameData {
        GameData {
            id: 0,
            name: "Clock".to_string(),
            theme_id: 1,
            game_mode: mode,
            difficulty: Difficulty::Easy,
            grid: Grid::filled(2, 2, 'A'),
            used_words: Vec::new(),
            max_duration,
            duration: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_elapsed_mode_counts_up_without_bound() {
        let mut game = game(GameMode::Normal, 2);
        for expected in 1..=5 {
            let tick = SessionClock::advance(&mut game);
            assert_eq!(tick.elapsed, expected);
            assert_eq!(tick.remaining, None);
            assert!(!tick.expired);
        }
    }

    #[test]
    fn test_countdown_expires_at_zero() {
        let mut game = game(GameMode::CountDown, 3);
        let ticks: Vec<Tick> = (0..3).map(|_| SessionClock::advance(&mut game)).collect();

        assert_eq!(
            ticks.iter().map(|t| t.remaining).collect::<Vec<_>>(),
            vec![Some(2), Some(1), Some(0)]
        );
        assert_eq!(ticks.iter().filter(|t| t.expired).count(), 1);
        assert!(ticks[2].expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_carry_current_epoch() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let mut clock = SessionClock::new(Duration::from_secs(1));

        clock.start(tx.downgrade(), |epoch| epoch);
        let epoch = clock.epoch();
        assert_eq!(rx.recv().await, Some(epoch));
        assert!(clock.accepts(epoch));

        clock.stop();
        assert!(!clock.accepts(epoch));
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let mut clock = SessionClock::new(Duration::from_secs(1));

        clock.start(tx.downgrade(), |epoch| epoch);
        clock.stop();

        let waited = time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(waited.is_err(), "no tick should arrive after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_uses_new_epoch() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let mut clock = SessionClock::new(Duration::from_secs(1));

        clock.start(tx.downgrade(), |epoch| epoch);
        let first = clock.epoch();
        clock.start(tx.downgrade(), |epoch| epoch);
        let second = clock.epoch();

        assert_ne!(first, second);
        assert_eq!(rx.recv().await, Some(second));
    }
}
