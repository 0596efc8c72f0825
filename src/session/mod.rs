//! Game session state machine.
//!
//! A session owns one round for its whole lifetime. All mutation (answers,
//! clock ticks, lifecycle transitions) runs on a single actor task; callers
//! talk to it through a cloneable [`SessionHandle`] and observe it through
//! four event streams.
//!
//! ```text
//!   Generating ─┐
//!               ├──▶ Playing ◀──▶ Paused
//!   Loading ────┘       │
//!                       ├──▶ Finished   (all words answered)
//!                       └──▶ GameOver   (countdown expired)
//! ```

use std::time::Duration;

use crate::game::{clock::DEFAULT_TICK_INTERVAL, GeneratorConfig};

pub mod actor;
pub mod events;
pub mod handle;

pub use actor::GameSession;
pub use events::{EventStream, GameState, SessionEvents, Subscription};
pub use handle::SessionHandle;

/// Default per-stream event buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub event_capacity: usize,
    pub generator: GeneratorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            generator: GeneratorConfig::default(),
        }
    }
}
