// Gameplay core: grid geometry, answer checking, puzzle generation, clock

pub mod clock;
pub mod generator;
pub mod mapper;
pub mod matcher;

pub use clock::{SessionClock, Tick};
pub use generator::{GeneratorConfig, PuzzleGenerator, RoundRequest};
pub use mapper::StreakLineMapper;
pub use matcher::{AnswerResult, WordMatcher};
