pub mod duration;
pub mod letters;

pub use duration::format_duration;
pub use letters::random_letter;
