pub mod game;

pub use game::{
    hidden_mask,
    // Round data
    GameData, RoundId, UsedWord, AnswerLine, Color,
    // Grid types
    Direction, Grid, GridLine, Placement, Position, MAX_GRID_SIZE,
    // Round settings
    Difficulty, GameMode,
};
