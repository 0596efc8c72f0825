use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier of a persisted round. `0` means the round has not been saved yet.
pub type RoundId = i64;

/// Largest row or column count a grid may have.
pub const MAX_GRID_SIZE: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Normal,
    Hidden,
    CountDown,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hidden => "hidden",
            Self::CountDown => "count_down",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "hidden" => Some(Self::Hidden),
            "countdown" | "count_down" => Some(Self::CountDown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Directions words may run in at this difficulty
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            Self::Easy => &[Direction::East, Direction::South],
            Self::Medium => &[
                Direction::East,
                Direction::South,
                Direction::SouthEast,
                Direction::NorthEast,
            ],
            Self::Hard => &Direction::ALL,
        }
    }

    /// Upper bound on hidden words per round
    pub fn max_words(&self) -> usize {
        match self {
            Self::Easy => 6,
            Self::Medium => 10,
            Self::Hard => 15,
        }
    }

    /// Fraction of grid cells that word letters may cover
    pub fn fill_density(&self) -> f32 {
        match self {
            Self::Easy => 0.35,
            Self::Medium => 0.5,
            Self::Hard => 0.65,
        }
    }

    /// Countdown budget granted per hidden word
    pub fn seconds_per_word(&self) -> u32 {
        match self {
            Self::Easy => 30,
            Self::Medium => 25,
            Self::Hard => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Step `steps` cells along `direction`, or `None` when that leaves the
    /// non-negative quadrant.
    pub fn step(&self, direction: Direction, steps: usize) -> Option<Position> {
        let (dr, dc) = direction.delta();
        let steps = isize::try_from(steps).ok()?;
        Some(Position {
            row: self.row.checked_add_signed(dr.checked_mul(steps)?)?,
            col: self.col.checked_add_signed(dc.checked_mul(steps)?)?,
        })
    }
}

/// The eight straight directions a word can be laid along.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    West,
    South,
    North,
    SouthEast,
    NorthWest,
    NorthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
        Direction::SouthEast,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
    ];

    /// (row, col) step of one cell
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Self::East => (0, 1),
            Self::West => (0, -1),
            Self::South => (1, 0),
            Self::North => (-1, 0),
            Self::SouthEast => (1, 1),
            Self::NorthWest => (-1, -1),
            Self::NorthEast => (-1, 1),
            Self::SouthWest => (1, -1),
        }
    }

    pub fn from_delta(dr: isize, dc: isize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.delta() == (dr, dc))
    }

    pub fn reversed(&self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::South => Self::North,
            Self::North => Self::South,
            Self::SouthEast => Self::NorthWest,
            Self::NorthWest => Self::SouthEast,
            Self::NorthEast => Self::SouthWest,
            Self::SouthWest => Self::NorthEast,
        }
    }
}

/// Ground-truth location of a hidden word.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Placement {
    pub start: Position,
    pub direction: Direction,
    pub length: usize,
}

impl Placement {
    pub fn new(start: Position, direction: Direction, length: usize) -> Self {
        Self {
            start,
            direction,
            length,
        }
    }

    /// Last cell covered by the placement
    pub fn end(&self) -> Option<Position> {
        self.start
            .step(self.direction, self.length.checked_sub(1)?)
    }

    /// Same cells, walked from the other end
    pub fn reversed(&self) -> Option<Placement> {
        Some(Placement {
            start: self.end()?,
            direction: self.direction.reversed(),
            length: self.length,
        })
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.length).filter_map(move |i| self.start.step(self.direction, i))
    }

    /// Whether every cell lies inside a `rows` x `cols` grid
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.length > 0
            && self
                .end()
                .is_some_and(|end| end.row < rows && end.col < cols)
            && self.start.row < rows
            && self.start.col < cols
    }
}

/// A straight line between two grid cells, as drawn by a drag gesture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct GridLine {
    pub start: Position,
    pub end: Position,
}

impl GridLine {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

/// ARGB color packed into a `u32`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Color(pub u32);

impl Color {
    pub fn random_with_alpha(rng: &mut impl Rng, alpha: u8) -> Self {
        let rgb = rng.random_range(0..=0x00FF_FFFF_u32);
        Color((u32::from(alpha) << 24) | rgb)
    }

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// The visual left behind by a correctly answered word.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerLine {
    pub line: GridLine,
    pub color: Color,
}

/// A word hidden in the grid, together with its answer status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsedWord {
    pub id: u32,
    pub string: String,
    pub placement: Placement,
    pub answer_line: Option<AnswerLine>,
}

impl UsedWord {
    pub fn new(id: u32, string: impl Into<String>, placement: Placement) -> Self {
        Self {
            id,
            string: string.into(),
            placement,
            answer_line: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answer_line.is_some()
    }
}

/// Letter matrix, stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Vec<char>>,
}

impl Grid {
    /// Grid of `rows` x `cols` cells all set to `fill`
    pub fn filled(rows: usize, cols: usize, fill: char) -> Self {
        Self {
            cells: vec![vec![fill; cols]; rows],
        }
    }

    /// Build from text rows. All rows must have the same length.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let cells: Vec<Vec<char>> = rows
            .iter()
            .map(|row| row.as_ref().chars().map(|c| c.to_ascii_uppercase()).collect())
            .collect();
        let width = cells.first().map(Vec::len)?;
        if width == 0 || cells.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Self { cells })
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn col_count(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.row_count() && pos.col < self.col_count()
    }

    pub fn get(&self, pos: Position) -> Option<char> {
        self.cells.get(pos.row)?.get(pos.col).copied()
    }

    pub fn set(&mut self, pos: Position, letter: char) {
        if let Some(cell) = self
            .cells
            .get_mut(pos.row)
            .and_then(|row| row.get_mut(pos.col))
        {
            *cell = letter;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.cells.iter().map(|row| row.iter().collect())
    }

    /// Letters read along a placement, if it lies inside the grid
    pub fn read(&self, placement: &Placement) -> Option<String> {
        if !placement.fits(self.row_count(), self.col_count()) {
            return None;
        }
        placement.positions().map(|pos| self.get(pos)).collect()
    }
}

/// A round: grid, hidden words and clock state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameData {
    pub id: RoundId,
    pub name: String,
    pub theme_id: i32,
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
    pub grid: Grid,
    /// Display order
    pub used_words: Vec<UsedWord>,
    /// Maximum play time in seconds, only enforced in countdown mode
    pub max_duration: u32,
    /// Elapsed play time in seconds
    pub duration: u32,
    pub created_at: DateTime<Utc>,
}

impl GameData {
    pub fn row_count(&self) -> usize {
        self.grid.row_count()
    }

    pub fn col_count(&self) -> usize {
        self.grid.col_count()
    }

    pub fn remaining_duration(&self) -> u32 {
        self.max_duration.saturating_sub(self.duration)
    }

    pub fn answered_words_count(&self) -> usize {
        self.used_words.iter().filter(|w| w.is_answered()).count()
    }

    pub fn is_finished(&self) -> bool {
        self.used_words.iter().all(UsedWord::is_answered)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_mode == GameMode::CountDown
            && self.remaining_duration() == 0
            && !self.is_finished()
    }

    pub fn used_word(&self, id: u32) -> Option<&UsedWord> {
        self.used_words.iter().find(|w| w.id == id)
    }
}

/// Mask used by hidden mode to show a word's length but not its letters.
pub fn hidden_mask(word: &str, mask: char) -> String {
    word.chars().map(|_| mask).collect()
}
