use std::cmp::Reverse;

use chrono::Utc;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    dictionary::WordBank,
    error::GenerationError,
    models::{Difficulty, Direction, GameData, GameMode, Grid, Placement, Position, UsedWord, MAX_GRID_SIZE},
    utils::letters::random_letter,
};

/// Default cap on placement candidates tried per generation
pub const DEFAULT_MAX_ATTEMPTS: usize = 5_000;

const EMPTY_CELL: char = '\0';

/// Everything needed to build a new round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRequest {
    pub rows: usize,
    pub cols: usize,
    pub theme_id: i32,
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Each (start, direction) candidate tried for any word costs one attempt
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PuzzleGenerator {
    config: GeneratorConfig,
}

impl PuzzleGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Build a new round: pick theme words, hide them in the grid and fill the
    /// remaining cells with weighted random letters
    pub fn generate<R: Rng>(
        &self,
        request: &RoundRequest,
        bank: &WordBank,
        rng: &mut R,
    ) -> Result<GameData, GenerationError> {
        let (rows, cols) = (request.rows, request.cols);
        if !(2..=MAX_GRID_SIZE).contains(&rows) || !(2..=MAX_GRID_SIZE).contains(&cols) {
            return Err(GenerationError::InvalidDimensions {
                rows,
                cols,
                max: MAX_GRID_SIZE,
            });
        }

        let theme = bank
            .theme(request.theme_id)
            .ok_or(GenerationError::UnknownTheme(request.theme_id))?;

        let words = Self::select_words(&theme.words, request, rng);
        if words.is_empty() {
            return Err(GenerationError::NoWordsFit {
                theme_id: request.theme_id,
                rows,
                cols,
            });
        }

        let (mut grid, placements) =
            self.place_words(rows, cols, &words, request.difficulty.directions(), rng)?;
        Self::fill_empty_cells(&mut grid, rng);

        let used_words: Vec<UsedWord> = words
            .into_iter()
            .zip(placements)
            .enumerate()
            .map(|(id, (word, placement))| UsedWord::new(id as u32, word, placement))
            .collect();

        tracing::debug!(
            "Generated {}x{} grid with {} words for theme {}",
            rows,
            cols,
            used_words.len(),
            theme.name
        );

        Ok(GameData {
            id: 0,
            name: format!("{} {}x{}", theme.name, rows, cols),
            theme_id: theme.id,
            game_mode: request.game_mode,
            difficulty: request.difficulty,
            grid,
            max_duration: used_words.len() as u32 * request.difficulty.seconds_per_word(),
            used_words,
            duration: 0,
            created_at: Utc::now(),
        })
    }

    /// Hide every word in an empty `rows` x `cols` grid.
    ///
    /// Words are placed longest first with backtracking. Placements only share
    /// cells holding the same letter. Returns the placements in the order of
    /// `words`; unused cells are left empty (`'\0'`).
    pub fn place_words<R: Rng>(
        &self,
        rows: usize,
        cols: usize,
        words: &[String],
        directions: &[Direction],
        rng: &mut R,
    ) -> Result<(Grid, Vec<Placement>), GenerationError> {
        let letters: Vec<Vec<char>> = words
            .iter()
            .map(|w| w.chars().map(|c| c.to_ascii_uppercase()).collect())
            .collect();
        let mut order: Vec<usize> = (0..letters.len()).collect();
        order.sort_by_key(|&i| Reverse(letters[i].len()));

        let mut grid = Grid::filled(rows, cols, EMPTY_CELL);
        let mut placed = vec![None; letters.len()];
        let mut budget = self.config.max_attempts;

        let mut search = Search {
            grid: &mut grid,
            letters: &letters,
            order: &order,
            directions,
            budget: &mut budget,
            placed: &mut placed,
        };
        if search.place(0, rng) {
            return Ok((grid, placed.into_iter().flatten().collect()));
        }

        let attempts = self.config.max_attempts - budget;
        tracing::warn!(
            "Failed to pack {} words into {}x{} grid after {} attempts",
            words.len(),
            rows,
            cols,
            attempts
        );
        Err(GenerationError::Unpackable {
            word_count: words.len(),
            rows,
            cols,
            attempts,
        })
    }

    fn select_words<R: Rng>(words: &[String], request: &RoundRequest, rng: &mut R) -> Vec<String> {
        let longest = request.rows.max(request.cols);
        let cells = (request.rows * request.cols) as f32;
        let letter_budget = (cells * request.difficulty.fill_density()) as usize;
        let max_words = request.difficulty.max_words();

        let mut pool: Vec<&String> = words.iter().filter(|w| w.len() <= longest).collect();
        pool.shuffle(rng);

        let mut selected: Vec<String> = Vec::new();
        let mut letters = 0;
        for word in pool {
            if selected.len() >= max_words {
                break;
            }
            // The first word is always admitted so small grids still get one
            if !selected.is_empty() && letters + word.len() > letter_budget {
                continue;
            }
            letters += word.len();
            selected.push(word.clone());
        }
        selected
    }

    fn fill_empty_cells<R: Rng>(grid: &mut Grid, rng: &mut R) {
        for row in 0..grid.row_count() {
            for col in 0..grid.col_count() {
                let pos = Position::new(row, col);
                if grid.get(pos) == Some(EMPTY_CELL) {
                    grid.set(pos, random_letter(rng));
                }
            }
        }
    }
}

/// Backtracking state for one `place_words` call
struct Search<'a> {
    grid: &'a mut Grid,
    letters: &'a [Vec<char>],
    order: &'a [usize],
    directions: &'a [Direction],
    budget: &'a mut usize,
    placed: &'a mut [Option<Placement>],
}

impl Search<'_> {
    fn place<R: Rng>(&mut self, depth: usize, rng: &mut R) -> bool {
        let Some(&index) = self.order.get(depth) else {
            return true;
        };
        let letters = self.letters;
        let word = &letters[index];

        let mut candidates = self.candidates(word.len());
        candidates.shuffle(rng);

        for placement in candidates {
            if *self.budget == 0 {
                return false;
            }
            *self.budget -= 1;

            if !self.letters_agree(&placement, word) {
                continue;
            }

            let written = self.write(&placement, word);
            self.placed[index] = Some(placement);
            if self.place(depth + 1, rng) {
                return true;
            }
            self.placed[index] = None;
            for pos in written {
                self.grid.set(pos, EMPTY_CELL);
            }
        }
        false
    }

    fn candidates(&self, length: usize) -> Vec<Placement> {
        let (rows, cols) = (self.grid.row_count(), self.grid.col_count());
        let mut candidates = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                for &direction in self.directions {
                    let placement = Placement::new(Position::new(row, col), direction, length);
                    if placement.fits(rows, cols) {
                        candidates.push(placement);
                    }
                }
            }
        }
        candidates
    }

    fn letters_agree(&self, placement: &Placement, word: &[char]) -> bool {
        placement
            .positions()
            .zip(word)
            .all(|(pos, &letter)| matches!(self.grid.get(pos), Some(c) if c == EMPTY_CELL || c == letter))
    }

    /// Write the word, returning the cells that were empty before
    fn write(&mut self, placement: &Placement, word: &[char]) -> Vec<Position> {
        let mut written = Vec::new();
        for (pos, &letter) in placement.positions().zip(word) {
            if self.grid.get(pos) == Some(EMPTY_CELL) {
                self.grid.set(pos, letter);
                written.push(pos);
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Theme;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn request(rows: usize, cols: usize, difficulty: Difficulty) -> RoundRequest {
        RoundRequest {
            rows,
            cols,
            theme_id: 1,
            game_mode: GameMode::Normal,
            difficulty,
        }
    }

    fn assert_words_readable(game: &GameData) {
        for word in &game.used_words {
            assert_eq!(
                game.grid.read(&word.placement).as_deref(),
                Some(word.string.as_str()),
                "word {} not found at its placement",
                word.string
            );
        }
    }

    #[test]
    fn test_generated_grid_is_complete() {
        let bank = WordBank::builtin();
        let generator = PuzzleGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);

        for (size, difficulty) in [(8, Difficulty::Easy), (10, Difficulty::Medium), (14, Difficulty::Hard)] {
            let game = generator
                .generate(&request(size, size, difficulty), &bank, &mut rng)
                .unwrap();

            assert_eq!(game.row_count(), size);
            assert_eq!(game.col_count(), size);
            assert!(game.grid.rows().all(|row| row.chars().all(|c| c.is_ascii_uppercase())));
            assert!(!game.used_words.is_empty());
            assert!(game.used_words.len() <= difficulty.max_words());
            assert_eq!(
                game.max_duration,
                game.used_words.len() as u32 * difficulty.seconds_per_word()
            );
            assert!(!game.is_finished());
            assert_words_readable(&game);
        }
    }

    #[test]
    fn test_used_word_ids_are_unique() {
        let bank = WordBank::builtin();
        let mut rng = StdRng::seed_from_u64(11);
        let game = PuzzleGenerator::default()
            .generate(&request(12, 12, Difficulty::Medium), &bank, &mut rng)
            .unwrap();

        let ids: HashSet<u32> = game.used_words.iter().map(|w| w.id).collect();
        assert!(game.used_words.len() > 1);
        assert_eq!(ids.len(), game.used_words.len());
    }

    #[test]
    fn test_easy_uses_forward_orthogonal_directions_only() {
        let bank = WordBank::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let game = PuzzleGenerator::default()
                .generate(&request(9, 9, Difficulty::Easy), &bank, &mut rng)
                .unwrap();
            assert!(game
                .used_words
                .iter()
                .all(|w| matches!(w.placement.direction, Direction::East | Direction::South)));
        }
    }

    #[test]
    fn test_overlapping_words_share_letters() {
        let words = vec!["ABCDE".to_string(), "AXYZ".to_string(), "EFGH".to_string()];
        let mut rng = StdRng::seed_from_u64(5);
        let (grid, placements) = PuzzleGenerator::default()
            .place_words(5, 5, &words, &Direction::ALL, &mut rng)
            .unwrap();

        for (word, placement) in words.iter().zip(&placements) {
            assert_eq!(grid.read(placement).as_deref(), Some(word.as_str()));
        }
    }

    #[test]
    fn test_unsatisfiable_packing_fails() {
        let words = vec!["ABCDEFGHIJKLMNOPQRST".to_string()];
        let mut rng = StdRng::seed_from_u64(1);
        let result = PuzzleGenerator::default().place_words(3, 3, &words, &Direction::ALL, &mut rng);

        assert!(matches!(
            result,
            Err(GenerationError::Unpackable { word_count: 1, rows: 3, cols: 3, .. })
        ));
    }

    #[test]
    fn test_attempt_budget_is_enforced() {
        // Five distinct 3-letter words cannot all fit a 3x3 grid with only East
        let words: Vec<String> = ["ABC", "DEF", "GHI", "JKL", "MNO"]
            .iter()
            .map(|w| w.to_string())
            .collect();
        let generator = PuzzleGenerator::new(GeneratorConfig { max_attempts: 50 });
        let mut rng = StdRng::seed_from_u64(2);

        match generator.place_words(3, 3, &words, &[Direction::East], &mut rng) {
            Err(GenerationError::Unpackable { attempts, .. }) => assert!(attempts <= 50),
            other => panic!("expected Unpackable, got {:?}", other),
        }
    }

    #[test]
    fn test_long_theme_word_in_tiny_grid_fails() {
        let bank = WordBank::from_themes([Theme {
            id: 1,
            name: "Long".to_string(),
            words: vec!["ABCDEFGHIJKLMNOPQRST".to_string()],
        }]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = PuzzleGenerator::default().generate(&request(3, 3, Difficulty::Hard), &bank, &mut rng);

        assert_eq!(
            result,
            Err(GenerationError::NoWordsFit { theme_id: 1, rows: 3, cols: 3 })
        );
    }

    #[test]
    fn test_invalid_request_rejected() {
        let bank = WordBank::builtin();
        let generator = PuzzleGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            generator.generate(&request(1, 8, Difficulty::Easy), &bank, &mut rng),
            Err(GenerationError::InvalidDimensions { .. })
        ));

        let unknown = RoundRequest { theme_id: 99, ..request(8, 8, Difficulty::Easy) };
        assert_eq!(
            generator.generate(&unknown, &bank, &mut rng),
            Err(GenerationError::UnknownTheme(99))
        );
    }
}
