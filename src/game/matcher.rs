use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::mapper::StreakLineMapper;
use crate::models::{AnswerLine, Color, GameData, GridLine, UsedWord};

/// Alpha channel given to answer line colors
pub const ANSWER_LINE_ALPHA: u8 = 170;

/// Outcome of checking one candidate answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    pub correct: bool,
    /// The word that was just answered, when `correct`
    pub used_word: Option<UsedWord>,
    pub total_answered: usize,
}

impl AnswerResult {
    pub fn rejected(total_answered: usize) -> Self {
        Self {
            correct: false,
            used_word: None,
            total_answered,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordMatcher {
    mapper: StreakLineMapper,
}

impl WordMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a candidate answer against the round's unanswered words.
    ///
    /// A match marks the word answered and assigns it a line color. A miss
    /// leaves `game` untouched.
    pub fn answer(
        &self,
        game: &mut GameData,
        candidate: &str,
        line: &GridLine,
        reverse_matching: bool,
        rng: &mut impl Rng,
    ) -> AnswerResult {
        let matched = game.used_words.iter().position(|word| {
            !word.is_answered()
                && Self::string_matches(&word.string, candidate, reverse_matching)
                && self.line_matches(word, line, reverse_matching)
        });

        let Some(index) = matched else {
            return AnswerResult::rejected(game.answered_words_count());
        };

        let word = &mut game.used_words[index];
        word.answer_line = Some(AnswerLine {
            line: *line,
            color: Color::random_with_alpha(rng, ANSWER_LINE_ALPHA),
        });
        let used_word = word.clone();

        AnswerResult {
            correct: true,
            used_word: Some(used_word),
            total_answered: game.answered_words_count(),
        }
    }

    fn string_matches(target: &str, candidate: &str, reverse_matching: bool) -> bool {
        if target.eq_ignore_ascii_case(candidate) {
            return true;
        }
        reverse_matching && {
            let reversed: String = candidate.chars().rev().collect();
            target.eq_ignore_ascii_case(&reversed)
        }
    }

    fn line_matches(&self, word: &UsedWord, line: &GridLine, reverse_matching: bool) -> bool {
        let Some(forward) = self.mapper.to_geometry(&word.placement) else {
            return false;
        };
        *line == forward || (reverse_matching && *line == forward.reversed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Direction, GameMode, Grid, Placement, Position};
    use chrono::Utc;

    fn sample_game() -> GameData {
        let grid = Grid::from_rows(&["CATX", "ODXX", "WXOX", "XXXG"]).unwrap();
        GameData {
            id: 1,
            name: "Sample".to_string(),
            theme_id: 1,
            game_mode: GameMode::Normal,
            difficulty: Difficulty::Easy,
            grid,
            used_words: vec![
                UsedWord::new(0, "CAT", Placement::new(Position::new(0, 0), Direction::East, 3)),
                UsedWord::new(1, "COW", Placement::new(Position::new(0, 0), Direction::South, 3)),
                UsedWord::new(2, "DOG", Placement::new(Position::new(1, 1), Direction::SouthEast, 3)),
            ],
            max_duration: 60,
            duration: 0,
            created_at: Utc::now(),
        }
    }

    fn line_of(game: &GameData, id: u32) -> GridLine {
        StreakLineMapper
            .to_geometry(&game.used_word(id).unwrap().placement)
            .unwrap()
    }

    #[test]
    fn test_every_placement_answers_exactly_once() {
        let matcher = WordMatcher::new();
        let mut game = sample_game();
        let mut rng = rand::rng();

        for id in 0..3 {
            let word = game.used_word(id).unwrap().string.clone();
            let line = line_of(&game, id);

            let first = matcher.answer(&mut game, &word, &line, false, &mut rng);
            assert!(first.correct, "first answer of {} should be correct", word);
            assert_eq!(first.used_word.as_ref().map(|w| w.id), Some(id));

            let second = matcher.answer(&mut game, &word, &line, false, &mut rng);
            assert!(!second.correct, "second answer of {} should be rejected", word);
            assert_eq!(second.total_answered, first.total_answered);
        }
        assert!(game.is_finished());
    }

    #[test]
    fn test_reverse_line_needs_reverse_matching() {
        let matcher = WordMatcher::new();
        let mut game = sample_game();
        let mut rng = rand::rng();
        let reversed = line_of(&game, 2).reversed();

        let result = matcher.answer(&mut game, "DOG", &reversed, false, &mut rng);
        assert!(!result.correct);
        assert_eq!(game.answered_words_count(), 0);

        let result = matcher.answer(&mut game, "DOG", &reversed, true, &mut rng);
        assert!(result.correct);
        assert_eq!(result.total_answered, 1);
    }

    #[test]
    fn test_reversed_spelling_accepted_with_reverse_matching() {
        let matcher = WordMatcher::new();
        let mut game = sample_game();
        let mut rng = rand::rng();
        let reversed = line_of(&game, 0).reversed();

        assert!(!matcher.answer(&mut game, "TAC", &reversed, false, &mut rng).correct);
        assert!(matcher.answer(&mut game, "TAC", &reversed, true, &mut rng).correct);
    }

    #[test]
    fn test_case_insensitive_match_sets_answer_line() {
        let matcher = WordMatcher::new();
        let mut game = sample_game();
        let mut rng = rand::rng();
        let line = line_of(&game, 1);

        let result = matcher.answer(&mut game, "cow", &line, false, &mut rng);
        assert!(result.correct);

        let answered = game.used_word(1).unwrap();
        let answer_line = answered.answer_line.unwrap();
        assert_eq!(answer_line.line, line);
        assert_eq!(answer_line.color.alpha(), ANSWER_LINE_ALPHA);
    }

    #[test]
    fn test_wrong_line_or_word_does_not_mutate() {
        let matcher = WordMatcher::new();
        let mut game = sample_game();
        let before = game.clone();
        let mut rng = rand::rng();

        let cat_line = line_of(&game, 0);
        let result = matcher.answer(&mut game, "COW", &cat_line, true, &mut rng);
        assert_eq!(result, AnswerResult::rejected(0));

        let result = matcher.answer(&mut game, "HORSE", &cat_line, true, &mut rng);
        assert!(!result.correct);
        assert_eq!(game, before);
    }
}
