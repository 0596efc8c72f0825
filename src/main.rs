use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordsearch::{
    config::Config,
    db::{self, GameDataRepository, MemoryRepository, PgRepository},
    dictionary::WordBank,
    models::{hidden_mask, GameData, GameMode, GridLine, Position},
    session::{GameSession, GameState, SessionHandle},
    utils::format_duration,
};

/// Character shown in place of letters of unanswered words in hidden mode
const HIDDEN_MASK: char = '?';

/// A line typed by the player
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlayerCommand {
    Answer { word: String, line: GridLine },
    Pause,
    Resume,
    Words,
    Quit,
}

fn parse_command(input: &str) -> Option<PlayerCommand> {
    let mut parts = input.split_whitespace();
    let command = parts.next()?.to_ascii_lowercase();

    match command.as_str() {
        "answer" | "a" => {
            let word = parts.next()?.to_string();
            let coords: Vec<usize> = parts
                .map(str::parse::<usize>)
                .collect::<Result<_, _>>()
                .ok()?;
            let &[r1, c1, r2, c2] = coords.as_slice() else {
                return None;
            };
            Some(PlayerCommand::Answer {
                word,
                line: GridLine::new(Position::new(r1, c1), Position::new(r2, c2)),
            })
        }
        "pause" => Some(PlayerCommand::Pause),
        "resume" => Some(PlayerCommand::Resume),
        "words" | "w" => Some(PlayerCommand::Words),
        "quit" | "q" | "exit" => Some(PlayerCommand::Quit),
        _ => None,
    }
}

/// Grid rows prefixed with their index, plus a header of column indexes
fn render_grid(game: &GameData) -> String {
    let header: String = (0..game.col_count()).map(|c| format!("{:>3}", c)).collect();
    let mut out = format!("    {}\n", header);
    for (r, row) in game.grid.rows().enumerate() {
        let cells: String = row.chars().map(|c| format!("{:>3}", c)).collect();
        out.push_str(&format!("{:>3} {}\n", r, cells));
    }
    out
}

/// One chip per hidden word; unanswered words are masked in hidden mode
fn render_words(game: &GameData) -> String {
    game.used_words
        .iter()
        .map(|word| {
            if word.is_answered() {
                format!("[{}]", word.string)
            } else if game.game_mode == GameMode::Hidden {
                hidden_mask(&word.string, HIDDEN_MASK)
            } else {
                word.string.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

async fn create_repository(config: &Config) -> Result<Arc<dyn GameDataRepository>> {
    let Some(database) = &config.database else {
        tracing::info!("DATABASE_URL not set, keeping rounds in memory");
        return Ok(Arc::new(MemoryRepository::new()));
    };

    let pool = db::create_pool(&database.url, database.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    Ok(Arc::new(PgRepository::new(pool)))
}

async fn load_word_bank(config: &Config) -> WordBank {
    let Some(path) = &config.game.word_bank_path else {
        return WordBank::builtin();
    };

    match WordBank::load(path).await {
        Ok(bank) if !bank.is_empty() => bank,
        Ok(_) => {
            tracing::warn!("Word bank {} has no themes. Using builtin themes.", path);
            WordBank::builtin()
        }
        Err(e) => {
            tracing::warn!("Failed to load word bank: {:#}. Using builtin themes.", e);
            WordBank::builtin()
        }
    }
}

/// Log session events as they arrive
fn spawn_event_loggers(handle: &SessionHandle) {
    let mut states = handle.on_game_state();
    tokio::spawn(async move {
        while let Some(state) = states.recv().await {
            match state {
                GameState::Generating { row_count, col_count } => {
                    tracing::info!("Generating a {}x{} puzzle...", row_count, col_count)
                }
                GameState::Loading { round_id } => tracing::info!("Loading round {}...", round_id),
                GameState::Playing { game } => {
                    println!("\n{}\n{}\n{}", game.name, render_grid(&game), render_words(&game));
                }
                GameState::Paused => println!("Paused. Type 'resume' to continue."),
                GameState::Finished { game } => println!(
                    "All {} words found in {}!",
                    game.used_words.len(),
                    format_duration(game.duration)
                ),
                GameState::GameOver { game } => println!(
                    "Time is up! {}/{} words found.",
                    game.answered_words_count(),
                    game.used_words.len()
                ),
            }
        }
    });

    let mut count_down = handle.on_count_down();
    tokio::spawn(async move {
        while let Some(remaining) = count_down.recv().await {
            if remaining <= 10 || remaining % 30 == 0 {
                println!("{} left", format_duration(remaining));
            }
        }
    });

    let mut timer = handle.on_timer();
    tokio::spawn(async move {
        while let Some(elapsed) = timer.recv().await {
            tracing::trace!("Elapsed {}", format_duration(elapsed));
        }
    });

    let mut answers = handle.on_answer_result();
    tokio::spawn(async move {
        while let Some(result) = answers.recv().await {
            match result.used_word {
                Some(word) if result.correct => {
                    println!("Found {} ({} so far)", word.string, result.total_answered)
                }
                _ => println!("Not a hidden word"),
            }
        }
    });
}

async fn start_round(handle: &SessionHandle, config: &Config) -> Result<()> {
    match config.game.round_id {
        Some(id) => handle.load_game_round(id).await?,
        None => {
            let id = handle.generate_new_game_round(config.default_round()).await?;
            tracing::info!("Started round {}", id);
        }
    }
    Ok(())
}

fn print_words(handle: &SessionHandle) {
    let game = match handle.current_state() {
        Some(GameState::Playing { game })
        | Some(GameState::Finished { game })
        | Some(GameState::GameOver { game }) => game,
        Some(GameState::Paused) => {
            println!("Words are hidden while paused");
            return;
        }
        _ => {
            println!("No round in play");
            return;
        }
    };

    for word in &game.used_words {
        match &word.answer_line {
            Some(answer) => {
                let GridLine { start, end } = answer.line;
                println!(
                    "  {} ({},{}) -> ({},{})",
                    word.string, start.row, start.col, end.row, end.col
                )
            }
            None if game.game_mode == GameMode::Hidden => {
                println!("  {}", hidden_mask(&word.string, HIDDEN_MASK))
            }
            None => println!("  {}", word.string),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordsearch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting word search...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let repository = create_repository(&config).await?;
    let word_bank = Arc::new(load_word_bank(&config).await);

    let handle = GameSession::spawn(repository, word_bank, config.session_config());
    spawn_event_loggers(&handle);
    start_round(&handle, &config).await?;

    println!("Commands: answer WORD r1 c1 r2 c2 | pause | resume | words | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_command(&line) else {
            println!("Unknown command: {}", line.trim());
            continue;
        };

        match command {
            PlayerCommand::Answer { word, line } => {
                handle
                    .answer_word(word, line, config.game.reverse_matching)
                    .await?;
            }
            PlayerCommand::Pause => handle.pause_game().await?,
            PlayerCommand::Resume => handle.resume_game().await?,
            PlayerCommand::Words => print_words(&handle),
            PlayerCommand::Quit => break,
        }
    }

    handle.stop_game().await?;
    tracing::info!("Session saved, bye");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordsearch::models::{Difficulty, Direction, Grid, Placement, UsedWord};

    #[test]
    fn test_parse_answer_command() {
        let command = parse_command("answer cat 0 0 0 2").unwrap();
        assert_eq!(
            command,
            PlayerCommand::Answer {
                word: "cat".to_string(),
                line: GridLine::new(Position::new(0, 0), Position::new(0, 2)),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_command("answer cat 0 0 0"), None);
        assert_eq!(parse_command("answer cat 0 0 0 x"), None);
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("PAUSE"), Some(PlayerCommand::Pause));
        assert_eq!(parse_command("resume"), Some(PlayerCommand::Resume));
        assert_eq!(parse_command("w"), Some(PlayerCommand::Words));
        assert_eq!(parse_command("quit"), Some(PlayerCommand::Quit));
    }

    #[test]
    fn test_hidden_words_are_masked() {
        let game = GameData {
            id: 1,
            name: "Hidden".to_string(),
            theme_id: 1,
            game_mode: GameMode::Hidden,
            difficulty: Difficulty::Easy,
            grid: Grid::from_rows(&["CAT", "XXX", "XXX"]).unwrap(),
            used_words: vec![UsedWord::new(
                0,
                "CAT",
                Placement::new(Position::new(0, 0), Direction::East, 3),
            )],
            max_duration: 30,
            duration: 0,
            created_at: chrono::Utc::now(),
        };

        assert_eq!(render_words(&game), "???");
        assert!(render_grid(&game).contains("  C  A  T"));
    }
}
