use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// A named list of words a puzzle can be built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Theme {
    pub id: i32,
    pub name: String,
    pub words: Vec<String>,
}

/// Themed word lists, keyed by theme id.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    themes: BTreeMap<i32, Theme>,
}

impl WordBank {
    /// Load themes from a JSON file holding an array of `{id, name, words}`
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read word bank {}", path.display()))?;
        let themes: Vec<Theme> =
            serde_json::from_str(&content).context("Word bank is not valid JSON")?;

        let bank = Self::from_themes(themes);
        tracing::info!(
            "Loaded {} themes ({} words) into word bank",
            bank.len(),
            bank.word_count()
        );

        Ok(bank)
    }

    /// Build a bank, normalizing words to uppercase and dropping anything
    /// that is not at least two ASCII letters
    pub fn from_themes(themes: impl IntoIterator<Item = Theme>) -> Self {
        let themes = themes
            .into_iter()
            .map(|theme| {
                let mut words: Vec<String> = theme
                    .words
                    .iter()
                    .map(|word| word.trim().to_uppercase())
                    .filter(|word| word.len() >= 2 && word.chars().all(|c| c.is_ascii_alphabetic()))
                    .collect();
                words.sort();
                words.dedup();
                (theme.id, Theme { words, ..theme })
            })
            .collect();

        Self { themes }
    }

    /// Themes shipped with the binary
    pub fn builtin() -> Self {
        let theme = |id: i32, name: &str, words: &[&str]| Theme {
            id,
            name: name.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
        };

        Self::from_themes([
            theme(
                1,
                "Animals",
                &[
                    "cat", "dog", "horse", "tiger", "lion", "zebra", "monkey", "rabbit",
                    "turtle", "eagle", "shark", "whale", "giraffe", "camel", "otter",
                    "panda", "koala", "moose", "beaver", "falcon",
                ],
            ),
            theme(
                2,
                "Fruits",
                &[
                    "apple", "banana", "cherry", "grape", "lemon", "mango", "melon",
                    "orange", "papaya", "peach", "pear", "plum", "kiwi", "guava", "lime",
                    "apricot", "coconut", "durian",
                ],
            ),
            theme(
                3,
                "Colors",
                &[
                    "red", "blue", "green", "yellow", "purple", "orange", "black", "white",
                    "brown", "pink", "cyan", "magenta", "violet", "indigo", "maroon",
                    "olive", "silver", "gold",
                ],
            ),
            theme(
                4,
                "Countries",
                &[
                    "brazil", "canada", "chile", "china", "egypt", "france", "germany",
                    "india", "italy", "japan", "kenya", "mexico", "norway", "peru",
                    "spain", "sweden", "turkey", "vietnam",
                ],
            ),
        ])
    }

    /// Create an empty word bank (for testing)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn theme(&self, id: i32) -> Option<&Theme> {
        self.themes.get(&id)
    }

    pub fn themes(&self) -> impl Iterator<Item = &Theme> {
        self.themes.values()
    }

    /// Number of themes
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.themes.values().map(|t| t.words.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_word_bank() {
        let bank = WordBank::empty();
        assert!(bank.is_empty());
        assert!(bank.theme(1).is_none());
    }

    #[test]
    fn test_words_are_normalized() {
        let bank = WordBank::from_themes([Theme {
            id: 7,
            name: "Mixed".to_string(),
            words: vec![
                " owl ".to_string(),
                "Owl".to_string(),
                "x".to_string(),
                "sea-lion".to_string(),
                "yak".to_string(),
            ],
        }]);

        let theme = bank.theme(7).unwrap();
        assert_eq!(theme.words, vec!["OWL".to_string(), "YAK".to_string()]);
    }

    #[test]
    fn test_builtin_themes_present() {
        let bank = WordBank::builtin();
        assert_eq!(bank.len(), 4);
        assert!(bank.theme(1).unwrap().words.contains(&"TIGER".to_string()));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("wordsearch-bank-{}.json", std::process::id()));
        let json = r#"[{"id": 3, "name": "Birds", "words": ["robin", "wren"]}]"#;
        fs::write(&path, json).await.unwrap();

        let bank = WordBank::load(&path).await.unwrap();
        let _ = fs::remove_file(&path).await;

        assert_eq!(bank.len(), 1);
        assert_eq!(bank.theme(3).unwrap().name, "Birds");
        assert_eq!(bank.word_count(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = WordBank::load("/definitely/not/here.json").await;
        assert!(result.is_err());
    }
}
