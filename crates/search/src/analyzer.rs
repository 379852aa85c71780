//! Text analyzers
//!
//! Two variants, applied identically at index and query time:
//!
//! - `Standard`: UAX#29 word boundaries → strip non-alphanumerics → lowercase.
//!   No stopwords and no stemming: terminology text ("Vitamin A") needs
//!   every word and prefix search needs the surface form.
//! - `Whitespace`: split on whitespace only, case preserved. Used for
//!   identifiers (UUIDs, nids, booleans) and for whole-word string matches.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenization variant of a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Analyzer {
    /// Word-splitting, lowercasing
    Standard,
    /// Whitespace-splitting, case-preserving
    Whitespace,
}

impl Analyzer {
    /// Split text into index terms
    ///
    /// # Example
    ///
    /// ```
    /// use termstore_search::Analyzer;
    ///
    /// assert_eq!(Analyzer::Standard.tokens("Hello, World!"), vec!["hello", "world"]);
    /// assert_eq!(Analyzer::Whitespace.tokens("Hello, World!"), vec!["Hello,", "World!"]);
    /// ```
    pub fn tokens(&self, text: &str) -> Vec<String> {
        match self {
            Analyzer::Standard => text
                .unicode_words()
                .map(|w| {
                    w.chars()
                        .filter(|c| c.is_alphanumeric())
                        .flat_map(char::to_lowercase)
                        .collect::<String>()
                })
                .filter(|w| !w.is_empty())
                .collect(),
            Analyzer::Whitespace => text.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Normalize a single query term the way `tokens` would
    ///
    /// Returns every term the word produces; a word may split into several
    /// under `Standard` (e.g. a hyphenated UUID).
    pub fn query_terms(&self, word: &str) -> Vec<String> {
        self.tokens(word)
    }
}
