//! Word features of a text for the local surrogate explainer.
//!
//! The text is cut at non-word runs; the separators are kept so that a text
//! with some words removed can be rebuilt from the remaining pieces. Features
//! are distinct words (bag of words) in order of first appearance, and
//! removing a feature removes every occurrence of that word.

use regex::Regex;
use std::collections::HashMap;

/// Pattern separating words.
pub const WORD_SPLIT: &str = r"\W+";

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    /// Feature index for words, `None` for separators
    feature: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct IndexedString {
    raw: String,
    pieces: Vec<Piece>,
    words: Vec<String>,
}

impl IndexedString {
    pub fn new(text: &str, splitter: &Regex) -> Self {
        let mut pieces = Vec::new();
        let mut words: Vec<String> = Vec::new();
        let mut vocab: HashMap<String, usize> = HashMap::new();

        let mut push_word = |word: &str, pieces: &mut Vec<Piece>| {
            if word.is_empty() {
                return;
            }
            let feature = *vocab.entry(word.to_string()).or_insert_with(|| {
                words.push(word.to_string());
                words.len() - 1
            });
            pieces.push(Piece {
                text: word.to_string(),
                feature: Some(feature),
            });
        };

        let mut cursor = 0;
        for sep in splitter.find_iter(text) {
            push_word(&text[cursor..sep.start()], &mut pieces);
            pieces.push(Piece {
                text: sep.as_str().to_string(),
                feature: None,
            });
            cursor = sep.end();
        }
        push_word(&text[cursor..], &mut pieces);

        Self {
            raw: text.to_string(),
            pieces,
            words,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of distinct words.
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    pub fn word(&self, feature: usize) -> &str {
        &self.words[feature]
    }

    /// Rebuild the text without the given features.
    pub fn without(&self, removed: &[usize]) -> String {
        let mut drop = vec![false; self.words.len()];
        for &feature in removed {
            drop[feature] = true;
        }
        self.pieces
            .iter()
            .filter(|p| !p.feature.is_some_and(|f| drop[f]))
            .map(|p| p.text.as_str())
            .collect()
    }
}
