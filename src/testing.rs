//! In-crate test doubles.

use crate::error::{Result, XaiError};
use crate::model::{Logits, Padding, SentimentBackend, TokenSpan, Tokenize};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

/// Word-weight lexicon posing as a two-class model.
///
/// The positive log-odds of a text is the sum of its word weights, so every
/// word contributes additively. `[MASK]` and unknown words weigh nothing.
pub struct LexiconBackend {
    weights: HashMap<&'static str, f64>,
    token_re: Regex,
    paddings: Mutex<Vec<Padding>>,
    calls: Mutex<usize>,
    fail_after: Option<usize>,
}

impl LexiconBackend {
    pub fn new() -> Self {
        let weights = [
            ("love", 3.0),
            ("great", 2.0),
            ("good", 1.0),
            ("fine", 0.5),
            ("bad", -2.0),
            ("awful", -3.0),
            ("terrible", -4.0),
            ("not", -0.5),
        ]
        .into_iter()
        .collect();

        Self {
            weights,
            token_re: Regex::new(r"\[MASK\]|\w+|[^\w\s]").unwrap(),
            paddings: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
            fail_after: None,
        }
    }

    /// Backend whose forward passes fail once `calls` have succeeded.
    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::new()
        }
    }

    pub fn paddings(&self) -> Vec<Padding> {
        self.paddings.lock().unwrap().clone()
    }

    pub fn weight(&self, word: &str) -> f64 {
        self.weights.get(word).copied().unwrap_or(0.0)
    }

    fn log_odds(&self, text: &str) -> f64 {
        self.token_re
            .find_iter(text)
            .map(|m| self.weight(&m.as_str().to_lowercase()))
            .sum()
    }
}

impl Tokenize for LexiconBackend {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>> {
        Ok(self
            .token_re
            .find_iter(text)
            .map(|m| TokenSpan {
                text: m.as_str().to_lowercase(),
                start: m.start(),
                end: m.end(),
            })
            .collect())
    }

    fn mask_token(&self) -> &str {
        "[MASK]"
    }
}

impl SentimentBackend for LexiconBackend {
    fn logits(&self, texts: &[String], padding: Padding) -> Result<Vec<Logits>> {
        let mut calls = self.calls.lock().unwrap();
        if self.fail_after.is_some_and(|limit| *calls >= limit) {
            return Err(XaiError::Inference("backend went away".to_string()));
        }
        *calls += 1;
        self.paddings.lock().unwrap().push(padding);

        Ok(texts
            .iter()
            .map(|t| {
                let s = self.log_odds(t);
                [-s / 2.0, s / 2.0]
            })
            .collect())
    }

    fn device(&self) -> String {
        "Lexicon".to_string()
    }
}

/// Backend that always yields equal logits.
pub struct UndecidedBackend;

impl Tokenize for UndecidedBackend {
    fn tokenize(&self, _text: &str) -> Result<Vec<TokenSpan>> {
        Ok(Vec::new())
    }

    fn mask_token(&self) -> &str {
        "[MASK]"
    }
}

impl SentimentBackend for UndecidedBackend {
    fn logits(&self, texts: &[String], _padding: Padding) -> Result<Vec<Logits>> {
        Ok(vec![[0.25, 0.25]; texts.len()])
    }

    fn device(&self) -> String {
        "Undecided".to_string()
    }
}
