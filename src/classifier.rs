//! Sentiment classification over the shared backend.

use crate::error::{Result, XaiError};
use crate::model::{Padding, SentimentBackend};
use crate::scoring::softmax;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Binary sentiment label. The checkpoint has no neutral class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    /// `Positive` only when strictly above one half.
    pub fn from_positive_probability(p: f64) -> Self {
        if p > 0.5 {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Negative => "Negative",
            Label::Positive => "Positive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label together with the probabilities it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentPrediction {
    pub label: Label,
    /// `[P(negative), P(positive)]`
    pub probabilities: [f64; 2],
}

impl SentimentPrediction {
    /// Probability of the predicted label
    pub fn confidence(&self) -> f64 {
        match self.label {
            Label::Negative => self.probabilities[0],
            Label::Positive => self.probabilities[1],
        }
    }
}

impl fmt::Display for SentimentPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (negative {:.2}%, positive {:.2}%)",
            self.label,
            self.probabilities[0] * 100.0,
            self.probabilities[1] * 100.0
        )
    }
}

/// Text input that may arrive as raw bytes.
pub struct SentimentInput;

impl SentimentInput {
    /// Only UTF-8 text can be tokenized.
    pub fn from_bytes(bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| XaiError::Input(format!("input is not valid UTF-8: {}", e)))
    }
}

/// Classifies one text per call with a single forward pass.
pub struct SentimentClassifier<M: ?Sized> {
    model: Arc<M>,
    max_length: usize,
}

impl<M: SentimentBackend + ?Sized> SentimentClassifier<M> {
    pub fn new(model: Arc<M>, max_length: usize) -> Self {
        Self { model, max_length }
    }

    /// Predict the label of `text`.
    ///
    /// Empty or whitespace-only input is not rejected; it is classified from
    /// whatever the tokenizer makes of it.
    pub fn classify(&self, text: &str) -> Result<Label> {
        Ok(self.predict(text)?.label)
    }

    pub fn predict(&self, text: &str) -> Result<SentimentPrediction> {
        let batch = [text.to_string()];
        let logits = self.model.logits(
            &batch,
            Padding::Longest {
                max_length: self.max_length,
            },
        )?;
        let first = logits
            .first()
            .ok_or_else(|| XaiError::Inference("model returned no logits".to_string()))?;

        let probabilities = softmax(first);
        let prediction = SentimentPrediction {
            label: Label::from_positive_probability(probabilities[1]),
            probabilities,
        };
        tracing::debug!(label = %prediction.label, p_positive = probabilities[1], "classified");
        Ok(prediction)
    }
}
