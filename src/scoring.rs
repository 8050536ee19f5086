//! Scoring functions shared by the classifier and the explainers.
//!
//! The explainers never see the model directly. They call a scoring function
//! on batches of (perturbed) texts:
//!
//! - [`LogOddsScorer`] returns the positive-class log-odds, an unbounded score
//!   suited to additive attribution.
//! - [`ProbabilityScorer`] returns `[P(negative), P(positive)]` per text.

use crate::error::Result;
use crate::model::{Logits, Padding, SentimentBackend};
use std::sync::Arc;

/// Maps a batch of texts to one real-valued score each.
pub trait ScoreFunction {
    fn score(&self, texts: &[String]) -> Result<Vec<f64>>;
}

/// Maps a batch of texts to a two-class probability row each.
pub trait ProbabilityFunction {
    fn predict_proba(&self, texts: &[String]) -> Result<Vec<[f64; 2]>>;
}

impl<F> ScoreFunction for F
where
    F: Fn(&[String]) -> Result<Vec<f64>>,
{
    fn score(&self, texts: &[String]) -> Result<Vec<f64>> {
        self(texts)
    }
}

impl<F> ProbabilityFunction for F
where
    F: Fn(&[String]) -> Result<Vec<[f64; 2]>>,
{
    fn predict_proba(&self, texts: &[String]) -> Result<Vec<[f64; 2]>> {
        self(texts)
    }
}

/// Numerically stable two-class softmax.
pub fn softmax(logits: &Logits) -> [f64; 2] {
    let max = logits[0].max(logits[1]);
    let e0 = (logits[0] - max).exp();
    let e1 = (logits[1] - max).exp();
    let sum = e0 + e1;
    [e0 / sum, e1 / sum]
}

/// `ln(p / (1 - p))`; infinite at 0 and 1.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Log-odds of the positive class.
///
/// Equal to `logit(softmax(logits)[1])`, computed as the logit difference so
/// that saturated probabilities stay finite.
pub fn positive_log_odds(logits: &Logits) -> f64 {
    logits[1] - logits[0]
}

/// Positive-class log-odds over fixed-length inputs.
///
/// Every text is padded/truncated to the same `length`, independent of the
/// text itself, so that all perturbed variants share one tensor shape.
pub struct LogOddsScorer<M: ?Sized> {
    model: Arc<M>,
    length: usize,
}

impl<M: SentimentBackend + ?Sized> LogOddsScorer<M> {
    pub fn new(model: Arc<M>, length: usize) -> Self {
        Self { model, length }
    }
}

impl<M: SentimentBackend + ?Sized> ScoreFunction for LogOddsScorer<M> {
    fn score(&self, texts: &[String]) -> Result<Vec<f64>> {
        let logits = self.model.logits(texts, Padding::Fixed { length: self.length })?;
        Ok(logits.iter().map(positive_log_odds).collect())
    }
}

/// Class probabilities with per-chunk dynamic padding.
pub struct ProbabilityScorer<M: ?Sized> {
    model: Arc<M>,
    max_length: usize,
    batch_size: usize,
}

impl<M: SentimentBackend + ?Sized> ProbabilityScorer<M> {
    pub fn new(model: Arc<M>, max_length: usize, batch_size: usize) -> Self {
        Self {
            model,
            max_length,
            batch_size: batch_size.max(1),
        }
    }
}

impl<M: SentimentBackend + ?Sized> ProbabilityFunction for ProbabilityScorer<M> {
    fn predict_proba(&self, texts: &[String]) -> Result<Vec<[f64; 2]>> {
        let mut rows = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let logits = self.model.logits(
                chunk,
                Padding::Longest {
                    max_length: self.max_length,
                },
            )?;
            rows.extend(logits.iter().map(softmax));
        }
        Ok(rows)
    }
}
