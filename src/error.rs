//! Error taxonomy shared by the classifier, the explainers and the loader.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XaiError {
    /// Text the tokenizer cannot process.
    #[error("Invalid input: {0}")]
    Input(String),

    /// An attribution algorithm failed; no partial result is produced.
    #[error("Explanation failed: {0}")]
    Explanation(String),

    /// Model files missing or unusable. Only raised while loading.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chart data mismatch: {features} features but {values} values")]
    ChartShape { features: usize, values: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl XaiError {
    /// Re-wrap any failure raised while an explainer was running.
    pub(crate) fn during_explanation(err: XaiError) -> XaiError {
        match err {
            XaiError::Explanation(_) => err,
            other => XaiError::Explanation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, XaiError>;
