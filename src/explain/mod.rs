//! Feature attribution for the sentiment classifier.
//!
//! Two model-agnostic explainers are provided, each behind a narrow scoring
//! interface so the model never leaks into the algorithm:
//!
//! - [`shap`] - hierarchical Owen values over model tokens (Partition
//!   explainer) on the positive-class log-odds; plotted as a waterfall.
//! - [`lime`] - a weighted linear surrogate fitted on word-deletion
//!   neighbours of the input; plotted as a bar chart.
//!
//! Both produce an [`AttributionRecord`]: ordered `(feature, weight)` pairs
//! where a positive weight pushes toward the positive class.
//!
//! ## Module Structure
//!
//! - [`masker`] - Coalition masks to perturbed texts
//! - [`partition`] - Token hierarchy for the Owen recursion
//! - [`shap`] - Partition explainer and its adapter
//! - [`indexed`] - Word features of a text
//! - [`surrogate`] - Weighted ridge regression and feature selection
//! - [`lime`] - Local surrogate explainer and its adapter

pub mod indexed;
pub mod lime;
pub mod masker;
pub mod partition;
pub mod shap;
pub mod surrogate;

use serde::Serialize;
use std::fmt;

pub use lime::{LimeAdapter, LimeTextExplainer, WordExplanation};
pub use shap::{PartitionExplainer, ShapAdapter, TokenExplanation};

/// Which explainer produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationMethod {
    Shap,
    Lime,
}

impl fmt::Display for ExplanationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplanationMethod::Shap => f.write_str("SHAP"),
            ExplanationMethod::Lime => f.write_str("LIME"),
        }
    }
}

/// One feature and its signed contribution toward the positive class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub feature: String,
    pub weight: f64,
}

/// Attributions in the order the explainer produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionRecord {
    pub method: ExplanationMethod,
    pub attributions: Vec<Attribution>,
}

impl AttributionRecord {
    pub fn new(method: ExplanationMethod, attributions: Vec<Attribution>) -> Self {
        Self {
            method,
            attributions,
        }
    }

    pub fn len(&self) -> usize {
        self.attributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributions.is_empty()
    }

    /// Feature names and weights as two parallel vectors (both empty for an
    /// empty record).
    pub fn split(&self) -> (Vec<String>, Vec<f64>) {
        self.attributions
            .iter()
            .map(|a| (a.feature.clone(), a.weight))
            .unzip()
    }

    pub fn total(&self) -> f64 {
        self.attributions.iter().map(|a| a.weight).sum()
    }
}

impl fmt::Display for AttributionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} attributions:", self.method)?;
        for a in &self.attributions {
            writeln!(f, "  {:<20} {:+.4}", a.feature, a.weight)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_empty() {
        let record = AttributionRecord::new(ExplanationMethod::Lime, Vec::new());
        let (features, values) = record.split();
        assert!(features.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_split_keeps_order_and_duplicates() {
        let record = AttributionRecord::new(
            ExplanationMethod::Shap,
            vec![
                Attribution { feature: "very".into(), weight: 0.2 },
                Attribution { feature: "very".into(), weight: 0.1 },
                Attribution { feature: "good".into(), weight: 1.0 },
            ],
        );
        let (features, values) = record.split();
        assert_eq!(features, vec!["very", "very", "good"]);
        assert_eq!(values, vec![0.2, 0.1, 1.0]);
        assert!((record.total() - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_serializes_method_lowercase() {
        let record = AttributionRecord::new(ExplanationMethod::Lime, Vec::new());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"method":"lime","attributions":[]}"#);
    }
}
