//! Configuration structures for the sentiment explorer.
//!
//! Settings live in a TOML file (by default `xai.toml`). Every section and every
//! field has a default, so a partial file only overrides what it names.

use crate::error::{Result, XaiError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hugging Face checkpoint the classifier is built from.
pub const DEFAULT_CHECKPOINT: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

/// Main configuration structure loaded from `xai.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Model location and tokenization window
    pub model: ModelConfig,
    /// Partition (SHAP-style) explainer settings
    pub shap: ShapConfig,
    /// Local surrogate (LIME-style) explainer settings
    pub lime: LimeConfig,
    /// Chart dimensions
    pub chart: ChartConfig,
}

/// Model location and tokenization window.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face repository id of the checkpoint
    pub checkpoint: String,
    /// Directory holding `config.json`, `vocab.txt` and `rust_model.ot`
    pub model_dir: String,
    /// Download missing files (needs the `auto-download` feature)
    pub auto_download: bool,
    /// Truncation length for classification and probability scoring
    pub max_length: usize,
    /// Stay on the CPU even when CUDA is available
    pub force_cpu: bool,
}

/// Partition explainer settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShapConfig {
    /// Fixed padding/truncation length used by the log-odds scorer
    pub sequence_length: usize,
    /// Model evaluations allowed per explanation (including the two anchors)
    pub max_evals: usize,
    /// Coalitions scored per call to the scoring function
    pub batch_size: usize,
    /// Replace runs of masked tokens with a single mask token
    pub collapse_mask_token: bool,
    /// Rows shown in the waterfall chart before folding the rest
    pub max_display: usize,
}

/// Local surrogate explainer settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimeConfig {
    /// Perturbed neighbours sampled around the input (including the input)
    pub num_samples: usize,
    /// Width of the exponential kernel over cosine distance
    pub kernel_width: f64,
    /// Texts per forward pass while scoring the neighbourhood
    pub batch_size: usize,
    /// Seed for reproducible sampling; drawn from entropy when absent
    pub seed: Option<u64>,
    pub class_names: Vec<String>,
}

/// Chart dimensions in pixels.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            checkpoint: DEFAULT_CHECKPOINT.to_string(),
            model_dir: "models/distilbert-sst2".to_string(),
            auto_download: cfg!(feature = "auto-download"),
            max_length: 512,
            force_cpu: false,
        }
    }
}

impl Default for ShapConfig {
    fn default() -> Self {
        ShapConfig {
            sequence_length: 500,
            max_evals: 500,
            batch_size: 10,
            collapse_mask_token: true,
            max_display: 10,
        }
    }
}

impl Default for LimeConfig {
    fn default() -> Self {
        LimeConfig {
            num_samples: 5000,
            kernel_width: 25.0,
            batch_size: 32,
            seed: None,
            class_names: vec!["Negative".to_string(), "Positive".to_string()],
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            width: 1000,
            height: 500,
        }
    }
}

impl ModelConfig {
    pub fn with_model_dir(mut self, dir: impl Into<String>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_auto_download(mut self, enable: bool) -> Self {
        self.auto_download = enable;
        self
    }

    pub fn with_force_cpu(mut self, force: bool) -> Self {
        self.force_cpu = force;
        self
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// Returns `Ok(Config)` if the file can be read, parsed and passes
    /// validation, or `XaiError::Config` otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| XaiError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| XaiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the explainers cannot work with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            // [CLS] and [SEP] always take two positions.
            (self.model.max_length >= 2, "model.max_length must be at least 2"),
            (self.shap.sequence_length >= 2, "shap.sequence_length must be at least 2"),
            (self.shap.max_evals >= 2, "shap.max_evals must be at least 2"),
            (self.shap.batch_size > 0, "shap.batch_size must be positive"),
            (self.lime.num_samples > 0, "lime.num_samples must be positive"),
            (self.lime.batch_size > 0, "lime.batch_size must be positive"),
            (
                self.lime.kernel_width.is_finite() && self.lime.kernel_width > 0.0,
                "lime.kernel_width must be a positive number",
            ),
            (self.lime.class_names.len() == 2, "lime.class_names must name two classes"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(XaiError::Config(msg.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model.checkpoint, DEFAULT_CHECKPOINT);
        assert_eq!(config.model.max_length, 512);
        assert_eq!(config.shap.sequence_length, 500);
        assert_eq!(config.shap.max_evals, 500);
        assert!(config.shap.collapse_mask_token);
        assert_eq!(config.lime.num_samples, 5000);
        assert_eq!(config.lime.kernel_width, 25.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [lime]
            num_samples = 200
            seed = 7

            [shap]
            max_display = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.lime.num_samples, 200);
        assert_eq!(config.lime.seed, Some(7));
        assert_eq!(config.lime.kernel_width, 25.0);
        assert_eq!(config.shap.max_display, 5);
        assert_eq!(config.shap.max_evals, 500);
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[shap]\nmax_evals = 1\n").unwrap_err();
        assert!(matches!(err, XaiError::Config(msg) if msg.contains("max_evals")));

        let err = Config::from_toml("[lime]\nkernel_width = 0.0\n").unwrap_err();
        assert!(matches!(err, XaiError::Config(_)));
    }

    #[test]
    fn test_sequence_lengths_leave_room_for_special_tokens() {
        let err = Config::from_toml("[model]\nmax_length = 1\n").unwrap_err();
        assert!(matches!(err, XaiError::Config(msg) if msg.contains("max_length")));

        let err = Config::from_toml("[shap]\nsequence_length = 1\n").unwrap_err();
        assert!(matches!(err, XaiError::Config(msg) if msg.contains("sequence_length")));

        let config = Config::from_toml("[model]\nmax_length = 2\n[shap]\nsequence_length = 2\n").unwrap();
        assert_eq!(config.model.max_length, 2);
        assert_eq!(config.shap.sequence_length, 2);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(Config::from_toml("[model"), Err(XaiError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model]\nmodel_dir = \"/tmp/sst2\"\nforce_cpu = true").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.model.model_dir, "/tmp/sst2");
        assert!(config.model.force_cpu);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder() {
        let model = ModelConfig::default()
            .with_model_dir("custom_models")
            .with_auto_download(false)
            .with_force_cpu(true);
        assert_eq!(model.model_dir, "custom_models");
        assert!(!model.auto_download);
        assert!(model.force_cpu);
    }
}
