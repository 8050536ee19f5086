//! High-level API for sentiment classification and its explanations
//!
//! [`Explorer`] loads the model once and hands a shared, read-only handle to
//! the classifier and both explainers.
//!
//! # Quick Start
//!
//! ```no_run
//! use xai_fundamentals::api::Explorer;
//!
//! let explorer = Explorer::new()?;
//! let label = explorer.classify("I love this product!")?;
//! println!("{}", label); // "Positive"
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! ## Auto-Download from Hugging Face
//!
//! Enable the `auto-download` feature to fetch the checkpoint on first use:
//!
//! ```toml
//! [dependencies]
//! xai-fundamentals = { version = "0.1", features = ["bert", "auto-download"] }
//! ```
//!
//! ## Manual Model Download
//!
//! Otherwise place the converted checkpoint in `models/distilbert-sst2/`:
//!
//! ```bash
//! mkdir -p models/distilbert-sst2 && cd models/distilbert-sst2
//! base=https://huggingface.co/distilbert/distilbert-base-uncased-finetuned-sst-2-english/resolve/main
//! wget $base/config.json $base/vocab.txt $base/rust_model.ot
//! ```
//!
//! # Examples
//!
//! ## Explaining a Prediction
//!
//! ```no_run
//! # use xai_fundamentals::api::Explorer;
//! use xai_fundamentals::chart::Chart;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let explorer = Explorer::new()?;
//! let (shap, waterfall) = explorer.explain_shap("This is terrible.")?;
//! println!("base {:.3} -> output {:.3}", shap.base_value, shap.output_value);
//! std::fs::write("shap.svg", waterfall.to_svg())?;
//!
//! let lime = explorer.explain_lime("This is terrible.")?;
//! let (features, values) = lime.record.split();
//! let chart = explorer.render_lime(&features, &values)?;
//! std::fs::write("lime.svg", chart.to_svg())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Configuration
//!
//! ```no_run
//! use xai_fundamentals::api::Explorer;
//! use xai_fundamentals::config::Config;
//!
//! let mut config = Config::load_or_default("xai.toml")?;
//! config.lime.num_samples = 1000;
//! config.lime.seed = Some(42);
//!
//! let explorer = Explorer::with_config(config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::chart::{BarChart, WaterfallChart};
use crate::classifier::{Label, SentimentClassifier, SentimentPrediction};
use crate::config::Config;
use crate::error::Result;
use crate::explain::{LimeAdapter, ShapAdapter, TokenExplanation, WordExplanation};
use crate::model::{DistilBertSentiment, SentimentBackend};
use std::sync::Arc;

/// Classifier and explainers over one shared model.
pub struct Explorer<M: ?Sized = DistilBertSentiment> {
    model: Arc<M>,
    config: Config,
    classifier: SentimentClassifier<M>,
    shap: ShapAdapter<M>,
    lime: LimeAdapter<M>,
}

impl Explorer<DistilBertSentiment> {
    /// Load the DistilBERT checkpoint with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `XaiError::ModelUnavailable` if:
    /// - Model files are not found and auto-download is disabled
    /// - Model files are corrupted or the labels are in an unexpected order
    /// - The crate was built without the `bert` feature
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let model = Arc::new(DistilBertSentiment::load(&config.model)?);
        Self::from_backend(model, config)
    }
}

impl<M: SentimentBackend + ?Sized> Explorer<M> {
    /// Build the adapters around an already loaded backend.
    ///
    /// The configuration is validated first, as in [`Explorer::with_config`].
    pub fn from_backend(model: Arc<M>, config: Config) -> Result<Self> {
        config.validate()?;
        let classifier = SentimentClassifier::new(model.clone(), config.model.max_length);
        let shap = ShapAdapter::new(model.clone(), &config.shap);
        let lime = LimeAdapter::new(
            model.clone(),
            config.model.max_length,
            &config.lime,
            &config.chart,
        )?;
        Ok(Self {
            model,
            config,
            classifier,
            shap,
            lime,
        })
    }

    pub fn classify(&self, text: &str) -> Result<Label> {
        self.classifier.classify(text)
    }

    /// Label together with the probability pair it was decided from.
    pub fn predict(&self, text: &str) -> Result<SentimentPrediction> {
        self.classifier.predict(text)
    }

    /// Token attributions of the positive log-odds and their waterfall chart.
    pub fn explain_shap(&self, text: &str) -> Result<(TokenExplanation, WaterfallChart)> {
        let (explanation, chart) = self.shap.explain_and_plot(text)?;
        Ok((
            explanation,
            chart.with_size(self.config.chart.width, self.config.chart.height),
        ))
    }

    /// Word attributions of P(positive) from a local surrogate.
    pub fn explain_lime(&self, text: &str) -> Result<WordExplanation> {
        self.lime.explain(text)
    }

    pub fn render_lime(&self, features: &[String], values: &[f64]) -> Result<BarChart> {
        self.lime.render(features, values)
    }

    pub fn device(&self) -> String {
        self.model.device()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
