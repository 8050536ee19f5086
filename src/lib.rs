//! # XAI Fundamentals - Explainable Sentiment Analysis
//!
//! Binary sentiment classification with a pretrained DistilBERT (SST-2)
//! model, plus two model-agnostic explanations of its decisions in pure Rust.
//!
//! ## Features
//!
//! - **Sentiment Classification**: `Positive` / `Negative` from one forward pass
//! - **Partition (SHAP-style) Explanations**: Owen values over model tokens on
//!   the positive-class log-odds, drawn as a waterfall chart
//! - **Local Surrogate (LIME-style) Explanations**: weighted ridge regression
//!   over word-deletion neighbours, drawn as a bar chart
//! - **Auto-Download**: Fetch the checkpoint from Hugging Face
//! - **SVG Charts**: Standalone output, no plotting runtime needed
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! # DistilBERT backend with auto-download (recommended)
//! xai-fundamentals = { version = "0.1", features = ["bert", "auto-download"] }
//!
//! # Explainers only, bring your own model
//! xai-fundamentals = { version = "0.1", default-features = false }
//! ```
//!
//! ### Basic Usage
//!
//! ```no_run
//! use xai_fundamentals::api::Explorer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let explorer = Explorer::new()?;
//!
//!     let prediction = explorer.predict("I love this product!")?;
//!     println!("{} ({:.1}%)", prediction.label, prediction.confidence() * 100.0);
//!
//!     let lime = explorer.explain_lime("I love this product!")?;
//!     for a in &lime.record.attributions {
//!         println!("{:>12} {:+.3}", a.feature, a.weight);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Bring Your Own Model
//!
//! The explainers only need a scoring function, and closures qualify:
//!
//! ```
//! use xai_fundamentals::explain::LimeTextExplainer;
//! use xai_fundamentals::Result;
//!
//! let classifier = |texts: &[String]| -> Result<Vec<[f64; 2]>> {
//!     Ok(texts
//!         .iter()
//!         .map(|t| if t.contains("bad") { [0.9, 0.1] } else { [0.1, 0.9] })
//!         .collect())
//! };
//!
//! let explanation = LimeTextExplainer::new(classifier)?
//!     .with_num_samples(200)
//!     .with_seed(Some(0))
//!     .explain("not a bad day", 4)?;
//! assert_eq!(explanation.record.attributions[0].feature, "bad");
//! # Ok::<(), xai_fundamentals::XaiError>(())
//! ```
//!
//! ## Features
//!
//! ### Available Cargo Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `cli` | Include CLI binary | ✓ |
//! | `bert` | DistilBERT backend via rust-bert (requires libtorch) | ✗ |
//! | `auto-download` | Auto-download the checkpoint from Hugging Face | ✗ |
//!
//! ## Requirements
//!
//! The `bert` feature links libtorch through `tch`:
//!
//! ```bash
//! export LIBTORCH_USE_PYTORCH=1
//! export LIBTORCH_BYPASS_VERSION_CHECK=1
//! ```
//!
//! CUDA device 0 is used when available unless `model.force_cpu` is set.
//!
//! ## Error Handling
//!
//! ```no_run
//! use xai_fundamentals::api::Explorer;
//!
//! match Explorer::new() {
//!     Ok(explorer) => match explorer.classify("text") {
//!         Ok(label) => println!("Label: {}", label),
//!         Err(e) => eprintln!("Classification failed: {}", e),
//!     },
//!     Err(e) => {
//!         eprintln!("Failed to load model: {}", e);
//!         eprintln!("Build with `--features bert,auto-download` or download the model manually");
//!     }
//! }
//! ```
//!
//! ## Examples
//!
//! ```bash
//! cargo run --example simple --features bert,auto-download
//! cargo run --example explain --features bert,auto-download -- "This is terrible."
//! ```
//!
//! ## License
//!
//! GNU General Public License v3.0 (GPLv3)

// Public API modules
pub mod api;
pub mod config;
pub mod error;
pub mod model_loader;

// Core modules
pub mod chart;
pub mod classifier;
pub mod explain;
pub mod model;
pub mod scoring;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod testing;

pub use classifier::{Label, SentimentPrediction};
pub use error::{Result, XaiError};
