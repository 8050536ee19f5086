//! Pretrained sentiment backend.
//!
//! [`DistilBertSentiment`] wraps the SST-2 fine-tuned DistilBERT classifier from
//! rust-bert (libtorch backend) together with its WordPiece tokenizer. It is
//! loaded once and shared read-only (`Arc`) by every adapter; forward passes
//! are serialized by an internal mutex.
//!
//! The adapters only depend on the [`SentimentBackend`] and [`Tokenize`]
//! traits, so any model that yields two logits per text can stand in.

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Pre-softmax scores, `[negative, positive]`.
pub type Logits = [f64; 2];

/// How a batch is padded before the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Pad to the longest sequence in the batch, truncating at `max_length`
    Longest { max_length: usize },
    /// Pad or truncate every sequence to exactly `length` tokens
    Fixed { length: usize },
}

/// A model token and its byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Splits text into model tokens with offsets; special tokens are left out.
pub trait Tokenize {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>>;

    /// Token substituted for masked-out tokens.
    fn mask_token(&self) -> &str;
}

/// A two-class sequence classifier.
pub trait SentimentBackend: Tokenize + Send + Sync {
    /// One forward pass over `texts`, one logit pair per text.
    fn logits(&self, texts: &[String], padding: Padding) -> Result<Vec<Logits>>;

    /// Human-readable execution device.
    fn device(&self) -> String;
}

/// Lock read-only model state, recovering the guard if an earlier forward
/// pass panicked while holding it.
#[cfg_attr(not(feature = "bert"), allow(dead_code))]
pub(crate) fn lock_weights<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Tokenize + ?Sized> Tokenize for Arc<T> {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>> {
        (**self).tokenize(text)
    }

    fn mask_token(&self) -> &str {
        (**self).mask_token()
    }
}

#[cfg(feature = "bert")]
mod distilbert {
    use super::{lock_weights, Logits, Padding, SentimentBackend, TokenSpan, Tokenize};
    use crate::config::ModelConfig;
    use crate::error::{Result, XaiError};
    use crate::model_loader::{ensure_model_files, ModelFiles};
    use rust_bert::distilbert::{DistilBertConfig, DistilBertModelClassifier};
    use rust_tokenizers::tokenizer::{BertTokenizer, Tokenizer, TruncationStrategy};
    use rust_tokenizers::vocab::Vocab;
    use std::sync::Mutex;
    use tch::{nn, Device, Kind, Tensor};

    const PAD_TOKEN: &str = "[PAD]";
    const MASK_TOKEN: &str = "[MASK]";

    struct Loaded {
        // Owns the weights referenced by `model`.
        _var_store: nn::VarStore,
        model: DistilBertModelClassifier,
    }

    /// DistilBERT SST-2 classifier (rust-bert, libtorch backend)
    pub struct DistilBertSentiment {
        tokenizer: BertTokenizer,
        inner: Mutex<Loaded>,
        device: Device,
        pad_id: i64,
    }

    impl DistilBertSentiment {
        /// Load tokenizer, config and weights, downloading them first when allowed.
        ///
        /// Every failure here is reported as `XaiError::ModelUnavailable`.
        pub fn load(config: &ModelConfig) -> Result<Self> {
            let files = ModelFiles::in_dir(&config.model_dir);
            ensure_model_files(&files, &config.checkpoint, config.auto_download)?;

            let unavailable = |what: &str, e: &dyn std::fmt::Display| {
                XaiError::ModelUnavailable(format!("{}: {}", what, e))
            };

            let device = if !config.force_cpu && tch::Cuda::is_available() {
                Device::Cuda(0)
            } else {
                Device::Cpu
            };
            tracing::info!(checkpoint = %config.checkpoint, ?device, "loading sentiment model");

            let tokenizer = BertTokenizer::from_file(&files.vocab, true, true)
                .map_err(|e| unavailable("tokenizer", &e))?;
            let pad_id = tokenizer.vocab().token_to_id(PAD_TOKEN);

            let raw = std::fs::read_to_string(&files.config)
                .map_err(|e| unavailable("model config", &e))?;
            let model_config: DistilBertConfig =
                serde_json::from_str(&raw).map_err(|e| unavailable("model config", &e))?;
            check_label_order(&model_config)?;

            let mut var_store = nn::VarStore::new(device);
            let model = DistilBertModelClassifier::new(var_store.root(), &model_config)
                .map_err(|e| unavailable("classifier head", &e))?;
            var_store
                .load(&files.weights)
                .map_err(|e| unavailable("weights", &e))?;

            tracing::info!("sentiment model ready");
            Ok(Self {
                tokenizer,
                inner: Mutex::new(Loaded {
                    _var_store: var_store,
                    model,
                }),
                device,
                pad_id,
            })
        }

        fn encode(&self, texts: &[String], padding: Padding) -> (Vec<i64>, Vec<i64>, usize) {
            let max_length = match padding {
                Padding::Longest { max_length } => max_length,
                Padding::Fixed { length } => length,
            };
            let encoded =
                self.tokenizer
                    .encode_list(texts, max_length, &TruncationStrategy::LongestFirst, 0);

            let width = match padding {
                Padding::Longest { .. } => encoded
                    .iter()
                    .map(|e| e.token_ids.len())
                    .max()
                    .unwrap_or(0),
                Padding::Fixed { length } => length,
            };

            let mut ids = Vec::with_capacity(texts.len() * width);
            let mut mask = Vec::with_capacity(texts.len() * width);
            for input in &encoded {
                let len = input.token_ids.len().min(width);
                ids.extend_from_slice(&input.token_ids[..len]);
                ids.extend(std::iter::repeat(self.pad_id).take(width - len));
                mask.extend(std::iter::repeat(1i64).take(len));
                mask.extend(std::iter::repeat(0i64).take(width - len));
            }
            (ids, mask, width)
        }
    }

    /// The adapters read index 1 as the positive class.
    fn check_label_order(config: &DistilBertConfig) -> Result<()> {
        let positive = config
            .id2label
            .as_ref()
            .and_then(|labels| labels.get(&1))
            .map(|label| label.to_ascii_lowercase());
        match positive.as_deref() {
            None | Some("positive") | Some("label_1") => Ok(()),
            Some(other) => Err(XaiError::ModelUnavailable(format!(
                "label 1 of the checkpoint is '{}', expected POSITIVE",
                other
            ))),
        }
    }

    impl Tokenize for DistilBertSentiment {
        fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>> {
            let tokens = self.tokenizer.tokenize_with_offsets(text);

            // Offsets are in characters; spans are byte ranges.
            let mut byte_at: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
            byte_at.push(text.len());

            let mut spans = Vec::with_capacity(tokens.tokens.len());
            for (token, offset) in tokens.tokens.into_iter().zip(tokens.offsets) {
                let Some(offset) = offset else { continue };
                let (begin, end) = (offset.begin as usize, offset.end as usize);
                match (byte_at.get(begin), byte_at.get(end)) {
                    (Some(&start), Some(&end)) if start <= end => {
                        spans.push(TokenSpan { text: token, start, end })
                    }
                    _ => {
                        return Err(XaiError::Input(format!(
                            "token '{}' has offsets {}..{} outside the text",
                            token, begin, end
                        )))
                    }
                }
            }
            Ok(spans)
        }

        fn mask_token(&self) -> &str {
            MASK_TOKEN
        }
    }

    impl SentimentBackend for DistilBertSentiment {
        fn logits(&self, texts: &[String], padding: Padding) -> Result<Vec<Logits>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let (ids, mask, width) = self.encode(texts, padding);
            if width == 0 {
                return Err(XaiError::Input("tokenizer produced no tokens".to_string()));
            }
            let shape = [texts.len() as i64, width as i64];

            let input = Tensor::from_slice(&ids).view(shape).to(self.device);
            // The fixed-length scorer runs without an attention mask.
            let attention = match padding {
                Padding::Longest { .. } => Some(Tensor::from_slice(&mask).view(shape).to(self.device)),
                Padding::Fixed { .. } => None,
            };

            let inner = lock_weights(&self.inner);
            let output = tch::no_grad(|| {
                inner
                    .model
                    .forward_t(Some(&input), attention.as_ref(), None, false)
            })
            .map_err(|e| XaiError::Inference(e.to_string()))?;
            drop(inner);

            let flat = Vec::<f64>::try_from(
                output
                    .logits
                    .to(Device::Cpu)
                    .to_kind(Kind::Double)
                    .view([-1]),
            )
            .map_err(|e| XaiError::Inference(e.to_string()))?;

            if flat.len() != texts.len() * 2 {
                return Err(XaiError::Inference(format!(
                    "expected {} logits, got {}",
                    texts.len() * 2,
                    flat.len()
                )));
            }
            tracing::debug!(batch = texts.len(), width, "forward pass");
            Ok(flat.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
        }

        fn device(&self) -> String {
            format!("{:?}", self.device)
        }
    }
}

#[cfg(feature = "bert")]
pub use distilbert::DistilBertSentiment;

// Fallback
#[cfg(not(feature = "bert"))]
#[derive(Debug)]
pub struct DistilBertSentiment {
    _private: (),
}

#[cfg(not(feature = "bert"))]
impl DistilBertSentiment {
    pub fn load(_config: &crate::config::ModelConfig) -> Result<Self> {
        Err(crate::error::XaiError::ModelUnavailable(
            "DistilBERT backend not enabled. Compile with: cargo build --features bert".to_string(),
        ))
    }
}

#[cfg(not(feature = "bert"))]
impl Tokenize for DistilBertSentiment {
    fn tokenize(&self, _text: &str) -> Result<Vec<TokenSpan>> {
        Err(crate::error::XaiError::ModelUnavailable("DistilBERT backend not enabled".to_string()))
    }

    fn mask_token(&self) -> &str {
        "[MASK]"
    }
}

#[cfg(not(feature = "bert"))]
impl SentimentBackend for DistilBertSentiment {
    fn logits(&self, _texts: &[String], _padding: Padding) -> Result<Vec<Logits>> {
        Err(crate::error::XaiError::ModelUnavailable("DistilBERT backend not enabled".to_string()))
    }

    fn device(&self) -> String {
        "none".to_string()
    }
}
