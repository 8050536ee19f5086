//! Local surrogate explanations over word features.
//!
//! Neighbours of the input are generated by deleting random subsets of its
//! words, scored with the probability function, weighted by their cosine
//! proximity to the input and fitted with a weighted ridge regression. The
//! surrogate's coefficients are the word contributions toward the positive
//! class.

use super::indexed::{IndexedString, WORD_SPLIT};
use super::surrogate::{r2_score, select_features, weighted_ridge, SURROGATE_ALPHA};
use super::{Attribution, AttributionRecord, ExplanationMethod};
use crate::chart::BarChart;
use crate::config::{ChartConfig, LimeConfig};
use crate::error::{Result, XaiError};
use crate::model::SentimentBackend;
use crate::scoring::{ProbabilityFunction, ProbabilityScorer};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Class explained by the surrogate (index into the probability row).
const POSITIVE: usize = 1;

/// Output of one local surrogate explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordExplanation {
    /// Words ranked by |weight|, strongest first
    pub record: AttributionRecord,
    pub intercept: f64,
    /// Weighted R² of the surrogate on the neighbourhood
    pub score: f64,
    /// Surrogate output at the unmodified input
    pub local_prediction: f64,
    pub class_name: String,
}

pub struct LimeTextExplainer<P> {
    classifier: P,
    splitter: Regex,
    num_samples: usize,
    kernel_width: f64,
    seed: Option<u64>,
    class_name: String,
}

impl<P: ProbabilityFunction> LimeTextExplainer<P> {
    pub fn new(classifier: P) -> Result<Self> {
        let splitter = Regex::new(WORD_SPLIT)
            .map_err(|e| XaiError::Config(format!("word pattern: {}", e)))?;
        Ok(Self {
            classifier,
            splitter,
            num_samples: 5000,
            kernel_width: 25.0,
            seed: None,
            class_name: "Positive".to_string(),
        })
    }

    /// Neighbourhood size, the input itself included.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples.max(1);
        self
    }

    pub fn with_kernel_width(mut self, kernel_width: f64) -> Self {
        self.kernel_width = kernel_width;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = name.into();
        self
    }

    /// Explain `text` with at most `num_features` words.
    pub fn explain(&self, text: &str, num_features: usize) -> Result<WordExplanation> {
        self.run(text, num_features)
            .map_err(XaiError::during_explanation)
    }

    fn run(&self, text: &str, num_features: usize) -> Result<WordExplanation> {
        let indexed = IndexedString::new(text, &self.splitter);
        let d = indexed.num_words();
        if d == 0 || num_features == 0 {
            return Ok(self.empty());
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (data, texts) = self.neighbourhood(&indexed, &mut rng);

        let probabilities = self.classifier.predict_proba(&texts)?;
        if probabilities.len() != texts.len() {
            return Err(XaiError::Explanation(format!(
                "probability function returned {} rows for {} inputs",
                probabilities.len(),
                texts.len()
            )));
        }
        let target: Array1<f64> = probabilities.iter().map(|row| row[POSITIVE]).collect();
        if target.iter().any(|p| !p.is_finite()) {
            return Err(XaiError::Explanation(
                "probability function returned a non-finite value".to_string(),
            ));
        }

        let weights = cosine_distances(&data).mapv(|dist| self.kernel(dist * 100.0));

        let used = select_features(data.view(), target.view(), weights.view(), num_features)?;
        let x = data.select(Axis(1), &used);
        let fit = weighted_ridge(x.view(), target.view(), weights.view(), SURROGATE_ALPHA)?;
        let score = r2_score(target.view(), fit.predict(x.view()).view(), weights.view());
        let local_prediction = fit.intercept + fit.coef.sum();

        let mut attributions: Vec<Attribution> = used
            .iter()
            .zip(fit.coef.iter())
            .map(|(&feature, &weight)| Attribution {
                feature: indexed.word(feature).to_string(),
                weight,
            })
            .collect();
        attributions.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

        debug!(
            words = d,
            samples = texts.len(),
            features = attributions.len(),
            score,
            "local surrogate fitted"
        );

        Ok(WordExplanation {
            record: AttributionRecord::new(ExplanationMethod::Lime, attributions),
            intercept: fit.intercept,
            score,
            local_prediction,
            class_name: self.class_name.clone(),
        })
    }

    /// Binary presence rows and their texts; row 0 is the input itself.
    fn neighbourhood(&self, indexed: &IndexedString, rng: &mut StdRng) -> (Array2<f64>, Vec<String>) {
        let d = indexed.num_words();
        let mut data = Array2::<f64>::ones((self.num_samples, d));
        let mut texts = Vec::with_capacity(self.num_samples);
        texts.push(indexed.raw().to_string());

        for i in 1..self.num_samples {
            let size = rng.gen_range(1..=d);
            let inactive = rand::seq::index::sample(rng, d, size).into_vec();
            for &feature in &inactive {
                data[[i, feature]] = 0.0;
            }
            texts.push(indexed.without(&inactive));
        }
        (data, texts)
    }

    fn kernel(&self, distance: f64) -> f64 {
        (-(distance * distance) / (self.kernel_width * self.kernel_width))
            .exp()
            .sqrt()
    }

    fn empty(&self) -> WordExplanation {
        WordExplanation {
            record: AttributionRecord::new(ExplanationMethod::Lime, Vec::new()),
            intercept: 0.0,
            score: 0.0,
            local_prediction: 0.0,
            class_name: self.class_name.clone(),
        }
    }
}

/// Cosine distance of every row to row 0, in `[0, 2]`. A row with no
/// active feature is at distance 1.
fn cosine_distances(data: &Array2<f64>) -> Array1<f64> {
    let origin = data.row(0);
    let origin_norm = origin.dot(&origin).sqrt();
    data.rows()
        .into_iter()
        .map(|row| {
            let norm = row.dot(&row).sqrt();
            let similarity = if norm == 0.0 || origin_norm == 0.0 {
                0.0
            } else {
                row.dot(&origin) / (norm * origin_norm)
            };
            (1.0 - similarity).clamp(0.0, 2.0)
        })
        .collect()
}

/// Method B: word-deletion surrogate explanations of P(positive).
pub struct LimeAdapter<M: ?Sized> {
    explainer: LimeTextExplainer<ProbabilityScorer<M>>,
    chart: ChartConfig,
}

impl<M: SentimentBackend + ?Sized> LimeAdapter<M> {
    pub fn new(
        model: Arc<M>,
        max_length: usize,
        config: &LimeConfig,
        chart: &ChartConfig,
    ) -> Result<Self> {
        let scorer = ProbabilityScorer::new(model, max_length, config.batch_size);
        let class_name = config
            .class_names
            .get(POSITIVE)
            .cloned()
            .unwrap_or_else(|| "Positive".to_string());
        let explainer = LimeTextExplainer::new(scorer)?
            .with_num_samples(config.num_samples)
            .with_kernel_width(config.kernel_width)
            .with_seed(config.seed)
            .with_class_name(class_name);
        Ok(Self {
            explainer,
            chart: chart.clone(),
        })
    }

    /// Explain `text`, requesting one feature per whitespace-separated word.
    ///
    /// Empty text yields an empty record without touching the model.
    pub fn explain(&self, text: &str) -> Result<WordExplanation> {
        let num_features = text.split_whitespace().count();
        self.explainer.explain(text, num_features)
    }

    /// Bar chart of word contributions, one bar per feature in record order.
    pub fn render(&self, features: &[String], values: &[f64]) -> Result<BarChart> {
        Ok(BarChart::word_contributions(features, values)?
            .with_size(self.chart.width, self.chart.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Padding;
    use crate::testing::LexiconBackend;

    fn config(num_samples: usize) -> LimeConfig {
        LimeConfig {
            num_samples,
            seed: Some(7),
            ..LimeConfig::default()
        }
    }

    fn adapter(model: &Arc<LexiconBackend>, num_samples: usize) -> LimeAdapter<LexiconBackend> {
        LimeAdapter::new(model.clone(), 512, &config(num_samples), &ChartConfig::default()).unwrap()
    }

    #[test]
    fn test_three_word_sentence() {
        let model = Arc::new(LexiconBackend::new());
        let explanation = adapter(&model, 500).explain("This is terrible.").unwrap();

        let (features, values) = explanation.record.split();
        assert_eq!(features.len(), 3);
        assert!(values.iter().all(|v| v.is_finite()));
        // strongest word first, and it pulls toward negative
        assert_eq!(features[0], "terrible");
        assert!(values[0] < 0.0);
        assert!(explanation.score > 0.5);
        assert_eq!(explanation.class_name, "Positive");
    }

    #[test]
    fn test_sorted_by_magnitude() {
        let model = Arc::new(LexiconBackend::new());
        let explanation = adapter(&model, 300)
            .explain("a good movie but an awful ending")
            .unwrap();
        let magnitudes: Vec<f64> = explanation
            .record
            .attributions
            .iter()
            .map(|a| a.weight.abs())
            .collect();
        assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_empty_text_skips_model() {
        let model = Arc::new(LexiconBackend::new());
        let lime = adapter(&model, 100);
        let explanation = lime.explain("   ").unwrap();

        assert!(explanation.record.is_empty());
        assert!(model.paddings().is_empty());

        let (features, values) = explanation.record.split();
        let chart = lime.render(&features, &values).unwrap();
        assert!(chart.is_empty());
    }

    #[test]
    fn test_seed_makes_runs_repeatable() {
        let model = Arc::new(LexiconBackend::new());
        let lime = adapter(&model, 200);
        let first = lime.explain("fine but not great").unwrap();
        let second = lime.explain("fine but not great").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_sample_is_singular() {
        let model = Arc::new(LexiconBackend::new());
        let err = adapter(&model, 1).explain("This is terrible.").unwrap_err();
        assert!(matches!(err, XaiError::Explanation(_)));
    }

    #[test]
    fn test_uses_dynamic_padding_in_chunks() {
        let model = Arc::new(LexiconBackend::new());
        adapter(&model, 100).explain("good day").unwrap();

        let paddings = model.paddings();
        // 100 texts in chunks of 32
        assert_eq!(paddings.len(), 4);
        assert!(paddings
            .iter()
            .all(|p| *p == Padding::Longest { max_length: 512 }));
    }

    #[test]
    fn test_backend_failure_is_explanation_error() {
        let model = Arc::new(LexiconBackend::failing_after(0));
        let err = adapter(&model, 50).explain("good day").unwrap_err();
        assert!(matches!(err, XaiError::Explanation(_)));
    }

    #[test]
    fn test_render_rejects_mismatch() {
        let model = Arc::new(LexiconBackend::new());
        let err = adapter(&model, 10)
            .render(&["good".to_string()], &[])
            .unwrap_err();
        assert!(matches!(err, XaiError::ChartShape { .. }));
    }

    #[test]
    fn test_closure_probability_function() {
        let classifier = |texts: &[String]| -> Result<Vec<[f64; 2]>> {
            Ok(texts
                .iter()
                .map(|t| if t.contains("bad") { [0.9, 0.1] } else { [0.2, 0.8] })
                .collect())
        };
        let explanation = LimeTextExplainer::new(classifier)
            .unwrap()
            .with_num_samples(200)
            .with_seed(Some(3))
            .explain("bad weather today", 3)
            .unwrap();
        assert_eq!(explanation.record.attributions[0].feature, "bad");
        assert!(explanation.record.attributions[0].weight < 0.0);
    }

    #[test]
    fn test_cosine_distances() {
        let data = ndarray::array![[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [1.0, 1.0]];
        let distances = cosine_distances(&data);
        assert!(distances[0].abs() < 1e-12);
        assert!((distances[1] - (1.0 - 1.0 / 2f64.sqrt())).abs() < 1e-12);
        assert!((distances[2] - 1.0).abs() < 1e-12);
        assert!(distances[3].abs() < 1e-12);
    }
}
