//! End-to-end runs of the explorer over a word-lexicon stand-in model.

use regex::Regex;
use std::sync::Arc;
use xai_fundamentals::api::Explorer;
use xai_fundamentals::chart::Chart;
use xai_fundamentals::config::Config;
use xai_fundamentals::explain::ExplanationMethod;
use xai_fundamentals::model::{Logits, Padding, SentimentBackend, TokenSpan, Tokenize};
use xai_fundamentals::{Label, Result};

struct Lexicon {
    token_re: Regex,
}

impl Lexicon {
    fn new() -> Self {
        Self {
            token_re: Regex::new(r"\[MASK\]|\w+|[^\w\s]").unwrap(),
        }
    }

    fn weight(word: &str) -> f64 {
        match word {
            "love" => 3.0,
            "great" => 2.0,
            "good" => 1.0,
            "bad" => -2.0,
            "terrible" => -4.0,
            _ => 0.0,
        }
    }
}

impl Tokenize for Lexicon {
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

impl SentimentBackend for Lexicon {
    fn logits(&self, texts: &[String], _padding: Padding) -> Result<Vec<Logits>> {
        Ok(texts
            .iter()
            .map(|t| {
                let s: f64 = self
                    .token_re
                    .find_iter(t)
                    .map(|m| Self::weight(&m.as_str().to_lowercase()))
                    .sum();
                [0.0, s]
            })
            .collect())
    }

    fn device(&self) -> String {
        "Cpu".to_string()
    }
}

fn explorer() -> Explorer<Lexicon> {
    let config = Config::from_toml(
        r#"
        [lime]
        num_samples = 400
        seed = 42

        [shap]
        max_display = 4
        "#,
    )
    .unwrap();
    Explorer::from_backend(Arc::new(Lexicon::new()), config).unwrap()
}

#[test]
fn classify_then_explain_both_ways() {
    let explorer = explorer();
    let text = "I love this product!";
    assert_eq!(explorer.classify(text).unwrap(), Label::Positive);

    let (shap, waterfall) = explorer.explain_shap(text).unwrap();
    assert_eq!(shap.record.method, ExplanationMethod::Shap);
    assert!((shap.base_value + shap.record.total() - shap.output_value).abs() < 1e-9);
    let love = shap
        .record
        .attributions
        .iter()
        .find(|a| a.feature == "love")
        .unwrap();
    assert!((love.weight - 3.0).abs() < 1e-9);
    assert_eq!(waterfall.steps[0].label, "love");
    assert!(waterfall.to_svg().contains("f(x) = 3.000"));

    let lime = explorer.explain_lime(text).unwrap();
    let (features, values) = lime.record.split();
    assert_eq!(features.len(), 4);
    assert_eq!(features[0], "love");
    assert!(values[0] > 0.0);

    let chart = explorer.render_lime(&features, &values).unwrap();
    assert_eq!(chart.bars.len(), 4);
}

#[test]
fn negative_sentence() {
    let explorer = explorer();
    let text = "This is terrible.";
    assert_eq!(explorer.classify(text).unwrap(), Label::Negative);

    let lime = explorer.explain_lime(text).unwrap();
    assert_eq!(lime.record.len(), 3);
    let terrible = lime
        .record
        .attributions
        .iter()
        .find(|a| a.feature == "terrible")
        .unwrap();
    assert!(terrible.weight < 0.0);
}

#[test]
fn empty_input_everywhere() {
    let explorer = explorer();
    // a zero score sits exactly on the boundary
    assert_eq!(explorer.classify("").unwrap(), Label::Negative);

    let lime = explorer.explain_lime("").unwrap();
    let (features, values) = lime.record.split();
    assert!(features.is_empty() && values.is_empty());
    let chart = explorer.render_lime(&features, &values).unwrap();
    assert!(chart.to_svg().contains("</svg>"));

    let (shap, _) = explorer.explain_shap("").unwrap();
    assert!(shap.record.is_empty());
}

#[test]
fn shared_model_across_threads() {
    let explorer = Arc::new(explorer());
    let handles: Vec<_> = ["good", "bad", "great", "terrible"]
        .into_iter()
        .map(|text| {
            let explorer = explorer.clone();
            std::thread::spawn(move || explorer.classify(text).unwrap())
        })
        .collect();
    let labels: Vec<Label> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        labels,
        vec![Label::Positive, Label::Negative, Label::Positive, Label::Negative]
    );
}
