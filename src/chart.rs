//! Chart models for attribution output, rendered as standalone SVG.
//!
//! - [`BarChart`] - one bar per word, in record order (LIME).
//! - [`WaterfallChart`] - contributions accumulating from the base value to
//!   the model output, largest first (SHAP).
//!
//! Both are plain data (serializable) so callers can also hand them to their
//! own plotting front end.

use crate::error::{Result, XaiError};
use crate::explain::Attribution;
use serde::Serialize;

const MARGIN_TOP: f64 = 50.0;
const MARGIN_RIGHT: f64 = 30.0;
const FONT: &str = "font-family=\"sans-serif\"";
const BAR_COLOR: &str = "#1f77b4";
const POSITIVE_COLOR: &str = "#ff0051";
const NEGATIVE_COLOR: &str = "#008bfb";

/// Anything that renders to an SVG document.
pub trait Chart {
    fn title(&self) -> &str;

    fn to_svg(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    /// Degrees, counter-clockwise, of the x tick labels
    pub label_rotation: f64,
    pub bars: Vec<Bar>,
    pub width: u32,
    pub height: u32,
}

impl BarChart {
    /// Word contributions toward the positive class, one bar per feature.
    ///
    /// `features` and `values` must be the same length; zero is fine and
    /// yields a chart with axes but no bars.
    pub fn word_contributions(features: &[String], values: &[f64]) -> Result<Self> {
        if features.len() != values.len() {
            return Err(XaiError::ChartShape {
                features: features.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            title: "Word Contributions to Sentiment".to_string(),
            y_label: "Contribution to Positive Class".to_string(),
            label_rotation: 45.0,
            bars: features
                .iter()
                .zip(values)
                .map(|(label, &value)| Bar {
                    label: label.clone(),
                    value,
                })
                .collect(),
            width: 1000,
            height: 500,
        })
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl Chart for BarChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn to_svg(&self) -> String {
        let (w, h) = (self.width as f64, self.height as f64);
        let (left, bottom) = (90.0, 130.0);
        let plot_w = (w - left - MARGIN_RIGHT).max(1.0);
        let plot_h = (h - MARGIN_TOP - bottom).max(1.0);

        let (lo, hi) = value_range(self.bars.iter().map(|b| b.value));
        let y = |v: f64| MARGIN_TOP + (hi - v) / (hi - lo) * plot_h;

        let mut svg = svg_open(self.width, self.height);
        svg.push_str(&title_text(w / 2.0, &self.title));
        svg.push_str(&format!(
            "<text x=\"20\" y=\"{cy:.1}\" {FONT} font-size=\"13\" text-anchor=\"middle\" transform=\"rotate(-90 20 {cy:.1})\">{}</text>\n",
            escape(&self.y_label),
            cy = MARGIN_TOP + plot_h / 2.0,
        ));
        svg.push_str(&y_axis(left, plot_h, lo, hi, &y));

        let slot = plot_w / self.bars.len().max(1) as f64;
        let zero = y(0.0);
        for (i, bar) in self.bars.iter().enumerate() {
            let x = left + slot * i as f64;
            let top = y(bar.value.max(0.0));
            let height = (y(bar.value) - zero).abs();
            svg.push_str(&format!(
                "<rect class=\"bar\" x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{BAR_COLOR}\" fill-opacity=\"0.7\"><title>{}: {:.4}</title></rect>\n",
                x + slot * 0.1,
                top,
                slot * 0.8,
                height,
                escape(&bar.label),
                bar.value
            ));

            let cx = x + slot / 2.0;
            let cy = MARGIN_TOP + plot_h + 14.0;
            svg.push_str(&format!(
                "<text x=\"{cx:.1}\" y=\"{cy:.1}\" {FONT} font-size=\"12\" text-anchor=\"end\" transform=\"rotate({:.1} {cx:.1} {cy:.1})\">{}</text>\n",
                -self.label_rotation,
                escape(&bar.label)
            ));
        }

        svg.push_str(&format!(
            "<line x1=\"{left:.1}\" y1=\"{zero:.1}\" x2=\"{:.1}\" y2=\"{zero:.1}\" stroke=\"#333\"/>\n",
            left + plot_w
        ));
        svg.push_str("</svg>\n");
        svg
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallStep {
    pub label: String,
    pub value: f64,
    pub start: f64,
    pub end: f64,
}

/// Contributions stacked from `base_value` to `final_value`.
///
/// Rows are ordered by magnitude, largest on top; the path starts at the
/// bottom row, so the top row ends at `final_value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallChart {
    pub title: String,
    pub base_value: f64,
    pub final_value: f64,
    pub steps: Vec<WaterfallStep>,
    pub width: u32,
    pub height: u32,
}

impl WaterfallChart {
    /// Build the chart, showing at most `max_display` rows; beyond that the
    /// smallest contributions are folded into one "N other features" row.
    pub fn new(base_value: f64, attributions: &[Attribution], max_display: usize) -> Self {
        let max_display = max_display.max(1);
        let mut ordered: Vec<&Attribution> = attributions.iter().collect();
        ordered.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

        let mut rows: Vec<(String, f64)> = Vec::new();
        if ordered.len() > max_display {
            let (shown, rest) = ordered.split_at(max_display - 1);
            rows.extend(shown.iter().map(|a| (a.feature.clone(), a.weight)));
            rows.push((
                format!("{} other features", rest.len()),
                rest.iter().map(|a| a.weight).sum(),
            ));
        } else {
            rows.extend(ordered.iter().map(|a| (a.feature.clone(), a.weight)));
        }

        let mut level = base_value;
        let mut steps: Vec<WaterfallStep> = rows
            .into_iter()
            .rev()
            .map(|(label, value)| {
                let start = level;
                level += value;
                WaterfallStep {
                    label,
                    value,
                    start,
                    end: level,
                }
            })
            .collect();
        steps.reverse();

        Self {
            title: "Token Contributions (log-odds of Positive)".to_string(),
            base_value,
            final_value: level,
            steps,
            width: 900,
            height: 500,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl Chart for WaterfallChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn to_svg(&self) -> String {
        let (w, h) = (self.width as f64, self.height as f64);
        let (left, bottom) = (170.0, 60.0);
        let plot_w = (w - left - MARGIN_RIGHT).max(1.0);
        let plot_h = (h - MARGIN_TOP - bottom).max(1.0);

        let values = self
            .steps
            .iter()
            .flat_map(|s| [s.start, s.end])
            .chain([self.base_value, self.final_value]);
        let (lo, hi) = value_range(values);
        let x = |v: f64| left + (v - lo) / (hi - lo) * plot_w;

        let mut svg = svg_open(self.width, self.height);
        svg.push_str(&title_text(w / 2.0, &self.title));

        let row = plot_h / self.steps.len().max(1) as f64;
        for (i, step) in self.steps.iter().enumerate() {
            let top = MARGIN_TOP + row * i as f64;
            let (x0, x1) = (x(step.start.min(step.end)), x(step.start.max(step.end)));
            let color = if step.value >= 0.0 {
                POSITIVE_COLOR
            } else {
                NEGATIVE_COLOR
            };
            svg.push_str(&format!(
                "<rect class=\"step\" x=\"{x0:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{color}\"/>\n",
                top + row * 0.15,
                (x1 - x0).max(1.0),
                row * 0.7
            ));
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"12\" text-anchor=\"end\">{}</text>\n",
                left - 8.0,
                top + row * 0.6,
                escape(&step.label)
            ));
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"11\" fill=\"{color}\">{:+.3}</text>\n",
                x1 + 4.0,
                top + row * 0.6,
                step.value
            ));
        }

        let axis_y = MARGIN_TOP + plot_h;
        svg.push_str(&format!(
            "<line x1=\"{left:.1}\" y1=\"{axis_y:.1}\" x2=\"{:.1}\" y2=\"{axis_y:.1}\" stroke=\"#333\"/>\n",
            left + plot_w
        ));
        for (value, label, y) in [
            (self.base_value, "E[f(X)]", axis_y + 20.0),
            (self.final_value, "f(x)", MARGIN_TOP - 6.0),
        ] {
            let vx = x(value);
            svg.push_str(&format!(
                "<line x1=\"{vx:.1}\" y1=\"{MARGIN_TOP:.1}\" x2=\"{vx:.1}\" y2=\"{axis_y:.1}\" stroke=\"#999\" stroke-dasharray=\"4 3\"/>\n"
            ));
            svg.push_str(&format!(
                "<text x=\"{vx:.1}\" y=\"{y:.1}\" {FONT} font-size=\"12\" text-anchor=\"middle\">{label} = {value:.3}</text>\n"
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Range covering zero and every finite value; never degenerate.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (0.0f64, 0.0f64);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi - lo < f64::EPSILON {
        hi = lo + 1.0;
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn svg_open(width: u32, height: u32) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n"
    )
}

fn title_text(cx: f64, title: &str) -> String {
    format!(
        "<text x=\"{cx:.1}\" y=\"24\" {FONT} font-size=\"16\" text-anchor=\"middle\">{}</text>\n",
        escape(title)
    )
}

fn y_axis(left: f64, plot_h: f64, lo: f64, hi: f64, y: &impl Fn(f64) -> f64) -> String {
    let mut out = format!(
        "<line x1=\"{left:.1}\" y1=\"{MARGIN_TOP:.1}\" x2=\"{left:.1}\" y2=\"{:.1}\" stroke=\"#333\"/>\n",
        MARGIN_TOP + plot_h
    );
    for i in 0..=4 {
        let v = lo + (hi - lo) * i as f64 / 4.0;
        let ty = y(v);
        out.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"11\" text-anchor=\"end\">{v:.3}</text>\n",
            left - 6.0,
            ty + 4.0
        ));
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn attr(feature: &str, weight: f64) -> Attribution {
        Attribution {
            feature: feature.to_string(),
            weight,
        }
    }

    #[test]
    fn test_empty_bar_chart_renders() {
        let chart = BarChart::word_contributions(&[], &[]).unwrap();
        assert!(chart.is_empty());

        let svg = chart.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("class=\"bar\""));
        assert!(svg.contains("Contribution to Positive Class"));
    }

    #[test]
    fn test_bar_chart_keeps_record_order() {
        let chart =
            BarChart::word_contributions(&words(&["terrible", "This", "is"]), &[-0.6, 0.05, -0.01])
                .unwrap();
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["terrible", "This", "is"]);
        assert_eq!(chart.label_rotation, 45.0);

        let svg = chart.to_svg();
        assert_eq!(svg.matches("class=\"bar\"").count(), 3);
        assert!(svg.contains("rotate(-45.0"));
    }

    #[test]
    fn test_bar_chart_length_mismatch() {
        let err = BarChart::word_contributions(&words(&["a", "b"]), &[1.0]).unwrap_err();
        assert!(matches!(err, XaiError::ChartShape { features: 2, values: 1 }));
    }

    #[test]
    fn test_labels_are_escaped() {
        let chart = BarChart::word_contributions(&words(&["<b>&"]), &[0.3]).unwrap();
        let svg = chart.to_svg();
        assert!(svg.contains("&lt;b&gt;&amp;"));
        assert!(!svg.contains("<b>&"));
    }

    #[test]
    fn test_waterfall_path() {
        let attributions = vec![attr("i", 0.1), attr("love", 2.5), attr("product", -0.4)];
        let chart = WaterfallChart::new(-0.2, &attributions, 10);

        let labels: Vec<&str> = chart.steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["love", "product", "i"]);

        let bottom = chart.steps.last().unwrap();
        assert_eq!(bottom.start, -0.2);
        assert!((chart.steps[0].end - chart.final_value).abs() < 1e-12);
        assert!((chart.final_value - 2.0).abs() < 1e-12);
        for pair in chart.steps.windows(2) {
            assert!((pair[1].end - pair[0].start).abs() < 1e-12);
        }
    }

    #[test]
    fn test_waterfall_folds_small_features() {
        let attributions: Vec<Attribution> =
            (1..=6).map(|i| attr(&format!("t{}", i), i as f64 * 0.1)).collect();
        let chart = WaterfallChart::new(0.0, &attributions, 3);

        assert_eq!(chart.steps.len(), 3);
        assert_eq!(chart.steps[0].label, "t6");
        assert_eq!(chart.steps[1].label, "t5");
        assert_eq!(chart.steps[2].label, "4 other features");
        assert!((chart.steps[2].value - 1.0).abs() < 1e-12);
        assert!((chart.final_value - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_waterfall_svg() {
        let chart = WaterfallChart::new(0.0, &[attr("bad", -1.0), attr("good", 0.5)], 10);
        let svg = chart.to_svg();
        assert_eq!(svg.matches("class=\"step\"").count(), 2);
        assert!(svg.contains(NEGATIVE_COLOR) && svg.contains(POSITIVE_COLOR));
        assert!(svg.contains("f(x) = -0.500"));
    }

    #[test]
    fn test_value_range_never_degenerate() {
        let (lo, hi) = value_range(std::iter::empty());
        assert!(hi > lo);
        let (lo, hi) = value_range([f64::NAN, 2.0].into_iter());
        assert!(lo < 0.0 && hi > 2.0);
    }
}
