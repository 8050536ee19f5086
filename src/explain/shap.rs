//! Partition explainer: Owen values over a hierarchy of model tokens.
//!
//! The input is tokenized, the tokens are arranged in a [`PartitionTree`],
//! and the tree is walked from the root. Each visited group is split into
//! its two children and the score difference of the four coalitions
//! `(none, left, right, both)` is credited to the group, the children are
//! queued with the context the [`FixedContext`] rule prescribes. The most
//! promising groups (largest `|Δf| · weight`) are expanded first until the
//! evaluation budget runs out; whatever is still queued then keeps its
//! full difference on the group.
//!
//! Credit left on internal nodes is finally pushed down to the tokens in
//! proportion to group size, so that
//! `base_value + Σ attributions == output_value`.

use super::masker::TextMasker;
use super::partition::{Node, PartitionTree};
use super::{Attribution, AttributionRecord, ExplanationMethod};
use crate::chart::WaterfallChart;
use crate::config::ShapConfig;
use crate::error::{Result, XaiError};
use crate::model::{SentimentBackend, TokenSpan, Tokenize};
use crate::scoring::{LogOddsScorer, ScoreFunction};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::debug;

/// Which half of a split is held fixed while the other is explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixedContext {
    /// Children are explored against the group masked out; the interaction
    /// term stays on the group.
    Zero,
    /// Each child is explored with its sibling present.
    #[default]
    One,
    /// Both contexts, each with half the weight.
    Averaged,
}

/// Output of one Partition explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenExplanation {
    /// Score of the fully masked input
    pub base_value: f64,
    /// Score of the unmodified input
    pub output_value: f64,
    /// One attribution per model token, in text order
    pub record: AttributionRecord,
    /// Scoring-function evaluations spent
    pub evaluations: usize,
}

impl TokenExplanation {
    /// Difference between the output and the base plus all attributions.
    pub fn additivity_gap(&self) -> f64 {
        self.output_value - (self.base_value + self.record.total())
    }
}

/// A group waiting to be split.
struct Task {
    node: usize,
    /// Coalition the group is explored against (its own tokens masked)
    context: Vec<bool>,
    f00: f64,
    f11: f64,
    weight: f64,
    seq: u64,
}

impl Task {
    fn priority(&self) -> f64 {
        (self.f11 - self.f00).abs() * self.weight
    }

    fn remaining_credit(&self) -> f64 {
        (self.f11 - self.f00) * self.weight
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    // max-heap on priority, earlier tasks first among equals
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority()
            .total_cmp(&other.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Queue {
    heap: BinaryHeap<Task>,
    next_seq: u64,
}

impl Queue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, node: usize, context: Vec<bool>, f00: f64, f11: f64, weight: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Task {
            node,
            context,
            f00,
            f11,
            weight,
            seq,
        });
    }
}

/// Model-agnostic Partition explainer over a token scoring function.
pub struct PartitionExplainer<S, T> {
    scorer: S,
    tokenizer: T,
    masker: TextMasker,
    max_evals: usize,
    batch_size: usize,
    fixed_context: FixedContext,
}

impl<S: ScoreFunction, T: Tokenize> PartitionExplainer<S, T> {
    pub fn new(scorer: S, tokenizer: T, collapse_mask_token: bool) -> Self {
        let masker = TextMasker::new(tokenizer.mask_token(), collapse_mask_token);
        Self {
            scorer,
            tokenizer,
            masker,
            max_evals: 500,
            batch_size: 10,
            fixed_context: FixedContext::One,
        }
    }

    /// Evaluation budget, including the all-masked and unmasked anchors.
    pub fn with_max_evals(mut self, max_evals: usize) -> Self {
        self.max_evals = max_evals.max(2);
        self
    }

    /// Coalitions per scoring call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_fixed_context(mut self, fixed_context: FixedContext) -> Self {
        self.fixed_context = fixed_context;
        self
    }

    /// Attribute the score of `text` to its model tokens.
    ///
    /// Any scoring failure aborts the whole explanation with
    /// [`XaiError::Explanation`].
    pub fn explain(&self, text: &str) -> Result<TokenExplanation> {
        self.run(text).map_err(XaiError::during_explanation)
    }

    fn run(&self, text: &str) -> Result<TokenExplanation> {
        let spans = self.tokenizer.tokenize(text)?;
        let m = spans.len();

        if m == 0 {
            let score = self.score_masks(text, &spans, &[Vec::new()])?[0];
            return Ok(TokenExplanation {
                base_value: score,
                output_value: score,
                record: AttributionRecord::new(ExplanationMethod::Shap, Vec::new()),
                evaluations: 1,
            });
        }

        let tokens: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
        let tree = PartitionTree::build(&tokens);
        let mut values = vec![0.0; tree.len()];

        let anchors = self.score_masks(text, &spans, &[vec![false; m], vec![true; m]])?;
        let (f00, f11) = (anchors[0], anchors[1]);
        let mut evaluations = 2;

        let mut queue = Queue::new();
        if let Some(root) = tree.root() {
            queue.push(root, vec![false; m], f00, f11, 1.0);
        }

        let per_call = self.batch_size.max(2);
        loop {
            let mut batch = Vec::new();
            let mut masks = Vec::new();

            while let Some(top) = queue.heap.peek() {
                match tree.node(top.node) {
                    Node::Leaf => {
                        if let Some(task) = queue.heap.pop() {
                            values[task.node] += task.remaining_credit();
                        }
                    }
                    Node::Group { left, right } => {
                        if masks.len() + 2 > per_call
                            || evaluations + masks.len() + 2 > self.max_evals
                        {
                            break;
                        }
                        let (left, right) = (*left, *right);
                        if let Some(task) = queue.heap.pop() {
                            let mut m10 = task.context.clone();
                            let mut m01 = task.context.clone();
                            tree.members(left).iter().for_each(|&i| m10[i] = true);
                            tree.members(right).iter().for_each(|&i| m01[i] = true);
                            masks.push(m10);
                            masks.push(m01);
                            batch.push((task, left, right));
                        }
                    }
                }
            }

            if batch.is_empty() {
                break;
            }

            let scores = self.score_masks(text, &spans, &masks)?;
            evaluations += masks.len();

            for ((task, left, right), (pair, children)) in batch
                .into_iter()
                .zip(scores.chunks(2).zip(masks.chunks(2)))
            {
                let (f10, f01) = (pair[0], pair[1]);
                let (m10, m01) = (&children[0], &children[1]);
                let interaction = (task.f11 - f10 - f01 + task.f00) * task.weight;
                let w = task.weight;

                match self.fixed_context {
                    FixedContext::One => {
                        values[task.node] -= interaction;
                        queue.push(left, m01.clone(), f01, task.f11, w);
                        queue.push(right, m10.clone(), f10, task.f11, w);
                    }
                    FixedContext::Zero => {
                        values[task.node] += interaction;
                        queue.push(left, task.context.clone(), task.f00, f10, w);
                        queue.push(right, task.context, task.f00, f01, w);
                    }
                    FixedContext::Averaged => {
                        let half = w / 2.0;
                        queue.push(left, task.context.clone(), task.f00, f10, half);
                        queue.push(left, m01.clone(), f01, task.f11, half);
                        queue.push(right, task.context, task.f00, f01, half);
                        queue.push(right, m10.clone(), f10, task.f11, half);
                    }
                }
            }
        }

        let unexpanded = queue.heap.len();
        for task in queue.heap.drain() {
            values[task.node] += task.remaining_credit();
        }

        lower_credit(&tree, &mut values);

        debug!(
            tokens = m,
            evaluations,
            unexpanded,
            base = f00,
            output = f11,
            "partition explanation finished"
        );

        let attributions = spans
            .iter()
            .zip(&values)
            .map(|(span, &weight)| Attribution {
                feature: text[span.start..span.end].to_string(),
                weight,
            })
            .collect();

        Ok(TokenExplanation {
            base_value: f00,
            output_value: f11,
            record: AttributionRecord::new(ExplanationMethod::Shap, attributions),
            evaluations,
        })
    }

    fn score_masks(&self, text: &str, spans: &[TokenSpan], masks: &[Vec<bool>]) -> Result<Vec<f64>> {
        let texts: Vec<String> = masks
            .iter()
            .map(|keep| self.masker.apply(text, spans, keep))
            .collect();
        let scores = self.scorer.score(&texts)?;

        if scores.len() != texts.len() {
            return Err(XaiError::Explanation(format!(
                "scoring function returned {} scores for {} inputs",
                scores.len(),
                texts.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(XaiError::Explanation(format!(
                "scoring function returned a non-finite score ({})",
                bad
            )));
        }
        Ok(scores)
    }
}

/// Push credit held by groups down to their leaves, proportional to size.
fn lower_credit(tree: &PartitionTree, values: &mut [f64]) {
    // children always precede their parent, so walking down from the root
    // visits every parent before its children
    for index in (tree.leaves()..tree.len()).rev() {
        if let Node::Group { left, right } = *tree.node(index) {
            let credit = std::mem::take(&mut values[index]);
            let size = tree.size(index) as f64;
            values[left] += credit * tree.size(left) as f64 / size;
            values[right] += credit * tree.size(right) as f64 / size;
        }
    }
}

/// Method A: Partition explanations of the positive-class log-odds.
pub struct ShapAdapter<M: ?Sized> {
    explainer: PartitionExplainer<LogOddsScorer<M>, Arc<M>>,
    max_display: usize,
}

impl<M: SentimentBackend + ?Sized> ShapAdapter<M> {
    pub fn new(model: Arc<M>, config: &ShapConfig) -> Self {
        let scorer = LogOddsScorer::new(model.clone(), config.sequence_length);
        let explainer = PartitionExplainer::new(scorer, model, config.collapse_mask_token)
            .with_max_evals(config.max_evals)
            .with_batch_size(config.batch_size)
            .with_fixed_context(FixedContext::One);
        Self {
            explainer,
            max_display: config.max_display,
        }
    }

    pub fn explain(&self, text: &str) -> Result<TokenExplanation> {
        self.explainer.explain(text)
    }

    /// Explain `text` and lay the result out as a waterfall chart.
    pub fn explain_and_plot(&self, text: &str) -> Result<(TokenExplanation, WaterfallChart)> {
        let explanation = self.explain(text)?;
        let chart = WaterfallChart::new(
            explanation.base_value,
            &explanation.record.attributions,
            self.max_display,
        );
        Ok((explanation, chart))
    }
}
