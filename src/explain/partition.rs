//! Token hierarchy for the Partition explainer.
//!
//! Tokens are merged bottom-up into a binary tree: at each step the adjacent
//! pair of groups with the highest merge score is joined. Word pieces glue
//! together first, apostrophe endings next, while crossing commas, sentence
//! ends and connectors is pushed toward the top of the tree.
//!
//! Node indices follow the usual linkage layout: leaves are `0..m`, the
//! `m - 1` internal nodes follow in merge order, and the root is last.

const CONNECTORS: &[&str] = &["and", "or", "but", "so", "because", "-", "/"];
const OPENERS: &[&str] = &["(", "[", "{", "\""];
const CLOSERS: &[&str] = &[")", "]", "}", "\""];
const SENTENCE_ENDS: &[&str] = &[".", "?", "!"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf,
    Group { left: usize, right: usize },
}

#[derive(Debug, Clone)]
pub struct PartitionTree {
    nodes: Vec<Node>,
    /// Leaves under each node, in text order.
    members: Vec<Vec<usize>>,
    leaves: usize,
}

struct Pending {
    node: usize,
    tokens: Vec<usize>,
}

impl PartitionTree {
    /// Build the hierarchy over `tokens` (lower-cased model tokens).
    pub fn build(tokens: &[String]) -> Self {
        let m = tokens.len();
        let mut nodes = vec![Node::Leaf; m];
        let mut members: Vec<Vec<usize>> = (0..m).map(|i| vec![i]).collect();
        let mut groups: Vec<Pending> = (0..m)
            .map(|i| Pending {
                node: i,
                tokens: vec![i],
            })
            .collect();

        while groups.len() > 1 {
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for i in 0..groups.len() - 1 {
                let score = merge_score(tokens, &groups[i].tokens, &groups[i + 1].tokens);
                if score > best_score {
                    best = i;
                    best_score = score;
                }
            }

            let right = groups.remove(best + 1);
            let left = &mut groups[best];
            let node = nodes.len();
            nodes.push(Node::Group {
                left: left.node,
                right: right.node,
            });
            let mut under = members[left.node].clone();
            under.extend_from_slice(&members[right.node]);
            members.push(under);

            left.node = node;
            left.tokens.extend(right.tokens);
        }

        Self {
            nodes,
            members,
            leaves: m,
        }
    }

    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the root; `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn members(&self, index: usize) -> &[usize] {
        &self.members[index]
    }

    pub fn size(&self, index: usize) -> usize {
        self.members[index].len()
    }
}

fn is(token: &str, set: &[&str]) -> bool {
    set.contains(&token)
}

fn merge_score(tokens: &[String], left: &[usize], right: &[usize]) -> f64 {
    let first_right = tokens[right[0]].as_str();
    let last_left = tokens[left[left.len() - 1]].as_str();
    let first_left = tokens[left[0]].as_str();
    let last_right = tokens[right[right.len() - 1]].as_str();
    let mut score = 0.0;

    // word pieces belong to the word they continue
    if first_right.starts_with("##") {
        score += 20.0;
    }

    // apostrophe endings: don ' t, it ' s
    if first_right == "'"
        && (right.len() == 1 || (right.len() == 2 && is(tokens[right[1]].as_str(), &["t", "s"])))
    {
        score += 15.0;
    }
    if last_left == "'" && is(first_right, &["t", "s"]) {
        score += 15.0;
    }

    if is(first_right, OPENERS) && right.len() == 1 {
        score -= 100.0;
    }
    if is(last_left, CLOSERS) && left.len() == 1 && !is(first_left, OPENERS) {
        score -= 100.0;
    }
    if is(first_left, OPENERS) && !is(last_right, CLOSERS) {
        score -= 2.0;
    }

    if is(last_left, CONNECTORS) || is(first_right, CONNECTORS) {
        score -= 2.0;
    }

    if last_left == "," {
        score -= 10.0;
    }
    if first_right == "," {
        score -= if right.len() > 1 { 10.0 } else { 1.0 };
    }

    if is(last_left, SENTENCE_ENDS) {
        score -= 20.0;
    }
    if is(first_right, SENTENCE_ENDS) {
        score -= if right.len() > 1 { 20.0 } else { 1.0 };
    }

    score - (left.len() + right.len()) as f64
}
