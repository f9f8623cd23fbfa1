use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::model::{FeatureMatrix, LabelSeries, PipelineError};

/// Two values closer than this are treated as the same split position.
const FEATURE_EPSILON: f64 = 1e-7;
const IMPURITY_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How training samples are weighted per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every sample weighs 1.
    None,
    /// Class `c` weighs `n / (2 * n_c)`, so both classes carry equal total weight.
    Balanced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub class_weight: ClassWeight,
    /// Seeds the order in which features are tried at each node.
    pub random_seed: u64,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            class_weight: ClassWeight::Balanced,
            random_seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf,
    /// Rows with `row[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub depth: usize,
    pub samples: usize,
    /// Class-weighted sample counts for labels 0 and 1.
    pub value: [f64; 2],
    pub impurity: f64,
    pub kind: NodeKind,
}

impl TreeNode {
    /// Majority class by weight; ties go to class 0.
    pub fn predicted_class(&self) -> u8 {
        if self.value[1] > self.value[0] { 1 } else { 0 }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }
}

fn gini(value: &[f64; 2]) -> f64 {
    let total = value[0] + value[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = value[0] / total;
    let p1 = value[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A fitted binary decision tree. Nodes live in an arena; index 0 is the root.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: DecisionTreeConfig,
    feature_names: Vec<String>,
    class_weights: [f64; 2],
    nodes: Vec<TreeNode>,
}

/// Borrowed training data plus per-sample weights, shared by the builder.
struct Builder<'a> {
    config: &'a DecisionTreeConfig,
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    weights: Vec<f64>,
    n_features: usize,
    rng: ChaCha8Rng,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Fit a tree on the training block.
    ///
    /// Fails with `PipelineError::Value` on an empty training set, mismatched
    /// lengths, ragged or non-finite feature rows, labels other than 0/1, or
    /// training labels that contain only one class.
    pub fn fit(config: &DecisionTreeConfig, x: &FeatureMatrix, y: &LabelSeries) -> Result<Self, PipelineError> {
        if x.is_empty() {
            return Err(PipelineError::Value("training set is empty".into()));
        }
        if x.len() != y.len() {
            return Err(PipelineError::Value(format!(
                "training features have {} rows but labels have {}",
                x.len(),
                y.len()
            )));
        }
        let n_features = x.feature_names.len();
        if n_features == 0 {
            return Err(PipelineError::Value("training set has no feature columns".into()));
        }
        for (i, row) in x.rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(PipelineError::Value(format!(
                    "training row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n_features
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::Value(format!("training row {} has a non-finite value", i)));
            }
        }

        let mut class_counts = [0usize; 2];
        for &label in &y.values {
            match label {
                0 | 1 => class_counts[label as usize] += 1,
                other => {
                    return Err(PipelineError::Value(format!("label {} is not a binary class", other)));
                }
            }
        }
        if class_counts[0] == 0 || class_counts[1] == 0 {
            return Err(PipelineError::Value(format!(
                "training labels contain a single class ({} no-laying, {} laying weeks)",
                class_counts[0], class_counts[1]
            )));
        }

        let n = y.len() as f64;
        let class_weights = match config.class_weight {
            ClassWeight::None => [1.0, 1.0],
            ClassWeight::Balanced => [
                n / (2.0 * class_counts[0] as f64),
                n / (2.0 * class_counts[1] as f64),
            ],
        };

        let mut builder = Builder {
            config,
            rows: &x.rows,
            labels: &y.values,
            weights: y.values.iter().map(|&l| class_weights[l as usize]).collect(),
            n_features,
            rng: ChaCha8Rng::seed_from_u64(config.random_seed),
            nodes: Vec::new(),
        };
        builder.grow((0..x.len()).collect(), 0);

        Ok(Self {
            config: config.clone(),
            feature_names: x.feature_names.clone(),
            class_weights,
            nodes: builder.nodes,
        })
    }

    /// Predict the class of one feature row. Callers check that the row has
    /// one value per training feature.
    pub(crate) fn predict_row(&self, row: &[f64]) -> u8 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            match node.kind {
                NodeKind::Leaf => return node.predicted_class(),
                NodeKind::Split { feature, threshold, left, right } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of `x`, in order.
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>, PipelineError> {
        if x.feature_names != self.feature_names {
            return Err(PipelineError::Value(format!(
                "model was trained on {:?} but received {:?}",
                self.feature_names, x.feature_names
            )));
        }
        x.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != self.feature_names.len() {
                    Err(PipelineError::Value(format!(
                        "row {} has {} values, expected {}",
                        i,
                        row.len(),
                        self.feature_names.len()
                    )))
                } else {
                    Ok(self.predict_row(row))
                }
            })
            .collect()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn config(&self) -> &DecisionTreeConfig {
        &self.config
    }

    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0).
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Indented text rendering of the tree, one rule or leaf per line:
    ///
    /// ```text
    /// |--- Temp_Lag_4w <= 17.55
    /// |   |--- class: Laying
    /// |--- Temp_Lag_4w >  17.55
    /// |   |--- class: No Laying
    /// ```
    pub fn export_text(&self, class_names: &[&str; 2]) -> String {
        let mut out = String::new();
        self.write_text(0, 0, class_names, &mut out);
        out
    }

    fn write_text(&self, idx: usize, level: usize, class_names: &[&str; 2], out: &mut String) {
        let node = &self.nodes[idx];
        let indent = "|   ".repeat(level);
        match node.kind {
            NodeKind::Leaf => {
                let class = class_names[node.predicted_class() as usize];
                out.push_str(&format!("{}|--- class: {}\n", indent, class));
            }
            NodeKind::Split { feature, threshold, left, right } => {
                let name = &self.feature_names[feature];
                out.push_str(&format!("{}|--- {} <= {:.2}\n", indent, name, threshold));
                self.write_text(left, level + 1, class_names, out);
                out.push_str(&format!("{}|--- {} >  {:.2}\n", indent, name, threshold));
                self.write_text(right, level + 1, class_names, out);
            }
        }
    }
}

impl Builder<'_> {
    fn node_value(&self, samples: &[usize]) -> [f64; 2] {
        let mut value = [0.0; 2];
        for &i in samples {
            value[self.labels[i] as usize] += self.weights[i];
        }
        value
    }

    /// Grow the subtree for `samples` and return its arena index.
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let value = self.node_value(&samples);
        let impurity = gini(&value);
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            depth,
            samples: samples.len(),
            value,
            impurity,
            kind: NodeKind::Leaf,
        });

        if depth >= self.config.max_depth
            || samples.len() < self.config.min_samples_split
            || impurity <= IMPURITY_EPSILON
        {
            return idx;
        }

        let Some(best) = self.best_split(&samples, &value) else {
            return idx;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.rows[i][best.feature] <= best.threshold);

        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx].kind = NodeKind::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    /// Lowest weighted impurity split of `samples`, even when it does not
    /// improve on the parent. `None` only when every feature is constant.
    ///
    /// Features are visited in a seeded random order; among equally good
    /// splits the first one visited wins.
    fn best_split(&mut self, samples: &[usize], parent: &[f64; 2]) -> Option<SplitCandidate> {
        let total_weight = parent[0] + parent[1];
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = samples.to_vec();

        for feature in features {
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left = [0.0; 2];
            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left[self.labels[i] as usize] += self.weights[i];

                let here = self.rows[i][feature];
                let next = self.rows[sorted[pos + 1]][feature];
                if next <= here + FEATURE_EPSILON {
                    continue;
                }

                let right = [parent[0] - left[0], parent[1] - left[1]];
                let left_weight = left[0] + left[1];
                let right_weight = right[0] + right[1];
                let child_impurity =
                    (left_weight * gini(&left) + right_weight * gini(&right)) / total_weight;

                let better = match &best {
                    Some(b) => child_impurity < b.child_impurity - IMPURITY_EPSILON,
                    None => true,
                };
                if better {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        child_impurity,
                    });
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
