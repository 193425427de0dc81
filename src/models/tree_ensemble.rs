//! Native evaluator for XGBoost JSON models
//!
//! Reads the document written by `Booster.save_model("model.json")` and
//! evaluates it without linking libxgboost. Only binary `gbtree` boosters with
//! a logistic link are accepted; everything else is rejected at load time.

use crate::error::{ArtifactError, InferenceError};
use crate::models::classifier::{dense_row, Classifier};
use crate::types::record::RecordBatch;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const SUPPORTED_OBJECTIVES: [&str; 2] = ["binary:logistic", "reg:logistic"];

#[derive(Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Deserialize)]
struct XgbLearner {
    #[serde(default)]
    attributes: XgbAttributes,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbGradientBooster,
    learner_model_param: XgbModelParam,
    objective: XgbObjective,
}

/// Set by early stopping; prediction only uses rounds up to and including it
#[derive(Deserialize, Default)]
struct XgbAttributes {
    #[serde(default)]
    best_iteration: Option<String>,
}

#[derive(Deserialize)]
struct XgbGradientBooster {
    name: String,
    #[serde(default)]
    model: Option<XgbGbtreeModel>,
}

#[derive(Deserialize)]
struct XgbGbtreeModel {
    #[serde(default)]
    gbtree_model_param: Option<XgbGbtreeParam>,
    /// Tree offset of each boosting round, written by 1.6+
    #[serde(default)]
    iteration_indptr: Vec<usize>,
    trees: Vec<XgbTree>,
}

#[derive(Deserialize)]
struct XgbGbtreeParam {
    #[serde(default)]
    num_parallel_tree: Option<String>,
}

#[derive(Deserialize)]
struct XgbTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// `default_left` is written as 0/1 by older releases and as booleans by newer ones
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// XGBoost serializes scalar model params as strings
#[derive(Deserialize)]
struct XgbModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Deserialize)]
struct XgbObjective {
    name: String,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        condition: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

/// A single regression tree. Children always sit after their parent, so
/// traversal from the root terminates.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_xgb(
        raw: XgbTree,
        num_feature: usize,
        tree_id: usize,
        path: &Path,
    ) -> Result<Self, ArtifactError> {
        let n = raw.left_children.len();
        if n == 0 {
            return Err(ArtifactError::malformed(path, format!("tree {} has no nodes", tree_id)));
        }
        let lengths = [
            raw.right_children.len(),
            raw.split_indices.len(),
            raw.split_conditions.len(),
            raw.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(ArtifactError::malformed(
                path,
                format!("tree {} has per-node arrays of differing lengths", tree_id),
            ));
        }
        if raw.split_type.iter().any(|&t| t != 0) {
            return Err(ArtifactError::unsupported(
                path,
                format!("tree {} uses categorical splits", tree_id),
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for idx in 0..n {
            let left = raw.left_children[idx];
            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[idx]));
                continue;
            }

            let right = raw.right_children[idx];
            let child_ok = |c: i32| c > idx as i32 && (c as usize) < n;
            if !child_ok(left) || !child_ok(right) {
                return Err(ArtifactError::malformed(
                    path,
                    format!("tree {} node {} has invalid children ({}, {})", tree_id, idx, left, right),
                ));
            }

            let feature = raw.split_indices[idx];
            if feature < 0 || feature as usize >= num_feature {
                return Err(ArtifactError::malformed(
                    path,
                    format!(
                        "tree {} node {} splits on feature {} but the model has {} features",
                        tree_id, idx, feature, num_feature
                    ),
                ));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                condition: raw.split_conditions[idx],
                left: left as usize,
                right: right as usize,
                default_left: raw.default_left[idx].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    condition,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[feature];
                    idx = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if x < condition {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gradient boosted tree ensemble with a logistic link.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    feature_names: Vec<String>,
    trees: Vec<Tree>,
    base_margin: f32,
}

impl TreeEnsemble {
    /// Load an XGBoost JSON model from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::parse(&text, path)?;

        info!(
            path = %path.display(),
            trees = model.num_trees(),
            features = model.feature_names.len(),
            "XGBoost model loaded"
        );

        Ok(model)
    }

    /// Parse an XGBoost JSON document. `origin` is only used in error messages.
    pub fn parse(json: &str, origin: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = origin.as_ref();
        let doc: XgbDocument = serde_json::from_str(json).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let learner = doc.learner;

        let objective = learner.objective.name.as_str();
        if !SUPPORTED_OBJECTIVES.contains(&objective) {
            return Err(ArtifactError::unsupported(
                path,
                format!("objective `{}` does not produce probabilities", objective),
            ));
        }

        let params = &learner.learner_model_param;
        let num_class = match &params.num_class {
            Some(raw) => parse_param::<u32>(raw, "num_class", path)?,
            None => 0,
        };
        if num_class > 1 {
            return Err(ArtifactError::unsupported(
                path,
                format!("{} classes, only binary models are supported", num_class),
            ));
        }

        let num_feature = parse_param::<usize>(&params.num_feature, "num_feature", path)?;
        let base_score = parse_param::<f32>(
            params.base_score.trim_matches(&['[', ']'][..]),
            "base_score",
            path,
        )?;
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ArtifactError::malformed(
                path,
                format!("base_score {} is not a probability in (0, 1)", base_score),
            ));
        }

        let feature_names = if learner.feature_names.is_empty() {
            (0..num_feature).map(|i| format!("f{}", i)).collect()
        } else if learner.feature_names.len() == num_feature {
            learner.feature_names
        } else {
            return Err(ArtifactError::malformed(
                path,
                format!(
                    "{} feature names for {} features",
                    learner.feature_names.len(),
                    num_feature
                ),
            ));
        };

        let booster = learner.gradient_booster;
        if booster.name != "gbtree" {
            return Err(ArtifactError::unsupported(
                path,
                format!("booster `{}`, only gbtree is supported", booster.name),
            ));
        }
        let model = booster
            .model
            .ok_or_else(|| ArtifactError::malformed(path, "gbtree booster has no model"))?;

        let used = match &learner.attributes.best_iteration {
            Some(raw) => {
                let best = parse_param::<usize>(raw, "best_iteration", path)?;
                trees_through_round(&model, best, path)?
            }
            None => model.trees.len(),
        };

        let trees = model
            .trees
            .into_iter()
            .take(used)
            .enumerate()
            .map(|(id, raw)| Tree::from_xgb(raw, num_feature, id, path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            feature_names,
            trees,
            base_margin: logit(base_score),
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin for a dense row in model column order
    pub fn margin(&self, row: &[f32]) -> f32 {
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(row))
    }

    /// Positive-class probability for a dense row in model column order
    pub fn predict_row(&self, row: &[f32]) -> f64 {
        sigmoid(self.margin(row)) as f64
    }
}

impl Classifier for TreeEnsemble {
    fn name(&self) -> &str {
        "xgboost"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<f64>, InferenceError> {
        let probs = batch
            .iter()
            .enumerate()
            .map(|(i, record)| {
                dense_row(&self.feature_names, record, i).map(|row| self.predict_row(&row))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = probs.len(), trees = self.trees.len(), "Tree ensemble scored batch");
        Ok(probs)
    }
}

/// Number of trees making up boosting rounds `0..=best`
fn trees_through_round(model: &XgbGbtreeModel, best: usize, path: &Path) -> Result<usize, ArtifactError> {
    let end = if model.iteration_indptr.is_empty() {
        let per_round = match model
            .gbtree_model_param
            .as_ref()
            .and_then(|p| p.num_parallel_tree.as_deref())
        {
            Some(raw) => parse_param::<usize>(raw, "num_parallel_tree", path)?.max(1),
            None => 1,
        };
        (best + 1) * per_round
    } else {
        *model.iteration_indptr.get(best + 1).ok_or_else(|| {
            ArtifactError::malformed(
                path,
                format!(
                    "best_iteration {} is past the {} recorded rounds",
                    best,
                    model.iteration_indptr.len().saturating_sub(1)
                ),
            )
        })?
    };

    if end > model.trees.len() {
        return Err(ArtifactError::malformed(
            path,
            format!(
                "best_iteration {} needs {} trees but the model has {}",
                best,
                end,
                model.trees.len()
            ),
        ));
    }
    Ok(end)
}

fn parse_param<T: std::str::FromStr>(raw: &str, name: &str, path: &Path) -> Result<T, ArtifactError> {
    raw.trim()
        .parse()
        .map_err(|_| ArtifactError::malformed(path, format!("invalid {} `{}`", name, raw)))
}

fn logit(p: f32) -> f32 {
    -(1.0 / p - 1.0).ln()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
