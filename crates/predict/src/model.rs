//! Trained regressors.
//!
//! A model artifact is a JSON document exported from the training pipeline.
//! Two kinds are understood: a linear pipeline (optional standard scaler +
//! coefficients, as fitted by OLS/ridge) and an additive tree ensemble.

use serde::Deserialize;

use crate::error::PredictError;

/// A fitted model: complete ordered feature vector in, one scalar out.
pub trait Regressor: Send + Sync + std::fmt::Debug {
    /// Number of input columns the model was fitted on.
    fn n_features(&self) -> usize;

    /// Evaluate a single row. `row.len()` has already been checked.
    fn predict_row(&self, row: &[f64]) -> Result<f64, PredictError>;
}

// ---------------------------------------------------------------------------
// Linear pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl LinearModel {
    fn validate(&self) -> Result<(), PredictError> {
        let n = self.coefficients.len();
        if n == 0 {
            return Err(PredictError::artifact("model", "linear model has no coefficients"));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictError::artifact("model", "linear model has non-finite weights"));
        }
        if let Some(ref scaler) = self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(PredictError::artifact(
                    "model",
                    format!(
                        "scaler has {}/{} entries for {n} coefficients",
                        scaler.mean.len(),
                        scaler.scale.len()
                    ),
                ));
            }
            if scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(PredictError::artifact("model", "scaler has a zero or non-finite scale"));
            }
        }
        Ok(())
    }
}

fn check_row_len(expected: usize, row: &[f64]) -> Result<(), PredictError> {
    if row.len() != expected {
        return Err(PredictError::Inference(format!(
            "model expects {expected} features, got {}",
            row.len()
        )));
    }
    Ok(())
}

impl Regressor for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64, PredictError> {
        check_row_len(self.coefficients.len(), row)?;
        let mut acc = self.intercept;
        match self.scaler {
            Some(ref s) => {
                for (i, x) in row.iter().enumerate() {
                    acc += self.coefficients[i] * (x - s.mean[i]) / s.scale[i];
                }
            }
            None => {
                for (x, w) in row.iter().zip(&self.coefficients) {
                    acc += w * x;
                }
            }
        }
        Ok(acc)
    }
}

// ---------------------------------------------------------------------------
// Tree ensemble
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `row[feature] < threshold` goes left, otherwise right.
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { leaf: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

fn default_learning_rate() -> f64 {
    1.0
}

impl TreeEnsemble {
    fn validate(&self) -> Result<(), PredictError> {
        if self.n_features == 0 {
            return Err(PredictError::artifact("model", "tree ensemble declares 0 features"));
        }
        if self.trees.is_empty() {
            return Err(PredictError::artifact("model", "tree ensemble has no trees"));
        }
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(PredictError::artifact("model", "non-finite base score or learning rate"));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(PredictError::artifact("model", format!("tree {t} has no nodes")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match *node {
                    // Children must point forward, which also rules out cycles.
                    TreeNode::Split { feature, threshold, left, right } => {
                        if feature >= self.n_features {
                            return Err(PredictError::artifact(
                                "model",
                                format!("tree {t} node {i}: feature {feature} out of range"),
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(PredictError::artifact(
                                "model",
                                format!("tree {t} node {i}: non-finite threshold"),
                            ));
                        }
                        for child in [left, right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(PredictError::artifact(
                                    "model",
                                    format!("tree {t} node {i}: bad child index {child}"),
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { leaf } => {
                        if !leaf.is_finite() {
                            return Err(PredictError::artifact(
                                "model",
                                format!("tree {t} node {i}: non-finite leaf"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Tree {
    fn evaluate(&self, row: &[f64]) -> Result<f64, PredictError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { leaf }) => return Ok(*leaf),
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        PredictError::Inference(format!(
                            "split on feature {feature} but row has {} value(s)",
                            row.len()
                        ))
                    })?;
                    idx = if *value < *threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictError::Inference(format!("tree has no node {idx}")));
                }
            }
        }
    }
}

impl Regressor for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64, PredictError> {
        check_row_len(self.n_features, row)?;
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(row)?;
        }
        Ok(self.base_score + self.learning_rate * sum)
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelParams {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    version: String,
    #[serde(flatten)]
    params: ModelParams,
}

/// A loaded model artifact together with the version it was exported under.
#[derive(Debug)]
pub struct TrainedModel {
    pub version: String,
    pub kind: &'static str,
    regressor: Box<dyn Regressor>,
}

impl TrainedModel {
    pub fn new(version: impl Into<String>, regressor: Box<dyn Regressor>) -> Self {
        Self { version: version.into(), kind: "custom", regressor }
    }

    pub fn from_json(input: &str) -> Result<Self, PredictError> {
        let file: ModelFile = serde_json::from_str(input)
            .map_err(|e| PredictError::artifact("model", e.to_string()))?;

        let (kind, regressor): (&'static str, Box<dyn Regressor>) = match file.params {
            ModelParams::Linear(m) => {
                m.validate()?;
                ("linear", Box::new(m))
            }
            ModelParams::TreeEnsemble(m) => {
                m.validate()?;
                ("tree_ensemble", Box::new(m))
            }
        };

        Ok(Self { version: file.version, kind, regressor })
    }

    pub fn n_features(&self) -> usize {
        self.regressor.n_features()
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }
}
