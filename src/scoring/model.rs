use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ScoringOptions;
use crate::scoring::{INDEL_FEATURES, SNV_FEATURES};

/// Errors raised while loading a scoring model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Model file unreadable.
    #[error("failed to read scoring model {path}: {source}")]
    Io {
        /// Model file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Model document is not valid JSON for any known model.
    #[error("malformed scoring model: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Model built for another variant type.
    #[error("scoring model is for {found} variants, expected {expected}")]
    WrongVariantType {
        /// Type the caller needs.
        expected: VariantType,
        /// Type declared by the document.
        found: VariantType,
    },

    /// Model features differ from the features the caller computes.
    #[error("scoring model features {found:?} do not match expected {expected:?}")]
    FeatureMismatch {
        /// Features the caller computes.
        expected: Vec<String>,
        /// Features declared by the document.
        found: Vec<String>,
    },

    /// Structurally invalid model parameters.
    #[error("invalid scoring model: {0}")]
    Invalid(String),
}

/// Variant class a model scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    /// Single-nucleotide variants.
    Snv,
    /// Insertions and deletions.
    Indel,
}

impl VariantType {
    /// Ordered feature names the caller computes for this type.
    pub fn feature_names(self) -> &'static [&'static str] {
        match self {
            VariantType::Snv => SNV_FEATURES,
            VariantType::Indel => INDEL_FEATURES,
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantType::Snv => write!(f, "SNV"),
            VariantType::Indel => write!(f, "indel"),
        }
    }
}

/// Empirical model mapping a feature vector to an error probability.
pub trait VariantScoringModel: Send + Sync + fmt::Debug {
    /// Variant type the model was trained for.
    fn variant_type(&self) -> VariantType;

    /// Ordered feature names the model expects.
    fn feature_names(&self) -> &[String];

    /// Probability in `[0, 1]` that the variant is an error.
    fn score_variant(&self, features: &[f64]) -> f64;
}

/// Logistic regression over the feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Variant type scored.
    pub variant_type: VariantType,
    /// Ordered feature names.
    pub features: Vec<String>,
    /// Linear term offset.
    pub intercept: f64,
    /// One coefficient per feature.
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    fn check(&self) -> Result<(), ModelError> {
        if self.coefficients.len() != self.features.len() {
            return Err(ModelError::Invalid(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.features.len()
            )));
        }
        Ok(())
    }
}

impl VariantScoringModel for LogisticModel {
    fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn score_variant(&self, features: &[f64]) -> f64 {
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(coef, x)| coef * x)
                .sum::<f64>();
        // z is the log-odds of a true variant
        let p_true = 1.0 / (1.0 + (-z).exp());
        (1.0 - p_true).clamp(0.0, 1.0)
    }
}

/// Decision tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `features[feature] <= threshold`, else `right`.
    Split {
        /// Feature index.
        feature: usize,
        /// Split value.
        threshold: f64,
        /// Child index, must be greater than this node's index.
        left: usize,
        /// Child index, must be greater than this node's index.
        right: usize,
    },
    /// Terminal error probability.
    Leaf {
        /// Error probability of the leaf.
        error_prob: f64,
    },
}

/// One tree of a [`RandomForestModel`], root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Nodes in topological order.
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn check(&self, feature_count: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("empty decision tree".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= feature_count {
                        return Err(ModelError::Invalid(format!(
                            "split on feature {feature} of {feature_count}"
                        )));
                    }
                    for child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "node {index} has invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { error_prob } => {
                    if !(0.0..=1.0).contains(&error_prob) {
                        return Err(ModelError::Invalid(format!(
                            "leaf {index} error probability {error_prob}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { error_prob }) => return *error_prob,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
                None => return 1.0,
            }
        }
    }
}

/// Average of decision tree error probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Variant type scored.
    pub variant_type: VariantType,
    /// Ordered feature names.
    pub features: Vec<String>,
    /// Trees of the forest.
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    fn check(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("random forest without trees".to_string()));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.check(self.features.len()))
    }
}

impl VariantScoringModel for RandomForestModel {
    fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn score_variant(&self, features: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        (total / self.trees.len() as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
enum ModelDocument {
    Logistic(LogisticModel),
    RandomForest(RandomForestModel),
}

/// Parse a model document and check it against the caller's features.
pub fn load_model_from_str(
    json: &str,
    expected: VariantType,
) -> Result<Box<dyn VariantScoringModel>, ModelError> {
    let model: Box<dyn VariantScoringModel> = match serde_json::from_str(json)? {
        ModelDocument::Logistic(model) => {
            model.check()?;
            Box::new(model)
        }
        ModelDocument::RandomForest(model) => {
            model.check()?;
            Box::new(model)
        }
    };

    if model.variant_type() != expected {
        return Err(ModelError::WrongVariantType {
            expected,
            found: model.variant_type(),
        });
    }
    let expected_names = expected.feature_names();
    let found = model.feature_names();
    if found.len() != expected_names.len() || found.iter().zip(expected_names).any(|(a, b)| a != b) {
        return Err(ModelError::FeatureMismatch {
            expected: expected_names.iter().map(|name| name.to_string()).collect(),
            found: found.to_vec(),
        });
    }
    Ok(model)
}

/// Read a model document from `path`.
pub fn load_model(path: &Path, expected: VariantType) -> Result<Box<dyn VariantScoringModel>, ModelError> {
    let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model = load_model_from_str(&json, expected)?;
    debug!(path = %path.display(), variant_type = %expected, "loaded scoring model");
    Ok(model)
}

/// Immutable set of loaded models shared across contig workers.
#[derive(Debug, Default)]
pub struct ScoringModels {
    snv: Option<Box<dyn VariantScoringModel>>,
    indel: Option<Box<dyn VariantScoringModel>>,
}

impl ScoringModels {
    /// No empirical models; every record takes the default filters.
    pub fn none() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Load the models named by `options`.
    pub fn load(options: &ScoringOptions) -> Result<Arc<Self>, ModelError> {
        let snv = options
            .snv_model
            .as_deref()
            .map(|path| load_model(path, VariantType::Snv))
            .transpose()?;
        let indel = options
            .indel_model
            .as_deref()
            .map(|path| load_model(path, VariantType::Indel))
            .transpose()?;
        Ok(Arc::new(Self { snv, indel }))
    }

    /// Models built directly.
    pub fn from_models(
        snv: Option<Box<dyn VariantScoringModel>>,
        indel: Option<Box<dyn VariantScoringModel>>,
    ) -> Arc<Self> {
        Arc::new(Self { snv, indel })
    }

    /// SNV model, if any.
    pub fn snv(&self) -> Option<&dyn VariantScoringModel> {
        self.snv.as_deref()
    }

    /// Indel model, if any.
    pub fn indel(&self) -> Option<&dyn VariantScoringModel> {
        self.indel.as_deref()
    }
}
