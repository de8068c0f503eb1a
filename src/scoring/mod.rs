//! Record scoring and classification.
//!
//! [`ScoringModelManager`] routes each record either to an empirical model
//! (when one is loaded and the record is usable) or to the threshold filters in
//! [`default_classify_site`] / [`default_classify_indel`]. Models are loaded
//! once into an immutable [`ScoringModels`] and shared by `Arc`.

mod default_filters;
mod features;
mod manager;
mod model;

pub use default_filters::{default_classify_indel, default_classify_site};
pub use features::{indel_features, site_features, INDEL_FEATURES, SNV_FEATURES};
pub use manager::{refined_gqx, ScoringModelManager, MAX_EMPIRICAL_SCORE};
pub use model::{
    load_model, load_model_from_str, DecisionTree, LogisticModel, ModelError, RandomForestModel,
    ScoringModels, TreeNode, VariantScoringModel, VariantType,
};
