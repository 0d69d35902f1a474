//! `hearth-predict` - feature reconciliation and price inference.
//!
//! Pure engine crate: takes a partial, human-entered set of house attributes,
//! builds the complete ordered feature vector a fixed-schema regression model
//! expects, evaluates the model, and turns the output into a display price.
//! No HTTP or CLI dependencies.

pub mod collect;
pub mod config;
pub mod defaults;
pub mod encoding;
pub mod error;
pub mod model;
pub mod predictor;
pub mod price;
pub mod reconcile;
pub mod schema;

pub use collect::{RawForm, RawValue, UserInputSet};
pub use config::DeploymentConfig;
pub use defaults::DefaultTable;
pub use encoding::{CategoricalMapping, CategoricalTables, LogFeatureSet, ModelMetadata};
pub use error::{PredictError, Stage};
pub use model::{Regressor, TrainedModel};
pub use predictor::{Artifacts, InputField, InputKind, Prediction, Predictor};
pub use price::{finalize_price, format_price, predict};
pub use reconcile::{reconcile, MissingPolicy};
pub use schema::FeatureSchema;
