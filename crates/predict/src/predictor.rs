use std::path::Path;

use serde::Serialize;

use crate::collect::{collect, RawForm, UserInputSet};
use crate::config::DeploymentConfig;
use crate::defaults::DefaultTable;
use crate::encoding::{from_log_space, ModelMetadata};
use crate::error::PredictError;
use crate::model::TrainedModel;
use crate::price::{finalize_price, format_price, predict};
use crate::reconcile::{reconcile, MissingPolicy};
use crate::schema::FeatureSchema;

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Everything loaded from disk at startup.
#[derive(Debug)]
pub struct Artifacts {
    pub schema: FeatureSchema,
    pub defaults: DefaultTable,
    pub metadata: ModelMetadata,
    pub model: TrainedModel,
    /// Subset of the schema exposed as user inputs. `None` exposes every feature.
    pub top_features: Option<Vec<String>>,
}

impl Artifacts {
    /// Load every artifact named in `config`, resolving paths against `base_dir`.
    pub fn load(config: &DeploymentConfig, base_dir: &Path) -> Result<Self, PredictError> {
        let paths = &config.artifacts;

        let schema = FeatureSchema::from_json(&read_artifact("schema", base_dir, &paths.schema)?)?;

        let defaults_src = read_artifact("defaults", base_dir, &paths.defaults)?;
        let defaults = if paths.defaults.to_ascii_lowercase().ends_with(".csv") {
            DefaultTable::from_csv(&defaults_src)?
        } else {
            DefaultTable::from_json(&defaults_src)?
        };

        let metadata =
            ModelMetadata::from_json(&read_artifact("metadata", base_dir, &paths.metadata)?)?;
        let model = TrainedModel::from_json(&read_artifact("model", base_dir, &paths.model)?)?;

        let top_features = match paths.top_features {
            Some(ref file) => {
                let src = read_artifact("top_features", base_dir, file)?;
                let names: Vec<String> = serde_json::from_str(&src)
                    .map_err(|e| PredictError::artifact("top_features", e.to_string()))?;
                Some(names)
            }
            None => None,
        };

        log::info!(
            "loaded artifacts for '{}': {} features, {} defaults, {} model v{}",
            config.name,
            schema.len(),
            defaults.len(),
            model.kind,
            model.version
        );

        Ok(Self { schema, defaults, metadata, model, top_features })
    }
}

fn read_artifact(artifact: &str, base_dir: &Path, file: &str) -> Result<String, PredictError> {
    let path = DeploymentConfig::resolve(base_dir, file);
    std::fs::read_to_string(&path)
        .map_err(|e| PredictError::artifact(artifact, format!("cannot read {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Numeric,
    /// Entered as a real magnitude, stored as log1p.
    Log,
    Categorical,
}

/// One user-facing input, as a form or CLI should present it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputField {
    pub name: String,
    pub kind: InputKind,
    /// The stored default in user-facing terms (real magnitude or label).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub price: f64,
    pub display: String,
    pub raw: f64,
    pub label_is_log_transformed: bool,
    pub model: String,
    pub model_version: String,
    pub predicted_at: String,
    #[serde(skip)]
    pub vector: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// Process-wide, read-only prediction state. Share it behind an `Arc`.
#[derive(Debug)]
pub struct Predictor {
    name: String,
    label_is_log_transformed: bool,
    missing: MissingPolicy,
    schema: FeatureSchema,
    defaults: DefaultTable,
    metadata: ModelMetadata,
    model: TrainedModel,
    exposed: Vec<String>,
}

impl Predictor {
    /// Assemble a predictor, cross-checking the artifacts against each other.
    pub fn new(
        name: impl Into<String>,
        artifacts: Artifacts,
        label_is_log_transformed: bool,
        missing: MissingPolicy,
    ) -> Result<Self, PredictError> {
        let Artifacts { schema, defaults, metadata, model, top_features } = artifacts;

        if metadata.version != model.version {
            return Err(PredictError::artifact(
                "metadata",
                format!(
                    "metadata version '{}' does not match model version '{}'",
                    metadata.version, model.version
                ),
            ));
        }

        if model.n_features() != schema.len() {
            return Err(PredictError::artifact(
                "model",
                format!(
                    "model expects {} features but schema lists {}",
                    model.n_features(),
                    schema.len()
                ),
            ));
        }

        for feature in metadata.categorical.features().chain(metadata.log_features.iter()) {
            if !schema.contains(feature) {
                return Err(PredictError::artifact(
                    "metadata",
                    format!("encoded feature '{feature}' is not in the schema"),
                ));
            }
        }

        let exposed = match top_features {
            Some(names) => {
                let mut seen = std::collections::HashSet::new();
                for name in &names {
                    if !schema.contains(name) {
                        return Err(PredictError::artifact(
                            "top_features",
                            format!("'{name}' is not in the schema"),
                        ));
                    }
                    if !seen.insert(name.as_str()) {
                        return Err(PredictError::artifact(
                            "top_features",
                            format!("'{name}' listed twice"),
                        ));
                    }
                }
                names
            }
            None => schema.names().to_vec(),
        };

        if missing == MissingPolicy::Zero {
            let uncovered = schema.iter().filter(|n| defaults.get(n).is_none()).count();
            if uncovered > 0 {
                log::warn!("{uncovered} schema feature(s) have no default and will be filled with 0");
            }
        }

        Ok(Self {
            name: name.into(),
            label_is_log_transformed,
            missing,
            schema,
            defaults,
            metadata,
            model,
            exposed,
        })
    }

    /// Load artifacts for a parsed config.
    pub fn from_config(config: &DeploymentConfig, base_dir: &Path) -> Result<Self, PredictError> {
        let artifacts = Artifacts::load(config, base_dir)?;
        Self::new(&config.name, artifacts, config.label_is_log_transformed, config.missing)
    }

    /// Read a config file and load everything it names.
    pub fn from_config_path(path: &Path) -> Result<Self, PredictError> {
        let config = DeploymentConfig::from_path(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_config(&config, base_dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn label_is_log_transformed(&self) -> bool {
        self.label_is_log_transformed
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing
    }

    pub fn exposed(&self) -> &[String] {
        &self.exposed
    }

    /// Translate raw user values into their numeric form.
    pub fn collect(&self, form: &RawForm) -> Result<UserInputSet, PredictError> {
        collect(form, &self.exposed, &self.metadata.categorical, &self.metadata.log_features)
    }

    /// Build the ordered model input for already-collected values.
    pub fn reconcile(&self, inputs: &UserInputSet) -> Result<Vec<f64>, PredictError> {
        reconcile(
            &self.schema,
            &self.defaults,
            inputs,
            &self.metadata.categorical,
            &self.metadata.log_features,
            self.missing,
        )
    }

    /// Full request path: collect, reconcile, predict, finalize.
    pub fn run(&self, form: &RawForm) -> Result<Prediction, PredictError> {
        let inputs = self.collect(form)?;
        let vector = self.reconcile(&inputs)?;
        let raw = predict(&self.model, &vector)?;
        let price = finalize_price(raw, self.label_is_log_transformed)?;

        log::debug!("'{}': {} supplied input(s) -> raw {raw:.6} -> {price:.2}", self.name, inputs.len());

        Ok(Prediction {
            price,
            display: format_price(price),
            raw,
            label_is_log_transformed: self.label_is_log_transformed,
            model: self.name.clone(),
            model_version: self.model.version.clone(),
            predicted_at: chrono::Utc::now().to_rfc3339(),
            vector,
        })
    }

    /// Describe the exposed inputs with their defaults in user-facing terms.
    pub fn inputs(&self) -> Vec<InputField> {
        self.exposed
            .iter()
            .map(|name| {
                let stored = self.defaults.get(name);
                if let Some(mapping) = self.metadata.categorical.get(name) {
                    InputField {
                        name: name.clone(),
                        kind: InputKind::Categorical,
                        default: stored
                            .and_then(|v| mapping.label_for(v.round() as i64))
                            .map(str::to_string),
                        options: mapping.labels().into_iter().map(str::to_string).collect(),
                    }
                } else if self.metadata.log_features.contains(name) {
                    InputField {
                        name: name.clone(),
                        kind: InputKind::Log,
                        default: stored.map(|v| display_number(from_log_space(v))),
                        options: Vec::new(),
                    }
                } else {
                    InputField {
                        name: name.clone(),
                        kind: InputKind::Numeric,
                        default: stored.map(display_number),
                        options: Vec::new(),
                    }
                }
            })
            .collect()
    }
}

/// Two decimals at most, trailing zeros dropped: `1500`, `7.31`.
fn display_number(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".into()
    } else {
        s.to_string()
    }
}
