use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty name, empty artifact path, etc.).
    ConfigValidation(String),
    /// A persisted artifact is missing, corrupt, or inconsistent with the others.
    ArtifactLoad { artifact: String, message: String },
    /// A user-supplied value could not be translated into its numeric form.
    InputTranslation { feature: String, message: String },
    /// Reconciled vector does not line up with the feature schema.
    SchemaMismatch(String),
    /// The model call itself failed.
    Inference(String),
}

/// Pipeline stage an error belongs to. Reported to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Startup,
    Collection,
    Reconciliation,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::Collection => write!(f, "collection"),
            Self::Reconciliation => write!(f, "reconciliation"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

impl PredictError {
    pub fn artifact(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArtifactLoad { artifact: artifact.into(), message: message.into() }
    }

    pub fn translation(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputTranslation { feature: feature.into(), message: message.into() }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::ArtifactLoad { .. } => {
                Stage::Startup
            }
            Self::InputTranslation { .. } => Stage::Collection,
            Self::SchemaMismatch(_) => Stage::Reconciliation,
            Self::Inference(_) => Stage::Inference,
        }
    }

    /// Stable machine-readable name, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "config_parse",
            Self::ConfigValidation(_) => "config_validation",
            Self::ArtifactLoad { .. } => "artifact_load",
            Self::InputTranslation { .. } => "input_translation",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::Inference(_) => "inference",
        }
    }

    /// True when the caller can fix the request and resubmit.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InputTranslation { .. })
    }

    /// Message safe to show an end user. Internal failures are not detailed.
    pub fn public_message(&self) -> String {
        match self {
            Self::InputTranslation { .. } => self.to_string(),
            Self::Inference(_) => "prediction failed".into(),
            _ => "internal error: model artifacts are inconsistent".into(),
        }
    }
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ArtifactLoad { artifact, message } => {
                write!(f, "cannot load {artifact} artifact: {message}")
            }
            Self::InputTranslation { feature, message } => {
                write!(f, "invalid value for '{feature}': {message}")
            }
            Self::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            Self::Inference(msg) => write!(f, "inference error: {msg}"),
        }
    }
}

impl std::error::Error for PredictError {}
