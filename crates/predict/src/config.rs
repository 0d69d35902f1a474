use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PredictError;
use crate::reconcile::MissingPolicy;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One deployment: which artifacts to load and how to interpret them.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    pub name: String,
    pub label_is_log_transformed: bool,
    #[serde(default)]
    pub missing: MissingPolicy,
    pub artifacts: ArtifactPaths,
    #[serde(default)]
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Artifact file paths. Relative paths resolve against the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPaths {
    pub model: String,
    pub schema: String,
    pub defaults: String,
    pub metadata: String,
    #[serde(default)]
    pub top_features: Option<String>,
}

impl ArtifactPaths {
    fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("model", self.model.as_str()),
            ("schema", self.schema.as_str()),
            ("defaults", self.defaults.as_str()),
            ("metadata", self.metadata.as_str()),
        ];
        if let Some(ref top) = self.top_features {
            out.push(("top_features", top.as_str()));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DeploymentConfig {
    pub fn from_toml(input: &str) -> Result<Self, PredictError> {
        let config: DeploymentConfig =
            toml::from_str(input).map_err(|e| PredictError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> Result<Self, PredictError> {
        let input = std::fs::read_to_string(path).map_err(|e| {
            PredictError::ConfigParse(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if self.name.trim().is_empty() {
            return Err(PredictError::ConfigValidation("name must not be empty".into()));
        }

        for (artifact, path) in self.artifacts.entries() {
            if path.trim().is_empty() {
                return Err(PredictError::ConfigValidation(format!(
                    "artifacts.{artifact} must not be empty"
                )));
            }
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(PredictError::ConfigValidation(format!(
                "server.bind '{}' is not a socket address",
                self.server.bind
            )));
        }

        Ok(())
    }

    /// Resolve an artifact path against `base_dir`.
    pub fn resolve(base_dir: &Path, file: &str) -> PathBuf {
        let p = Path::new(file);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "ridge-v3"
label_is_log_transformed = true
missing = "reject"

[artifacts]
model = "model.json"
schema = "features.json"
defaults = "defaults.csv"
metadata = "metadata.json"
top_features = "top_features.json"

[server]
bind = "0.0.0.0:9000"
"#;

    #[test]
    fn parse_valid() {
        let config = DeploymentConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "ridge-v3");
        assert!(config.label_is_log_transformed);
        assert_eq!(config.missing, MissingPolicy::Reject);
        assert_eq!(config.artifacts.defaults, "defaults.csv");
        assert_eq!(config.artifacts.top_features.as_deref(), Some("top_features.json"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn defaults_apply() {
        let input = r#"
name = "minimal"
label_is_log_transformed = false

[artifacts]
model = "m.json"
schema = "s.json"
defaults = "d.json"
metadata = "meta.json"
"#;
        let config = DeploymentConfig::from_toml(input).unwrap();
        assert_eq!(config.missing, MissingPolicy::Zero);
        assert!(config.artifacts.top_features.is_none());
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn label_flag_is_required() {
        let input = r#"
name = "no-flag"

[artifacts]
model = "m.json"
schema = "s.json"
defaults = "d.json"
metadata = "meta.json"
"#;
        let err = DeploymentConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, PredictError::ConfigParse(_)));
    }

    #[test]
    fn rejects_unknown_missing_policy() {
        let input = VALID.replace("missing = \"reject\"", "missing = \"mean\"");
        assert!(DeploymentConfig::from_toml(&input).is_err());
    }

    #[test]
    fn rejects_empty_artifact_path() {
        let input = VALID.replace("model = \"model.json\"", "model = \"\"");
        let err = DeploymentConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("artifacts.model must not be empty"));
    }

    #[test]
    fn rejects_bad_bind() {
        let input = VALID.replace("0.0.0.0:9000", "localhost");
        let err = DeploymentConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("not a socket address"));
    }

    #[test]
    fn resolve_relative_paths() {
        let base = Path::new("/srv/models");
        assert_eq!(
            DeploymentConfig::resolve(base, "model.json"),
            PathBuf::from("/srv/models/model.json")
        );
        assert_eq!(
            DeploymentConfig::resolve(base, "/abs/model.json"),
            PathBuf::from("/abs/model.json")
        );
    }
}
