//! Training-time encodings: categorical label tables and log1p features.
//!
//! Both ship inside the model metadata artifact and are versioned with the
//! model. Nothing here is derived at runtime.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::error::PredictError;

// ---------------------------------------------------------------------------
// Categorical
// ---------------------------------------------------------------------------

/// Fixed label -> code table for one categorical feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalMapping {
    feature: String,
    /// Sorted by code, so UI options come out in ordinal order.
    entries: Vec<(String, i64)>,
    by_label: HashMap<String, i64>,
}

impl CategoricalMapping {
    /// Build a mapping. Codes must be unique (the mapping is injective).
    pub fn new(
        feature: impl Into<String>,
        labels: impl IntoIterator<Item = (String, i64)>,
    ) -> Result<Self, PredictError> {
        let feature = feature.into();
        let mut by_label = HashMap::new();
        let mut seen_codes = HashMap::new();

        for (label, code) in labels {
            if let Some(other) = seen_codes.insert(code, label.clone()) {
                return Err(PredictError::artifact(
                    "metadata",
                    format!("'{feature}': labels '{other}' and '{label}' share code {code}"),
                ));
            }
            if by_label.insert(label.clone(), code).is_some() {
                return Err(PredictError::artifact(
                    "metadata",
                    format!("'{feature}': label '{label}' listed twice"),
                ));
            }
        }

        if by_label.is_empty() {
            return Err(PredictError::artifact(
                "metadata",
                format!("'{feature}': categorical mapping has no labels"),
            ));
        }

        let mut entries: Vec<(String, i64)> =
            by_label.iter().map(|(l, c)| (l.clone(), *c)).collect();
        entries.sort_by_key(|(_, code)| *code);

        Ok(Self { feature, entries, by_label })
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Translate a label to its code. Unknown labels never fall back to a default.
    pub fn encode(&self, label: &str) -> Result<i64, PredictError> {
        self.by_label.get(label).copied().ok_or_else(|| {
            PredictError::translation(
                &self.feature,
                format!("unknown label '{label}' (expected one of: {})", self.labels().join(", ")),
            )
        })
    }

    /// Reverse lookup, used to show a stored default code as its label.
    pub fn label_for(&self, code: i64) -> Option<&str> {
        self.entries.iter().find(|(_, c)| *c == code).map(|(l, _)| l.as_str())
    }

    pub fn has_code(&self, code: i64) -> bool {
        self.entries.iter().any(|(_, c)| *c == code)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn entries(&self) -> &[(String, i64)] {
        &self.entries
    }
}

/// All categorical tables for a model, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalTables {
    tables: HashMap<String, CategoricalMapping>,
}

impl CategoricalTables {
    pub fn new(mappings: impl IntoIterator<Item = CategoricalMapping>) -> Self {
        Self {
            tables: mappings.into_iter().map(|m| (m.feature.clone(), m)).collect(),
        }
    }

    pub fn get(&self, feature: &str) -> Option<&CategoricalMapping> {
        self.tables.get(feature)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.tables.contains_key(feature)
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Log features
// ---------------------------------------------------------------------------

/// Features stored as `log1p(x)` of their real-world magnitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFeatureSet {
    names: BTreeSet<String>,
}

impl LogFeatureSet {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self { names: names.into_iter().collect() }
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.names.contains(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Real-world magnitude -> stored value.
pub fn to_log_space(x: f64) -> f64 {
    x.ln_1p()
}

/// Stored value -> real-world magnitude, for display.
pub fn from_log_space(x: f64) -> f64 {
    x.exp_m1()
}

// ---------------------------------------------------------------------------
// Metadata artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MetadataFile {
    version: String,
    #[serde(default)]
    categorical: HashMap<String, HashMap<String, i64>>,
    #[serde(default)]
    log_features: Vec<String>,
}

/// Encoding metadata shipped with a model artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub categorical: CategoricalTables,
    pub log_features: LogFeatureSet,
}

impl ModelMetadata {
    pub fn from_json(input: &str) -> Result<Self, PredictError> {
        let file: MetadataFile = serde_json::from_str(input)
            .map_err(|e| PredictError::artifact("metadata", e.to_string()))?;

        if file.version.trim().is_empty() {
            return Err(PredictError::artifact("metadata", "version must not be empty"));
        }

        let mut mappings = Vec::with_capacity(file.categorical.len());
        for (feature, labels) in file.categorical {
            mappings.push(CategoricalMapping::new(feature, labels)?);
        }

        let categorical = CategoricalTables::new(mappings);
        let log_features = LogFeatureSet::new(file.log_features);

        if let Some(both) = log_features.iter().find(|f| categorical.contains(f)) {
            return Err(PredictError::artifact(
                "metadata",
                format!("'{both}' cannot be both categorical and log-transformed"),
            ));
        }

        Ok(Self { version: file.version, categorical, log_features })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen_qual() -> CategoricalMapping {
        CategoricalMapping::new(
            "KitchenQual",
            [("Fair".to_string(), 1), ("Good".to_string(), 3), ("TA".to_string(), 2)],
        )
        .unwrap()
    }

    #[test]
    fn encode_known_labels() {
        let m = kitchen_qual();
        assert_eq!(m.encode("Fair").unwrap(), 1);
        assert_eq!(m.encode("Good").unwrap(), 3);
        assert_eq!(m.labels(), vec!["Fair", "TA", "Good"]);
        assert_eq!(m.label_for(2), Some("TA"));
        assert_eq!(m.label_for(9), None);
    }

    #[test]
    fn unknown_label_is_a_translation_error() {
        let err = kitchen_qual().encode("Excellent").unwrap_err();
        assert!(matches!(err, PredictError::InputTranslation { ref feature, .. } if feature == "KitchenQual"));
        assert!(err.to_string().contains("Fair, TA, Good"));
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert!(kitchen_qual().encode("good").is_err());
    }

    #[test]
    fn shared_codes_are_rejected() {
        let err = CategoricalMapping::new(
            "BsmtExposure",
            [("Gd".to_string(), 3), ("Av".to_string(), 3)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("share code 3"));
    }

    #[test]
    fn log_space_round_trip() {
        let stored = to_log_space(2000.0);
        assert!((stored - 7.601402334583733).abs() < 1e-9);
        assert!((from_log_space(stored) - 2000.0).abs() < 0.5);
    }

    #[test]
    fn parse_metadata() {
        let meta = ModelMetadata::from_json(
            r#"{
                "version": "2024-05-ridge",
                "categorical": {"KitchenQual": {"Fair": 1, "TA": 2, "Good": 3}},
                "log_features": ["GrLivArea", "LotArea"]
            }"#,
        )
        .unwrap();
        assert_eq!(meta.version, "2024-05-ridge");
        assert!(meta.categorical.contains("KitchenQual"));
        assert!(meta.log_features.contains("GrLivArea"));
        assert_eq!(meta.log_features.len(), 2);
    }

    #[test]
    fn metadata_rejects_overlapping_encodings() {
        let err = ModelMetadata::from_json(
            r#"{"version": "v1", "categorical": {"LotArea": {"small": 0}}, "log_features": ["LotArea"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both categorical and log-transformed"));
    }

    #[test]
    fn metadata_requires_version() {
        assert!(ModelMetadata::from_json(r#"{"categorical": {}}"#).is_err());
        assert!(ModelMetadata::from_json(r#"{"version": " "}"#).is_err());
    }
}
