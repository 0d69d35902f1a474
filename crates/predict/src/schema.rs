use std::collections::HashMap;

use serde::Serialize;

use crate::error::PredictError;

/// Ordered column names exactly as the trained model expects them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    names: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self, PredictError> {
        if names.is_empty() {
            return Err(PredictError::artifact("schema", "feature list is empty"));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PredictError::artifact(
                    "schema",
                    format!("feature at position {i} has an empty name"),
                ));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(PredictError::artifact(
                    "schema",
                    format!("duplicate feature '{name}'"),
                ));
            }
        }

        Ok(Self { names, index })
    }

    /// Parse a JSON array of feature names.
    pub fn from_json(input: &str) -> Result<Self, PredictError> {
        let names: Vec<String> = serde_json::from_str(input)
            .map_err(|e| PredictError::artifact("schema", e.to_string()))?;
        Self::new(names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}
