//! Input collection: raw form values -> `UserInputSet`.
//!
//! Label translation and log1p happen here, so the reconciler only ever
//! sees values in their final numeric form.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::encoding::{to_log_space, CategoricalTables, LogFeatureSet};
use crate::error::PredictError;

/// A value as the user entered it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One submitted form, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawForm {
    fields: BTreeMap<String, RawValue>,
}

impl RawForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Feature values in final numeric form, ready for reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInputSet {
    values: HashMap<String, f64>,
}

impl UserInputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for UserInputSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Translate a raw form into a `UserInputSet`.
///
/// Only names in `exposed` are accepted. Blank text fields count as not
/// supplied. Fields are visited in name order, so the reported error is
/// stable for a given form.
pub fn collect(
    form: &RawForm,
    exposed: &[String],
    categorical: &CategoricalTables,
    log_features: &LogFeatureSet,
) -> Result<UserInputSet, PredictError> {
    let mut inputs = UserInputSet::new();

    for (name, raw) in &form.fields {
        if !exposed.iter().any(|e| e == name) {
            return Err(PredictError::translation(name, "not an accepted input"));
        }

        if let RawValue::Text(text) = raw {
            if text.trim().is_empty() {
                continue;
            }
        }

        let value = if let Some(mapping) = categorical.get(name) {
            match raw {
                RawValue::Text(label) => mapping.encode(label.trim())? as f64,
                RawValue::Number(_) => {
                    return Err(PredictError::translation(
                        name,
                        format!("expected a label (one of: {})", mapping.labels().join(", ")),
                    ));
                }
            }
        } else {
            let number = parse_number(name, raw)?;
            if log_features.contains(name) {
                if number < 0.0 {
                    return Err(PredictError::translation(
                        name,
                        format!("must not be negative, got {number}"),
                    ));
                }
                to_log_space(number)
            } else {
                number
            }
        };

        inputs.insert(name.clone(), value);
    }

    log::debug!("collected {} of {} submitted field(s)", inputs.len(), form.len());
    Ok(inputs)
}

fn parse_number(name: &str, raw: &RawValue) -> Result<f64, PredictError> {
    let number = match raw {
        RawValue::Number(n) => *n,
        RawValue::Text(text) => {
            let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| PredictError::translation(name, format!("'{text}' is not a number")))?
        }
    };

    if !number.is_finite() {
        return Err(PredictError::translation(name, "must be a finite number"));
    }
    Ok(number)
}
