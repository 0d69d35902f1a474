use std::collections::HashMap;

use crate::error::PredictError;

/// Per-feature fallback values (training-set mean or mode), already in
/// the encoded space the model expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultTable {
    values: HashMap<String, f64>,
}

impl DefaultTable {
    pub fn new(values: HashMap<String, f64>) -> Result<Self, PredictError> {
        for (name, value) in &values {
            if !value.is_finite() {
                return Err(PredictError::artifact(
                    "defaults",
                    format!("default for '{name}' is not a finite number"),
                ));
            }
        }
        Ok(Self { values })
    }

    /// Parse a JSON object of `{"feature": number}`.
    pub fn from_json(input: &str) -> Result<Self, PredictError> {
        let values: HashMap<String, f64> = serde_json::from_str(input)
            .map_err(|e| PredictError::artifact("defaults", e.to_string()))?;
        Self::new(values)
    }

    /// Parse a two-column CSV with a `feature,value` header.
    pub fn from_csv(input: &str) -> Result<Self, PredictError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PredictError::artifact("defaults", e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, PredictError> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                PredictError::artifact("defaults", format!("missing column '{name}'"))
            })
        };
        let feature_idx = idx("feature")?;
        let value_idx = idx("value")?;

        let mut values = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| PredictError::artifact("defaults", e.to_string()))?;
            let feature = record.get(feature_idx).unwrap_or("").to_string();
            if feature.is_empty() {
                continue;
            }
            let raw = record.get(value_idx).unwrap_or("");
            let value: f64 = raw.parse().map_err(|_| {
                PredictError::artifact(
                    "defaults",
                    format!("cannot parse default '{raw}' for '{feature}'"),
                )
            })?;
            if values.insert(feature.clone(), value).is_some() {
                return Err(PredictError::artifact(
                    "defaults",
                    format!("feature '{feature}' listed twice"),
                ));
            }
        }

        Self::new(values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
