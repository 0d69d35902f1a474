use serde::Deserialize;

use crate::collect::UserInputSet;
use crate::defaults::DefaultTable;
use crate::encoding::{CategoricalTables, LogFeatureSet};
use crate::error::PredictError;
use crate::schema::FeatureSchema;

/// What to do with a schema feature that has neither a user value nor a default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Fill with `0.0`.
    #[default]
    Zero,
    /// Fail the request with `SchemaMismatch`.
    Reject,
}

impl std::fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Assemble the model input vector in schema order.
///
/// Resolution per feature: user value, then default, then the missing
/// policy. Values are taken as-is: categorical features must already hold
/// codes and log features must already be in log1p space. Categorical
/// codes supplied by the user are checked against their table.
pub fn reconcile(
    schema: &FeatureSchema,
    defaults: &DefaultTable,
    inputs: &UserInputSet,
    categorical: &CategoricalTables,
    log_features: &LogFeatureSet,
    missing: MissingPolicy,
) -> Result<Vec<f64>, PredictError> {
    // Extra columns mean the caller and the schema disagree.
    let mut extras: Vec<&str> = inputs.names().filter(|n| !schema.contains(n)).collect();
    if !extras.is_empty() {
        extras.sort_unstable();
        return Err(PredictError::SchemaMismatch(format!(
            "input names feature(s) not in schema: {}",
            extras.join(", ")
        )));
    }

    let mut vector = Vec::with_capacity(schema.len());
    let mut filled_zero = 0usize;

    for name in schema.iter() {
        let value = match inputs.get(name) {
            Some(v) => {
                if let Some(mapping) = categorical.get(name) {
                    let code = v as i64;
                    if code as f64 != v || !mapping.has_code(code) {
                        return Err(PredictError::SchemaMismatch(format!(
                            "'{name}': {v} is not a code of its categorical mapping"
                        )));
                    }
                }
                v
            }
            None => match (defaults.get(name), missing) {
                (Some(d), _) => d,
                (None, MissingPolicy::Zero) => {
                    filled_zero += 1;
                    0.0
                }
                (None, MissingPolicy::Reject) => {
                    return Err(PredictError::SchemaMismatch(format!(
                        "'{name}' has no input value and no default"
                    )));
                }
            },
        };

        if !value.is_finite() {
            return Err(PredictError::SchemaMismatch(format!(
                "'{name}' resolved to a non-numeric value ({value})"
            )));
        }
        vector.push(value);
    }

    if vector.len() != schema.len() {
        return Err(PredictError::SchemaMismatch(format!(
            "expected {} columns, built {}",
            schema.len(),
            vector.len()
        )));
    }

    if filled_zero > 0 {
        log::debug!("{filled_zero} feature(s) had no default and were filled with 0");
    }
    log::trace!(
        "reconciled {} columns ({} from input, {} log-space)",
        vector.len(),
        inputs.len(),
        log_features.len()
    );

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CategoricalMapping;
    use std::collections::HashMap;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["OverallQual".into(), "GrLivArea".into(), "GarageCars".into()])
            .unwrap()
    }

    fn defaults() -> DefaultTable {
        DefaultTable::new(HashMap::from([
            ("OverallQual".to_string(), 5.0),
            ("GrLivArea".to_string(), 1500.0),
            ("GarageCars".to_string(), 2.0),
        ]))
        .unwrap()
    }

    #[test]
    fn user_value_overrides_default() {
        let inputs: UserInputSet = [("OverallQual", 8.0)].into_iter().collect();
        let v = reconcile(
            &schema(),
            &defaults(),
            &inputs,
            &CategoricalTables::default(),
            &LogFeatureSet::default(),
            MissingPolicy::Zero,
        )
        .unwrap();
        assert_eq!(v, vec![8.0, 1500.0, 2.0]);
    }

    #[test]
    fn missing_default_falls_back_to_zero() {
        let defaults =
            DefaultTable::new(HashMap::from([("OverallQual".to_string(), 5.0)])).unwrap();
        let v = reconcile(
            &schema(),
            &defaults,
            &UserInputSet::new(),
            &CategoricalTables::default(),
            &LogFeatureSet::default(),
            MissingPolicy::Zero,
        )
        .unwrap();
        assert_eq!(v, vec![5.0, 0.0, 0.0]);
    }

    #[test]
    fn reject_policy_fails_on_uncovered_feature() {
        let defaults =
            DefaultTable::new(HashMap::from([("OverallQual".to_string(), 5.0)])).unwrap();
        let err = reconcile(
            &schema(),
            &defaults,
            &UserInputSet::new(),
            &CategoricalTables::default(),
            &LogFeatureSet::default(),
            MissingPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::SchemaMismatch(ref m) if m.contains("'GrLivArea'")));
    }

    #[test]
    fn extra_columns_rejected() {
        let inputs: UserInputSet = [("PoolQC", 1.0), ("Alley", 2.0)].into_iter().collect();
        let err = reconcile(
            &schema(),
            &defaults(),
            &inputs,
            &CategoricalTables::default(),
            &LogFeatureSet::default(),
            MissingPolicy::Zero,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PredictError::SchemaMismatch("input names feature(s) not in schema: Alley, PoolQC".into())
        );
    }

    #[test]
    fn non_finite_input_rejected() {
        let inputs: UserInputSet = [("GarageCars", f64::NAN)].into_iter().collect();
        let err = reconcile(
            &schema(),
            &defaults(),
            &inputs,
            &CategoricalTables::default(),
            &LogFeatureSet::default(),
            MissingPolicy::Zero,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "schema_mismatch");
    }

    #[test]
    fn categorical_value_must_be_a_known_code() {
        let schema = FeatureSchema::new(vec!["KitchenQual".into()]).unwrap();
        let tables = CategoricalTables::new([CategoricalMapping::new(
            "KitchenQual",
            [("Fair".to_string(), 1), ("Good".to_string(), 3)],
        )
        .unwrap()]);

        let ok: UserInputSet = [("KitchenQual", 3.0)].into_iter().collect();
        let v = reconcile(
            &schema,
            &DefaultTable::default(),
            &ok,
            &tables,
            &LogFeatureSet::default(),
            MissingPolicy::Zero,
        )
        .unwrap();
        assert_eq!(v, vec![3.0]);

        for bad in [2.0, 1.5] {
            let inputs: UserInputSet = [("KitchenQual", bad)].into_iter().collect();
            assert!(reconcile(
                &schema,
                &DefaultTable::default(),
                &inputs,
                &tables,
                &LogFeatureSet::default(),
                MissingPolicy::Zero,
            )
            .is_err());
        }
    }

    #[test]
    fn log_feature_values_pass_through_untouched() {
        let logs = LogFeatureSet::new(["GrLivArea".to_string()]);
        let stored = 2000f64.ln_1p();
        let inputs: UserInputSet = [("GrLivArea", stored)].into_iter().collect();
        let v = reconcile(
            &schema(),
            &defaults(),
            &inputs,
            &CategoricalTables::default(),
            &logs,
            MissingPolicy::Zero,
        )
        .unwrap();
        assert_eq!(v[1], stored);
    }
}
