use crate::encoding::from_log_space;
use crate::error::PredictError;
use crate::model::TrainedModel;

/// Invoke the model on a reconciled vector.
///
/// Deterministic: the same vector always yields the same scalar.
pub fn predict(model: &TrainedModel, vector: &[f64]) -> Result<f64, PredictError> {
    let expected = model.n_features();
    if vector.len() != expected {
        return Err(PredictError::Inference(format!(
            "model expects {expected} features, got {}",
            vector.len()
        )));
    }
    if let Some(i) = vector.iter().position(|v| !v.is_finite()) {
        return Err(PredictError::Inference(format!("input column {i} is not finite")));
    }

    let raw = model.regressor().predict_row(vector)?;
    if !raw.is_finite() {
        return Err(PredictError::Inference(format!("model produced a non-finite output ({raw})")));
    }
    Ok(raw)
}

/// Undo the label transform. Negative prices clamp to zero.
pub fn finalize_price(raw: f64, label_is_log_transformed: bool) -> Result<f64, PredictError> {
    let price = if label_is_log_transformed { from_log_space(raw) } else { raw };

    if !price.is_finite() {
        return Err(PredictError::Inference(format!(
            "price is not finite after label transform (raw output {raw})"
        )));
    }
    if price < 0.0 {
        log::warn!("model produced a negative price ({price:.2}); clamping to 0");
        return Ok(0.0);
    }
    Ok(price)
}

/// Format as whole dollars with thousands separators, e.g. `$268,337`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
