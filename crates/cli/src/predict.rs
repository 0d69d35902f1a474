//! `hearth predict` / `hearth inputs`.

use std::io::Write;
use std::path::PathBuf;

use hearth_predict::{InputKind, RawForm};

use crate::{load_predictor, CliError};

/// Split `NAME=VALUE`. The value may itself contain `=`.
fn parse_assignment(arg: &str) -> Result<(String, String), CliError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::args(format!("--set expects NAME=VALUE, got '{arg}'"))),
    }
}

fn build_form(set: &[String], input: Option<&PathBuf>) -> Result<RawForm, CliError> {
    let mut form = match input {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;
            serde_json::from_str::<RawForm>(&text).map_err(|e| {
                CliError::args(format!("{} is not a JSON object of values: {e}", path.display()))
            })?
        }
        None => RawForm::new(),
    };

    for arg in set {
        let (name, value) = parse_assignment(arg)?;
        form.insert(name, value);
    }
    Ok(form)
}

pub fn cmd_predict(
    config_path: PathBuf,
    set: Vec<String>,
    input: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let form = build_form(&set, input.as_ref())?;
    let (_, predictor) = load_predictor(&config_path)?;

    // Blank values drop out here, so count from the collected set.
    let supplied = predictor.collect(&form).map_err(CliError::predict)?.len();
    let prediction = predictor.run(&form).map_err(CliError::predict)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&prediction)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        println!("Predicted Price: {}", prediction.display);
    }

    // Human summary to stderr
    eprintln!(
        "{} supplied value(s), {} default(s), raw model output {:.4}{}",
        supplied,
        predictor.schema().len().saturating_sub(supplied),
        prediction.raw,
        if prediction.label_is_log_transformed { " (log-price)" } else { "" },
    );
    Ok(())
}

pub fn cmd_inputs(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (_, predictor) = load_predictor(&config_path)?;
    let fields = predictor.inputs();

    if json_output {
        let json_str = serde_json::to_string_pretty(&fields)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);

    for field in &fields {
        let kind = match field.kind {
            InputKind::Numeric => "number",
            InputKind::Log => "number (log1p)",
            InputKind::Categorical => "label",
        };
        let default = field.default.as_deref().unwrap_or("-");
        let line = if field.options.is_empty() {
            format!("{:<width$}  {kind:<14}  default {default}", field.name)
        } else {
            format!(
                "{:<width$}  {kind:<14}  default {default}  [{}]",
                field.name,
                field.options.join(", ")
            )
        };
        writeln!(out, "{line}").map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}
