// hearth CLI - house-price predictions from a deployment config

mod exit_codes;
mod predict;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use exit_codes::{predict_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use hearth_predict::{DeploymentConfig, PredictError, Predictor};

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "House-price predictions from a trained regression model")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a sale price from a few house attributes
    #[command(after_help = "\
Examples:
  hearth predict ames.deploy.toml --set OverallQual=8 --set KitchenQual=Good
  hearth predict ames.deploy.toml --input house.json --json
  hearth predict ames.deploy.toml                      # all defaults")]
    Predict {
        /// Path to the .deploy.toml config file
        config: PathBuf,

        /// Feature value as NAME=VALUE (repeatable; overrides --input)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// JSON object of feature values
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output JSON to stdout instead of the human summary
        #[arg(long)]
        json: bool,
    },

    /// List the inputs a deployment accepts, with defaults and options
    #[command(after_help = "\
Examples:
  hearth inputs ames.deploy.toml
  hearth inputs ames.deploy.toml --json")]
    Inputs {
        /// Path to the .deploy.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Load every artifact and run the startup checks without predicting
    #[command(after_help = "\
Examples:
  hearth validate ames.deploy.toml")]
    Validate {
        /// Path to the .deploy.toml config file
        config: PathBuf,
    },

    /// Serve the prediction form and JSON API over HTTP
    #[command(after_help = "\
Examples:
  hearth serve ames.deploy.toml
  hearth serve ames.deploy.toml --bind 0.0.0.0:8080
  RUST_LOG=debug hearth serve ames.deploy.toml")]
    Serve {
        /// Path to the .deploy.toml config file
        config: PathBuf,

        /// Address to listen on (overrides [server].bind)
        #[arg(long, env = "HEARTH_BIND")]
        bind: Option<String>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  hearth-predict ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("HEARTH_BUILD_PROFILE"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Predict { config, set, input, json } => {
            predict::cmd_predict(config, set, input, json)
        }
        Commands::Inputs { config, json } => predict::cmd_inputs(config, json),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Serve { config, bind } => cmd_serve(config, bind),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a prediction error with the proper exit code.
    pub fn predict(err: PredictError) -> Self {
        let code = predict_exit_code(&err);
        let hint = match &err {
            PredictError::ArtifactLoad { .. } => {
                Some("artifact paths resolve relative to the config file".to_string())
            }
            PredictError::InputTranslation { .. } => {
                Some("run `hearth inputs <config>` to see accepted values".to_string())
            }
            PredictError::SchemaMismatch(_) => {
                Some("schema, defaults, and model may come from different exports".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Parse the config and load every artifact it names.
pub(crate) fn load_predictor(config_path: &Path) -> Result<(DeploymentConfig, Predictor), CliError> {
    let config = DeploymentConfig::from_path(config_path).map_err(CliError::predict)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let predictor = Predictor::from_config(&config, base_dir).map_err(CliError::predict)?;
    Ok((config, predictor))
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, predictor) = load_predictor(&config_path)?;

    eprintln!(
        "valid: '{}', {} model v{}, {} feature(s), {} exposed, label {}, missing={}",
        config.name,
        predictor.model().kind,
        predictor.model().version,
        predictor.schema().len(),
        predictor.exposed().len(),
        if predictor.label_is_log_transformed() { "log1p" } else { "raw" },
        predictor.missing_policy(),
    );
    Ok(())
}

// ============================================================================
// serve
// ============================================================================

fn cmd_serve(config_path: PathBuf, bind: Option<String>) -> Result<(), CliError> {
    let (config, predictor) = load_predictor(&config_path)?;
    let bind = bind.unwrap_or(config.server.bind);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io(format!("cannot start runtime: {e}")))?;

    runtime
        .block_on(hearth_server::serve(Arc::new(predictor), &bind))
        .map_err(|e| CliError::io(e.to_string()).with_hint("is another process using that address?"))
}
