//! Exit codes for the `hearth` binary.
//!
//! Scripts branch on these, so a code never changes meaning once released.
//! Each [`PredictError`] variant owns one code in the 60s; anything that
//! fails before a deployment is loaded uses the generic 1/2.
//!
//! | Code | Trigger                                             |
//! |------|-----------------------------------------------------|
//! | 0    | prediction printed / deployment valid               |
//! | 1    | I/O or runtime failure outside prediction           |
//! | 2    | bad arguments, malformed `--set`, unreadable input  |
//! | 60   | `.deploy.toml` unreadable or invalid                |
//! | 61   | artifact missing, corrupt, or out of step           |
//! | 62   | a supplied value could not be translated            |
//! | 63   | reconciled vector does not fit the schema           |
//! | 64   | model call or price transform failed                |
//!
//! New codes go in the 60s and must be wired into [`predict_exit_code`].

use hearth_predict::PredictError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed `--set`, unreadable `--input`.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Predict (60-69)
// =============================================================================

/// Deployment config could not be read, parsed, or validated.
pub const EXIT_PREDICT_CONFIG: u8 = 60;

/// An artifact is missing, corrupt, or inconsistent with the others.
pub const EXIT_PREDICT_ARTIFACT: u8 = 61;

/// A supplied value could not be translated (unknown label, not a number).
pub const EXIT_PREDICT_INPUT: u8 = 62;

/// Reconciled vector does not fit the schema (artifact drift).
pub const EXIT_PREDICT_SCHEMA: u8 = 63;

/// The model call failed.
pub const EXIT_PREDICT_INFERENCE: u8 = 64;

/// Map a PredictError to its exit code.
pub fn predict_exit_code(err: &PredictError) -> u8 {
    match err {
        PredictError::ConfigParse(_) | PredictError::ConfigValidation(_) => EXIT_PREDICT_CONFIG,
        PredictError::ArtifactLoad { .. } => EXIT_PREDICT_ARTIFACT,
        PredictError::InputTranslation { .. } => EXIT_PREDICT_INPUT,
        PredictError::SchemaMismatch(_) => EXIT_PREDICT_SCHEMA,
        PredictError::Inference(_) => EXIT_PREDICT_INFERENCE,
    }
}
