//! JSON output types for machine-readable CLI output.
//!
//! Every command accepting `--json` prints one [`CommandOutput`] envelope to
//! stdout instead of colored text.

use serde::{Deserialize, Serialize};
use vowelmux_dsp::DspError;
use vowelmux_spec::{BackendError, SpecError, ValidationError, ValidationWarning};

/// Error codes for CLI operations.
///
/// Configuration problems pass through their `E0xx` codes and pipeline
/// failures their `DSP_0xx` codes; the `CLI_xxx` codes cover the rest.
pub mod error_codes {
    /// Config file could not be read or parsed
    pub const CONFIG_READ: &str = "CLI_001";
    /// Input audio could not be read
    pub const INPUT_READ: &str = "CLI_002";
    /// Output could not be written
    pub const OUTPUT_WRITE: &str = "CLI_003";
    /// JSON serialization error
    pub const JSON_SERIALIZE: &str = "CLI_004";
    /// Any other failure
    pub const INTERNAL: &str = "CLI_005";
}

/// Warning codes for CLI operations.
pub mod warning_codes {
    /// Input file sample rate differs from the configured input rate
    pub const RATE_MISMATCH: &str = "CLI_W001";
    /// A stream block was skipped
    pub const BLOCK_SKIPPED: &str = "CLI_W002";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "CLI_001", "E008", "DSP_003")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// JSON path to the problematic field (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source file path (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
            file: None,
        }
    }

    /// Sets the JSON path for this error.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the file path for this error.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// A structured warning in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWarning {
    /// Stable warning code (e.g., "CLI_W001", "W002")
    pub code: String,
    /// Human-readable warning message
    pub message: String,
    /// JSON path to the problematic field (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl JsonWarning {
    /// Creates a new warning with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
        }
    }
}

/// Envelope printed by `--json` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput<T> {
    /// Whether the command succeeded
    pub success: bool,
    /// Errors (empty on success)
    pub errors: Vec<JsonError>,
    /// Warnings
    pub warnings: Vec<JsonWarning>,
    /// Command-specific result (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> CommandOutput<T> {
    /// Creates a successful output.
    pub fn success(result: T, warnings: Vec<JsonWarning>) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings,
            result: Some(result),
        }
    }

    /// Creates a failed output.
    pub fn failure(errors: Vec<JsonError>, warnings: Vec<JsonWarning>) -> Self {
        Self {
            success: false,
            errors,
            warnings,
            result: None,
        }
    }
}

impl<T: Serialize> CommandOutput<T> {
    /// Prints the envelope as pretty JSON on stdout.
    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Converts a validation error to JSON.
pub fn validation_error_to_json(error: &ValidationError) -> JsonError {
    let json = JsonError::new(error.code.to_string(), &error.message);
    match &error.path {
        Some(path) => json.with_path(path),
        None => json,
    }
}

/// Converts a validation warning to JSON.
pub fn validation_warning_to_json(warning: &ValidationWarning) -> JsonWarning {
    JsonWarning {
        code: warning.code.to_string(),
        message: warning.message.clone(),
        path: warning.path.clone(),
    }
}

/// Converts a command failure to JSON errors.
///
/// Invalid configurations expand to one entry per validation error.
pub fn error_to_json(error: &anyhow::Error) -> Vec<JsonError> {
    if let Some(dsp) = error.downcast_ref::<DspError>() {
        return match dsp {
            DspError::InvalidConfig { errors } => {
                errors.iter().map(validation_error_to_json).collect()
            }
            other => vec![JsonError::new(other.code(), other.to_string())],
        };
    }
    if error.downcast_ref::<SpecError>().is_some() {
        return vec![JsonError::new(error_codes::CONFIG_READ, format!("{:#}", error))];
    }
    if error.downcast_ref::<std::io::Error>().is_some() {
        return vec![JsonError::new(error_codes::OUTPUT_WRITE, format!("{:#}", error))];
    }
    if error.downcast_ref::<serde_json::Error>().is_some() {
        return vec![JsonError::new(error_codes::JSON_SERIALIZE, format!("{:#}", error))];
    }
    vec![JsonError::new(error_codes::INTERNAL, format!("{:#}", error))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use pretty_assertions::assert_eq;
    use vowelmux_spec::ErrorCode;

    #[test]
    fn test_envelope_omits_missing_result() {
        let output: CommandOutput<u32> =
            CommandOutput::failure(vec![JsonError::new("CLI_005", "boom")], vec![]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("result").is_none());
        assert!(json["errors"][0].get("path").is_none());
    }

    #[test]
    fn test_invalid_config_expands() {
        let error = anyhow::Error::new(DspError::InvalidConfig {
            errors: vec![
                ValidationError::with_path(ErrorCode::CarrierSpacing, "too close", "channels[1]"),
                ValidationError::new(ErrorCode::NoChannels, "none"),
            ],
        });
        let errors = error_to_json(&error);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code, "E008");
        assert_eq!(errors[0].path.as_deref(), Some("channels[1]"));
    }

    #[test]
    fn test_dsp_codes_pass_through() {
        let error = anyhow::Error::new(DspError::MissingChannels {
            labels: vec!["e".to_string()],
        })
        .context("processing failed");
        let errors = error_to_json(&error);
        assert_eq!(errors[0].code, "DSP_003");
    }

    #[test]
    fn test_config_errors_use_cli_code() {
        let error: anyhow::Result<()> = Err(SpecError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        )))
        .context("Failed to load config file: x.json");
        let errors = error_to_json(&error.unwrap_err());
        assert_eq!(errors[0].code, error_codes::CONFIG_READ);
        assert!(errors[0].message.contains("x.json"));
    }
}
