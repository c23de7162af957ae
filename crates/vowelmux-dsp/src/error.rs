//! Error types for the DSP core.

use thiserror::Error;
use vowelmux_spec::{BackendError, ValidationError};

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

/// Errors that can occur while conditioning or multiplexing signals.
#[derive(Debug, Error)]
pub enum DspError {
    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Input signal cannot be processed.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// One or more channels have no input signal.
    #[error("missing input for channel(s): {}", .labels.join(", "))]
    MissingChannels {
        /// Labels of the channels without input.
        labels: Vec<String>,
    },

    /// Filter design produced an unusable result.
    #[error("numeric instability: {message}")]
    NumericInstability {
        /// Error message.
        message: String,
    },

    /// Pipeline configuration failed validation.
    #[error("invalid configuration: {}", format_errors(.errors))]
    InvalidConfig {
        /// Validation errors reported for the configuration.
        errors: Vec<ValidationError>,
    },

    /// WAV encoding or decoding error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DspError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a numeric instability error.
    pub fn instability(message: impl Into<String>) -> Self {
        Self::NumericInstability {
            message: message.into(),
        }
    }
}

impl BackendError for DspError {
    fn code(&self) -> &'static str {
        match self {
            DspError::InvalidParameter { .. } => "DSP_001",
            DspError::InvalidInput { .. } => "DSP_002",
            DspError::MissingChannels { .. } => "DSP_003",
            DspError::NumericInstability { .. } => "DSP_004",
            DspError::InvalidConfig { .. } => "DSP_005",
            DspError::Wav(_) => "DSP_006",
            DspError::Io(_) => "DSP_007",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            DspError::Wav(_) | DspError::Io(_) => "io",
            DspError::InvalidConfig { .. } => "config",
            _ => "dsp",
        }
    }
}
