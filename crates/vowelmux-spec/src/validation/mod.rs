//! Pipeline configuration validation.

pub mod common;


use crate::config::{PipelineConfig, MAX_FILTER_ORDER};
use crate::error::{ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode};

pub use common::{
    validate_non_negative, validate_open_range, validate_positive, validate_range,
    CommonValidationError,
};

/// Orders above this ring noticeably around the band edges.
const HIGH_ORDER_WARNING_THRESHOLD: u32 = 10;

/// Validates a pipeline configuration and returns a validation result.
///
/// # Example
/// ```
/// use vowelmux_spec::{validate_config, ErrorCode, PipelineConfig};
///
/// let mut config = PipelineConfig::default();
/// config.channels[1].carrier_hz = 18_000.0;
///
/// let result = validate_config(&config);
/// assert!(!result.is_ok());
/// assert!(result.has_error(ErrorCode::CarrierSpacing));
/// ```
pub fn validate_config(config: &PipelineConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let rates_ok = validate_rates(config, &mut result);
    if rates_ok {
        validate_band(config, &mut result);
        validate_channel_plan(config, &mut result);
        validate_notch(config, &mut result);
    }
    validate_orders(config, &mut result);
    validate_stopband(config, &mut result);
    validate_noise_reduction(config, &mut result);
    validate_stream(config, &mut result);

    result
}

/// Validates sample rates. Returns false when later frequency checks would be
/// meaningless.
fn validate_rates(config: &PipelineConfig, result: &mut ValidationResult) -> bool {
    let mut ok = true;
    for (name, rate) in [
        ("input_rate", config.input_rate),
        ("baseband_rate", config.baseband_rate),
        ("multiplex_rate", config.multiplex_rate),
    ] {
        if rate == 0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidSampleRate,
                format!("{} must be positive", name),
                name,
            ));
            ok = false;
        }
    }
    if !ok {
        return false;
    }

    for (name, rate) in [
        ("input_rate", config.input_rate),
        ("multiplex_rate", config.multiplex_rate),
    ] {
        if rate % config.baseband_rate != 0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::RateNotMultiple,
                format!(
                    "{} {} Hz is not an integer multiple of baseband_rate {} Hz",
                    name, rate, config.baseband_rate
                ),
                name,
            ));
        }
    }
    true
}

fn validate_band(config: &PipelineConfig, result: &mut ValidationResult) {
    let band = config.band;
    let nyquist = config.baseband_rate.min(config.input_rate) as f64 / 2.0;

    if let Err(e) = validate_open_range("band.low_hz", band.low_hz, 0.0, nyquist) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidBand,
            e.message,
            "band.low_hz",
        ));
    }
    if let Err(e) = validate_open_range("band.high_hz", band.high_hz, 0.0, nyquist) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidBand,
            e.message,
            "band.high_hz",
        ));
    }
    if band.low_hz >= band.high_hz {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidBand,
            format!(
                "band.low_hz ({}) must be below band.high_hz ({})",
                band.low_hz, band.high_hz
            ),
            "band",
        ));
    }
}

fn validate_orders(config: &PipelineConfig, result: &mut ValidationResult) {
    for (name, order) in [
        ("condition_order", config.condition_order),
        ("demod_order", config.demod_order),
        ("recovery_order", config.recovery_order),
    ] {
        if order == 0 || order > MAX_FILTER_ORDER {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidFilterOrder,
                format!("{} must be in 1..={}, got {}", name, MAX_FILTER_ORDER, order),
                name,
            ));
        } else if order > HIGH_ORDER_WARNING_THRESHOLD {
            result.add_warning(ValidationWarning::with_path(
                WarningCode::HighFilterOrder,
                format!("{} {} may ring around the band edges", name, order),
                name,
            ));
        }
    }
}

/// Kaiser designs below this attenuation degenerate to a rectangular window.
const MIN_STOPBAND_DB: f64 = 8.0;

fn validate_stopband(config: &PipelineConfig, result: &mut ValidationResult) {
    let db = config.stopband_db;
    if !db.is_finite() || db < MIN_STOPBAND_DB {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidStopband,
            format!(
                "stopband_db must be at least {} dB, got {}",
                MIN_STOPBAND_DB, db
            ),
            "stopband_db",
        ));
    }
}

fn validate_channel_plan(config: &PipelineConfig, result: &mut ValidationResult) {
    for violation in config.channel_plan().violations() {
        // Rate divisibility is already reported against the config fields.
        if violation.error_code() == ErrorCode::RateNotMultiple {
            continue;
        }
        result.add_error(ValidationError::with_path(
            violation.error_code(),
            violation.to_string(),
            violation.path(),
        ));
    }
}

fn validate_notch(config: &PipelineConfig, result: &mut ValidationResult) {
    let Some(notch) = config.notch else {
        return;
    };

    let nyquist = config.input_rate as f64 / 2.0;
    if let Err(e) = validate_open_range("notch.center_hz", notch.center_hz, 0.0, nyquist) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidNotch,
            e.message,
            "notch.center_hz",
        ));
    } else if !config.band.contains(notch.center_hz) {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::NotchOutsideBand,
            format!(
                "notch at {} Hz lies outside the {}-{} Hz band and has no effect",
                notch.center_hz, config.band.low_hz, config.band.high_hz
            ),
            "notch.center_hz",
        ));
    }
    if let Err(e) = validate_positive("notch.q", notch.q) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidNotch,
            e.message,
            "notch.q",
        ));
    }
}

fn validate_noise_reduction(config: &PipelineConfig, result: &mut ValidationResult) {
    let Some(nr) = config.noise_reduction else {
        return;
    };

    if let Err(e) = validate_positive("noise_reduction.threshold", nr.threshold)
        .and_then(|_| validate_range("noise_reduction.threshold", nr.threshold, 0.0, 1.0))
    {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidNoiseReduction,
            e.message,
            "noise_reduction.threshold",
        ));
    }
    if let Err(e) = validate_non_negative("noise_reduction.factor", nr.factor) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidNoiseReduction,
            e.message,
            "noise_reduction.factor",
        ));
    }

    result.add_warning(ValidationWarning::with_path(
        WarningCode::NoiseReductionEnabled,
        "spectral subtraction may add musical noise to the recovered channels",
        "noise_reduction",
    ));
}

fn validate_stream(config: &PipelineConfig, result: &mut ValidationResult) {
    if let Err(e) = validate_positive("stream.block_seconds", config.stream.block_seconds) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidStreamConfig,
            e.message,
            "stream.block_seconds",
        ));
    }
    if config.stream.queue_depth == 0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidStreamConfig,
            "stream.queue_depth must be at least 1",
            "stream.queue_depth",
        ));
    }
}
