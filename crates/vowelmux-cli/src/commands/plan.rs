//! Plan command implementation
//!
//! Validates a configuration and prints its channel plan: where each channel
//! lands in the multiplexed spectrum.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use vowelmux_spec::{validate_config, PipelineConfig, ValidationResult};

use super::json_output::{
    error_to_json, validation_error_to_json, validation_warning_to_json, CommandOutput,
};
use crate::config::ConfigArgs;

/// One channel's slot in the multiplexed spectrum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanChannel {
    /// Channel label
    pub label: String,
    /// Carrier frequency in Hz
    pub carrier_hz: f64,
    /// Lowest occupied frequency (lower sideband edge) in Hz
    pub occupied_low_hz: f64,
    /// Highest occupied frequency (upper sideband edge) in Hz
    pub occupied_high_hz: f64,
    /// Distance to the next carrier, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing_to_next_hz: Option<f64>,
}

/// Result of the plan command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanResult {
    /// Baseband rate in Hz
    pub baseband_rate: u32,
    /// Multiplex rate in Hz
    pub multiplex_rate: u32,
    /// Per-channel bandwidth in Hz
    pub bandwidth_hz: f64,
    /// Minimum allowed carrier spacing in Hz
    pub min_spacing_hz: f64,
    /// Channels sorted by carrier
    pub channels: Vec<PlanChannel>,
}

/// Builds the plan summary for `config`.
pub fn summarize(config: &PipelineConfig) -> PlanResult {
    let plan = config.channel_plan();
    let mut sorted = plan.channels.clone();
    sorted.sort_by(|a, b| a.carrier_hz.total_cmp(&b.carrier_hz));

    let channels = sorted
        .iter()
        .enumerate()
        .map(|(i, c)| PlanChannel {
            label: c.label.clone(),
            carrier_hz: c.carrier_hz,
            occupied_low_hz: c.carrier_hz - plan.bandwidth_hz,
            occupied_high_hz: c.carrier_hz + plan.bandwidth_hz,
            spacing_to_next_hz: sorted.get(i + 1).map(|n| n.carrier_hz - c.carrier_hz),
        })
        .collect();

    PlanResult {
        baseband_rate: plan.baseband_rate,
        multiplex_rate: plan.multiplex_rate,
        bandwidth_hz: plan.bandwidth_hz,
        min_spacing_hz: plan.min_spacing_hz(),
        channels,
    }
}

/// Run the plan command
///
/// # Returns
/// Exit code: 0 if the configuration is valid, 1 otherwise
pub fn run(config: &ConfigArgs, json_output: bool) -> Result<ExitCode> {
    let resolved = match config.resolve() {
        Ok(c) => c,
        Err(e) if json_output => {
            CommandOutput::<PlanResult>::failure(error_to_json(&e), vec![]).print()?;
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };
    let validation = validate_config(&resolved);
    let summary = summarize(&resolved);

    if json_output {
        let warnings = validation
            .warnings
            .iter()
            .map(validation_warning_to_json)
            .collect();
        let output = if validation.is_ok() {
            CommandOutput::success(summary, warnings)
        } else {
            let errors = validation
                .errors
                .iter()
                .map(validation_error_to_json)
                .collect();
            CommandOutput::failure(errors, warnings)
        };
        output.print()?;
    } else {
        print_plan(&summary);
        print_validation(&validation);
    }

    Ok(if validation.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_plan(summary: &PlanResult) {
    println!(
        "{} baseband {} Hz, multiplex {} Hz, min spacing {:.0} Hz",
        "Plan:".cyan().bold(),
        summary.baseband_rate,
        summary.multiplex_rate,
        summary.min_spacing_hz
    );
    for channel in &summary.channels {
        let spacing = channel
            .spacing_to_next_hz
            .map(|s| {
                let text = format!("{:.0} Hz to next", s);
                if s > summary.min_spacing_hz {
                    text.dimmed()
                } else {
                    text.red()
                }
            })
            .unwrap_or_default();
        println!(
            "  {:>4}  {:>8.0} Hz  [{:.0} .. {:.0}]  {}",
            channel.label.bold(),
            channel.carrier_hz,
            channel.occupied_low_hz,
            channel.occupied_high_hz,
            spacing
        );
    }
}

fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        println!("  {} {}", "x".red(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    if result.is_ok() {
        println!("\n{} Configuration is valid", "SUCCESS".green().bold());
    } else {
        println!(
            "\n{} Configuration has {} error(s)",
            "FAILED".red().bold(),
            result.errors.len()
        );
    }
}
