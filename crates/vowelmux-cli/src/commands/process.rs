//! Process command implementation
//!
//! Loads `{label}.wav` for every planned channel, runs the multiplex round
//! trip, and writes the conditioned, multiplexed and recovered signals plus a
//! JSON run report and diagnostic plots.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use vowelmux_dsp::spectrum::dominant_frequency;
use vowelmux_dsp::{DspError, Session, Signal, WavResult};
use vowelmux_spec::validate_config;

use super::json_output::{
    error_to_json, validation_warning_to_json, warning_codes, CommandOutput, JsonWarning,
};
use crate::config::ConfigArgs;
use crate::render;

/// Name of the run report written next to the outputs.
pub const REPORT_FILE: &str = "report.json";

/// One written WAV file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactReport {
    /// Output path
    pub path: String,
    /// BLAKE3 hash of the PCM payload
    pub pcm_hash: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample (8 or 16)
    pub bits_per_sample: u16,
    /// Number of samples
    pub num_samples: usize,
    /// Strongest non-DC frequency, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_hz: Option<f64>,
}

/// Outputs for one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelReport {
    /// Channel label
    pub label: String,
    /// Carrier frequency in Hz
    pub carrier_hz: f64,
    /// Strongest non-DC frequency of the loaded input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dominant_hz: Option<f64>,
    /// 8-bit conditioned signal at the baseband rate
    pub conditioned: ArtifactReport,
    /// Recovered signal at the baseband rate
    pub recovered: ArtifactReport,
}

/// Result of a process run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessResult {
    /// Per-channel outputs in plan order
    pub channels: Vec<ChannelReport>,
    /// Composite signal at the multiplex rate
    pub multiplexed: ArtifactReport,
    /// Diagnostic plots written
    pub plots: Vec<String>,
    /// Wall-clock time in milliseconds
    pub duration_ms: u64,
}

/// Run the process command
///
/// # Arguments
/// * `input_dir` - Directory holding one `{label}.wav` per channel
/// * `out_dir` - Directory receiving outputs, created if missing
/// * `config` - Configuration file and overrides
/// * `plots` - Whether to render diagnostic PNGs
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 on success, 1 on failure
pub fn run(
    input_dir: &str,
    out_dir: &str,
    config: &ConfigArgs,
    plots: bool,
    json_output: bool,
) -> Result<ExitCode> {
    if json_output {
        run_json(input_dir, out_dir, config, plots)
    } else {
        run_human(input_dir, out_dir, config, plots)
    }
}

fn run_human(input_dir: &str, out_dir: &str, config: &ConfigArgs, plots: bool) -> Result<ExitCode> {
    println!("{} {}", "Processing:".cyan().bold(), input_dir);

    let mut warnings = Vec::new();
    let result = execute(Path::new(input_dir), Path::new(out_dir), config, plots, &mut warnings);
    for warning in &warnings {
        println!("  {} [{}] {}", "!".yellow(), warning.code, warning.message);
    }
    let result = result?;

    for channel in &result.channels {
        println!(
            "  {} {} @ {:.0} Hz: input {} -> recovered {}",
            "+".green(),
            channel.label.bold(),
            channel.carrier_hz,
            format_hz(channel.input_dominant_hz),
            format_hz(channel.recovered.dominant_hz)
        );
        println!("      {} {}", "conditioned".dimmed(), channel.conditioned.path);
        println!("      {} {}", "recovered".dimmed(), channel.recovered.path);
    }
    println!(
        "  {} {} ({} Hz, {} samples)",
        "multiplexed".dimmed(),
        result.multiplexed.path,
        result.multiplexed.sample_rate,
        result.multiplexed.num_samples
    );
    if !result.plots.is_empty() {
        println!("  {} {} plot(s)", "plots".dimmed(), result.plots.len());
    }

    println!(
        "\n{} {} channel(s) processed ({}ms)",
        "SUCCESS".green().bold(),
        result.channels.len(),
        result.duration_ms
    );
    Ok(ExitCode::SUCCESS)
}

fn run_json(input_dir: &str, out_dir: &str, config: &ConfigArgs, plots: bool) -> Result<ExitCode> {
    let mut warnings = Vec::new();
    match execute(Path::new(input_dir), Path::new(out_dir), config, plots, &mut warnings) {
        Ok(result) => {
            CommandOutput::success(result, warnings).print()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            CommandOutput::<ProcessResult>::failure(error_to_json(&e), warnings).print()?;
            Ok(ExitCode::from(1))
        }
    }
}

fn format_hz(hz: Option<f64>) -> String {
    hz.map(|f| format!("{:.0} Hz", f))
        .unwrap_or_else(|| "-".to_string())
}

fn artifact(path: &Path, wav: &WavResult, signal: &Signal) -> Result<ArtifactReport> {
    wav.write_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(ArtifactReport {
        path: path.display().to_string(),
        pcm_hash: wav.pcm_hash.clone(),
        sample_rate: wav.sample_rate,
        bits_per_sample: wav.bits_per_sample,
        num_samples: wav.num_samples,
        dominant_hz: dominant_frequency(signal).ok().flatten(),
    })
}

/// Loads every planned channel from `input_dir` into `session`.
///
/// Fails naming all channels whose file is missing.
pub fn load_inputs(
    session: &mut Session,
    input_dir: &Path,
    warnings: &mut Vec<JsonWarning>,
) -> Result<()> {
    let labels: Vec<String> = session
        .config()
        .labels()
        .into_iter()
        .map(str::to_string)
        .collect();
    let input_rate = session.config().input_rate;

    let missing: Vec<String> = labels
        .iter()
        .filter(|label| !input_path(input_dir, label).is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(DspError::MissingChannels { labels: missing }.into());
    }

    for label in &labels {
        let path = input_path(input_dir, label);
        let mismatch = session
            .load_input(label, &path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        if mismatch {
            warnings.push(JsonWarning::new(
                warning_codes::RATE_MISMATCH,
                format!(
                    "{} is not sampled at the expected {} Hz",
                    path.display(),
                    input_rate
                ),
            ));
        }
    }
    Ok(())
}

/// Path of the input recording for `label`.
pub fn input_path(input_dir: &Path, label: &str) -> PathBuf {
    input_dir.join(format!("{}.wav", label))
}

fn execute(
    input_dir: &Path,
    out_dir: &Path,
    args: &ConfigArgs,
    plots: bool,
    warnings: &mut Vec<JsonWarning>,
) -> Result<ProcessResult> {
    let start = Instant::now();
    let config = args.resolve()?;
    warnings.extend(
        validate_config(&config)
            .warnings
            .iter()
            .map(validation_warning_to_json),
    );

    let mut session = Session::new(config)?;
    load_inputs(&mut session, input_dir, warnings)?;
    session.process()?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let output = session
        .output()
        .context("pipeline produced no output")?;
    let mut channels = Vec::with_capacity(output.channels.len());
    for channel in &output.channels {
        let conditioned_signal = channel.conditioned.to_signal();
        let conditioned = artifact(
            &out_dir.join(format!("conditioned_{}.wav", channel.label)),
            &WavResult::from_quantized(&channel.conditioned)?,
            &conditioned_signal,
        )?;
        let recovered = artifact(
            &out_dir.join(format!("recovered_{}.wav", channel.label)),
            &WavResult::from_signal(&channel.recovered)?,
            &channel.recovered,
        )?;
        let input_dominant_hz = session
            .input(&channel.label)
            .and_then(|s| dominant_frequency(s).ok().flatten());
        channels.push(ChannelReport {
            label: channel.label.clone(),
            carrier_hz: channel.carrier_hz,
            input_dominant_hz,
            conditioned,
            recovered,
        });
    }
    let multiplexed = artifact(
        &out_dir.join("multiplexed.wav"),
        &WavResult::from_signal(&output.multiplexed)?,
        &output.multiplexed,
    )?;

    let plots = if plots {
        render::render_diagnostics(&session.diagnostics(), &out_dir.join("plots"))?
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let result = ProcessResult {
        channels,
        multiplexed,
        plots,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    let report_path = out_dir.join(REPORT_FILE);
    std::fs::write(&report_path, serde_json::to_string_pretty(&result)?)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;

    Ok(result)
}
