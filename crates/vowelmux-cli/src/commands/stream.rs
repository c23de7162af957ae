//! Stream command implementation
//!
//! Replays `{label}.wav` from an input directory block by block, multiplexes
//! each block on a processing thread, and writes the recovered blocks as
//! numbered WAV files per channel.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use vowelmux_dsp::device::{PlaybackDevice, SignalReplay, WavSink};
use vowelmux_dsp::{stream, wav};
use vowelmux_dsp::{CancelToken, DspError, Multiplexer, StreamStats};

use super::json_output::{error_to_json, warning_codes, CommandOutput, JsonWarning};
use super::process::input_path;
use crate::config::ConfigArgs;

/// Result of a stream run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamResult {
    /// Blocks recorded
    pub captured: u64,
    /// Blocks processed
    pub processed: u64,
    /// Blocks dropped on overrun
    pub dropped: u64,
    /// Blocks skipped because they could not be processed
    pub skipped: u64,
    /// Recovered block files per channel
    pub written: BTreeMap<String, Vec<String>>,
}

/// Stream-specific overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOverrides {
    /// Block length in seconds
    pub block_seconds: Option<f64>,
    /// Queue depth in blocks
    pub queue_depth: Option<usize>,
}

/// Run the stream command
///
/// # Returns
/// Exit code: 0 on success, 1 on failure
pub fn run(
    input_dir: &str,
    out_dir: &str,
    config: &ConfigArgs,
    overrides: StreamOverrides,
    json_output: bool,
) -> Result<ExitCode> {
    let mut warnings = Vec::new();
    let result = execute(Path::new(input_dir), Path::new(out_dir), config, overrides, &mut warnings);

    if json_output {
        return match result {
            Ok(r) => {
                CommandOutput::success(r, warnings).print()?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                CommandOutput::<StreamResult>::failure(error_to_json(&e), warnings).print()?;
                Ok(ExitCode::from(1))
            }
        };
    }

    println!("{} {}", "Streaming:".cyan().bold(), input_dir);
    for warning in &warnings {
        println!("  {} [{}] {}", "!".yellow(), warning.code, warning.message);
    }
    let result = result?;
    for (label, files) in &result.written {
        println!("  {} {}: {} block(s)", "+".green(), label.bold(), files.len());
    }
    println!(
        "\n{} captured {}, processed {}, dropped {}, skipped {}",
        "DONE".green().bold(),
        result.captured,
        result.processed,
        result.dropped,
        result.skipped
    );
    Ok(ExitCode::SUCCESS)
}

/// Streams the recordings in `input_dir` into per-channel block files under
/// `out_dir`, collecting warnings along the way.
pub fn execute(
    input_dir: &Path,
    out_dir: &Path,
    args: &ConfigArgs,
    overrides: StreamOverrides,
    warnings: &mut Vec<JsonWarning>,
) -> Result<StreamResult> {
    let mut config = args.resolve()?;
    if let Some(seconds) = overrides.block_seconds {
        config.stream.block_seconds = seconds;
    }
    if let Some(depth) = overrides.queue_depth {
        config.stream.queue_depth = depth;
    }

    let mux = Multiplexer::new(config.clone())?;
    let labels: Vec<String> = config.labels().into_iter().map(str::to_string).collect();

    let missing: Vec<String> = labels
        .iter()
        .filter(|label| !input_path(input_dir, label).is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(DspError::MissingChannels { labels: missing }.into());
    }

    let mut devices = Vec::with_capacity(labels.len());
    let mut sinks = BTreeMap::new();
    for label in &labels {
        let path = input_path(input_dir, label);
        let loaded = wav::load(&path, Some(config.input_rate))
            .with_context(|| format!("Failed to load {}", path.display()))?;
        if loaded.rate_mismatch {
            warnings.push(JsonWarning::new(
                warning_codes::RATE_MISMATCH,
                format!(
                    "{} is not sampled at the expected {} Hz",
                    path.display(),
                    config.input_rate
                ),
            ));
        }
        devices.push((label.clone(), SignalReplay::new(loaded.signal)));
        sinks.insert(label.clone(), WavSink::new(out_dir.join(label), label.as_str())?);
    }

    let mut skipped = 0;
    let stats: StreamStats = stream::run(
        &config.stream,
        config.input_rate,
        &mut devices,
        &CancelToken::new(),
        |block| {
            let output = match mux.run(&block.inputs) {
                Ok(output) => output,
                Err(DspError::InvalidInput { message }) => {
                    tracing::warn!(block = block.index, %message, "skipping block");
                    skipped += 1;
                    warnings.push(JsonWarning::new(
                        warning_codes::BLOCK_SKIPPED,
                        format!("block {}: {}", block.index, message),
                    ));
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            for channel in &output.channels {
                if let Some(sink) = sinks.get_mut(&channel.label) {
                    sink.play(&channel.recovered)?;
                }
            }
            Ok(())
        },
    )?;

    let written = sinks
        .iter()
        .map(|(label, sink)| {
            let files = sink
                .written()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            (label.clone(), files)
        })
        .collect();

    Ok(StreamResult {
        captured: stats.captured,
        processed: stats.processed - skipped,
        dropped: stats.dropped,
        skipped,
        written,
    })
}
