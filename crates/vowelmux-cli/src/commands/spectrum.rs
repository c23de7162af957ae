//! Spectrum command implementation
//!
//! Prints the strongest spectral peaks of a WAV file and optionally renders
//! its diagnostic plot.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use vowelmux_dsp::{magnitude_spectrum, wav, Spectrum};

use super::json_output::{error_to_json, error_codes, CommandOutput, JsonError};
use crate::render;

/// A local maximum of the magnitude spectrum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Peak {
    /// Bin frequency in Hz
    pub frequency_hz: f64,
    /// Bin magnitude
    pub magnitude: f64,
}

/// Result of the spectrum command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpectrumResult {
    /// Analyzed file
    pub file: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of samples analyzed
    pub num_samples: usize,
    /// Frequency resolution in Hz
    pub resolution_hz: f64,
    /// Strongest non-DC frequency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_hz: Option<f64>,
    /// Strongest peaks, loudest first
    pub peaks: Vec<Peak>,
    /// Plot written, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
}

/// Returns up to `count` local maxima (excluding DC), loudest first.
pub fn find_peaks(spectrum: &Spectrum, count: usize) -> Vec<Peak> {
    let m = &spectrum.magnitudes;
    let mut peaks: Vec<Peak> = (1..m.len())
        .filter(|&i| m[i] > m[i - 1] && m.get(i + 1).map_or(true, |&next| m[i] >= next))
        .map(|i| Peak {
            frequency_hz: spectrum.frequencies[i],
            magnitude: m[i],
        })
        .collect();
    peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    peaks.truncate(count);
    peaks
}

/// Analyzes `input`, rendering a plot to `plot_path` when given.
pub fn analyze(input: &Path, plot_path: Option<&Path>, top: usize) -> Result<SpectrumResult> {
    let loaded = wav::load(input, None)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let signal = loaded.signal;
    let spectrum = magnitude_spectrum(&signal)?;

    let plot = match plot_path {
        Some(path) => {
            render::write_plot(&signal, path)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(SpectrumResult {
        file: input.display().to_string(),
        sample_rate: signal.sample_rate(),
        num_samples: signal.len(),
        resolution_hz: signal.sample_rate() as f64 / signal.len() as f64,
        dominant_hz: spectrum.dominant_frequency(),
        peaks: find_peaks(&spectrum, top),
        plot,
    })
}

/// Run the spectrum command
///
/// # Arguments
/// * `input` - WAV file to analyze
/// * `plot` - Optional PNG output path
/// * `top` - Number of peaks to report
/// * `json_output` - Whether to output machine-readable JSON
pub fn run(input: &str, plot: Option<&str>, top: usize, json_output: bool) -> Result<ExitCode> {
    let result = analyze(Path::new(input), plot.map(Path::new), top);

    if json_output {
        return match result {
            Ok(r) => {
                CommandOutput::success(r, vec![]).print()?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                let errors = if Path::new(input).is_file() {
                    error_to_json(&e)
                } else {
                    vec![JsonError::new(error_codes::INPUT_READ, format!("{:#}", e)).with_file(input)]
                };
                CommandOutput::<SpectrumResult>::failure(errors, vec![]).print()?;
                Ok(ExitCode::from(1))
            }
        };
    }

    let result = result?;
    println!(
        "{} {} ({} Hz, {} samples, {:.2} Hz/bin)",
        "Spectrum:".cyan().bold(),
        result.file,
        result.sample_rate,
        result.num_samples,
        result.resolution_hz
    );
    for (rank, peak) in result.peaks.iter().enumerate() {
        println!(
            "  {:>2}. {:>9.1} Hz  {:.5}",
            rank + 1,
            peak.frequency_hz,
            peak.magnitude
        );
    }
    if let Some(plot) = &result.plot {
        println!("  {} {}", "plot".dimmed(), plot);
    }
    Ok(ExitCode::SUCCESS)
}
