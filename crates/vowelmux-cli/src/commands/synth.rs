//! Synth command implementation
//!
//! Writes synthetic `a.wav`, `e.wav` and `i.wav` recordings: either pure test
//! tones or harmonic vowel approximations with two formants each.

use std::f64::consts::PI;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use vowelmux_dsp::{wav, Signal};

use super::json_output::{error_to_json, CommandOutput};

/// Peak amplitude of generated recordings.
const PEAK: f64 = 0.8;
/// Fade-in/out length in seconds.
const FADE_SECONDS: f64 = 0.02;
/// Formant resonance half-width in Hz.
const FORMANT_WIDTH_HZ: f64 = 120.0;

/// Voice parameters for one vowel.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    /// Channel label
    pub label: &'static str,
    /// Fundamental frequency in Hz
    pub f0_hz: f64,
    /// First and second formant in Hz
    pub formants_hz: [f64; 2],
    /// Test tone frequency in Hz
    pub tone_hz: f64,
}

/// The three reference vowels.
pub const VOICES: [Voice; 3] = [
    Voice {
        label: "a",
        f0_hz: 200.0,
        formants_hz: [800.0, 1200.0],
        tone_hz: 1000.0,
    },
    Voice {
        label: "e",
        f0_hz: 160.0,
        formants_hz: [480.0, 1920.0],
        tone_hz: 1200.0,
    },
    Voice {
        label: "i",
        f0_hz: 250.0,
        formants_hz: [250.0, 2250.0],
        tone_hz: 1500.0,
    },
];

/// One written recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthFile {
    /// Channel label
    pub label: String,
    /// Output path
    pub path: String,
    /// BLAKE3 hash of the PCM payload
    pub pcm_hash: String,
}

/// Result of the synth command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthResult {
    /// "tone" or "vowel"
    pub kind: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Length in seconds
    pub duration_seconds: f64,
    /// Files written
    pub files: Vec<SynthFile>,
}

fn fade(t: f64, duration: f64) -> f64 {
    let edge = t.min(duration - t).max(0.0);
    if edge >= FADE_SECONDS {
        1.0
    } else {
        0.5 - 0.5 * (PI * edge / FADE_SECONDS).cos()
    }
}

fn normalize(signal: Signal) -> Signal {
    let peak = signal.peak();
    if peak == 0.0 {
        return signal;
    }
    let rate = signal.sample_rate();
    let samples = signal.into_samples().into_iter().map(|x| x * PEAK / peak).collect();
    Signal::new(samples, rate)
}

/// A faded sine at the voice's test tone.
pub fn tone(voice: &Voice, duration: f64, sample_rate: u32) -> Signal {
    normalize(Signal::from_fn(duration, sample_rate, |t| {
        fade(t, duration) * (2.0 * PI * voice.tone_hz * t).sin()
    }))
}

/// Harmonics of `f0` below Nyquist, weighted by the two formant resonances.
pub fn vowel(voice: &Voice, duration: f64, sample_rate: u32) -> Signal {
    let nyquist = sample_rate as f64 / 2.0;
    let harmonics: Vec<(f64, f64)> = (1..)
        .map(|k| k as f64 * voice.f0_hz)
        .take_while(|&f| f < nyquist.min(5000.0))
        .map(|f| {
            let weight: f64 = voice
                .formants_hz
                .iter()
                .zip([1.0, 0.5])
                .map(|(&formant, gain)| {
                    gain / (1.0 + ((f - formant) / FORMANT_WIDTH_HZ).powi(2))
                })
                .sum();
            (f, weight)
        })
        .collect();

    normalize(Signal::from_fn(duration, sample_rate, |t| {
        let voiced: f64 = harmonics
            .iter()
            .map(|&(f, w)| w * (2.0 * PI * f * t).sin())
            .sum();
        fade(t, duration) * voiced
    }))
}

/// Writes the three recordings into `out_dir`.
pub fn generate(out_dir: &Path, kind: &str, duration: f64, sample_rate: u32) -> Result<SynthResult> {
    if !(duration.is_finite() && duration > 2.0 * FADE_SECONDS) {
        bail!("duration must exceed {} s, got {}", 2.0 * FADE_SECONDS, duration);
    }
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut files = Vec::with_capacity(VOICES.len());
    for voice in &VOICES {
        let signal = match kind {
            "tone" => tone(voice, duration, sample_rate),
            "vowel" => vowel(voice, duration, sample_rate),
            other => bail!("unknown synth kind: {} (expected tone or vowel)", other),
        };
        let path = out_dir.join(format!("{}.wav", voice.label));
        let result = wav::save(&path, &signal)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        files.push(SynthFile {
            label: voice.label.to_string(),
            path: path.display().to_string(),
            pcm_hash: result.pcm_hash,
        });
    }

    Ok(SynthResult {
        kind: kind.to_string(),
        sample_rate,
        duration_seconds: duration,
        files,
    })
}

/// Run the synth command
pub fn run(out_dir: &str, kind: &str, duration: f64, sample_rate: u32, json_output: bool) -> Result<ExitCode> {
    let result = generate(Path::new(out_dir), kind, duration, sample_rate);

    if json_output {
        return match result {
            Ok(r) => {
                CommandOutput::success(r, vec![]).print()?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                CommandOutput::<SynthResult>::failure(error_to_json(&e), vec![]).print()?;
                Ok(ExitCode::from(1))
            }
        };
    }

    let result = result?;
    for file in &result.files {
        println!("  {} {} {}", "+".green(), file.label.bold(), file.path);
    }
    println!(
        "\n{} {} {} recording(s) at {} Hz",
        "SUCCESS".green().bold(),
        result.files.len(),
        result.kind,
        result.sample_rate
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vowelmux_dsp::spectrum::dominant_frequency;

    #[test]
    fn test_vowel_peaks_at_first_formant() {
        for voice in &VOICES {
            let signal = vowel(voice, 0.5, 24000);
            assert!((signal.peak() - PEAK).abs() < 1e-9);
            let found = dominant_frequency(&signal).unwrap().unwrap();
            assert!(
                (found - voice.formants_hz[0]).abs() <= voice.f0_hz / 2.0,
                "{}: {} Hz",
                voice.label,
                found
            );
        }
    }

    #[test]
    fn test_tone_frequency() {
        let signal = tone(&VOICES[1], 0.5, 24000);
        let found = dominant_frequency(&signal).unwrap().unwrap();
        assert!((found - 1200.0).abs() < 5.0);
    }

    #[test]
    fn test_fade_edges() {
        assert_eq!(fade(0.0, 1.0), 0.0);
        assert_eq!(fade(0.5, 1.0), 1.0);
        assert!(fade(1.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_generate_rejects_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate(dir.path(), "noise", 0.5, 24000).is_err());
        assert!(generate(dir.path(), "tone", 0.01, 24000).is_err());
    }
}
