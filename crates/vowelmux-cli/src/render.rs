//! Diagnostic plots.
//!
//! Each signal is drawn as one PNG with two stacked panels: the waveform
//! (per-column min/max, normalized to the signal peak) on top and the
//! magnitude spectrum in dB below.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use vowelmux_dsp::{magnitude_spectrum, Signal};

/// Plot width in pixels.
pub const PLOT_WIDTH: u32 = 1024;
/// Height of each panel in pixels.
pub const PANEL_HEIGHT: u32 = 256;
/// Spectrum floor relative to the strongest bin.
pub const SPECTRUM_FLOOR_DB: f64 = -80.0;

const BACKGROUND_COLOR: [u8; 3] = [32, 32, 32];
const WAVEFORM_COLOR: [u8; 3] = [64, 192, 255];
const SPECTRUM_COLOR: [u8; 3] = [255, 128, 64];
const AXIS_COLOR: [u8; 3] = [64, 64, 64];

/// An encoded plot.
pub struct PlotResult {
    /// PNG image data.
    pub png_data: Vec<u8>,
    /// BLAKE3 hash of the PNG data.
    pub hash: String,
}

struct Canvas {
    width: usize,
    height: usize,
    rgb: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        let rgb = BACKGROUND_COLOR
            .iter()
            .copied()
            .cycle()
            .take(width * height * 3)
            .collect();
        Self { width, height, rgb }
    }

    fn put(&mut self, x: usize, y: usize, color: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 3;
            self.rgb[idx..idx + 3].copy_from_slice(&color);
        }
    }

    fn vline(&mut self, x: usize, y0: usize, y1: usize, color: [u8; 3]) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.put(x, y, color);
        }
    }

    fn hline(&mut self, y: usize, color: [u8; 3]) {
        for x in 0..self.width {
            self.put(x, y, color);
        }
    }
}

/// Per-column (min, max) of `samples`.
fn column_extents(samples: &[f64], columns: usize) -> Vec<(f64, f64)> {
    if samples.is_empty() {
        return vec![(0.0, 0.0); columns];
    }
    let per_column = samples.len() as f64 / columns as f64;
    (0..columns)
        .map(|col| {
            let start = (col as f64 * per_column).floor() as usize;
            let end = (((col + 1) as f64 * per_column).ceil() as usize).min(samples.len());
            if start >= end {
                return (0.0, 0.0);
            }
            samples[start..end]
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
        })
        .collect()
}

/// Maps `value` in [-1, 1] onto rows `top..top + height`, positive upwards.
fn value_to_row(value: f64, top: usize, height: usize) -> usize {
    let normalized = (1.0 - value.clamp(-1.0, 1.0)) / 2.0;
    top + ((normalized * (height - 1) as f64).round() as usize).min(height - 1)
}

fn draw_waveform(canvas: &mut Canvas, signal: &Signal) {
    let height = PANEL_HEIGHT as usize;
    canvas.hline(height / 2, AXIS_COLOR);

    let peak = signal.peak();
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
    let normalized: Vec<f64> = signal.samples().iter().map(|s| s * scale).collect();

    for (x, (lo, hi)) in column_extents(&normalized, canvas.width).into_iter().enumerate() {
        let top = value_to_row(hi, 0, height);
        let bottom = value_to_row(lo, 0, height);
        canvas.vline(x, top, bottom, WAVEFORM_COLOR);
    }
}

fn draw_spectrum(canvas: &mut Canvas, signal: &Signal) {
    let top = PANEL_HEIGHT as usize;
    let height = PANEL_HEIGHT as usize;
    let baseline = top + height - 1;
    canvas.hline(top, AXIS_COLOR);

    let spectrum = match magnitude_spectrum(signal) {
        Ok(s) => s,
        Err(_) => return,
    };
    let peak = spectrum.peak_magnitude();
    if peak <= 0.0 {
        return;
    }

    let db: Vec<f64> = spectrum
        .magnitudes
        .iter()
        .map(|&m| (20.0 * (m / peak).log10()).max(SPECTRUM_FLOOR_DB))
        .collect();
    for (x, (_, hi)) in column_extents(&db, canvas.width).into_iter().enumerate() {
        let level = 1.0 - hi / SPECTRUM_FLOOR_DB;
        let row = baseline - ((level * (height - 1) as f64).round() as usize).min(height - 1);
        canvas.vline(x, row, baseline, SPECTRUM_COLOR);
    }
}

fn encode_png_to_writer<W: Write>(
    rgb_data: &[u8],
    width: u32,
    height: u32,
    writer: W,
) -> Result<(), png::EncodingError> {
    let mut encoder = Encoder::new(writer, width, height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    // Fixed settings keep the output byte-identical across runs.
    encoder.set_compression(Compression::Default);
    encoder.set_filter(FilterType::NoFilter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(rgb_data)?;
    Ok(())
}

/// Renders the waveform and spectrum panels for `signal`.
pub fn render_signal(signal: &Signal) -> Result<PlotResult> {
    let mut canvas = Canvas::new(PLOT_WIDTH, 2 * PANEL_HEIGHT);
    draw_waveform(&mut canvas, signal);
    draw_spectrum(&mut canvas, signal);

    let mut png_data = Vec::new();
    encode_png_to_writer(&canvas.rgb, PLOT_WIDTH, 2 * PANEL_HEIGHT, &mut png_data)
        .context("Failed to encode plot")?;
    let hash = blake3::hash(&png_data).to_hex().to_string();
    Ok(PlotResult { png_data, hash })
}

/// File name for a diagnostic label: "Processed A" → "processed_a.png".
pub fn plot_file_name(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.png", stem)
}

/// Renders `signal` and writes it to `path`, returning the PNG hash.
pub fn write_plot(signal: &Signal, path: &Path) -> Result<String> {
    let plot = render_signal(signal)?;
    std::fs::write(path, &plot.png_data)
        .with_context(|| format!("Failed to write plot: {}", path.display()))?;
    Ok(plot.hash)
}

/// Writes one plot per labelled signal into `dir`.
pub fn render_diagnostics(signals: &BTreeMap<String, Signal>, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create plot directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(signals.len());
    for (label, signal) in signals {
        let path = dir.join(plot_file_name(label));
        write_plot(signal, &path)?;
        tracing::debug!(label = %label, path = %path.display(), "wrote plot");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone() -> Signal {
        Signal::from_fn(0.1, 8000, |t| (2.0 * PI * 1000.0 * t).sin())
    }

    #[test]
    fn test_plot_file_name() {
        assert_eq!(plot_file_name("Processed A"), "processed_a.png");
        assert_eq!(plot_file_name("Multiplexed"), "multiplexed.png");
    }

    #[test]
    fn test_value_to_row() {
        assert_eq!(value_to_row(1.0, 0, 256), 0);
        assert_eq!(value_to_row(-1.0, 0, 256), 255);
        assert_eq!(value_to_row(-5.0, 256, 256), 511);
    }

    #[test]
    fn test_render_dimensions() {
        let plot = render_signal(&tone()).unwrap();
        let decoder = png::Decoder::new(plot.png_data.as_slice());
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.width, PLOT_WIDTH);
        assert_eq!(info.height, 2 * PANEL_HEIGHT);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_signal(&tone()).unwrap();
        let b = render_signal(&tone()).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_render_silence_and_empty() {
        assert!(render_signal(&Signal::zeros(100, 8000)).is_ok());
        assert!(render_signal(&Signal::new(Vec::new(), 8000)).is_ok());
    }

    #[test]
    fn test_render_diagnostics_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut signals = BTreeMap::new();
        signals.insert("Original A".to_string(), tone());
        signals.insert("Multiplexed".to_string(), tone());
        let written = render_diagnostics(&signals, &dir.path().join("plots")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }
}
