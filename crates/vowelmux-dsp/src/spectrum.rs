//! Magnitude spectra for diagnostics and tests.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::error::{DspError, DspResult};
use crate::signal::Signal;

/// One-sided magnitude spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Bin center frequencies in Hz.
    pub frequencies: Vec<f64>,
    /// Bin magnitudes, normalized by the transform length.
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    /// Number of bins.
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// Returns true if there are no bins.
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Frequency of the strongest bin, ignoring DC.
    pub fn dominant_frequency(&self) -> Option<f64> {
        self.magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }

    /// Sum of squared magnitudes of bins within `low_hz..=high_hz`.
    pub fn band_power(&self, low_hz: f64, high_hz: f64) -> f64 {
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
            .map(|(_, m)| m * m)
            .sum()
    }

    /// Largest magnitude.
    pub fn peak_magnitude(&self) -> f64 {
        self.magnitudes.iter().fold(0.0_f64, |acc, &m| acc.max(m))
    }
}

/// Computes `|DFT(x)| / N` over the first `N / 2` bins.
pub fn magnitude_spectrum(signal: &Signal) -> DspResult<Spectrum> {
    if signal.len() < 2 {
        return Err(DspError::invalid_input(format!(
            "spectrum needs at least 2 samples, got {}",
            signal.len()
        )));
    }

    let n = signal.len();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f64>> = signal
        .samples()
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .collect();
    fft.process(&mut buffer);

    let half = n / 2;
    let resolution = signal.sample_rate() as f64 / n as f64;
    let frequencies = (0..half).map(|i| i as f64 * resolution).collect();
    let magnitudes = buffer
        .iter()
        .take(half)
        .map(|c| c.norm() / n as f64)
        .collect();

    Ok(Spectrum {
        frequencies,
        magnitudes,
    })
}

/// Dominant frequency of `signal`, ignoring DC.
pub fn dominant_frequency(signal: &Signal) -> DspResult<Option<f64>> {
    Ok(magnitude_spectrum(signal)?.dominant_frequency())
}
