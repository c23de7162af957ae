//! Sampled signal containers.

use std::collections::BTreeMap;

use crate::error::{DspError, DspResult};

/// Raw channel inputs keyed by channel label.
pub type ChannelInputs = BTreeMap<String, Signal>;

/// Real-valued samples tagged with their sample rate.
///
/// Signals are immutable; every processing stage returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Signal {
    /// Creates a signal from samples at `sample_rate` Hz.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Creates a silent signal of `len` samples.
    pub fn zeros(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Samples a function of time (seconds) for `duration_secs`.
    pub fn from_fn(duration_secs: f64, sample_rate: u32, f: impl Fn(f64) -> f64) -> Self {
        let len = (duration_secs * sample_rate as f64).round() as usize;
        let samples = (0..len)
            .map(|n| f(n as f64 / sample_rate as f64))
            .collect();
        Self::new(samples, sample_rate)
    }

    /// The samples.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Consumes the signal, returning its samples.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
    }

    /// Root-mean-square level.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|x| x * x).sum();
        (sum / self.samples.len() as f64).sqrt()
    }

    /// Returns a copy of the samples in `start..end`, clamped to the signal.
    pub fn slice(&self, start: usize, end: usize) -> Signal {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        Signal::new(self.samples[start..end].to_vec(), self.sample_rate)
    }

    /// Fails unless the signal holds at least one sample and a positive rate.
    pub(crate) fn ensure_usable(&self, what: &str) -> DspResult<()> {
        if self.sample_rate == 0 {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!("{} has a zero sample rate", what),
            ));
        }
        if self.samples.is_empty() {
            return Err(DspError::invalid_input(format!("{} is empty", what)));
        }
        Ok(())
    }
}

/// 8-bit signed samples produced by the quantization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedSignal {
    samples: Vec<i8>,
    sample_rate: u32,
}

impl QuantizedSignal {
    /// Creates a quantized signal.
    pub fn new(samples: Vec<i8>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// The 8-bit samples.
    pub fn samples(&self) -> &[i8] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> u8 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Converts to a real signal with values in -127..=127.
    pub fn to_signal(&self) -> Signal {
        Signal::new(
            self.samples.iter().map(|&s| s as f64).collect(),
            self.sample_rate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_length() {
        let s = Signal::from_fn(0.5, 8000, |t| t);
        assert_eq!(s.len(), 4000);
        assert_eq!(s.sample_rate(), 8000);
        assert!((s.duration_seconds() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_peak_and_rms() {
        let s = Signal::new(vec![1.0, -2.0, 1.0, -2.0], 100);
        assert_eq!(s.peak(), 2.0);
        assert!((s.rms() - 2.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(Signal::zeros(0, 100).rms(), 0.0);
    }

    #[test]
    fn test_slice_clamps() {
        let s = Signal::new(vec![1.0, 2.0, 3.0], 10);
        assert_eq!(s.slice(1, 10).samples(), &[2.0, 3.0]);
        assert!(s.slice(5, 10).is_empty());
    }

    #[test]
    fn test_quantized_to_signal() {
        let q = QuantizedSignal::new(vec![-127, 0, 64, 127], 8000);
        assert_eq!(q.peak(), 127);
        assert_eq!(q.to_signal().samples(), &[-127.0, 0.0, 64.0, 127.0]);
    }

    #[test]
    fn test_ensure_usable() {
        assert!(Signal::zeros(0, 8000).ensure_usable("x").is_err());
        assert!(Signal::zeros(4, 0).ensure_usable("x").is_err());
        assert!(Signal::zeros(4, 8000).ensure_usable("x").is_ok());
    }
}
