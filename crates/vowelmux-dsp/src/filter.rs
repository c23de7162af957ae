//! Filter bank: Butterworth band-pass/low-pass and IIR notch filters.
//!
//! Band-pass and low-pass filters are digital Butterworth designs expressed as
//! second-order sections and applied causally from zero state. The notch is a
//! single biquad applied forward-backward so it adds no phase shift.
//!
//! Designs are pure functions of their [`FilterSpec`], so a [`FilterBank`]
//! caches them for reuse across channels.

pub mod biquad;
mod butterworth;
pub mod zero_phase;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::error::{DspError, DspResult};
use crate::signal::Signal;

pub use biquad::{BiquadCoeffs, BiquadFilter, SosCascade};
pub use zero_phase::filtfilt;

/// Highest supported Butterworth order.
pub const MAX_ORDER: u32 = 12;

/// Shape of a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    /// Passes `low_hz..high_hz`.
    BandPass { low_hz: f64, high_hz: f64 },
    /// Passes `0..cutoff_hz`.
    LowPass { cutoff_hz: f64 },
    /// Rejects a narrow band around `center_hz`.
    Notch { center_hz: f64, q: f64 },
}

/// Everything needed to design a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Butterworth prototype order. Fixed at 2 for notches.
    pub order: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl FilterSpec {
    /// Band-pass spec.
    pub fn bandpass(low_hz: f64, high_hz: f64, order: u32, sample_rate: u32) -> Self {
        Self {
            kind: FilterKind::BandPass { low_hz, high_hz },
            order,
            sample_rate,
        }
    }

    /// Low-pass spec.
    pub fn lowpass(cutoff_hz: f64, order: u32, sample_rate: u32) -> Self {
        Self {
            kind: FilterKind::LowPass { cutoff_hz },
            order,
            sample_rate,
        }
    }

    /// Notch spec.
    pub fn notch(center_hz: f64, q: f64, sample_rate: u32) -> Self {
        Self {
            kind: FilterKind::Notch { center_hz, q },
            order: 2,
            sample_rate,
        }
    }

    /// Returns true if the filter is applied forward-backward.
    pub fn is_zero_phase(&self) -> bool {
        matches!(self.kind, FilterKind::Notch { .. })
    }

    /// Checks frequencies against Nyquist and the order range.
    pub fn validate(&self) -> DspResult<()> {
        if self.sample_rate == 0 {
            return Err(DspError::invalid_param("sample_rate", "must be positive"));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        let in_band = |f: f64| f.is_finite() && f > 0.0 && f < nyquist;

        match self.kind {
            FilterKind::BandPass { low_hz, high_hz } => {
                if !(in_band(low_hz) && in_band(high_hz) && low_hz < high_hz) {
                    return Err(DspError::invalid_param(
                        "band",
                        format!(
                            "need 0 < low < high < {} Hz, got {}..{} Hz",
                            nyquist, low_hz, high_hz
                        ),
                    ));
                }
            }
            FilterKind::LowPass { cutoff_hz } => {
                if !in_band(cutoff_hz) {
                    return Err(DspError::invalid_param(
                        "cutoff_hz",
                        format!("need 0 < cutoff < {} Hz, got {} Hz", nyquist, cutoff_hz),
                    ));
                }
            }
            FilterKind::Notch { center_hz, q } => {
                if !in_band(center_hz) {
                    return Err(DspError::invalid_param(
                        "center_hz",
                        format!("need 0 < center < {} Hz, got {} Hz", nyquist, center_hz),
                    ));
                }
                if !(q.is_finite() && q > 0.0) {
                    return Err(DspError::invalid_param(
                        "q",
                        format!("must be positive, got {}", q),
                    ));
                }
                return Ok(());
            }
        }

        if self.order == 0 || self.order > MAX_ORDER {
            return Err(DspError::invalid_param(
                "order",
                format!("must be in 1..={}, got {}", MAX_ORDER, self.order),
            ));
        }
        Ok(())
    }

    /// Designs the second-order-section cascade for this spec.
    pub fn design(&self) -> DspResult<SosCascade> {
        self.validate()?;
        let nyquist = self.sample_rate as f64 / 2.0;
        let order = self.order as usize;

        match self.kind {
            FilterKind::BandPass { low_hz, high_hz } => {
                butterworth::bandpass(order, low_hz / nyquist, high_hz / nyquist)
            }
            FilterKind::LowPass { cutoff_hz } => butterworth::lowpass(order, cutoff_hz / nyquist),
            FilterKind::Notch { center_hz, q } => {
                let coeffs = BiquadCoeffs::notch(center_hz, q, self.sample_rate as f64);
                if !coeffs.is_finite() {
                    return Err(DspError::instability("non-finite notch coefficients"));
                }
                Ok(SosCascade::new(vec![coeffs]))
            }
        }
    }

    fn key(&self) -> (u8, u64, u64, u32, u32) {
        let (tag, a, b) = match self.kind {
            FilterKind::BandPass { low_hz, high_hz } => (0, low_hz, high_hz),
            FilterKind::LowPass { cutoff_hz } => (1, cutoff_hz, 0.0),
            FilterKind::Notch { center_hz, q } => (2, center_hz, q),
        };
        (tag, a.to_bits(), b.to_bits(), self.order, self.sample_rate)
    }
}

impl Eq for FilterSpec {}

impl Hash for FilterSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Cache of designed filters keyed by spec.
#[derive(Debug, Default)]
pub struct FilterBank {
    cache: Mutex<HashMap<FilterSpec, Arc<SosCascade>>>,
}

impl FilterBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached designs.
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing has been designed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cascade for `spec`, designing it on first use.
    pub fn design(&self, spec: &FilterSpec) -> DspResult<Arc<SosCascade>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cascade) = cache.get(spec) {
            return Ok(Arc::clone(cascade));
        }

        let cascade = Arc::new(spec.design()?);
        tracing::debug!(
            kind = ?spec.kind,
            order = spec.order,
            sample_rate = spec.sample_rate,
            sections = cascade.sections().len(),
            "designed filter"
        );
        cache.insert(*spec, Arc::clone(&cascade));
        Ok(cascade)
    }

    /// Applies the filter described by `spec` to `signal`.
    pub fn apply(&self, spec: &FilterSpec, signal: &Signal) -> DspResult<Signal> {
        if signal.sample_rate() != spec.sample_rate {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!(
                    "filter designed for {} Hz applied to a {} Hz signal",
                    spec.sample_rate,
                    signal.sample_rate()
                ),
            ));
        }

        let cascade = self.design(spec)?;
        let samples = if spec.is_zero_phase() {
            filtfilt(&cascade, signal.samples())?
        } else {
            cascade.filter(signal.samples())
        };
        Ok(Signal::new(samples, signal.sample_rate()))
    }
}

/// Band-pass filters `signal` to `low_hz..high_hz` with a Butterworth cascade.
pub fn apply_bandpass(signal: &Signal, low_hz: f64, high_hz: f64, order: u32) -> DspResult<Signal> {
    let spec = FilterSpec::bandpass(low_hz, high_hz, order, signal.sample_rate());
    FilterBank::new().apply(&spec, signal)
}

/// Low-pass filters `signal` below `cutoff_hz` with a Butterworth cascade.
pub fn apply_lowpass(signal: &Signal, cutoff_hz: f64, order: u32) -> DspResult<Signal> {
    let spec = FilterSpec::lowpass(cutoff_hz, order, signal.sample_rate());
    FilterBank::new().apply(&spec, signal)
}

/// Removes a narrow band around `center_hz` without phase distortion.
pub fn apply_notch(signal: &Signal, center_hz: f64, q: f64) -> DspResult<Signal> {
    let spec = FilterSpec::notch(center_hz, q, signal.sample_rate());
    FilterBank::new().apply(&spec, signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_validation() {
        assert!(FilterSpec::bandpass(300.0, 3400.0, 10, 24000).validate().is_ok());
        assert!(FilterSpec::bandpass(3400.0, 300.0, 10, 24000).validate().is_err());
        assert!(FilterSpec::bandpass(300.0, 4000.0, 10, 8000).validate().is_err());
        assert!(FilterSpec::bandpass(0.0, 3400.0, 10, 8000).validate().is_err());
        assert!(FilterSpec::bandpass(300.0, 3400.0, 0, 8000).validate().is_err());
        assert!(FilterSpec::bandpass(300.0, 3400.0, 13, 8000).validate().is_err());
        assert!(FilterSpec::lowpass(4000.0, 6, 8000).validate().is_err());
        assert!(FilterSpec::notch(2800.0, 0.0, 24000).validate().is_err());
        assert!(FilterSpec::notch(2800.0, 30.0, 24000).validate().is_ok());
    }

    #[test]
    fn test_bank_caches_designs() {
        let bank = FilterBank::new();
        let spec = FilterSpec::bandpass(300.0, 3400.0, 10, 24000);
        let a = bank.design(&spec).unwrap();
        let b = bank.design(&spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bank.len(), 1);

        bank.design(&FilterSpec::bandpass(300.0, 3400.0, 10, 8000))
            .unwrap();
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn test_rate_mismatch_rejected() {
        let bank = FilterBank::new();
        let spec = FilterSpec::lowpass(1000.0, 4, 8000);
        let signal = Signal::zeros(100, 16000);
        assert!(matches!(
            bank.apply(&spec, &signal),
            Err(DspError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_causal_filter_starts_from_rest() {
        let signal = Signal::zeros(32, 8000);
        let out = apply_bandpass(&signal, 300.0, 3400.0, 4).unwrap();
        assert!(out.samples().iter().all(|&x| x == 0.0));
        assert_eq!(out.len(), 32);
    }
}
