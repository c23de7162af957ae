//! Carrier modulation and coherent demodulation.

use std::f64::consts::PI;

use vowelmux_spec::{Band, WindowKind};

use crate::error::{DspError, DspResult};
use crate::filter::{FilterBank, FilterSpec};
use crate::signal::Signal;

/// Symmetric Hann window spanning `len` samples.
pub fn hann(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f64;
            (0..len)
                .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos())
                .collect()
        }
    }
}

/// Multiplies `signal` by `cos(2π·fc·n/fs)` and the optional taper.
fn mix(signal: &Signal, carrier_hz: f64, window: WindowKind) -> DspResult<Signal> {
    let fs = signal.sample_rate() as f64;
    if !(carrier_hz.is_finite() && carrier_hz > 0.0 && carrier_hz < fs / 2.0) {
        return Err(DspError::invalid_param(
            "carrier_hz",
            format!("need 0 < carrier < {} Hz, got {} Hz", fs / 2.0, carrier_hz),
        ));
    }

    let taper = match window {
        WindowKind::Hann => Some(hann(signal.len())),
        WindowKind::None => None,
    };
    let omega = 2.0 * PI * carrier_hz / fs;
    let samples = signal
        .samples()
        .iter()
        .enumerate()
        .map(|(n, &x)| {
            let w = taper.as_ref().map_or(1.0, |t| t[n]);
            x * (omega * n as f64).cos() * w
        })
        .collect();
    Ok(Signal::new(samples, signal.sample_rate()))
}

/// Shifts a baseband signal up to `carrier_hz`.
///
/// The carrier must lie strictly between 0 Hz and the signal's Nyquist rate.
pub fn modulate(baseband: &Signal, carrier_hz: f64, window: WindowKind) -> DspResult<Signal> {
    mix(baseband, carrier_hz, window)
}

/// Shifts a passband signal back down and keeps `recovery` only.
pub fn demodulate(
    passband: &Signal,
    carrier_hz: f64,
    recovery: Band,
    order: u32,
    window: WindowKind,
) -> DspResult<Signal> {
    demodulate_with(&FilterBank::new(), passband, carrier_hz, recovery, order, window)
}

/// [`demodulate`] drawing its recovery filter from `bank`.
pub fn demodulate_with(
    bank: &FilterBank,
    passband: &Signal,
    carrier_hz: f64,
    recovery: Band,
    order: u32,
    window: WindowKind,
) -> DspResult<Signal> {
    let mixed = mix(passband, carrier_hz, window)?;
    let spec = FilterSpec::bandpass(
        recovery.low_hz,
        recovery.high_hz,
        order,
        passband.sample_rate(),
    );
    bank.apply(&spec, &mixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_shape() {
        let w = hann(5);
        assert_eq!(w.len(), 5);
        assert!(w[0].abs() < 1e-15);
        assert!((w[2] - 1.0).abs() < 1e-15);
        assert!(w[4].abs() < 1e-15);
        assert!((w[1] - 0.5).abs() < 1e-12);
        assert_eq!(hann(1), vec![1.0]);
        assert!(hann(0).is_empty());
    }

    #[test]
    fn test_modulate_without_window_is_carrier_product() {
        let fs = 48000;
        let s = Signal::new(vec![1.0; 8], fs);
        let out = modulate(&s, 12000.0, WindowKind::None).unwrap();
        // cos(π/2·n): 1, 0, -1, 0, ...
        let expected = [1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0, 0.0];
        for (a, b) in out.samples().iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_modulate_rejects_carrier_above_nyquist() {
        let s = Signal::zeros(16, 8000);
        assert!(modulate(&s, 4000.0, WindowKind::Hann).is_err());
        assert!(modulate(&s, -5.0, WindowKind::Hann).is_err());
    }

    #[test]
    fn test_demodulate_recovers_baseband_tone() {
        let fs = 48000;
        let tone = Signal::from_fn(0.5, fs, |t| (2.0 * PI * 1000.0 * t).sin());
        let band = Band::new(300.0, 3400.0);

        let passband = modulate(&tone, 12000.0, WindowKind::None).unwrap();
        let recovered = demodulate(&passband, 12000.0, band, 6, WindowKind::None).unwrap();
        assert_eq!(recovered.sample_rate(), fs);
        assert_eq!(recovered.len(), tone.len());

        // cos² leaves half the amplitude at baseband; the 2·fc image is filtered out.
        let settled = recovered.slice(fs as usize / 10, recovered.len());
        let expected = 0.5 / 2f64.sqrt();
        assert!((settled.rms() - expected).abs() < 0.02, "rms {}", settled.rms());
        let peak = crate::spectrum::dominant_frequency(&settled).unwrap().unwrap();
        assert!((peak - 1000.0).abs() <= 5.0, "peak at {} Hz", peak);
    }

    #[test]
    fn test_demodulate_with_caches_recovery_filter() {
        let bank = FilterBank::new();
        let passband = Signal::from_fn(0.1, 48000, |t| (2.0 * PI * 13000.0 * t).sin());
        let band = Band::new(300.0, 3400.0);
        let first = demodulate_with(&bank, &passband, 12000.0, band, 6, WindowKind::Hann).unwrap();
        let second = demodulate(&passband, 12000.0, band, 6, WindowKind::Hann).unwrap();
        assert_eq!(first, second);
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_window_tapers_edges() {
        let s = Signal::new(vec![1.0; 101], 48000);
        let out = modulate(&s, 1000.0, WindowKind::Hann).unwrap();
        assert!(out.samples()[0].abs() < 1e-15);
        assert!(out.samples()[100].abs() < 1e-12);
    }
}
