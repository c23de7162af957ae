//! Optional spectral-subtraction post-filter.
//!
//! The noise estimate is the set of quiet samples (below a fraction of the
//! peak). Its power spectrum is subtracted from the signal's while the signal
//! phase is kept.

use rustfft::{num_complex::Complex, FftPlanner};
use vowelmux_spec::NoiseReductionConfig;

use crate::error::{DspError, DspResult};
use crate::signal::Signal;

/// Collects the samples of `signal` whose magnitude is below `threshold_ratio`
/// times its peak.
pub fn estimate_noise(signal: &Signal, threshold_ratio: f64) -> DspResult<Signal> {
    if !(threshold_ratio.is_finite() && threshold_ratio > 0.0 && threshold_ratio <= 1.0) {
        return Err(DspError::invalid_param(
            "threshold",
            format!("must be in (0, 1], got {}", threshold_ratio),
        ));
    }

    let limit = threshold_ratio * signal.peak();
    let quiet = signal
        .samples()
        .iter()
        .copied()
        .filter(|x| x.abs() < limit)
        .collect();
    Ok(Signal::new(quiet, signal.sample_rate()))
}

/// Subtracts `factor` times the noise power spectrum from the signal's.
///
/// The noise is tiled to the signal length before transforming. An empty
/// noise estimate leaves the signal unchanged.
pub fn spectral_subtraction(signal: &Signal, noise: &Signal, factor: f64) -> DspResult<Signal> {
    if !(factor.is_finite() && factor >= 0.0) {
        return Err(DspError::invalid_param(
            "factor",
            format!("must be non-negative, got {}", factor),
        ));
    }
    if signal.is_empty() {
        return Ok(signal.clone());
    }
    if noise.is_empty() {
        tracing::warn!(
            len = signal.len(),
            "noise estimate is empty; skipping spectral subtraction"
        );
        return Ok(signal.clone());
    }

    let n = signal.len();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut spec: Vec<Complex<f64>> = signal
        .samples()
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .collect();
    let mut noise_spec: Vec<Complex<f64>> = noise
        .samples()
        .iter()
        .cycle()
        .take(n)
        .map(|&x| Complex::new(x, 0.0))
        .collect();
    forward.process(&mut spec);
    forward.process(&mut noise_spec);

    for (s, nz) in spec.iter_mut().zip(&noise_spec) {
        let power = (s.norm_sqr() - factor * nz.norm_sqr()).max(0.0);
        let phase = s.arg();
        *s = Complex::from_polar(power.sqrt(), phase);
    }
    inverse.process(&mut spec);

    let scale = 1.0 / n as f64;
    let samples = spec.iter().map(|c| c.re * scale).collect();
    Ok(Signal::new(samples, signal.sample_rate()))
}

/// Estimates noise from `signal` itself and subtracts it.
pub fn reduce_noise(signal: &Signal, config: &NoiseReductionConfig) -> DspResult<Signal> {
    let noise = estimate_noise(signal, config.threshold)?;
    tracing::debug!(
        noise_samples = noise.len(),
        total = signal.len(),
        "estimated noise floor"
    );
    spectral_subtraction(signal, &noise, config.factor)
}
