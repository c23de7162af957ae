//! Rational-factor resampling with Kaiser windowed-sinc kernels.
//!
//! Kernels are designed from the target rate and a stop-band attenuation with
//! the Kaiser order estimate, then applied polyphase: the input is conceptually
//! zero-stuffed by `up`, convolved with the kernel centred on its middle tap,
//! and every `down`-th sample is kept.

use std::f64::consts::PI;

use crate::error::{DspError, DspResult};
use crate::signal::{QuantizedSignal, Signal};

/// Full-scale value of the 8-bit stage.
pub const QUANT_FULL_SCALE: f64 = 127.0;

/// Anti-aliasing FIR kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    taps: Vec<f64>,
    input_rate: f64,
    output_rate: f64,
    beta: f64,
}

impl Kernel {
    /// Filter taps, unity DC gain.
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Returns true if the kernel has no taps.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Rate the kernel runs at (twice the design Nyquist rate).
    pub fn input_rate(&self) -> f64 {
        self.input_rate
    }

    /// Rate whose Nyquist frequency is the kernel cutoff.
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    /// Kaiser window shape parameter.
    pub fn beta(&self) -> f64 {
        self.beta
    }
}

/// Kaiser window beta for a stop-band attenuation in dB.
pub fn kaiser_beta(stopband_db: f64) -> f64 {
    if stopband_db > 50.0 {
        0.1102 * (stopband_db - 8.7)
    } else if stopband_db > 21.0 {
        0.5842 * (stopband_db - 21.0).powf(0.4) + 0.07886 * (stopband_db - 21.0)
    } else {
        0.0
    }
}

/// Kaiser estimate of the tap count for a transition width given as a fraction
/// of Nyquist.
pub fn kaiser_length(stopband_db: f64, width: f64) -> usize {
    let n = (stopband_db - 7.95) / (2.285 * PI * width) + 1.0;
    n.ceil().max(1.0) as usize
}

fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..64 {
        term *= (x / (2.0 * k as f64)).powi(2);
        sum += term;
        if term < 1e-20 * sum {
            break;
        }
    }
    sum
}

fn kaiser_window(len: usize, beta: f64) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let alpha = (len - 1) as f64 / 2.0;
    let denom = bessel_i0(beta);
    (0..len)
        .map(|n| {
            let r = (n as f64 - alpha) / alpha;
            bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom
        })
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Designs the anti-aliasing low-pass kernel for a conversion to `output_rate`.
///
/// The cutoff is `output_rate / 2`, the transition width `Δ` is that cutoff as
/// a fraction of `nyquist_rate`, and the tap count follows the Kaiser estimate
/// `ceil((A - 7.95) / (2.285·π·Δ) + 1)` for attenuation `A` dB.
pub fn design_antialias_kernel(
    output_rate: f64,
    nyquist_rate: f64,
    stopband_db: f64,
) -> DspResult<Kernel> {
    if !(output_rate.is_finite() && output_rate > 0.0) {
        return Err(DspError::invalid_param(
            "output_rate",
            format!("must be positive, got {}", output_rate),
        ));
    }
    if !(nyquist_rate.is_finite() && nyquist_rate > 0.0) {
        return Err(DspError::invalid_param(
            "nyquist_rate",
            format!("must be positive, got {}", nyquist_rate),
        ));
    }
    if !(stopband_db.is_finite() && stopband_db >= 8.0) {
        return Err(DspError::invalid_param(
            "stopband_db",
            format!("must be at least 8 dB, got {}", stopband_db),
        ));
    }

    let cutoff = (output_rate / 2.0) / nyquist_rate;
    if cutoff > 1.0 {
        return Err(DspError::invalid_param(
            "output_rate",
            format!(
                "cutoff {} Hz exceeds Nyquist {} Hz",
                output_rate / 2.0,
                nyquist_rate
            ),
        ));
    }

    let len = kaiser_length(stopband_db, cutoff);
    let beta = kaiser_beta(stopband_db);
    let window = kaiser_window(len, beta);
    let alpha = (len - 1) as f64 / 2.0;

    let mut taps: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(n, w)| cutoff * sinc(cutoff * (n as f64 - alpha)) * w)
        .collect();
    let sum: f64 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }

    tracing::debug!(
        output_rate,
        nyquist_rate,
        stopband_db,
        taps = len,
        beta,
        "designed anti-aliasing kernel"
    );

    Ok(Kernel {
        taps,
        input_rate: 2.0 * nyquist_rate,
        output_rate,
        beta,
    })
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Resamples `signal` by `up / down` using `kernel`.
///
/// The kernel must be designed for the zero-stuffed rate `input_rate * up`
/// (after reducing `up / down` to lowest terms). Output length is
/// `ceil(len * up / down)`. A ratio of one returns the input unchanged.
pub fn resample(signal: &Signal, up: u32, down: u32, kernel: &Kernel) -> DspResult<Signal> {
    if up == 0 || down == 0 {
        return Err(DspError::invalid_param(
            "factor",
            format!("up and down must be positive, got {}/{}", up, down),
        ));
    }
    let g = gcd(up, down);
    let (up, down) = (up / g, down / g);

    let rate = signal.sample_rate() as u64;
    if (rate * up as u64) % down as u64 != 0 {
        return Err(DspError::invalid_param(
            "factor",
            format!(
                "{} Hz * {} / {} is not an integer rate",
                rate, up, down
            ),
        ));
    }
    let out_rate = (rate * up as u64 / down as u64) as u32;

    if up == 1 && down == 1 {
        return Ok(signal.clone());
    }
    if kernel.is_empty() {
        return Err(DspError::invalid_param("kernel", "kernel has no taps"));
    }
    let stuffed_rate = (rate * up as u64) as f64;
    if (kernel.input_rate - stuffed_rate).abs() > 1e-6 * stuffed_rate {
        return Err(DspError::invalid_param(
            "kernel",
            format!(
                "kernel designed for {} Hz, resampler runs at {} Hz",
                kernel.input_rate, stuffed_rate
            ),
        ));
    }

    let x = signal.samples();
    let n_in = x.len();
    let up_us = up as usize;
    let n_out = (n_in * up_us).div_ceil(down as usize);
    let half_len = (kernel.len() - 1) / 2;
    let h: Vec<f64> = kernel.taps.iter().map(|t| t * up as f64).collect();

    let mut out = Vec::with_capacity(n_out);
    for j in 0..n_out {
        // Position in the zero-stuffed input aligned with kernel tap 0.
        let t = j * down as usize + half_len;
        let mut acc = 0.0;
        let mut k = t % up_us;
        while k < h.len() && k <= t {
            let i = (t - k) / up_us;
            if i < n_in {
                acc += h[k] * x[i];
            }
            k += up_us;
        }
        out.push(acc);
    }

    tracing::debug!(
        in_len = n_in,
        out_len = n_out,
        in_rate = signal.sample_rate(),
        out_rate,
        "resampled"
    );
    Ok(Signal::new(out, out_rate))
}

/// Resamples `signal` down to `output_rate`, which must divide its rate.
pub fn decimate(signal: &Signal, output_rate: u32, stopband_db: f64) -> DspResult<Signal> {
    let rate = signal.sample_rate();
    if output_rate == 0 || rate % output_rate != 0 {
        return Err(DspError::invalid_param(
            "sample_rate",
            format!(
                "{} Hz is not an integer multiple of {} Hz",
                rate, output_rate
            ),
        ));
    }
    let kernel = design_antialias_kernel(output_rate as f64, rate as f64 / 2.0, stopband_db)?;
    resample(signal, 1, rate / output_rate, &kernel)
}

/// Scales `signal` so its peak maps to ±127 and rounds to 8-bit integers.
pub fn quantize_8bit(signal: &Signal) -> DspResult<QuantizedSignal> {
    let peak = signal.peak();
    if signal.is_empty() || peak == 0.0 {
        return Err(DspError::invalid_input(
            "cannot quantize an empty or all-zero signal",
        ));
    }
    if !peak.is_finite() {
        return Err(DspError::invalid_input("signal contains non-finite samples"));
    }

    let scale = QUANT_FULL_SCALE / peak;
    let samples = signal
        .samples()
        .iter()
        .map(|&x| (x * scale).round().clamp(-QUANT_FULL_SCALE, QUANT_FULL_SCALE) as i8)
        .collect();
    Ok(QuantizedSignal::new(samples, signal.sample_rate()))
}

/// Repeats every sample `factor` times, multiplying the rate by `factor`.
pub fn zero_order_hold(signal: &Signal, factor: u32) -> DspResult<Signal> {
    if factor == 0 {
        return Err(DspError::invalid_param("factor", "must be positive"));
    }
    let rate = signal
        .sample_rate()
        .checked_mul(factor)
        .ok_or_else(|| DspError::invalid_param("factor", "sample rate overflows"))?;

    let samples = signal
        .samples()
        .iter()
        .flat_map(|&x| std::iter::repeat(x).take(factor as usize))
        .collect();
    Ok(Signal::new(samples, rate))
}
