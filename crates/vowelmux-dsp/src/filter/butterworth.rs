//! Digital Butterworth design.
//!
//! Analog prototype poles are moved to the requested band with a low-pass or
//! band-pass frequency transform, mapped to the z-plane with the bilinear
//! transform, and finally grouped into second-order sections.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use super::biquad::{BiquadCoeffs, SosCascade};
use crate::error::{DspError, DspResult};

/// Imaginary parts smaller than this count as real roots.
const REAL_TOLERANCE: f64 = 1e-9;

/// Sample rate of the normalized design domain (Nyquist = 1).
const DESIGN_FS: f64 = 2.0;

/// Zeros, poles and gain of a transfer function.
#[derive(Debug, Clone)]
pub(crate) struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    fn degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }
}

/// Analog Butterworth prototype with unit cutoff.
fn prototype(order: usize) -> Zpk {
    let n = order as f64;
    let poles = (0..order)
        .map(|k| {
            let m = -(n - 1.0) + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();
    Zpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

/// Pre-warps a cutoff given as a fraction of Nyquist.
fn warp(normalized: f64) -> f64 {
    2.0 * DESIGN_FS * (PI * normalized / DESIGN_FS).tan()
}

fn lowpass_transform(proto: Zpk, wo: f64) -> Zpk {
    let degree = proto.degree() as i32;
    Zpk {
        zeros: proto.zeros.iter().map(|&z| z * wo).collect(),
        poles: proto.poles.iter().map(|&p| p * wo).collect(),
        gain: proto.gain * wo.powi(degree),
    }
}

fn bandpass_transform(proto: Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = proto.degree();
    let split = |roots: &[Complex64]| -> Vec<Complex64> {
        let scaled: Vec<Complex64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
        let mut out = Vec::with_capacity(roots.len() * 2);
        for &r in &scaled {
            out.push(r + (r * r - wo * wo).sqrt());
        }
        for &r in &scaled {
            out.push(r - (r * r - wo * wo).sqrt());
        }
        out
    };

    let mut zeros = split(&proto.zeros);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    Zpk {
        zeros,
        poles: split(&proto.poles),
        gain: proto.gain * bw.powi(degree as i32),
    }
}

fn bilinear(analog: Zpk) -> Zpk {
    let fs2 = Complex64::new(2.0 * DESIGN_FS, 0.0);
    let degree = analog.degree();

    let mut zeros: Vec<Complex64> = analog.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let poles = analog.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();

    let num: Complex64 = analog.zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = analog.poles.iter().map(|&p| fs2 - p).product();
    Zpk {
        zeros,
        poles,
        gain: analog.gain * (num / den).re,
    }
}

/// Quadratic (or linear, with a zero last coefficient) factors of a root set.
///
/// Conjugate pairs become one factor each. Real roots are sorted and paired
/// first with last, so `{-1, -1, 1, 1}` yields `1 - z^-2` twice.
fn quadratic_factors(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut factors = Vec::new();
    let mut reals = Vec::new();

    for r in roots {
        if r.im.abs() <= REAL_TOLERANCE * r.norm().max(1.0) {
            reals.push(r.re);
        } else if r.im > 0.0 {
            factors.push((r.norm(), [1.0, -2.0 * r.re, r.norm_sqr()]));
        }
    }

    reals.sort_by(|a, b| a.total_cmp(b));
    let (mut lo, mut hi) = (0usize, reals.len());
    while hi - lo >= 2 {
        let (r1, r2) = (reals[lo], reals[hi - 1]);
        factors.push((r1.abs().max(r2.abs()), [1.0, -(r1 + r2), r1 * r2]));
        lo += 1;
        hi -= 1;
    }
    if hi - lo == 1 {
        let r = reals[lo];
        factors.push((r.abs(), [1.0, -r, 0.0]));
    }

    factors.sort_by(|a, b| a.0.total_cmp(&b.0));
    factors.into_iter().map(|(_, f)| f).collect()
}

/// Largest factor by which a cascade may amplify its own rounding error,
/// leaving roughly six significant digits of an f64 result.
const MAX_ERROR_GAIN: f64 = 1e10;

/// Log-spaced probe frequencies, as fractions of Nyquist, for peak searches.
const PEAK_GRID_POINTS: usize = 2048;
const PEAK_GRID_DECADES: f64 = 9.0;

/// Largest magnitude of `section` over a log grid of the band.
fn peak_gain(section: &BiquadCoeffs) -> f64 {
    (0..=PEAK_GRID_POINTS)
        .map(|i| {
            let exponent = PEAK_GRID_DECADES * (i as f64 / PEAK_GRID_POINTS as f64 - 1.0);
            section.response(10f64.powf(exponent), DESIGN_FS).norm()
        })
        .fold(0.0, f64::max)
}

/// Coefficient size over the smallest denominator magnitude on the unit circle.
///
/// Relative rounding in the coefficients perturbs the response by about this
/// factor. The minimum lies at DC, Nyquist, or the angle of a complex pole.
fn conditioning(section: &BiquadCoeffs) -> f64 {
    let (a1, a2) = (section.a1, section.a2);
    let mut angles = vec![0.0, PI];
    if a2 > 0.0 && a1 * a1 < 4.0 * a2 {
        angles.push((-a1 / (2.0 * a2.sqrt())).clamp(-1.0, 1.0).acos());
    }
    let smallest = angles
        .into_iter()
        .map(|w| {
            let z1 = Complex64::from_polar(1.0, -w);
            (1.0 + z1 * a1 + z1 * z1 * a2).norm()
        })
        .fold(f64::INFINITY, f64::min);
    (1.0 + a1.abs() + a2.abs()) / smallest
}

/// Groups a digital zpk into sections, ordered from the pole pair farthest from
/// the unit circle to the closest.
///
/// Every section is scaled to unit peak gain so intermediate signals stay near
/// the input level, and the last section restores the overall gain. That gain
/// also multiplies every rounding error made upstream, so designs needing more
/// than [`MAX_ERROR_GAIN`] fail.
fn to_sections(digital: &Zpk) -> DspResult<SosCascade> {
    let dens = quadratic_factors(&digital.poles);
    let mut nums = quadratic_factors(&digital.zeros);

    if nums.len() > dens.len() {
        return Err(DspError::instability(format!(
            "{} numerator factors for {} denominator factors",
            nums.len(),
            dens.len()
        )));
    }
    nums.resize(dens.len(), [1.0, 0.0, 0.0]);

    let mut gain = digital.gain;
    let mut sections = Vec::with_capacity(dens.len());
    for (b, a) in nums.iter().zip(&dens) {
        let section = BiquadCoeffs::new(*b, *a);
        let peak = peak_gain(&section);
        if !(peak.is_finite() && peak > 0.0) {
            return Err(DspError::instability(format!(
                "section peak gain is {}",
                peak
            )));
        }
        gain *= peak;
        sections.push(section.scaled(1.0 / peak));
    }

    if !(gain.is_finite() && gain.abs() <= MAX_ERROR_GAIN) {
        return Err(DspError::instability(format!(
            "cascade amplifies rounding error by {:.3e}, limit is {:.0e}",
            gain.abs(),
            MAX_ERROR_GAIN
        )));
    }
    if let Some(last) = sections.last_mut() {
        *last = last.scaled(gain);
    }
    Ok(SosCascade::new(sections))
}

fn check_stable(digital: &Zpk, cascade: &SosCascade) -> DspResult<()> {
    if let Some(p) = digital.poles.iter().find(|p| !(p.norm() < 1.0)) {
        return Err(DspError::instability(format!(
            "pole at {:.6}{:+.6}i lies on or outside the unit circle",
            p.re, p.im
        )));
    }
    if !digital.gain.is_finite() || cascade.sections().iter().any(|s| !s.is_finite()) {
        return Err(DspError::instability("non-finite filter coefficients"));
    }
    let worst = cascade
        .sections()
        .iter()
        .map(conditioning)
        .fold(0.0, f64::max);
    if !(worst <= MAX_ERROR_GAIN) {
        return Err(DspError::instability(format!(
            "poles too close to the unit circle for f64 coefficients (condition {:.3e})",
            worst
        )));
    }
    Ok(())
}

/// Designs a low-pass Butterworth cascade.
///
/// `cutoff` is a fraction of Nyquist in (0, 1); the caller validates it.
pub(crate) fn lowpass(order: usize, cutoff: f64) -> DspResult<SosCascade> {
    let analog = lowpass_transform(prototype(order), warp(cutoff));
    let digital = bilinear(analog);
    let cascade = to_sections(&digital)?;
    check_stable(&digital, &cascade)?;
    Ok(cascade)
}

/// Designs a band-pass Butterworth cascade of `2 * order` poles.
///
/// `low` and `high` are fractions of Nyquist with `0 < low < high < 1`.
pub(crate) fn bandpass(order: usize, low: f64, high: f64) -> DspResult<SosCascade> {
    let (w1, w2) = (warp(low), warp(high));
    let analog = bandpass_transform(prototype(order), (w1 * w2).sqrt(), w2 - w1);
    let digital = bilinear(analog);
    let cascade = to_sections(&digital)?;
    check_stable(&digital, &cascade)?;
    Ok(cascade)
}
