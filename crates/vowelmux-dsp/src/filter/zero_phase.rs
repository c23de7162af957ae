//! Forward-backward (zero-phase) filtering.

use super::biquad::SosCascade;
use crate::error::{DspError, DspResult};

/// Number of samples reflected at each edge before filtering.
pub fn pad_len(cascade: &SosCascade) -> usize {
    3 * (2 * cascade.sections().len() + 1)
}

/// Odd extension: `2*x[0] - x[pad..1]`, `x`, `2*x[n-1] - x[n-2..n-pad-1]`.
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

/// Filters `x` forward then backward, cancelling the cascade's phase response.
///
/// Edges are padded by odd extension and each pass starts from steady-state
/// initial conditions scaled by its first sample, which suppresses start-up
/// transients.
pub fn filtfilt(cascade: &SosCascade, x: &[f64]) -> DspResult<Vec<f64>> {
    let pad = pad_len(cascade);
    if x.len() <= pad {
        return Err(DspError::invalid_input(format!(
            "zero-phase filtering needs more than {} samples, got {}",
            pad,
            x.len()
        )));
    }

    let zi = cascade.steady_state();
    let scaled = |x0: f64| -> Vec<[f64; 2]> {
        zi.iter().map(|[a, b]| [a * x0, b * x0]).collect()
    };

    let ext = odd_extend(x, pad);
    let mut y = cascade.filter_with_state(&ext, &scaled(ext[0]));
    y.reverse();
    let mut y = cascade.filter_with_state(&y, &scaled(y[0]));
    y.reverse();

    Ok(y[pad..pad + x.len()].to_vec())
}
