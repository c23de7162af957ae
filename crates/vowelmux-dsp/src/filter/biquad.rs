//! Second-order sections and their cascades.
//!
//! Sections run in transposed direct form II, which keeps two state values per
//! section and makes steady-state initial conditions easy to compute.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

/// Biquad filter coefficients, normalized so that `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Creates coefficients, dividing through by `a0`.
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        }
    }

    /// Creates a second-order IIR notch.
    ///
    /// The -3 dB bandwidth is `center / q`; the gain is unity away from the notch.
    ///
    /// # Arguments
    /// * `center` - Notch frequency in Hz
    /// * `q` - Quality factor
    /// * `sample_rate` - Sample rate in Hz
    pub fn notch(center: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * center / sample_rate;
        let bw = w0 / q;
        let beta = (bw / 2.0).tan();
        let gain = 1.0 / (1.0 + beta);
        let cos_w0 = w0.cos();

        Self {
            b0: gain,
            b1: -2.0 * gain * cos_w0,
            b2: gain,
            a1: -2.0 * gain * cos_w0,
            a2: 2.0 * gain - 1.0,
        }
    }

    /// Returns true if every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Same poles with the numerator multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            b0: self.b0 * factor,
            b1: self.b1 * factor,
            b2: self.b2 * factor,
            ..*self
        }
    }

    /// Gain at 0 Hz.
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Complex response at `freq` Hz.
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * freq / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    /// State that makes the section output settle immediately for a unit step.
    pub fn steady_state(&self) -> [f64; 2] {
        let g = self.dc_gain();
        let z2 = self.b2 - self.a2 * g;
        let z1 = self.b1 - self.a1 * g + z2;
        [z1, z2]
    }
}

/// Biquad filter state.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    /// Creates a new biquad filter with zero state.
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self::with_state(coeffs, [0.0, 0.0])
    }

    /// Creates a biquad filter with the given initial state.
    pub fn with_state(coeffs: BiquadCoeffs, state: [f64; 2]) -> Self {
        Self {
            coeffs,
            z1: state[0],
            z2: state[1],
        }
    }

    /// Resets the filter state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Processes a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    /// Processes a buffer of samples in place.
    pub fn process_buffer(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

/// A cascade of second-order sections.
#[derive(Debug, Clone, PartialEq)]
pub struct SosCascade {
    sections: Vec<BiquadCoeffs>,
}

impl SosCascade {
    /// Creates a cascade from its sections, first section first.
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self { sections }
    }

    /// The sections.
    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Complex response of the whole cascade at `freq` Hz.
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| {
                acc * s.response(freq, sample_rate)
            })
    }

    /// Magnitude response in dB at `freq` Hz.
    pub fn gain_db(&self, freq: f64, sample_rate: f64) -> f64 {
        20.0 * self.response(freq, sample_rate).norm().log10()
    }

    /// Filters `input` causally, starting from zero state.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut output = input.to_vec();
        for coeffs in &self.sections {
            BiquadFilter::new(*coeffs).process_buffer(&mut output);
        }
        output
    }

    /// Filters `input` starting from per-section initial state.
    pub(crate) fn filter_with_state(&self, input: &[f64], states: &[[f64; 2]]) -> Vec<f64> {
        let mut output = input.to_vec();
        for (coeffs, state) in self.sections.iter().zip(states) {
            BiquadFilter::with_state(*coeffs, *state).process_buffer(&mut output);
        }
        output
    }

    /// Per-section steady-state conditions for a unit step through the cascade.
    pub(crate) fn steady_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let [z1, z2] = s.steady_state();
                let state = [z1 * scale, z2 * scale];
                scale *= s.dc_gain();
                state
            })
            .collect()
    }
}
