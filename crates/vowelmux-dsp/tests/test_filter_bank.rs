//! Telephone-band and notch filtering integration tests.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use vowelmux_dsp::filter::{apply_bandpass, apply_lowpass, apply_notch};
use vowelmux_dsp::{magnitude_spectrum, DspError, FilterBank, FilterSpec, Signal};

const RATE: u32 = 24000;

fn tone(freq: f64, seconds: f64) -> Signal {
    Signal::from_fn(seconds, RATE, |t| (2.0 * PI * freq * t).sin())
}

fn settled_rms(signal: &Signal, skip: usize) -> f64 {
    signal.slice(skip, signal.len()).rms()
}

#[test]
fn test_bandpass_rejects_tones_outside_band() {
    let skip = RATE as usize / 10;
    let pass = settled_rms(&apply_bandpass(&tone(1000.0, 1.0), 300.0, 3400.0, 4).unwrap(), skip);
    let low = settled_rms(&apply_bandpass(&tone(100.0, 1.0), 300.0, 3400.0, 4).unwrap(), skip);
    let high = settled_rms(&apply_bandpass(&tone(8000.0, 1.0), 300.0, 3400.0, 4).unwrap(), skip);

    assert!(pass > 0.65, "1 kHz passband rms {}", pass);
    assert!(low < 0.05 * pass, "100 Hz leaked: {} vs {}", low, pass);
    assert!(high < 0.05 * pass, "8 kHz leaked: {} vs {}", high, pass);
}

#[test]
fn test_bandpass_on_white_noise() {
    let mut rng = Pcg32::seed_from_u64(7);
    let noise = Signal::new((0..RATE).map(|_| rng.gen_range(-1.0..1.0)).collect(), RATE);
    let filtered = apply_bandpass(&noise, 300.0, 3400.0, 4).unwrap();
    let spectrum = magnitude_spectrum(&filtered).unwrap();

    let density = |lo: f64, hi: f64| spectrum.band_power(lo, hi) / (hi - lo);
    let in_band = density(800.0, 2000.0);
    assert!(density(1.0, 100.0) < 1e-2 * in_band);
    assert!(density(8000.0, 11999.0) < 1e-3 * in_band);
}

#[test]
fn test_lowpass_keeps_low_tones() {
    let skip = RATE as usize / 10;
    let pass = settled_rms(&apply_lowpass(&tone(500.0, 1.0), 1000.0, 6).unwrap(), skip);
    let high = settled_rms(&apply_lowpass(&tone(5000.0, 1.0), 1000.0, 6).unwrap(), skip);

    assert!(pass > 0.65, "500 Hz passband rms {}", pass);
    assert!(high < 0.01 * pass, "5 kHz leaked: {} vs {}", high, pass);
}

#[test]
fn test_lowpass_on_white_noise() {
    let mut rng = Pcg32::seed_from_u64(11);
    let noise = Signal::new((0..RATE).map(|_| rng.gen_range(-1.0..1.0)).collect(), RATE);
    let filtered = apply_lowpass(&noise, 1000.0, 6).unwrap();
    let spectrum = magnitude_spectrum(&filtered).unwrap();

    let density = |lo: f64, hi: f64| spectrum.band_power(lo, hi) / (hi - lo);
    let in_band = density(10.0, 800.0);
    assert!(density(3000.0, 11999.0) < 1e-3 * in_band);
}

#[test]
fn test_near_dc_band_edge_reports_instability() {
    let spec = FilterSpec::bandpass(1.0, 3400.0, 12, 192_000);
    assert!(spec.validate().is_ok());

    let bank = FilterBank::new();
    assert!(matches!(
        bank.design(&spec),
        Err(DspError::NumericInstability { .. })
    ));
    assert!(bank.is_empty());

    let signal = Signal::from_fn(0.05, 192_000, |t| (2.0 * PI * 9000.0 * t).sin());
    assert!(matches!(
        apply_bandpass(&signal, 1.0, 3400.0, 12),
        Err(DspError::NumericInstability { .. })
    ));
}

#[test]
fn test_high_order_wide_band_stays_bounded() {
    let rate = 192_000;
    let signal = Signal::from_fn(0.25, rate, |t| (2.0 * PI * 9000.0 * t).sin());
    let out = apply_bandpass(&signal, 300.0, 3400.0, 12).unwrap();
    let tail = out.slice(out.len() - 5000, out.len()).rms();
    assert!(tail < 1e-4, "9 kHz stop-band rms {}", tail);
}

#[test]
fn test_notch_removes_center_and_keeps_neighbours() {
    let seconds = 1.0;
    let interior = |s: &Signal| s.slice(RATE as usize / 5, 4 * RATE as usize / 5).rms();

    let hum = tone(2800.0, seconds);
    let notched = apply_notch(&hum, 2800.0, 30.0).unwrap();
    assert!(interior(&notched) < 0.05 * interior(&hum));

    let speech = tone(1000.0, seconds);
    let kept = apply_notch(&speech, 2800.0, 30.0).unwrap();
    assert!(interior(&kept) > 0.95 * interior(&speech));
}

#[test]
fn test_notch_is_zero_phase() {
    let speech = tone(1000.0, 1.0);
    let kept = apply_notch(&speech, 2800.0, 30.0).unwrap();
    let mid = RATE as usize / 2;
    for i in mid..mid + 48 {
        assert!((kept.samples()[i] - speech.samples()[i]).abs() < 0.02);
    }
}

#[test]
fn test_bank_reuses_designs() {
    let bank = FilterBank::new();
    let spec = FilterSpec::bandpass(300.0, 3400.0, 4, RATE);
    let first = bank.design(&spec).unwrap();
    let second = bank.design(&spec).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(bank.len(), 1);

    bank.design(&FilterSpec::bandpass(300.0, 3400.0, 4, 8000)).unwrap();
    assert_eq!(bank.len(), 2);
}

#[test]
fn test_bank_rejects_rate_mismatch() {
    let bank = FilterBank::new();
    let spec = FilterSpec::bandpass(300.0, 3400.0, 4, 8000);
    assert!(bank.apply(&spec, &tone(1000.0, 0.1)).is_err());
}
