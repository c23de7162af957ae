//! Rate conversion integration tests.

use std::f64::consts::PI;

use vowelmux_dsp::resample::{decimate, design_antialias_kernel, resample};
use vowelmux_dsp::Signal;

#[test]
fn test_upsample_then_downsample_round_trip() {
    let original = Signal::from_fn(0.5, 8000, |t| (2.0 * PI * 500.0 * t).sin());
    let kernel = design_antialias_kernel(8000.0, 12000.0, 60.0).unwrap();
    assert_eq!(kernel.input_rate(), 24000.0);

    let up = resample(&original, 3, 1, &kernel).unwrap();
    assert_eq!(up.sample_rate(), 24000);
    assert_eq!(up.len(), 3 * original.len());

    let back = resample(&up, 1, 3, &kernel).unwrap();
    assert_eq!(back.sample_rate(), 8000);
    assert_eq!(back.len(), original.len());

    let edge = 20;
    for i in edge..original.len() - edge {
        let err = (back.samples()[i] - original.samples()[i]).abs();
        assert!(err < 0.01, "sample {} off by {}", i, err);
    }
}

#[test]
fn test_upsampled_signal_interpolates() {
    let original = Signal::from_fn(0.5, 8000, |t| (2.0 * PI * 500.0 * t).sin());
    let kernel = design_antialias_kernel(8000.0, 12000.0, 60.0).unwrap();
    let up = resample(&original, 3, 1, &kernel).unwrap();

    let expected = Signal::from_fn(0.5, 24000, |t| (2.0 * PI * 500.0 * t).sin());
    for i in 60..up.len() - 60 {
        assert!((up.samples()[i] - expected.samples()[i]).abs() < 0.01);
    }
}

#[test]
fn test_decimate_suppresses_aliases() {
    let tone = Signal::from_fn(0.5, 24000, |t| (2.0 * PI * 7000.0 * t).sin());
    let out = decimate(&tone, 8000, 60.0).unwrap();
    assert_eq!(out.sample_rate(), 8000);
    assert_eq!(out.len(), 4000);
    let settled = out.slice(100, out.len() - 100);
    assert!(settled.rms() < 0.01 * tone.rms());
}

#[test]
fn test_decimate_from_multiplex_rate() {
    let tone = Signal::from_fn(0.1, 192_000, |t| (2.0 * PI * 1000.0 * t).sin());
    let out = decimate(&tone, 8000, 60.0).unwrap();
    assert_eq!(out.len(), 800);
    let settled = out.slice(50, 750);
    assert!((settled.rms() - tone.rms()).abs() < 0.02);
}
