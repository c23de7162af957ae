//! End-to-end multiplex/demultiplex tests.

use std::f64::consts::PI;

use pretty_assertions::assert_eq;
use vowelmux_dsp::spectrum::dominant_frequency;
use vowelmux_dsp::{
    magnitude_spectrum, wav, ChannelInputs, DspError, Multiplexer, PipelineOutput, Session, Signal,
};
use vowelmux_spec::{Channel, PipelineConfig};

const INPUT_RATE: u32 = 24000;

fn tone(freq: f64) -> Signal {
    Signal::from_fn(0.5, INPUT_RATE, |t| 0.8 * (2.0 * PI * freq * t).sin())
}

/// Harmonic series on `f0` shaped by a single formant at `formant`.
fn vowel(f0: f64, formant: f64) -> Signal {
    Signal::from_fn(0.5, INPUT_RATE, |t| {
        (1..=15)
            .map(|k| {
                let f = k as f64 * f0;
                let weight = 1.0 / (1.0 + ((f - formant) / 200.0).powi(2));
                0.3 * weight * (2.0 * PI * f * t).sin()
            })
            .sum()
    })
}

fn tone_inputs() -> ChannelInputs {
    let mut inputs = ChannelInputs::new();
    inputs.insert("a".to_string(), tone(1000.0));
    inputs.insert("e".to_string(), tone(1200.0));
    inputs.insert("i".to_string(), tone(1500.0));
    inputs
}

fn run_default(inputs: &ChannelInputs) -> PipelineOutput {
    Multiplexer::new(PipelineConfig::default())
        .unwrap()
        .run(inputs)
        .unwrap()
}

#[test]
fn test_tones_survive_round_trip() {
    let output = run_default(&tone_inputs());

    for (label, freq) in [("a", 1000.0), ("e", 1200.0), ("i", 1500.0)] {
        let channel = output.channel(label).unwrap();
        assert_eq!(channel.recovered.sample_rate(), 8000);
        assert_eq!(channel.recovered.len(), 4000);
        let found = dominant_frequency(&channel.recovered).unwrap().unwrap();
        assert!((found - freq).abs() <= 50.0, "{}: {} Hz, expected {} Hz", label, found, freq);
    }
}

#[test]
fn test_channel_isolation() {
    let output = run_default(&tone_inputs());
    let tones = [("a", 1000.0), ("e", 1200.0), ("i", 1500.0)];

    for (label, own) in tones {
        let spectrum = magnitude_spectrum(&output.channel(label).unwrap().recovered).unwrap();
        let own_power = spectrum.band_power(own - 30.0, own + 30.0);
        for (other, freq) in tones.iter().filter(|(l, _)| *l != label) {
            let leak = spectrum.band_power(freq - 30.0, freq + 30.0);
            let ratio_db = 10.0 * (own_power / leak).log10();
            assert!(ratio_db >= 20.0, "{} leaks into {} at {:.1} dB", other, label, ratio_db);
        }
    }
}

#[test]
fn test_multiplexed_signal_shape() {
    let output = run_default(&tone_inputs());
    assert_eq!(output.multiplexed.sample_rate(), 192_000);
    assert_eq!(output.multiplexed.len(), 4000 * 24);

    let spectrum = magnitude_spectrum(&output.multiplexed).unwrap();
    for carrier in [15_000.0, 42_500.0, 70_000.0] {
        let around = spectrum.band_power(carrier - 3500.0, carrier + 3500.0);
        let empty = spectrum.band_power(carrier + 5000.0, carrier + 8000.0);
        assert!(around > 10.0 * empty, "carrier {} Hz", carrier);
    }
}

#[test]
fn test_conditioned_channels_use_full_scale() {
    let output = run_default(&tone_inputs());
    for channel in &output.channels {
        assert_eq!(channel.conditioned.sample_rate(), 8000);
        assert_eq!(channel.conditioned.peak(), 127);
    }
}

#[test]
fn test_close_carriers_rejected_before_processing() {
    let mut config = PipelineConfig::default();
    config.channels = vec![
        Channel::new("a", 62_000.0),
        Channel::new("e", 66_000.0),
        Channel::new("i", 70_000.0),
    ];
    match Multiplexer::new(config).unwrap_err() {
        DspError::InvalidConfig { errors } => {
            assert!(errors.iter().any(|e| e.code.to_string() == "E008"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_channels_named() {
    let mut inputs = ChannelInputs::new();
    inputs.insert("a".to_string(), tone(1000.0));
    let err = Multiplexer::new(PipelineConfig::default())
        .unwrap()
        .run(&inputs)
        .unwrap_err();
    assert_eq!(err.to_string(), "missing input for channel(s): e, i");
}

#[test]
fn test_bad_rate_rejected_up_front() {
    let mut inputs = tone_inputs();
    inputs.insert(
        "i".to_string(),
        Signal::from_fn(0.5, 44100, |t| (2.0 * PI * 1500.0 * t).sin()),
    );
    let err = Multiplexer::new(PipelineConfig::default())
        .unwrap()
        .run(&inputs)
        .unwrap_err();
    assert!(matches!(err, DspError::InvalidParameter { .. }));
}

#[test]
fn test_near_dc_band_fails_as_unstable() {
    let config = PipelineConfig::from_json(r#"{ "band": { "low_hz": 1.0, "high_hz": 3400.0 } }"#)
        .unwrap();
    let err = Multiplexer::new(config).unwrap().run(&tone_inputs()).unwrap_err();
    assert!(matches!(err, DspError::NumericInstability { .. }), "{}", err);
}

#[test]
fn test_all_zero_channel_fails() {
    let mut inputs = tone_inputs();
    inputs.insert("e".to_string(), Signal::zeros(12000, INPUT_RATE));
    let err = Multiplexer::new(PipelineConfig::default())
        .unwrap()
        .run(&inputs)
        .unwrap_err();
    assert!(matches!(err, DspError::InvalidInput { .. }));
}

#[test]
fn test_vowel_recordings_from_wav() {
    let dir = tempfile::tempdir().unwrap();
    let vowels = [("a", vowel(200.0, 800.0)), ("e", vowel(160.0, 480.0)), ("i", vowel(250.0, 2250.0))];

    let mut session = Session::new(PipelineConfig::default()).unwrap();
    for (label, signal) in &vowels {
        let path = dir.path().join(format!("{}.wav", label));
        wav::save(&path, signal).unwrap();
        let mismatch = session.load_input(label, &path).unwrap();
        assert!(!mismatch);
    }
    assert!(session.missing_inputs().is_empty());

    let output = session.process().unwrap();
    for (label, original) in &vowels {
        let channel = output.channel(label).unwrap();
        assert_eq!(channel.conditioned.peak(), 127);

        let expected = dominant_frequency(original).unwrap().unwrap();
        let found = dominant_frequency(&channel.recovered).unwrap().unwrap();
        assert!(
            (found - expected).abs() <= 50.0,
            "{}: recovered {} Hz, original {} Hz",
            label,
            found,
            expected
        );
    }

    let diagnostics = session.diagnostics();
    assert_eq!(diagnostics.len(), 10);
    assert_eq!(diagnostics["Original A"].sample_rate(), INPUT_RATE);
    assert_eq!(diagnostics["Processed I"].sample_rate(), 8000);
}

#[test]
fn test_notch_and_noise_reduction_enabled() {
    let config = PipelineConfig::from_json(
        r#"{
            "notch": { "center_hz": 2800.0, "q": 30.0 },
            "noise_reduction": { "threshold": 0.02, "factor": 1.0 }
        }"#,
    )
    .unwrap();
    let output = Multiplexer::new(config).unwrap().run(&tone_inputs()).unwrap();
    let found = dominant_frequency(&output.channel("a").unwrap().recovered)
        .unwrap()
        .unwrap();
    assert!((found - 1000.0).abs() <= 50.0);
}
