//! Session context: captured inputs and the latest pipeline output.

use std::collections::BTreeMap;
use std::path::Path;

use vowelmux_spec::PipelineConfig;

use super::{display_label, Multiplexer, PipelineOutput};
use crate::device::CaptureDevice;
use crate::error::{DspError, DspResult};
use crate::signal::{ChannelInputs, Signal};
use crate::wav;

/// Owns the inputs of one multiplexing session and its most recent result.
#[derive(Debug)]
pub struct Session {
    multiplexer: Multiplexer,
    inputs: ChannelInputs,
    output: Option<PipelineOutput>,
}

impl Session {
    /// Starts an empty session for `config`.
    pub fn new(config: PipelineConfig) -> DspResult<Self> {
        Ok(Self {
            multiplexer: Multiplexer::new(config)?,
            inputs: ChannelInputs::new(),
            output: None,
        })
    }

    /// The session configuration.
    pub fn config(&self) -> &PipelineConfig {
        self.multiplexer.config()
    }

    /// The multiplexer used by [`Session::process`].
    pub fn multiplexer(&self) -> &Multiplexer {
        &self.multiplexer
    }

    /// Stores the raw input for `label`, discarding any previous output.
    pub fn set_input(&mut self, label: &str, signal: Signal) -> DspResult<()> {
        if self.multiplexer.plan().channel(label).is_none() {
            return Err(DspError::invalid_param(
                "label",
                format!("no channel '{}' in the plan", label),
            ));
        }
        self.inputs.insert(label.to_string(), signal);
        self.output = None;
        Ok(())
    }

    /// Raw input for `label`, if captured.
    pub fn input(&self, label: &str) -> Option<&Signal> {
        self.inputs.get(label)
    }

    /// All captured inputs.
    pub fn inputs(&self) -> &ChannelInputs {
        &self.inputs
    }

    /// Planned channels that have no input yet.
    pub fn missing_inputs(&self) -> Vec<String> {
        self.multiplexer
            .plan()
            .channels
            .iter()
            .filter(|c| !self.inputs.contains_key(&c.label))
            .map(|c| c.label.clone())
            .collect()
    }

    /// Records `duration_secs` from `device` as the input for `label`.
    pub fn capture(
        &mut self,
        label: &str,
        device: &mut dyn CaptureDevice,
        duration_secs: f64,
    ) -> DspResult<()> {
        let rate = self.config().input_rate;
        let signal = device
            .record(duration_secs, rate)?
            .ok_or_else(|| DspError::invalid_input("capture device produced no audio"))?;
        self.set_input(label, signal)
    }

    /// Loads the input for `label` from a WAV file.
    ///
    /// Returns true if the file rate differs from the configured input rate.
    pub fn load_input(&mut self, label: &str, path: impl AsRef<Path>) -> DspResult<bool> {
        let loaded = wav::load(path, Some(self.config().input_rate))?;
        self.set_input(label, loaded.signal)?;
        Ok(loaded.rate_mismatch)
    }

    /// Runs the pipeline over the current inputs.
    ///
    /// On failure the previous output is cleared and nothing is kept.
    pub fn process(&mut self) -> DspResult<&PipelineOutput> {
        self.output = None;
        let output = self.multiplexer.run(&self.inputs)?;
        Ok(self.output.insert(output))
    }

    /// Output of the last successful [`Session::process`].
    pub fn output(&self) -> Option<&PipelineOutput> {
        self.output.as_ref()
    }

    /// Every signal of the session keyed by its display label.
    pub fn diagnostics(&self) -> BTreeMap<String, Signal> {
        let mut map: BTreeMap<String, Signal> = self
            .inputs
            .iter()
            .map(|(label, s)| (format!("Original {}", display_label(label)), s.clone()))
            .collect();
        if let Some(output) = &self.output {
            map.extend(output.diagnostics());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SignalReplay;
    use std::f64::consts::PI;

    fn tone(freq: f64) -> Signal {
        Signal::from_fn(0.25, 24000, |t| (2.0 * PI * freq * t).sin())
    }

    #[test]
    fn test_missing_inputs_tracked() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        assert_eq!(session.missing_inputs(), vec!["a", "e", "i"]);
        session.set_input("e", tone(1000.0)).unwrap();
        assert_eq!(session.missing_inputs(), vec!["a", "i"]);
    }

    #[test]
    fn test_process_names_missing_channels() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        session.set_input("e", tone(1000.0)).unwrap();
        let err = session.process().unwrap_err();
        match err {
            DspError::MissingChannels { labels } => assert_eq!(labels, vec!["a", "i"]),
            other => panic!("unexpected error: {}", other),
        }
        assert!(session.output().is_none());
    }

    #[test]
    fn test_unknown_label_rejected() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        assert!(session.set_input("o", tone(1000.0)).is_err());
    }

    #[test]
    fn test_capture_and_diagnostics() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        for (label, freq) in [("a", 1000.0), ("e", 1200.0), ("i", 1500.0)] {
            let mut device = SignalReplay::new(tone(freq));
            session.capture(label, &mut device, 0.25).unwrap();
        }
        session.process().unwrap();

        let keys: Vec<String> = session.diagnostics().into_keys().collect();
        assert_eq!(
            keys,
            vec![
                "Conditioned A",
                "Conditioned E",
                "Conditioned I",
                "Multiplexed",
                "Original A",
                "Original E",
                "Original I",
                "Processed A",
                "Processed E",
                "Processed I",
            ]
        );
    }

    #[test]
    fn test_new_input_clears_output() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        for label in ["a", "e", "i"] {
            session.set_input(label, tone(1000.0)).unwrap();
        }
        session.process().unwrap();
        assert!(session.output().is_some());
        session.set_input("a", tone(900.0)).unwrap();
        assert!(session.output().is_none());
    }
}
