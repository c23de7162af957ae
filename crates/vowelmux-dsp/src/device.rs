//! Capture and playback collaborators.
//!
//! The pipeline never talks to audio hardware. Capture is a source of signal
//! blocks and playback a sink; the file-backed implementations here replay a
//! loaded recording and write numbered WAV files.

use std::path::PathBuf;

use crate::error::{DspError, DspResult};
use crate::signal::Signal;
use crate::wav;

/// A source of recorded audio.
pub trait CaptureDevice {
    /// Records `duration_secs` of audio at `sample_rate`.
    ///
    /// Returns `Ok(None)` once the source is exhausted. The final block may be
    /// shorter than requested.
    fn record(&mut self, duration_secs: f64, sample_rate: u32) -> DspResult<Option<Signal>>;

    /// The only rate this device can record at, if it is fixed.
    fn native_rate(&self) -> Option<u32> {
        None
    }
}

impl<T: CaptureDevice + ?Sized> CaptureDevice for Box<T> {
    fn record(&mut self, duration_secs: f64, sample_rate: u32) -> DspResult<Option<Signal>> {
        (**self).record(duration_secs, sample_rate)
    }

    fn native_rate(&self) -> Option<u32> {
        (**self).native_rate()
    }
}

/// A sink for rendered audio.
pub trait PlaybackDevice {
    /// Plays (or stores) `signal`.
    fn play(&mut self, signal: &Signal) -> DspResult<()>;
}

/// Replays a recording block by block.
#[derive(Debug, Clone)]
pub struct SignalReplay {
    signal: Signal,
    position: usize,
}

impl SignalReplay {
    /// Replays `signal` from its start.
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            position: 0,
        }
    }

    /// Samples not yet replayed.
    pub fn remaining(&self) -> usize {
        self.signal.len() - self.position
    }
}

impl CaptureDevice for SignalReplay {
    fn record(&mut self, duration_secs: f64, sample_rate: u32) -> DspResult<Option<Signal>> {
        if sample_rate != self.signal.sample_rate() {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!(
                    "recording is {} Hz, capture requested {} Hz",
                    self.signal.sample_rate(),
                    sample_rate
                ),
            ));
        }
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(DspError::invalid_param(
                "duration_secs",
                format!("must be positive, got {}", duration_secs),
            ));
        }
        if self.remaining() == 0 {
            return Ok(None);
        }

        let want = ((duration_secs * sample_rate as f64).ceil() as usize).max(1);
        let end = (self.position + want).min(self.signal.len());
        let block = self.signal.slice(self.position, end);
        self.position = end;
        Ok(Some(block))
    }

    fn native_rate(&self) -> Option<u32> {
        Some(self.signal.sample_rate())
    }
}

/// Writes each played signal to `<dir>/<prefix>_<n>.wav`.
#[derive(Debug, Clone)]
pub struct WavSink {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl WavSink {
    /// Creates a sink writing into `dir`, which is created if missing.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> DspResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PlaybackDevice for WavSink {
    fn play(&mut self, signal: &Signal) -> DspResult<()> {
        let path = self
            .dir
            .join(format!("{}_{:04}.wav", self.prefix, self.written.len()));
        wav::save(&path, signal)?;
        tracing::debug!(path = %path.display(), "wrote block");
        self.written.push(path);
        Ok(())
    }
}

/// Collects played signals in memory.
impl PlaybackDevice for Vec<Signal> {
    fn play(&mut self, signal: &Signal) -> DspResult<()> {
        self.push(signal.clone());
        Ok(())
    }
}
