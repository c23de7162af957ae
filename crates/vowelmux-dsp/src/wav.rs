//! WAV file loading and saving.
//!
//! Files are read with `hound`; any integer or float format is accepted and
//! multi-channel files keep their first channel only. Signals are written as
//! 16-bit PCM, quantized signals as 8-bit PCM. Every write reports a BLAKE3
//! hash of the PCM payload so identical outputs can be compared cheaply.

use std::io::Cursor;
use std::path::Path;

use crate::error::{DspError, DspResult};
use crate::signal::{QuantizedSignal, Signal};

/// A signal read from disk.
#[derive(Debug, Clone)]
pub struct LoadedWav {
    /// First channel, scaled to [-1, 1].
    pub signal: Signal,
    /// Channel count of the file.
    pub channels: u16,
    /// Bit depth of the file.
    pub bits_per_sample: u16,
    /// True if the file rate differs from the expected rate.
    pub rate_mismatch: bool,
}

/// Loads the first channel of a WAV file.
///
/// When `expected_rate` is given and differs from the file's rate a warning is
/// logged and `rate_mismatch` is set; loading still succeeds.
pub fn load(path: impl AsRef<Path>, expected_rate: Option<u32>) -> DspResult<LoadedWav> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path)?;
    let loaded = read(reader, expected_rate)?;
    tracing::debug!(
        path = %path.display(),
        samples = loaded.signal.len(),
        rate = loaded.signal.sample_rate(),
        "loaded WAV"
    );
    Ok(loaded)
}

/// Decodes WAV bytes held in memory.
pub fn load_bytes(bytes: &[u8], expected_rate: Option<u32>) -> DspResult<LoadedWav> {
    read(hound::WavReader::new(Cursor::new(bytes))?, expected_rate)
}

fn read<R: std::io::Read>(
    reader: hound::WavReader<R>,
    expected_rate: Option<u32>,
) -> DspResult<LoadedWav> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DspError::invalid_input("WAV file declares zero channels"));
    }
    let channels = spec.channels as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / full_scale))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<_, _>>()?,
    };
    let first: Vec<f64> = interleaved.into_iter().step_by(channels).collect();

    let rate_mismatch = match expected_rate {
        Some(expected) if expected != spec.sample_rate => {
            tracing::warn!(
                expected,
                actual = spec.sample_rate,
                "WAV sample rate differs from the expected rate"
            );
            true
        }
        _ => false,
    };

    Ok(LoadedWav {
        signal: Signal::new(first, spec.sample_rate),
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        rate_mismatch,
    })
}

/// Result of WAV encoding.
#[derive(Debug, Clone)]
pub struct WavResult {
    /// Complete WAV file bytes.
    pub wav_data: Vec<u8>,
    /// BLAKE3 hash of the PCM payload only.
    pub pcm_hash: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample (8 or 16).
    pub bits_per_sample: u16,
    /// Number of samples.
    pub num_samples: usize,
}

impl WavResult {
    /// Encodes a signal as mono 16-bit PCM.
    ///
    /// Signals whose peak exceeds 1.0 are scaled down to full scale; quieter
    /// signals are written as-is.
    pub fn from_signal(signal: &Signal) -> DspResult<Self> {
        let peak = signal.peak();
        let gain = if peak > 1.0 { 1.0 / peak } else { 1.0 };
        let pcm: Vec<i16> = signal
            .samples()
            .iter()
            .map(|&x| ((x * gain).clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();

        let pcm_bytes: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav_data = encode(signal.sample_rate(), 16, |w| {
            pcm.iter().try_for_each(|&s| w.write_sample(s))
        })?;

        Ok(Self {
            wav_data,
            pcm_hash: blake3::hash(&pcm_bytes).to_hex().to_string(),
            sample_rate: signal.sample_rate(),
            bits_per_sample: 16,
            num_samples: pcm.len(),
        })
    }

    /// Encodes an 8-bit signal as mono 8-bit PCM.
    pub fn from_quantized(signal: &QuantizedSignal) -> DspResult<Self> {
        let pcm_bytes: Vec<u8> = signal.samples().iter().map(|&s| s as u8).collect();
        let wav_data = encode(signal.sample_rate(), 8, |w| {
            signal.samples().iter().try_for_each(|&s| w.write_sample(s))
        })?;

        Ok(Self {
            wav_data,
            pcm_hash: blake3::hash(&pcm_bytes).to_hex().to_string(),
            sample_rate: signal.sample_rate(),
            bits_per_sample: 8,
            num_samples: signal.len(),
        })
    }

    /// Returns the duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples as f64 / self.sample_rate as f64
    }

    /// Writes the WAV bytes to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> DspResult<()> {
        std::fs::write(path, &self.wav_data)?;
        Ok(())
    }
}

type MemWriter<'a> = hound::WavWriter<&'a mut Cursor<Vec<u8>>>;

fn encode<F>(sample_rate: u32, bits_per_sample: u16, write: F) -> DspResult<Vec<u8>>
where
    F: FnOnce(&mut MemWriter<'_>) -> Result<(), hound::Error>,
{
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        write(&mut writer)?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Saves `signal` as 16-bit PCM.
pub fn save(path: impl AsRef<Path>, signal: &Signal) -> DspResult<WavResult> {
    let result = WavResult::from_signal(signal)?;
    result.write_to(path)?;
    Ok(result)
}

/// Saves an 8-bit signal as 8-bit PCM.
pub fn save_quantized(path: impl AsRef<Path>, signal: &QuantizedSignal) -> DspResult<WavResult> {
    let result = WavResult::from_quantized(signal)?;
    result.write_to(path)?;
    Ok(result)
}
