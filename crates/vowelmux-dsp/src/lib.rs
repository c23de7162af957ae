//! vowelmux DSP core
//!
//! Conditions vowel recordings to the telephone band, quantizes them to 8 bits,
//! stacks them on separate carriers in one composite signal, and recovers each
//! channel again.
//!
//! # Overview
//!
//! - **Filtering** - Butterworth band-pass/low-pass cascades and a zero-phase notch
//! - **Rate conversion** - Kaiser-windowed polyphase resampling, 8-bit quantization, sample-and-hold
//! - **Modulation** - Carrier mixing with an optional Hann taper, coherent demodulation
//! - **Pipeline** - Per-channel conditioning, multiplexing and demultiplexing
//! - **Streaming** - Block capture on one thread, processing on another
//!
//! # Example
//!
//! ```ignore
//! use vowelmux_dsp::{wav, ChannelInputs, Multiplexer};
//! use vowelmux_spec::PipelineConfig;
//!
//! let mux = Multiplexer::new(PipelineConfig::default())?;
//! let mut inputs = ChannelInputs::new();
//! for label in ["a", "e", "i"] {
//!     inputs.insert(label.to_string(), wav::load(format!("{label}.wav"), Some(24000))?.signal);
//! }
//! let output = mux.run(&inputs)?;
//! wav::save("multiplexed.wav", &output.multiplexed)?;
//! ```
//!
//! # Crate Structure
//!
//! - [`pipeline`] - [`Multiplexer`] stages and the [`Session`] context
//! - [`filter`] - Filter design, caching and application
//! - [`resample`] - Anti-aliasing kernels, decimation, quantization
//! - [`modulation`] - Carrier modulation and demodulation
//! - [`spectrum`] - One-sided magnitude spectra
//! - [`denoise`] - Spectral subtraction
//! - [`device`] - Capture and playback traits with file-backed implementations
//! - [`stream`] - Bounded block streaming
//! - [`wav`] - WAV reading and writing

pub mod denoise;
pub mod device;
pub mod error;
pub mod filter;
pub mod modulation;
pub mod pipeline;
pub mod resample;
pub mod signal;
pub mod spectrum;
pub mod stream;
pub mod wav;

// Re-export main types at crate root
pub use error::{DspError, DspResult};
pub use filter::{FilterBank, FilterKind, FilterSpec};
pub use pipeline::{ChannelOutput, Multiplexer, PipelineOutput, Session};
pub use signal::{ChannelInputs, QuantizedSignal, Signal};
pub use spectrum::{magnitude_spectrum, Spectrum};
pub use stream::{CancelToken, StreamStats};
pub use wav::WavResult;
