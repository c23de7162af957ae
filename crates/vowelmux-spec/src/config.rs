//! Pipeline configuration.
//!
//! A single [`PipelineConfig`] parameterizes every stage of the multiplexer:
//! sample rates, the telephone band, filter orders, the optional notch and
//! noise-reduction stages, the carrier plan, and periodic streaming. Every field
//! has a default, so `{}` is a valid configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::plan::{Channel, ChannelPlan};

/// Reference capture rate in Hz.
pub const DEFAULT_INPUT_RATE: u32 = 24_000;

/// Baseband (telephone) rate in Hz.
pub const DEFAULT_BASEBAND_RATE: u32 = 8_000;

/// Composite multiplex rate in Hz.
pub const DEFAULT_MULTIPLEX_RATE: u32 = 192_000;

/// Butterworth order used by every band-pass stage.
pub const DEFAULT_FILTER_ORDER: u32 = 10;

/// Largest supported Butterworth order.
pub const MAX_FILTER_ORDER: u32 = 12;

/// Anti-aliasing kernel stop-band attenuation in dB.
pub const DEFAULT_STOPBAND_DB: f64 = 60.0;

/// Telephone band edges in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Band {
    /// Lower cutoff in Hz.
    pub low_hz: f64,
    /// Upper cutoff in Hz.
    pub high_hz: f64,
}

impl Band {
    /// Creates a band from its edges.
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// Returns true if `freq_hz` lies inside the band (edges included).
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    /// Width of the band in Hz.
    pub fn width(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

impl Default for Band {
    fn default() -> Self {
        Self {
            low_hz: 300.0,
            high_hz: 3400.0,
        }
    }
}

/// Taper applied across the whole signal during (de)modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// No taper.
    None,
    /// Symmetric Hann taper.
    #[default]
    Hann,
}

/// Optional notch stage applied after conditioning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotchConfig {
    /// Notch center in Hz.
    #[serde(default = "default_notch_center")]
    pub center_hz: f64,
    /// Quality factor (center / -3 dB bandwidth).
    #[serde(default = "default_notch_q")]
    pub q: f64,
}

fn default_notch_center() -> f64 {
    2800.0
}

fn default_notch_q() -> f64 {
    30.0
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            center_hz: default_notch_center(),
            q: default_notch_q(),
        }
    }
}

/// Optional spectral-subtraction post-filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseReductionConfig {
    /// Noise floor as a fraction of the signal peak, not an absolute level:
    /// samples below `threshold * peak` count as noise. Must be in (0, 1].
    #[serde(default = "default_noise_threshold")]
    pub threshold: f64,
    /// Scale applied to the noise power before subtraction.
    #[serde(default = "default_noise_factor")]
    pub factor: f64,
}

fn default_noise_threshold() -> f64 {
    0.02
}

fn default_noise_factor() -> f64 {
    1.0
}

impl Default for NoiseReductionConfig {
    fn default() -> Self {
        Self {
            threshold: default_noise_threshold(),
            factor: default_noise_factor(),
        }
    }
}

/// Periodic block capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Length of one captured block in seconds.
    #[serde(default = "default_block_seconds")]
    pub block_seconds: f64,
    /// Number of blocks the capture queue may hold.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_block_seconds() -> f64 {
    1.0
}

fn default_queue_depth() -> usize {
    4
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_seconds: default_block_seconds(),
            queue_depth: default_queue_depth(),
        }
    }
}

/// Full parameterization of the multiplex pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Expected capture rate in Hz. Loaded files at other rates produce a warning.
    pub input_rate: u32,
    /// Baseband rate every channel is decimated to.
    pub baseband_rate: u32,
    /// Rate of the composite multiplexed signal.
    pub multiplex_rate: u32,
    /// Telephone band used for conditioning, demodulation and recovery.
    pub band: Band,
    /// Order of the conditioning band-pass.
    pub condition_order: u32,
    /// Order of the band-pass applied after coherent demodulation.
    pub demod_order: u32,
    /// Order of the final recovery band-pass at the baseband rate.
    pub recovery_order: u32,
    /// Stop-band attenuation target of the resampling kernels.
    pub stopband_db: f64,
    /// Modulation taper.
    pub window: WindowKind,
    /// Optional notch applied after conditioning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notch: Option<NotchConfig>,
    /// Optional spectral subtraction applied after recovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_reduction: Option<NoiseReductionConfig>,
    /// Carrier assignment, one entry per channel.
    pub channels: Vec<Channel>,
    /// Periodic capture settings.
    pub stream: StreamConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_rate: DEFAULT_INPUT_RATE,
            baseband_rate: DEFAULT_BASEBAND_RATE,
            multiplex_rate: DEFAULT_MULTIPLEX_RATE,
            band: Band::default(),
            condition_order: DEFAULT_FILTER_ORDER,
            demod_order: DEFAULT_FILTER_ORDER,
            recovery_order: DEFAULT_FILTER_ORDER,
            stopband_db: DEFAULT_STOPBAND_DB,
            window: WindowKind::default(),
            notch: None,
            noise_reduction: None,
            channels: vec![
                Channel::new("a", 15_000.0),
                Channel::new("e", 42_500.0),
                Channel::new("i", 70_000.0),
            ],
            stream: StreamConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the channel plan implied by this configuration.
    pub fn channel_plan(&self) -> ChannelPlan {
        ChannelPlan::new(
            self.channels.clone(),
            self.baseband_rate,
            self.multiplex_rate,
            self.band.high_hz,
        )
    }

    /// Labels of the configured channels, in plan order.
    pub fn labels(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.label.as_str()).collect()
    }
}
