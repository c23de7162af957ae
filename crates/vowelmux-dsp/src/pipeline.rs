//! Multiplex pipeline.
//!
//! Per channel: band-pass to the telephone band (plus the optional notch),
//! decimate to the baseband rate, quantize to 8 bits, hold up to the multiplex
//! rate and modulate onto the channel carrier. The modulated channels are
//! summed into one composite signal. Demultiplexing reverses this: coherent
//! demodulation with a band-pass, decimation with its own kernel, and a final
//! telephone-band filter at the baseband rate.

mod session;

pub use session::Session;

use std::collections::BTreeMap;

use vowelmux_spec::{validate_config, ChannelPlan, PipelineConfig};

use crate::denoise::reduce_noise;
use crate::error::{DspError, DspResult};
use crate::filter::{FilterBank, FilterSpec};
use crate::modulation::{demodulate_with, modulate};
use crate::resample::{decimate, quantize_8bit, zero_order_hold};
use crate::signal::{ChannelInputs, QuantizedSignal, Signal};

/// Diagnostic label of the composite signal.
pub const MULTIPLEXED_LABEL: &str = "Multiplexed";

/// Results for one channel.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    /// Channel label.
    pub label: String,
    /// Carrier the channel was shifted onto.
    pub carrier_hz: f64,
    /// 8-bit signal at the baseband rate, before upconversion.
    pub conditioned: QuantizedSignal,
    /// Demultiplexed signal at the baseband rate.
    pub recovered: Signal,
}

/// Results of one multiplex/demultiplex run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Per-channel results in plan order.
    pub channels: Vec<ChannelOutput>,
    /// Sum of all modulated channels at the multiplex rate.
    pub multiplexed: Signal,
}

impl PipelineOutput {
    /// Looks up a channel by label.
    pub fn channel(&self, label: &str) -> Option<&ChannelOutput> {
        self.channels.iter().find(|c| c.label == label)
    }

    /// Label → signal mapping handed to the presentation layer.
    pub fn diagnostics(&self) -> BTreeMap<String, Signal> {
        let mut map = BTreeMap::new();
        for channel in &self.channels {
            let name = display_label(&channel.label);
            map.insert(
                format!("Conditioned {}", name),
                channel.conditioned.to_signal(),
            );
            map.insert(format!("Processed {}", name), channel.recovered.clone());
        }
        map.insert(MULTIPLEXED_LABEL.to_string(), self.multiplexed.clone());
        map
    }
}

/// Upper-cases the first character of a channel label ("a" → "A").
pub fn display_label(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// FDM multiplexer/demultiplexer for a validated configuration.
#[derive(Debug)]
pub struct Multiplexer {
    config: PipelineConfig,
    plan: ChannelPlan,
    bank: FilterBank,
}

impl Multiplexer {
    /// Validates `config` and builds a multiplexer for it.
    pub fn new(config: PipelineConfig) -> DspResult<Self> {
        let result = validate_config(&config);
        for warning in &result.warnings {
            tracing::warn!(code = %warning.code, "{}", warning.message);
        }
        if !result.is_ok() {
            return Err(DspError::InvalidConfig {
                errors: result.errors,
            });
        }

        let plan = config.channel_plan();
        Ok(Self {
            config,
            plan,
            bank: FilterBank::new(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The channel plan.
    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    fn check_input(&self, label: &str, raw: &Signal) -> DspResult<()> {
        raw.ensure_usable(&format!("input for channel '{}'", label))?;
        let rate = raw.sample_rate();
        if rate % self.config.baseband_rate != 0 {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!(
                    "channel '{}' is sampled at {} Hz, not a multiple of the {} Hz baseband rate",
                    label, rate, self.config.baseband_rate
                ),
            ));
        }
        Ok(())
    }

    /// Band-limits, decimates and quantizes one raw channel.
    pub fn condition(&self, label: &str, raw: &Signal) -> DspResult<QuantizedSignal> {
        self.check_input(label, raw)?;
        let cfg = &self.config;
        let rate = raw.sample_rate();

        let band = FilterSpec::bandpass(cfg.band.low_hz, cfg.band.high_hz, cfg.condition_order, rate);
        let mut filtered = self.bank.apply(&band, raw)?;
        if let Some(notch) = cfg.notch {
            let spec = FilterSpec::notch(notch.center_hz, notch.q, rate);
            filtered = self.bank.apply(&spec, &filtered)?;
        }

        let baseband = decimate(&filtered, cfg.baseband_rate, cfg.stopband_db)?;
        let quantized = quantize_8bit(&baseband)?;
        tracing::debug!(
            channel = label,
            in_rate = rate,
            in_len = raw.len(),
            out_len = quantized.len(),
            "conditioned channel"
        );
        Ok(quantized)
    }

    /// Holds a conditioned channel up to the multiplex rate and modulates it.
    pub fn upconvert(&self, conditioned: &QuantizedSignal, carrier_hz: f64) -> DspResult<Signal> {
        let held = zero_order_hold(&conditioned.to_signal(), self.plan.upsample_factor())?;
        modulate(&held, carrier_hz, self.config.window)
    }

    /// Sums channels sample-wise, zero-extending shorter ones.
    pub fn combine(channels: &[Signal]) -> DspResult<Signal> {
        let first = channels
            .first()
            .ok_or_else(|| DspError::invalid_input("no channels to combine"))?;
        let rate = first.sample_rate();
        if let Some(other) = channels.iter().find(|c| c.sample_rate() != rate) {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!(
                    "cannot combine {} Hz and {} Hz channels",
                    rate,
                    other.sample_rate()
                ),
            ));
        }

        let len = channels.iter().map(Signal::len).max().unwrap_or(0);
        let mut sum = vec![0.0; len];
        for channel in channels {
            for (acc, &x) in sum.iter_mut().zip(channel.samples()) {
                *acc += x;
            }
        }
        Ok(Signal::new(sum, rate))
    }

    /// Recovers the channel carried on `carrier_hz` from the composite signal.
    pub fn demultiplex(&self, multiplexed: &Signal, carrier_hz: f64) -> DspResult<Signal> {
        let cfg = &self.config;
        if multiplexed.sample_rate() != cfg.multiplex_rate {
            return Err(DspError::invalid_param(
                "sample_rate",
                format!(
                    "multiplexed signal is {} Hz, expected {} Hz",
                    multiplexed.sample_rate(),
                    cfg.multiplex_rate
                ),
            ));
        }

        let shifted = demodulate_with(
            &self.bank,
            multiplexed,
            carrier_hz,
            cfg.band,
            cfg.demod_order,
            cfg.window,
        )?;
        let baseband = decimate(&shifted, cfg.baseband_rate, cfg.stopband_db)?;
        let recovery = FilterSpec::bandpass(
            cfg.band.low_hz,
            cfg.band.high_hz,
            cfg.recovery_order,
            cfg.baseband_rate,
        );
        let recovered = self.bank.apply(&recovery, &baseband)?;

        match cfg.noise_reduction {
            Some(ref nr) => reduce_noise(&recovered, nr),
            None => Ok(recovered),
        }
    }

    /// Runs the full multiplex/demultiplex round trip.
    ///
    /// Every planned channel must have an input; otherwise nothing is processed
    /// and the error names all missing channels.
    pub fn run(&self, inputs: &ChannelInputs) -> DspResult<PipelineOutput> {
        let missing: Vec<String> = self
            .plan
            .channels
            .iter()
            .filter(|c| !inputs.contains_key(&c.label))
            .map(|c| c.label.clone())
            .collect();
        if !missing.is_empty() {
            return Err(DspError::MissingChannels { labels: missing });
        }
        for label in inputs.keys() {
            if self.plan.channel(label).is_none() {
                tracing::debug!(channel = %label, "ignoring input with no planned carrier");
            }
        }

        let raws: Vec<(&str, f64, &Signal)> = self
            .plan
            .channels
            .iter()
            .filter_map(|c| {
                inputs
                    .get(&c.label)
                    .map(|s| (c.label.as_str(), c.carrier_hz, s))
            })
            .collect();
        for (label, _, raw) in &raws {
            self.check_input(label, raw)?;
        }

        let mut conditioned = Vec::with_capacity(raws.len());
        let mut modulated = Vec::with_capacity(raws.len());
        for (label, carrier, raw) in &raws {
            let q = self.condition(label, raw)?;
            modulated.push(self.upconvert(&q, *carrier)?);
            conditioned.push(q);
        }

        let multiplexed = Self::combine(&modulated)?;
        tracing::debug!(
            channels = raws.len(),
            len = multiplexed.len(),
            rate = multiplexed.sample_rate(),
            "combined channels"
        );

        let mut channels = Vec::with_capacity(raws.len());
        for ((label, carrier, _), q) in raws.iter().zip(conditioned) {
            let recovered = self.demultiplex(&multiplexed, *carrier)?;
            tracing::debug!(channel = *label, len = recovered.len(), "recovered channel");
            channels.push(ChannelOutput {
                label: label.to_string(),
                carrier_hz: *carrier,
                conditioned: q,
                recovered,
            });
        }

        Ok(PipelineOutput {
            channels,
            multiplexed,
        })
    }
}
