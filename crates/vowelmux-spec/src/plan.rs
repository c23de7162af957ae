//! Carrier-frequency channel plan.
//!
//! Each channel occupies `carrier ± bandwidth` in the multiplexed signal, so two
//! carriers must be more than twice the post-filter bandwidth apart for their
//! sidebands not to overlap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

/// One logical channel and the carrier it is shifted onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Channel {
    /// Channel label (e.g. "a").
    pub label: String,
    /// Carrier frequency in Hz.
    pub carrier_hz: f64,
}

impl Channel {
    /// Creates a channel entry.
    pub fn new(label: impl Into<String>, carrier_hz: f64) -> Self {
        Self {
            label: label.into(),
            carrier_hz,
        }
    }
}

/// Reasons a channel plan cannot be multiplexed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The plan has no channels.
    #[error("channel plan is empty")]
    Empty,

    /// Two channels share a label.
    #[error("duplicate channel label '{label}'")]
    DuplicateLabel { index: usize, label: String },

    /// Two carriers are not far enough apart.
    #[error(
        "carriers '{first}' and '{second}' are {spacing_hz} Hz apart, must exceed {min_spacing_hz} Hz"
    )]
    CarrierSpacing {
        index: usize,
        first: String,
        second: String,
        spacing_hz: f64,
        min_spacing_hz: f64,
    },

    /// Carrier is too low, or its upper sideband reaches the multiplex Nyquist.
    #[error("carrier '{label}' at {carrier_hz} Hz must lie in ({min_hz}, {max_hz}) Hz")]
    CarrierOutOfRange {
        index: usize,
        label: String,
        carrier_hz: f64,
        min_hz: f64,
        max_hz: f64,
    },

    /// The multiplex rate is not an integer multiple of the baseband rate.
    #[error("multiplex rate {multiplex_rate} Hz is not a multiple of baseband rate {baseband_rate} Hz")]
    RateNotMultiple {
        baseband_rate: u32,
        multiplex_rate: u32,
    },
}

impl PlanError {
    /// Validation code matching this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PlanError::Empty => ErrorCode::NoChannels,
            PlanError::DuplicateLabel { .. } => ErrorCode::DuplicateChannelLabel,
            PlanError::CarrierSpacing { .. } => ErrorCode::CarrierSpacing,
            PlanError::CarrierOutOfRange { .. } => ErrorCode::CarrierOutOfRange,
            PlanError::RateNotMultiple { .. } => ErrorCode::RateNotMultiple,
        }
    }

    /// JSON path of the offending field within a pipeline configuration.
    pub fn path(&self) -> String {
        match self {
            PlanError::Empty => "channels".to_string(),
            PlanError::DuplicateLabel { index, .. } => format!("channels[{}].label", index),
            PlanError::CarrierSpacing { index, .. }
            | PlanError::CarrierOutOfRange { index, .. } => {
                format!("channels[{}].carrier_hz", index)
            }
            PlanError::RateNotMultiple { .. } => "multiplex_rate".to_string(),
        }
    }
}

/// Carrier assignment shared by the multiplexer and demultiplexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPlan {
    /// Channels in multiplex order.
    pub channels: Vec<Channel>,
    /// Rate each channel is decimated to before upconversion.
    pub baseband_rate: u32,
    /// Rate of the composite signal.
    pub multiplex_rate: u32,
    /// One-sided bandwidth of a conditioned channel in Hz.
    pub bandwidth_hz: f64,
}

impl ChannelPlan {
    /// Creates a plan.
    pub fn new(
        channels: Vec<Channel>,
        baseband_rate: u32,
        multiplex_rate: u32,
        bandwidth_hz: f64,
    ) -> Self {
        Self {
            channels,
            baseband_rate,
            multiplex_rate,
            bandwidth_hz,
        }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if the plan has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Minimum allowed distance between two carriers (exclusive).
    pub fn min_spacing_hz(&self) -> f64 {
        2.0 * self.bandwidth_hz
    }

    /// Zero-order-hold factor from baseband to multiplex rate.
    pub fn upsample_factor(&self) -> u32 {
        if self.baseband_rate == 0 {
            return 0;
        }
        self.multiplex_rate / self.baseband_rate
    }

    /// Looks up a channel by label.
    pub fn channel(&self, label: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.label == label)
    }

    /// Every reason this plan cannot be used; empty when it is valid.
    pub fn violations(&self) -> Vec<PlanError> {
        let mut errors = Vec::new();

        if self.channels.is_empty() {
            errors.push(PlanError::Empty);
            return errors;
        }

        if self.baseband_rate == 0 || self.multiplex_rate % self.baseband_rate != 0 {
            errors.push(PlanError::RateNotMultiple {
                baseband_rate: self.baseband_rate,
                multiplex_rate: self.multiplex_rate,
            });
        }

        let mut seen = HashSet::new();
        for (index, channel) in self.channels.iter().enumerate() {
            if !seen.insert(channel.label.as_str()) {
                errors.push(PlanError::DuplicateLabel {
                    index,
                    label: channel.label.clone(),
                });
            }
        }

        let min_spacing = self.min_spacing_hz();
        let max_carrier = self.multiplex_rate as f64 / 2.0 - self.bandwidth_hz;
        for (index, channel) in self.channels.iter().enumerate() {
            let carrier = channel.carrier_hz;
            if !carrier.is_finite() || carrier <= min_spacing || carrier >= max_carrier {
                errors.push(PlanError::CarrierOutOfRange {
                    index,
                    label: channel.label.clone(),
                    carrier_hz: carrier,
                    min_hz: min_spacing,
                    max_hz: max_carrier,
                });
            }
        }

        for (index, channel) in self.channels.iter().enumerate() {
            for other in &self.channels[..index] {
                let spacing = (channel.carrier_hz - other.carrier_hz).abs();
                if spacing <= min_spacing {
                    errors.push(PlanError::CarrierSpacing {
                        index,
                        first: other.label.clone(),
                        second: channel.label.clone(),
                        spacing_hz: spacing,
                        min_spacing_hz: min_spacing,
                    });
                }
            }
        }

        errors
    }

    /// Checks the plan, returning the first violation.
    pub fn validate(&self) -> Result<(), PlanError> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(carriers: &[(&str, f64)]) -> ChannelPlan {
        ChannelPlan::new(
            carriers
                .iter()
                .map(|(label, fc)| Channel::new(*label, *fc))
                .collect(),
            8_000,
            192_000,
            3_400.0,
        )
    }

    #[test]
    fn test_default_carriers_valid() {
        let plan = plan(&[("a", 15_000.0), ("e", 42_500.0), ("i", 70_000.0)]);
        assert!(plan.validate().is_ok());
        assert_eq!(plan.upsample_factor(), 24);
        assert_eq!(plan.min_spacing_hz(), 6_800.0);
    }

    #[test]
    fn test_close_carriers_rejected() {
        let plan = plan(&[("a", 62_000.0), ("e", 66_000.0), ("i", 70_000.0)]);
        let errors = plan.violations();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, PlanError::CarrierSpacing { .. }))
                .count(),
            2
        );
        assert_eq!(errors[0].error_code(), ErrorCode::CarrierSpacing);
        assert_eq!(errors[0].path(), "channels[1].carrier_hz");
    }

    #[test]
    fn test_spacing_exactly_min_rejected() {
        let plan = plan(&[("a", 20_000.0), ("e", 26_800.0)]);
        assert!(matches!(
            plan.validate(),
            Err(PlanError::CarrierSpacing { .. })
        ));
    }

    #[test]
    fn test_carrier_out_of_range() {
        let low = plan(&[("a", 5_000.0)]);
        assert!(matches!(
            low.validate(),
            Err(PlanError::CarrierOutOfRange { .. })
        ));

        let high = plan(&[("a", 93_000.0)]);
        assert!(matches!(
            high.validate(),
            Err(PlanError::CarrierOutOfRange { .. })
        ));
    }

    #[test]
    fn test_duplicate_label() {
        let plan = plan(&[("a", 15_000.0), ("a", 42_500.0)]);
        let err = plan.validate().unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::DuplicateChannelLabel);
        assert_eq!(err.to_string(), "duplicate channel label 'a'");
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(plan(&[]).validate(), Err(PlanError::Empty));
    }

    #[test]
    fn test_rate_not_multiple() {
        let mut plan = plan(&[("a", 15_000.0)]);
        plan.multiplex_rate = 44_100;
        assert!(matches!(
            plan.validate(),
            Err(PlanError::RateNotMultiple { .. })
        ));
    }

    #[test]
    fn test_channel_lookup() {
        let plan = plan(&[("a", 15_000.0), ("e", 42_500.0)]);
        assert_eq!(plan.channel("e").map(|c| c.carrier_hz), Some(42_500.0));
        assert!(plan.channel("o").is_none());
    }
}
