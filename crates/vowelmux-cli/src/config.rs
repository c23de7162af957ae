//! Pipeline configuration from a JSON file plus command-line overrides.

use anyhow::{Context, Result};
use clap::Args;
use vowelmux_spec::{NoiseReductionConfig, NotchConfig, PipelineConfig, WindowKind};

/// Configuration flags shared by the processing commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Pipeline configuration file (JSON); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Filter order for conditioning, demodulation and recovery
    #[arg(long)]
    pub order: Option<u32>,

    /// Carrier window (none, hann)
    #[arg(long, value_parser = ["none", "hann"])]
    pub window: Option<String>,

    /// Enable the notch filter at this center frequency (Hz)
    #[arg(long)]
    pub notch_hz: Option<f64>,

    /// Enable spectral-subtraction noise reduction on recovered channels
    #[arg(long)]
    pub denoise: bool,
}

impl ConfigArgs {
    /// Loads the configuration file (if any) and applies the flag overrides.
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Failed to load config file: {}", path))?,
            None => PipelineConfig::default(),
        };

        if let Some(order) = self.order {
            config.condition_order = order;
            config.demod_order = order;
            config.recovery_order = order;
        }
        if let Some(window) = self.window.as_deref() {
            config.window = match window {
                "none" => WindowKind::None,
                _ => WindowKind::Hann,
            };
        }
        if let Some(center_hz) = self.notch_hz {
            config.notch = Some(NotchConfig {
                center_hz,
                ..config.notch.unwrap_or_default()
            });
        }
        if self.denoise && config.noise_reduction.is_none() {
            config.noise_reduction = Some(NoiseReductionConfig::default());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = ConfigArgs::default().resolve().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"condition_order": 6, "notch": {{"center_hz": 1000.0, "q": 12.0}}}}"#)
            .unwrap();

        let args = ConfigArgs {
            config: Some(file.path().to_string_lossy().into_owned()),
            order: None,
            window: Some("none".to_string()),
            notch_hz: Some(2800.0),
            denoise: true,
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.condition_order, 6);
        assert_eq!(config.demod_order, 10);
        assert_eq!(config.window, WindowKind::None);
        let notch = config.notch.unwrap();
        assert_eq!(notch.center_hz, 2800.0);
        assert_eq!(notch.q, 12.0);
        assert!(config.noise_reduction.is_some());
    }

    #[test]
    fn test_order_applies_to_all_filters() {
        let args = ConfigArgs {
            order: Some(4),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(
            (config.condition_order, config.demod_order, config.recovery_order),
            (4, 4, 4)
        );
    }

    #[test]
    fn test_missing_file_reports_path() {
        let args = ConfigArgs {
            config: Some("/nonexistent/vowelmux.json".to_string()),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/vowelmux.json"));
    }
}
