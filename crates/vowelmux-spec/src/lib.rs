//! vowelmux Pipeline Configuration Library
//!
//! This crate provides the declarative types shared by the vowelmux DSP core and
//! CLI: the pipeline configuration, the carrier-frequency channel plan, and the
//! validation machinery that rejects unusable parameter sets before any signal is
//! touched.
//!
//! # Example
//!
//! ```
//! use vowelmux_spec::{validate_config, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let result = validate_config(&config);
//! assert!(result.is_ok());
//!
//! let plan = config.channel_plan();
//! assert_eq!(plan.len(), 3);
//! assert!(plan.validate().is_ok());
//! ```
//!
//! # Modules
//!
//! - [`config`]: Pipeline configuration with defaults reproducing the reference setup
//! - [`plan`]: Channel plan and carrier-spacing invariant
//! - [`error`]: Error and warning types for validation
//! - [`validation`]: Configuration validation functions

pub mod config;
pub mod error;
pub mod plan;
pub mod validation;

pub use config::{
    Band, NoiseReductionConfig, NotchConfig, PipelineConfig, StreamConfig, WindowKind,
    DEFAULT_BASEBAND_RATE, DEFAULT_FILTER_ORDER, DEFAULT_INPUT_RATE, DEFAULT_MULTIPLEX_RATE,
    DEFAULT_STOPBAND_DB, MAX_FILTER_ORDER,
};
pub use error::{
    BackendError, ErrorCode, SpecError, ValidationError, ValidationResult, ValidationWarning,
    WarningCode,
};
pub use plan::{Channel, ChannelPlan, PlanError};
pub use validation::validate_config;
