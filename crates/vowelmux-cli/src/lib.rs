//! vowelmux CLI library.
//!
//! Command implementations, configuration overrides, logging setup and PNG
//! rendering of diagnostic signals for the `vowelmux` binary.

pub mod commands;
pub mod config;
pub mod logging;
pub mod render;
