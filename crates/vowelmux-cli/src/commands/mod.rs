//! CLI command implementations

pub mod json_output;
pub mod plan;
pub mod process;
pub mod spectrum;
pub mod stream;
pub mod synth;
