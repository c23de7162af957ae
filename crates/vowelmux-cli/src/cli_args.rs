//! CLI argument definitions for the vowelmux command-line interface.

use clap::{ArgAction, Parser, Subcommand};
use vowelmux_cli::config::ConfigArgs;

/// vowelmux - FDM multiplexing of telephone-band vowel recordings
#[derive(Parser)]
#[command(name = "vowelmux")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Multiplex and demultiplex a/e/i recordings from a directory
    Process {
        /// Directory containing one `<label>.wav` per channel
        #[arg(short, long)]
        input_dir: String,

        /// Output directory for WAV files, plots and the run report
        #[arg(short, long)]
        out_dir: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Skip diagnostic PNG plots
        #[arg(long)]
        no_plots: bool,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration and print its carrier plan
    Plan {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the spectral peaks of a WAV file
    Spectrum {
        /// WAV file to analyze
        #[arg(short, long)]
        input: String,

        /// Write a waveform/spectrum PNG to this path
        #[arg(long)]
        plot: Option<String>,

        /// Number of peaks to report
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Process recordings block by block on a capture and a processing thread
    Stream {
        /// Directory containing one `<label>.wav` per channel
        #[arg(short, long)]
        input_dir: String,

        /// Output directory for recovered blocks
        #[arg(short, long)]
        out_dir: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Block length in seconds
        #[arg(long)]
        block_seconds: Option<f64>,

        /// Maximum queued blocks before the oldest is dropped
        #[arg(long)]
        queue_depth: Option<usize>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Write synthetic a/e/i recordings
    Synth {
        /// Output directory
        #[arg(short, long)]
        out_dir: String,

        /// Signal kind (tone, vowel)
        #[arg(long, default_value = "vowel", value_parser = ["tone", "vowel"])]
        kind: String,

        /// Length in seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f64,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 24000)]
        rate: u32,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },
}
