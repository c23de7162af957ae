//! vowelmux CLI - Command-line interface for FDM vowel multiplexing
//!
//! This binary synthesizes or loads vowel recordings, multiplexes them onto
//! separate carriers, recovers them again, and reports on the result.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use vowelmux_cli::commands;
use vowelmux_cli::commands::stream::StreamOverrides;
use vowelmux_cli::logging;

mod cli_args;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input_dir,
            out_dir,
            config,
            no_plots,
            json,
        } => commands::process::run(&input_dir, &out_dir, &config, !no_plots, json),
        Commands::Plan { config, json } => commands::plan::run(&config, json),
        Commands::Spectrum {
            input,
            plot,
            top,
            json,
        } => commands::spectrum::run(&input, plot.as_deref(), top, json),
        Commands::Stream {
            input_dir,
            out_dir,
            config,
            block_seconds,
            queue_depth,
            json,
        } => commands::stream::run(
            &input_dir,
            &out_dir,
            &config,
            StreamOverrides {
                block_seconds,
                queue_depth,
            },
            json,
        ),
        Commands::Synth {
            out_dir,
            kind,
            duration,
            rate,
            json,
        } => commands::synth::run(&out_dir, &kind, duration, rate, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red(), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_process() {
        let cli = Cli::try_parse_from([
            "vowelmux",
            "process",
            "--input-dir",
            "in",
            "--out-dir",
            "out",
            "--notch-hz",
            "2800",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Process {
                input_dir,
                out_dir,
                config,
                no_plots,
                json,
            } => {
                assert_eq!(input_dir, "in");
                assert_eq!(out_dir, "out");
                assert_eq!(config.notch_hz, Some(2800.0));
                assert!(config.config.is_none());
                assert!(!no_plots);
                assert!(!json);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_cli_requires_dirs_for_process() {
        let err = Cli::try_parse_from(["vowelmux", "process", "--input-dir", "in"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("--out-dir"));
    }

    #[test]
    fn test_cli_parses_plan_with_config() {
        let cli = Cli::try_parse_from([
            "vowelmux", "plan", "--config", "mux.json", "--order", "6", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan { config, json } => {
                assert_eq!(config.config.as_deref(), Some("mux.json"));
                assert_eq!(config.order, Some(6));
                assert!(json);
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_window() {
        assert!(Cli::try_parse_from(["vowelmux", "plan", "--window", "kaiser"]).is_err());
    }

    #[test]
    fn test_cli_parses_stream_overrides() {
        let cli = Cli::try_parse_from([
            "vowelmux",
            "stream",
            "-i",
            "in",
            "-o",
            "out",
            "--block-seconds",
            "0.5",
            "--queue-depth",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Stream {
                block_seconds,
                queue_depth,
                ..
            } => {
                assert_eq!(block_seconds, Some(0.5));
                assert_eq!(queue_depth, Some(2));
            }
            _ => panic!("expected stream command"),
        }
    }

    #[test]
    fn test_cli_synth_defaults() {
        let cli = Cli::try_parse_from(["vowelmux", "synth", "-o", "rec"]).unwrap();
        match cli.command {
            Commands::Synth {
                kind,
                duration,
                rate,
                ..
            } => {
                assert_eq!(kind, "vowel");
                assert_eq!(duration, 1.0);
                assert_eq!(rate, 24000);
            }
            _ => panic!("expected synth command"),
        }
    }
}
