//! # dca CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dca_cli::rules::{run_rules, RulesArgs};
use dca_cli::score::{run_score, ScoreArgs};
use dca_cli::transitions::{run_transitions, TransitionsArgs};

/// Debt-collection case engine tooling.
#[derive(Parser, Debug)]
#[command(name = "dca", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the case lifecycle transition table.
    Transitions(TransitionsArgs),

    /// Policy and allocation-rule file tooling.
    Rules(RulesArgs),

    /// Compute the recovery probability of a hypothetical case.
    Score(ScoreArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Transitions(args) => run_transitions(&args),
        Commands::Rules(args) => run_rules(&args),
        Commands::Score(args) => run_score(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
