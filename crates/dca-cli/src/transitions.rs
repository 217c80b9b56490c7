//! # Transitions Subcommand
//!
//! Dumps the lifecycle table the engine enforces, for runbooks and for
//! diffing across releases.

use anyhow::Result;
use clap::{Args, ValueEnum};
use dca_state::{CaseStatus, TRANSITION_TABLE};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
}

/// Arguments for `dca transitions`.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Debug, Serialize)]
struct Edge {
    from: &'static str,
    to: &'static str,
    roles: Vec<&'static str>,
    system: bool,
    precondition: &'static str,
}

fn edges() -> Vec<Edge> {
    TRANSITION_TABLE
        .iter()
        .map(|rule| Edge {
            from: rule.from.as_str(),
            to: rule.to.as_str(),
            roles: rule.roles.iter().map(|r| r.as_str()).collect(),
            system: rule.system,
            precondition: rule.precondition.describe(),
        })
        .collect()
}

/// The table as pretty JSON.
pub fn render_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&edges())?)
}

/// The table as aligned text, one edge per line, then terminal states.
pub fn render_table() -> String {
    let rows = edges();
    let mut out = format!(
        "{:<12} {:<12} {:<28} {:<7} {}\n",
        "FROM", "TO", "ROLES", "SYSTEM", "PRECONDITION"
    );
    for e in &rows {
        out.push_str(&format!(
            "{:<12} {:<12} {:<28} {:<7} {}\n",
            e.from,
            e.to,
            e.roles.join(","),
            if e.system { "yes" } else { "no" },
            e.precondition
        ));
    }
    let terminal: Vec<&str> = CaseStatus::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .map(|s| s.as_str())
        .collect();
    out.push_str(&format!("\nterminal: {}\n", terminal.join(", ")));
    out
}

pub fn run_transitions(args: &TransitionsArgs) -> Result<u8> {
    match args.format {
        Format::Table => print!("{}", render_table()),
        Format::Json => println!("{}", render_json()?),
    }
    Ok(0)
}
