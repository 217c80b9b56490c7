//! # Score Subcommand
//!
//! Computes the recovery probability the RECOVERY_BASED allocation rule
//! keys on, for a hypothetical case.

use anyhow::{Context, Result};
use clap::Args;
use dca_core::{DebtorId, Money, Priority, Timestamp};
use dca_state::Case;
use dca_workflow::recovery_probability;

/// Arguments for `dca score`.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Original debt, as a decimal amount.
    #[arg(long)]
    pub amount: String,

    #[arg(long, default_value = "MEDIUM")]
    pub priority: String,

    /// Days since the debt fell due. Negative means not yet due.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub days_overdue: i64,

    /// Amount recovered so far.
    #[arg(long, default_value = "0")]
    pub recovered: String,
}

/// Score the described case as of `now`.
pub fn score(args: &ScoreArgs, now: Timestamp) -> Result<u8> {
    let amount = Money::parse_decimal(&args.amount).context("invalid --amount")?;
    let priority: Priority = args.priority.parse().context("invalid --priority")?;
    let recovered = Money::parse_decimal(&args.recovered).context("invalid --recovered")?;

    let mut case = Case::open("SCORE", DebtorId::new(), amount, priority, None, now)
        .context("invalid case")?;
    case.due_date = Some(now.plus_days(-args.days_overdue));
    case.recovered_amount = recovered;
    Ok(recovery_probability(&case, now))
}

pub fn run_score(args: &ScoreArgs) -> Result<u8> {
    let value = score(args, Timestamp::now())?;
    tracing::info!(amount = %args.amount, priority = %args.priority, "scored case");
    println!("{value}");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(amount: &str, priority: &str, days: i64, recovered: &str) -> ScoreArgs {
        ScoreArgs {
            amount: amount.into(),
            priority: priority.into(),
            days_overdue: days,
            recovered: recovered.into(),
        }
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T00:00:00Z").unwrap()
    }

    #[test]
    fn small_fresh_critical_case_with_payment_saturates() {
        // 50 + 15 + 10 + 20 + 10
        assert_eq!(score(&args("1000", "critical", 0, "100"), now()).unwrap(), 100);
    }

    #[test]
    fn large_stale_low_case_scores_low() {
        // 50 - 10 - 5 - 25
        assert_eq!(score(&args("250000", "LOW", 200, "0"), now()).unwrap(), 10);
    }

    #[test]
    fn mid_band_medium_case() {
        // 50 + 0 + 0 - 10
        assert_eq!(score(&args("100000", "MEDIUM", 100, "0"), now()).unwrap(), 40);
    }

    #[test]
    fn zero_amount_is_rejected() {
        assert!(score(&args("0", "HIGH", 0, "0"), now()).is_err());
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let err = score(&args("100", "URGENT", 0, "0"), now()).unwrap_err();
        assert!(format!("{err:#}").contains("--priority"));
    }
}
