//! # Rules Subcommand
//!
//! `dca rules check <file.yaml>` loads a policy-and-rules file and reports
//! problems before it is fed to a deployment. Money bounds are in minor
//! units.
//!
//! ```yaml
//! policy:
//!   sla_days: { critical: 3, high: 7, medium: 14, low: 30 }
//! rules:
//!   - name: mumbai desk
//!     priority: 10
//!     target_manager_id: 6f1c0e8e-2a7d-4d3b-9a51-0c3f1f2b7a10
//!     kind: { type: GEO_BASED, city: Mumbai }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dca_workflow::{NewRule, PolicyConfig};
use serde::Deserialize;

/// Arguments for `dca rules`.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Validate a policy and allocation-rule file.
    Check {
        /// YAML file to check.
        file: PathBuf,
    },
}

/// On-disk layout. Both sections are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleFile {
    pub policy: PolicyConfig,
    pub rules: Vec<NewRule>,
}

/// Findings for one file. Errors fail the check; warnings do not.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn load(path: &Path) -> Result<RuleFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn check(file: &RuleFile) -> CheckReport {
    let mut report = CheckReport::default();

    let sla = file.policy.sla_days;
    if [sla.critical, sla.high, sla.medium, sla.low].contains(&0) {
        report.errors.push("policy: SLA days must be positive".to_string());
    }
    if !(sla.critical <= sla.high && sla.high <= sla.medium && sla.medium <= sla.low) {
        report.warnings.push(format!(
            "policy: SLA days are not ascending by urgency (critical={}, high={}, medium={}, low={})",
            sla.critical, sla.high, sla.medium, sla.low
        ));
    }

    let mut names = HashSet::new();
    let mut by_priority: HashMap<u32, Vec<&str>> = HashMap::new();
    for (idx, rule) in file.rules.iter().enumerate() {
        let label = format!("rule {} ({:?})", idx + 1, rule.name);
        let name = rule.name.trim();
        if name.is_empty() {
            report.errors.push(format!("rule {}: name must not be empty", idx + 1));
        } else if !names.insert(name.to_ascii_lowercase()) {
            report.errors.push(format!("{label}: duplicate name"));
        }
        if let Err(e) = rule.kind.validate() {
            report.errors.push(format!("{label}: {e}"));
        }
        by_priority.entry(rule.priority).or_default().push(&rule.name);
    }

    let mut shared: Vec<_> = by_priority.into_iter().filter(|(_, v)| v.len() > 1).collect();
    shared.sort_by_key(|(p, _)| *p);
    for (priority, rules) in shared {
        report.warnings.push(format!(
            "priority {priority} is shared by {}; evaluation order between them is by creation time",
            rules.join(", ")
        ));
    }
    report
}

pub fn run_rules(args: &RulesArgs) -> Result<u8> {
    match &args.command {
        RulesCommand::Check { file } => {
            let parsed = load(file)?;
            let report = check(&parsed);
            for w in &report.warnings {
                tracing::warn!("{w}");
            }
            for e in &report.errors {
                eprintln!("error: {e}");
            }
            if report.passed() {
                println!(
                    "{}: OK ({} rule(s), {} warning(s))",
                    file.display(),
                    parsed.rules.len(),
                    report.warnings.len()
                );
                Ok(0)
            } else {
                eprintln!("{}: {} error(s)", file.display(), report.errors.len());
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANAGER: &str = "6f1c0e8e-2a7d-4d3b-9a51-0c3f1f2b7a10";

    fn write_yaml(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    fn run_check(body: &str) -> u8 {
        let f = write_yaml(body);
        run_rules(&RulesArgs {
            command: RulesCommand::Check {
                file: f.path().to_path_buf(),
            },
        })
        .unwrap()
    }

    #[test]
    fn well_formed_file_passes() {
        let body = format!(
            "rules:\n  - name: mumbai desk\n    priority: 10\n    target_manager_id: {MANAGER}\n    kind: {{ type: GEO_BASED, city: Mumbai }}\n  - name: large balances\n    priority: 20\n    target_manager_id: {MANAGER}\n    kind: {{ type: VALUE_BASED, min: 10000000 }}\n"
        );
        let parsed = load(write_yaml(&body).path()).unwrap();
        assert_eq!(parsed.rules.len(), 2);
        assert_eq!(parsed.policy, PolicyConfig::default());
        assert!(check(&parsed).passed());
        assert_eq!(run_check(&body), 0);
    }

    #[test]
    fn manager_id_copied_from_a_log_line_is_accepted() {
        let body = format!(
            "rules:\n  - name: pasted\n    priority: 1\n    target_manager_id: user:{MANAGER}\n    kind: {{ type: PRIORITY_BASED, priority: LOW }}\n"
        );
        let parsed = load(write_yaml(&body).path()).unwrap();
        assert_eq!(parsed.rules[0].target_manager_id.as_uuid().to_string(), MANAGER);
    }

    #[test]
    fn inverted_value_bounds_fail() {
        let body = format!(
            "rules:\n  - name: broken\n    priority: 1\n    target_manager_id: {MANAGER}\n    kind: {{ type: VALUE_BASED, min: 500, max: 100 }}\n"
        );
        assert_eq!(run_check(&body), 1);
    }

    #[test]
    fn duplicate_names_are_errors_and_shared_priorities_warn() {
        let body = format!(
            "rules:\n  - name: Desk\n    priority: 5\n    target_manager_id: {MANAGER}\n    kind: {{ type: PRIORITY_BASED, priority: HIGH }}\n  - name: desk\n    priority: 5\n    target_manager_id: {MANAGER}\n    kind: {{ type: RECOVERY_BASED, min_probability: 70 }}\n"
        );
        let report = check(&load(write_yaml(&body).path()).unwrap());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("duplicate name"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("priority 5"));
    }

    #[test]
    fn out_of_order_sla_only_warns() {
        let report = check(&load(write_yaml("policy:\n  sla_days:\n    critical: 10\n    high: 7\n").path()).unwrap());
        assert!(report.passed());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn zero_sla_is_an_error() {
        let report = check(&load(write_yaml("policy:\n  sla_days:\n    low: 0\n").path()).unwrap());
        assert!(!report.passed());
    }

    #[test]
    fn unknown_rule_type_is_a_parse_error() {
        let body = format!(
            "rules:\n  - name: x\n    priority: 1\n    target_manager_id: {MANAGER}\n    kind: {{ type: MOON_PHASE }}\n"
        );
        assert!(load(write_yaml(&body).path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }
}
