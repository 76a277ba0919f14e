use std::path::{Path, PathBuf};

use clap::Subcommand;
use kotaro_core::{RuleSet, RuleSetVersion};
use serde_json::json;

use crate::util::{EXIT_REJECTED, build_engine, exit_error, print_engine_error, print_json};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Print a rule set as JSON (the active one unless --version is given)
    Show {
        /// Built-in rule set to print instead
        #[arg(long, value_parser = ["v4.2", "v4.6.1"])]
        version: Option<String>,
    },
    /// Validate a rule set file without classifying anything
    Check {
        /// Rule set JSON file
        path: PathBuf,
    },
}

pub fn run(rules_path: Option<&Path>, command: RulesCommands) -> i32 {
    match command {
        RulesCommands::Show { version } => {
            let rules = match version.as_deref() {
                Some(version) => builtin(version).unwrap_or_else(|| {
                    exit_error(
                        &format!("Unknown built-in rule set '{version}'"),
                        Some("Built-in rule sets: v4.2, v4.6.1."),
                    )
                }),
                None => build_engine(rules_path).rules().clone(),
            };
            print_json(&rules);
            0
        }
        RulesCommands::Check { path } => {
            let data = std::fs::read_to_string(&path).unwrap_or_else(|e| {
                exit_error(&format!("Failed to read {}: {e}", path.display()), None)
            });
            match RuleSet::from_json(&data) {
                Ok(rules) => {
                    print_json(&json!({
                        "valid": true,
                        "version": rules.version,
                        "adjustment_rules": rules.adjuster.rules.len(),
                        "tie_overrides": rules.decision.overrides.len(),
                        "scatter_gate": rules.decision.scatter.is_some(),
                    }));
                    0
                }
                Err(err) => {
                    print_engine_error(&err);
                    EXIT_REJECTED
                }
            }
        }
    }
}

fn builtin(version: &str) -> Option<RuleSet> {
    let version = match version {
        "v4.2" => RuleSetVersion::V4_2,
        "v4.6.1" => RuleSetVersion::V4_6_1,
        _ => return None,
    };
    RuleSet::builtin(version)
}
