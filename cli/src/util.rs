use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use kotaro_core::{EngineError, ErrorReport, FlagPolicy, PatternEngine, RuleSet};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit codes: 0=success, 1=input rejected by the engine, 4=usage or I/O error
pub const EXIT_REJECTED: i32 = 1;
pub const EXIT_USAGE: i32 = 4;

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", to_pretty(&err));
    std::process::exit(EXIT_USAGE);
}

/// Print an engine error as a structured report on stderr.
pub fn print_engine_error(err: &EngineError) {
    eprintln!("{}", to_pretty(&ErrorReport::from(err)));
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", to_pretty(value));
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\":\"cli_error\",\"message\":\"{e}\"}}"))
}

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// results.
pub fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kotaro=info,kotaro_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

pub fn flag_policy(value: &str) -> FlagPolicy {
    match value {
        "lenient" => FlagPolicy::Lenient,
        _ => FlagPolicy::Strict,
    }
}

/// Default location of a user rule set.
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kotaro");
    config_dir.join("rules.json")
}

/// Resolve the active rule set (priority order):
/// 1. --rules / KOTARO_RULES
/// 2. ~/.config/kotaro/rules.json
/// 3. Built-in current rule set
pub fn load_rule_set(explicit: Option<&Path>) -> Result<RuleSet, String> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = config_path();
            if !default_path.exists() {
                tracing::debug!("no rule set configured, using built-in");
                return Ok(RuleSet::default());
            }
            default_path
        }
    };

    let data = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read rule set {}: {e}", path.display()))?;
    let rules = RuleSet::from_json(&data).map_err(|e| format!("{}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), version = %rules.version, "loaded rule set");
    Ok(rules)
}

pub fn build_engine(explicit: Option<&Path>) -> PatternEngine {
    let rules = load_rule_set(explicit).unwrap_or_else(|e| {
        exit_error(
            &e,
            Some("Check KOTARO_RULES, or dump a valid rule set with `kotaro rules show`."),
        )
    });
    PatternEngine::new(rules).unwrap_or_else(|e| exit_error(&e.to_string(), None))
}

fn is_stdin(path: Option<&Path>) -> bool {
    path.is_none_or(|p| p == Path::new("-"))
}

/// Read the whole input (file, or stdin for None / "-").
pub fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    let mut data = String::new();
    match path {
        Some(p) if !is_stdin(path) => {
            File::open(p)?.read_to_string(&mut data)?;
        }
        _ => {
            std::io::stdin().lock().read_to_string(&mut data)?;
        }
    }
    Ok(data)
}

/// Open the input for line-by-line reading.
pub fn open_lines(path: Option<&Path>) -> std::io::Result<Box<dyn BufRead>> {
    match path {
        Some(p) if !is_stdin(path) => Ok(Box::new(BufReader::new(File::open(p)?))),
        _ => Ok(Box::new(std::io::stdin().lock())),
    }
}
