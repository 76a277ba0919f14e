use std::io::BufRead;
use std::path::PathBuf;

use clap::Args;
use kotaro_core::report::{DEFAULT_CLUSTER_THRESHOLD, PatternDistribution};
use kotaro_core::{FlagPolicy, OracleResponse, PatternEngine};

use crate::util::{exit_error, open_lines, print_json};

#[derive(Args)]
pub struct BenchArgs {
    /// JSON Lines file with one oracle answer per line. Reads stdin when omitted or "-".
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json", value_parser = ["json", "markdown"])]
    pub format: String,

    /// Share above which one pattern is reported as clustered
    #[arg(long, default_value_t = DEFAULT_CLUSTER_THRESHOLD)]
    pub cluster_threshold: f64,
}

pub fn run(engine: &PatternEngine, policy: FlagPolicy, args: BenchArgs) -> i32 {
    if !(0.0..=1.0).contains(&args.cluster_threshold) {
        exit_error("--cluster-threshold must be within [0, 1]", None);
    }
    let reader = open_lines(args.input.as_deref())
        .unwrap_or_else(|e| exit_error(&format!("Failed to open input: {e}"), None));
    let dist = tally(engine, policy, reader)
        .unwrap_or_else(|e| exit_error(&format!("Failed to read input: {e}"), None));

    let summary = dist.summary(args.cluster_threshold, chrono::Utc::now());
    for id in &summary.clustered {
        tracing::warn!(pattern = %id, share = dist.share(*id), "pattern distribution is clustered");
    }

    if args.format == "markdown" {
        print!("{}", summary.to_markdown());
    } else {
        print_json(&summary);
    }
    0
}

/// Classify every non-blank line. Lines that fail to parse or classify are
/// counted as failures and skipped.
pub fn tally(
    engine: &PatternEngine,
    policy: FlagPolicy,
    reader: impl BufRead,
) -> std::io::Result<PatternDistribution> {
    let mut dist = PatternDistribution::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = serde_json::from_str::<OracleResponse>(&line)
            .map_err(|e| e.to_string())
            .and_then(|response| {
                engine
                    .classify(&response, policy)
                    .map_err(|e| e.to_string())
            });
        match outcome {
            Ok(classification) => dist.record(classification.pattern_id, classification.main_axis),
            Err(error) => {
                tracing::warn!(line = index + 1, %error, "skipping input line");
                dist.record_failure();
            }
        }
    }
    Ok(dist)
}
