use std::path::PathBuf;

use clap::Args;
use kotaro_core::{FlagPolicy, OracleResponse, PatternEngine};

use crate::util::{EXIT_REJECTED, exit_error, print_engine_error, print_json, read_input};

#[derive(Args)]
pub struct ClassifyArgs {
    /// Oracle answer JSON ({"scores": {...}, "flags": {...}}). Reads stdin when omitted or "-".
    pub input: Option<PathBuf>,
}

pub fn run(engine: &PatternEngine, policy: FlagPolicy, args: ClassifyArgs) -> i32 {
    let data = read_input(args.input.as_deref())
        .unwrap_or_else(|e| exit_error(&format!("Failed to read input: {e}"), None));
    let response: OracleResponse = serde_json::from_str(&data).unwrap_or_else(|e| {
        exit_error(
            &format!("Input is not an oracle answer: {e}"),
            Some("Expected a JSON object with optional 'scores' and 'flags' maps."),
        )
    });

    match engine.classify(&response, policy) {
        Ok(classification) => {
            tracing::info!(
                pattern = %classification.pattern_id,
                main_axis = %classification.main_axis,
                mood = %classification.mood,
                "classified"
            );
            print_json(&classification);
            0
        }
        Err(err) => {
            tracing::warn!(error = %err, "classification rejected");
            print_engine_error(&err);
            EXIT_REJECTED
        }
    }
}
