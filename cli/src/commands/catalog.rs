use clap::Args;
use kotaro_core::PatternCatalogEntry;
use kotaro_core::catalog;
use serde_json::{Value, json};

use crate::util::{EXIT_REJECTED, print_engine_error, print_json};

#[derive(Args)]
pub struct PatternsArgs {
    /// Show a single pattern (e.g. P04)
    #[arg(long)]
    pub id: Option<String>,

    /// Resolve unknown ids to the fallback pattern instead of failing
    #[arg(long)]
    pub fallback: bool,
}

pub fn run(args: PatternsArgs) -> i32 {
    let Some(id) = args.id else {
        let all: Vec<Value> = catalog::entries().map(entry_json).collect();
        print_json(&all);
        return 0;
    };

    if args.fallback {
        print_json(&entry_json(catalog::lookup_or_fallback(&id)));
        return 0;
    }
    match catalog::lookup(&id) {
        Ok(entry) => {
            print_json(&entry_json(entry));
            0
        }
        Err(err) => {
            print_engine_error(&err);
            EXIT_REJECTED
        }
    }
}

fn entry_json(entry: &PatternCatalogEntry) -> Value {
    json!({
        "pattern_id": entry.id,
        "name": entry.name,
        "attack": entry.attack,
        "short_label": entry.short_label,
    })
}
