use kotaro_core::report::{DistributionEntry, DistributionSummary};
use kotaro_core::{
    Classification, DecisionTrace, ErrorReport, Flag, MainAxis, Mood, OracleResponse, PatternId,
    ScoreVector,
};
use utoipa::OpenApi;

use crate::util::exit_error;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kotaro Pattern Engine",
        description = "Wire types of the kotaro CLI: oracle answers in, classifications and distribution reports out."
    ),
    components(schemas(
        OracleResponse,
        Classification,
        ScoreVector,
        PatternId,
        MainAxis,
        Mood,
        Flag,
        DecisionTrace,
        ErrorReport,
        DistributionSummary,
        DistributionEntry,
    ))
)]
pub struct WireDoc;

pub fn run() -> i32 {
    match WireDoc::openapi().to_pretty_json() {
        Ok(doc) => {
            println!("{doc}");
            0
        }
        Err(e) => exit_error(&format!("Failed to render schema: {e}"), None),
    }
}
