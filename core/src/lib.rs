//! Kotaro pattern engine.
//!
//! Turns the vision oracle's five axis scores and detected flags into one of
//! twelve persona patterns for the comment generator. Everything here is
//! pure and synchronous; a [`PatternEngine`] holds only an immutable
//! [`RuleSet`] and can be shared freely across threads.

pub mod adjust;
pub mod axis;
pub mod catalog;
pub mod decision;
pub mod error;
pub mod flags;
pub mod mood;
pub mod oracle;
pub mod report;
pub mod rules;

pub use axis::{Axis, ScoreVector};
pub use catalog::{PatternCatalogEntry, PatternId};
pub use decision::{DecisionTrace, MainAxis, PatternEngine, PatternResult};
pub use error::{EngineError, ErrorReport};
pub use flags::{Flag, FlagPolicy, FlagSet};
pub use mood::Mood;
pub use oracle::{Classification, OracleResponse};
pub use rules::{RuleSet, RuleSetVersion};
