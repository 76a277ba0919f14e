use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::EngineError;
use crate::rules::require_finite;

/// Tertiary style hint for the comment generator, derived from axis E only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Close,
    Normal,
    Polite,
}

impl Mood {
    pub fn from_score(e: f64, thresholds: &MoodThresholds) -> Self {
        if e >= thresholds.close_at {
            Mood::Close
        } else if e <= thresholds.polite_at {
            Mood::Polite
        } else {
            Mood::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Close => "close",
            Mood::Normal => "normal",
            Mood::Polite => "polite",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoodThresholds {
    /// E at or above this reads as close.
    pub close_at: f64,
    /// E at or below this reads as polite.
    pub polite_at: f64,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self {
            close_at: 4.0,
            polite_at: 2.0,
        }
    }
}

impl MoodThresholds {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_finite("mood.close_at", self.close_at)?;
        require_finite("mood.polite_at", self.polite_at)?;
        if self.polite_at >= self.close_at {
            return Err(EngineError::InvalidRuleSet(format!(
                "mood.polite_at ({}) must be below mood.close_at ({})",
                self.polite_at, self.close_at
            )));
        }
        Ok(())
    }
}
