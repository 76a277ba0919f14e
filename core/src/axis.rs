use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::EngineError;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 5.0;
/// Value used for axes the oracle did not report.
pub const NEUTRAL_SCORE: f64 = 3.0;

/// One of the five signal dimensions scored by the vision oracle.
///
/// A..D take part in ranking; E only drives the mood modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Axis {
    /// Expression lingering
    A,
    /// Gaze ambiguity / composition
    B,
    /// Emotional asynchrony between face regions
    C,
    /// Warmth / tension balance
    D,
    /// Closeness / approachability
    E,
}

impl Axis {
    pub const ALL: [Axis; 5] = [Axis::A, Axis::B, Axis::C, Axis::D, Axis::E];
    pub const PRIMARY: [Axis; 4] = [Axis::A, Axis::B, Axis::C, Axis::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::A => "A",
            Axis::B => "B",
            Axis::C => "C",
            Axis::D => "D",
            Axis::E => "E",
        }
    }

    pub fn is_primary(&self) -> bool {
        !matches!(self, Axis::E)
    }

    fn index(self) -> usize {
        self as usize
    }

    fn from_key(key: &str) -> Option<Axis> {
        match key.trim() {
            k if k.eq_ignore_ascii_case("a") => Some(Axis::A),
            k if k.eq_ignore_ascii_case("b") => Some(Axis::B),
            k if k.eq_ignore_ascii_case("c") => Some(Axis::C),
            k if k.eq_ignore_ascii_case("d") => Some(Axis::D),
            k if k.eq_ignore_ascii_case("e") => Some(Axis::E),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five-axis score vector. Values are in [0,5] whenever the vector was
/// built through [`ScoreVector::new`] or [`ScoreVector::from_oracle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoreVector {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "E")]
    pub e: f64,
}

impl Default for ScoreVector {
    fn default() -> Self {
        Self::splat(NEUTRAL_SCORE)
    }
}

impl ScoreVector {
    /// Build a vector from raw values, clipping each into [0,5].
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64) -> Result<Self, EngineError> {
        let mut values = [a, b, c, d, e];
        for axis in Axis::ALL {
            values[axis.index()] = clip_score(axis, values[axis.index()])?;
        }
        Ok(Self::from_array(values))
    }

    fn splat(value: f64) -> Self {
        Self::from_array([value; 5])
    }

    fn from_array(values: [f64; 5]) -> Self {
        Self {
            a: values[0],
            b: values[1],
            c: values[2],
            d: values[3],
            e: values[4],
        }
    }

    pub(crate) fn to_array(self) -> [f64; 5] {
        [self.a, self.b, self.c, self.d, self.e]
    }

    pub fn get(&self, axis: Axis) -> f64 {
        self.to_array()[axis.index()]
    }

    /// Best-effort coercion of the untrusted `scores` mapping returned by the
    /// vision oracle. Missing or null axes fall back to [`NEUTRAL_SCORE`].
    pub fn from_oracle(raw: &BTreeMap<String, serde_json::Value>) -> Result<Self, EngineError> {
        let mut values = [NEUTRAL_SCORE; 5];

        for (key, value) in raw {
            let Some(axis) = Axis::from_key(key) else {
                tracing::debug!(key = %key, "ignoring unknown score key");
                continue;
            };
            let Some(number) = coerce_score(axis, value)? else {
                continue;
            };
            if number.is_finite() && !(MIN_SCORE..=MAX_SCORE).contains(&number) {
                tracing::warn!(axis = %axis, value = number, "oracle score out of range; clipping");
            }
            values[axis.index()] = clip_score(axis, number)?;
        }

        Ok(Self::from_array(values))
    }

    /// Rank the primary axes by descending score, breaking exact ties by the
    /// position of each axis in `priority`.
    pub fn rank(&self, priority: &[Axis; 4]) -> [RankedAxis; 4] {
        let mut ranked = (*priority).map(|axis| RankedAxis {
            axis,
            score: self.get(axis),
        });
        // `priority` order is the insertion order, so a stable sort on score
        // alone keeps the priority for ties.
        ranked.sort_by(|x, y| y.score.total_cmp(&x.score));
        ranked
    }

    /// Copy with every value rounded to one decimal, for display.
    pub fn rounded(&self) -> Self {
        Self::from_array(self.to_array().map(|v| (v * 10.0).round() / 10.0))
    }
}

/// An axis paired with its score in a ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedAxis {
    pub axis: Axis,
    pub score: f64,
}

/// Join a ranking for display, e.g. `"A>B>C>D"`.
pub fn ranking_label(axes: &[Axis]) -> String {
    axes.iter().map(Axis::as_str).collect::<Vec<_>>().join(">")
}

fn clip_score(axis: Axis, value: f64) -> Result<f64, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::InvalidScore {
            axis,
            reason: format!("value {value} is not finite"),
        });
    }
    Ok(value.clamp(MIN_SCORE, MAX_SCORE))
}

fn coerce_score(axis: Axis, value: &serde_json::Value) -> Result<Option<f64>, EngineError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| EngineError::InvalidScore {
            axis,
            reason: format!("number {n} is not representable"),
        }),
        serde_json::Value::String(s) => {
            s.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| EngineError::InvalidScore {
                    axis,
                    reason: format!("'{s}' is not a number"),
                })
        }
        other => Err(EngineError::InvalidScore {
            axis,
            reason: format!("expected a number, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    const DEFAULT_PRIORITY: [Axis; 4] = [Axis::A, Axis::B, Axis::C, Axis::D];

    #[test]
    fn missing_axes_default_to_neutral() {
        let scores = ScoreVector::from_oracle(&raw(json!({"A": 4.5}))).unwrap();
        assert_eq!(scores.a, 4.5);
        assert_eq!(scores.b, NEUTRAL_SCORE);
        assert_eq!(scores.e, NEUTRAL_SCORE);
    }

    #[test]
    fn numeric_strings_and_lowercase_keys_are_accepted() {
        let scores = ScoreVector::from_oracle(&raw(json!({"b": "4", "C": null}))).unwrap();
        assert_eq!(scores.b, 4.0);
        assert_eq!(scores.c, NEUTRAL_SCORE);
    }

    #[test]
    fn out_of_range_values_are_clipped() {
        let scores = ScoreVector::from_oracle(&raw(json!({"A": 9, "D": -2}))).unwrap();
        assert_eq!(scores.a, MAX_SCORE);
        assert_eq!(scores.d, MIN_SCORE);
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = ScoreVector::from_oracle(&raw(json!({"C": "high"}))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidScore { axis: Axis::C, .. }));

        let err = ScoreVector::from_oracle(&raw(json!({"E": true}))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidScore { axis: Axis::E, .. }));
    }

    #[test]
    fn nan_is_rejected() {
        let err = ScoreVector::from_oracle(&raw(json!({"A": "NaN"}))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidScore { axis: Axis::A, .. }));
        assert!(ScoreVector::new(1.0, f64::INFINITY, 1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn unknown_score_keys_are_ignored() {
        let scores = ScoreVector::from_oracle(&raw(json!({"F": 1, "A": 2}))).unwrap();
        assert_eq!(scores.a, 2.0);
    }

    #[test]
    fn ranking_is_strict_descending_without_ties() {
        let scores = ScoreVector::new(1.0, 4.0, 2.5, 3.0, 0.0).unwrap();
        let ranked = scores.rank(&DEFAULT_PRIORITY);
        let axes: Vec<Axis> = ranked.iter().map(|r| r.axis).collect();
        assert_eq!(axes, vec![Axis::B, Axis::D, Axis::C, Axis::A]);
        assert!(ranked.windows(2).all(|w| w[0].score > w[1].score));
    }

    #[test]
    fn exact_ties_follow_priority_order() {
        let scores = ScoreVector::new(2.0, 3.0, 3.0, 3.0, 3.0).unwrap();
        let axes: Vec<Axis> = scores.rank(&DEFAULT_PRIORITY).iter().map(|r| r.axis).collect();
        assert_eq!(axes, vec![Axis::B, Axis::C, Axis::D, Axis::A]);

        let flat = ScoreVector::new(1.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        let axes: Vec<Axis> = flat.rank(&DEFAULT_PRIORITY).iter().map(|r| r.axis).collect();
        assert_eq!(axes, DEFAULT_PRIORITY.to_vec());
    }

    #[test]
    fn custom_priority_changes_tie_order() {
        let flat = ScoreVector::new(1.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        let priority = [Axis::B, Axis::C, Axis::D, Axis::A];
        let axes: Vec<Axis> = flat.rank(&priority).iter().map(|r| r.axis).collect();
        assert_eq!(axes, priority.to_vec());
    }

    #[test]
    fn ranking_label_joins_with_gt() {
        assert_eq!(ranking_label(&DEFAULT_PRIORITY), "A>B>C>D");
    }

    #[test]
    fn rounded_keeps_one_decimal() {
        let scores = ScoreVector::new(3.8999999, 1.04, 0.0, 5.0, 2.25).unwrap();
        let rounded = scores.rounded();
        assert_eq!(rounded.a, 3.9);
        assert_eq!(rounded.b, 1.0);
    }
}
