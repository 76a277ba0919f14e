use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::axis::ScoreVector;
use crate::catalog::PatternId;
use crate::decision::{DecisionTrace, MainAxis, PatternEngine};
use crate::error::EngineError;
use crate::flags::{Flag, FlagPolicy, FlagSet};
use crate::mood::Mood;
use crate::rules::RuleSetVersion;

/// Raw answer from the vision oracle. The oracle is untrusted: both maps
/// may be missing or partial, values may be strings, and flag keys may use
/// the prefixed prompt names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OracleResponse {
    /// Axis scores, keys "A".."E", each expected in [0,5]. Missing axes read as 3.0.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub scores: BTreeMap<String, serde_json::Value>,
    /// Detected flags; missing flags read as false.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub flags: BTreeMap<String, serde_json::Value>,
}

/// Everything the comment generator needs for one image.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Classification {
    pub pattern_id: PatternId,
    /// Display name of the pattern
    pub pattern_name: String,
    /// Rhetorical angle the comment should take
    pub attack: String,
    pub short_label: String,
    pub main_axis: MainAxis,
    /// Ranked primary axes joined with '>', e.g. "A>B>C>D"
    pub ranked: String,
    /// Scores after normalization, before secondary scoring
    pub base_scores: ScoreVector,
    /// Scores after secondary scoring, rounded to one decimal
    pub adjusted_scores: ScoreVector,
    pub mood: Mood,
    /// Flags that were set, canonical names
    pub detected_flags: Vec<Flag>,
    pub trace: DecisionTrace,
    #[schema(value_type = String)]
    pub rule_set: RuleSetVersion,
}

impl PatternEngine {
    /// Full pipeline for one oracle answer: normalize, parse flags, adjust,
    /// decide and attach catalog metadata.
    pub fn classify(
        &self,
        input: &OracleResponse,
        policy: FlagPolicy,
    ) -> Result<Classification, EngineError> {
        let base = ScoreVector::from_oracle(&input.scores)?;
        let flags = FlagSet::from_oracle(&input.flags, policy)?;
        let adjusted = self.adjust(&base, &flags)?;
        let result = self.decide(&adjusted, &flags);
        let entry = result.pattern_id.entry();

        Ok(Classification {
            pattern_id: result.pattern_id,
            pattern_name: entry.name.to_string(),
            attack: entry.attack.to_string(),
            short_label: entry.short_label.to_string(),
            main_axis: result.main_axis,
            ranked: result.ranking_label(),
            base_scores: base,
            adjusted_scores: adjusted.rounded(),
            mood: result.mood,
            detected_flags: flags.iter().collect(),
            trace: result.trace,
            rule_set: self.rules().version,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rules::RuleSet;

    fn response(value: serde_json::Value) -> OracleResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classifies_prompt_shaped_answer() {
        let input = response(json!({
            "scores": {"A": 3, "B": 4, "C": 2, "D": 1, "E": 5},
            "flags": {
                "E10_casual_moment": true,
                "E09_nostalgic": false,
                "E07_08_crowd_venue": false,
                "E14_group_feeling": false,
                "E06_talk_to": true,
                "E01_close_dist": true,
                "C07_costume_strong": false,
                "ACT_action_pose": false,
                "B02_objects_strong": false,
                "pose_safe_theory": true,
                "pose_front_true": false,
                "pose_side_cool": false,
                "pose_front_body_face_angled": false
            }
        }));

        let out = PatternEngine::default()
            .classify(&input, FlagPolicy::Strict)
            .unwrap();

        // A: 3 + 0.7 + 0.2 = 3.9, B: 4 - 0.6 = 3.4, gap 0.5 -> main A.
        // Safe pose blocks strong intimacy; B below the scatter gate -> P01.
        assert_eq!(out.adjusted_scores.a, 3.9);
        assert_eq!(out.adjusted_scores.b, 3.4);
        assert_eq!(out.main_axis, MainAxis::A);
        assert_eq!(out.pattern_id, PatternId::P01);
        assert_eq!(out.pattern_name, "余韻 (Soft)");
        assert_eq!(out.ranked, "A>B>C>D");
        assert_eq!(out.mood, Mood::Close);
        assert_eq!(
            out.detected_flags,
            vec![
                Flag::CasualMoment,
                Flag::TalkTo,
                Flag::CloseDist,
                Flag::PoseSafeTheory
            ]
        );
        assert_eq!(out.rule_set, RuleSetVersion::V4_6_1);
    }

    #[test]
    fn mood_reads_the_unadjusted_e_score() {
        let engine = PatternEngine::default();

        let front = response(json!({
            "scores": {"A": 5, "B": 1, "C": 1, "D": 1, "E": 3.5},
            "flags": {"pose_front_true": true}
        }));
        let out = engine.classify(&front, FlagPolicy::Strict).unwrap();
        assert_eq!(out.adjusted_scores.e, 3.5);
        assert_eq!(out.mood, Mood::Normal);

        let side = response(json!({
            "scores": {"A": 5, "B": 1, "C": 1, "D": 1, "E": 2.3},
            "flags": {"pose_side_cool": true}
        }));
        let out = engine.classify(&side, FlagPolicy::Strict).unwrap();
        assert_eq!(out.adjusted_scores.e, 2.3);
        assert_eq!(out.mood, Mood::Normal);
    }

    #[test]
    fn empty_answer_uses_neutral_defaults() {
        let out = PatternEngine::default()
            .classify(&OracleResponse::default(), FlagPolicy::Strict)
            .unwrap();
        // All 3.0: A wins the tie and the contest has no override.
        assert_eq!(out.base_scores, ScoreVector::default());
        assert_eq!(out.main_axis, MainAxis::A);
        assert!(out.trace.close_contest);
        assert_eq!(out.pattern_id, PatternId::P01);
        assert_eq!(out.mood, Mood::Normal);
    }

    #[test]
    fn missing_sections_deserialize() {
        let input = response(json!({"scores": {"A": 1}}));
        assert!(input.flags.is_empty());
    }

    #[test]
    fn errors_propagate() {
        let engine = PatternEngine::default();
        let bad_score = response(json!({"scores": {"B": "lots"}}));
        assert!(matches!(
            engine.classify(&bad_score, FlagPolicy::Lenient),
            Err(EngineError::InvalidScore { .. })
        ));

        let bad_flag = response(json!({"flags": {"sparkle": true}}));
        assert!(matches!(
            engine.classify(&bad_flag, FlagPolicy::Strict),
            Err(EngineError::UnknownFlag(_))
        ));
        assert!(engine.classify(&bad_flag, FlagPolicy::Lenient).is_ok());
    }

    #[test]
    fn rule_set_version_is_reported() {
        let engine = PatternEngine::new(RuleSet::v4_2()).unwrap();
        let out = engine
            .classify(&OracleResponse::default(), FlagPolicy::Strict)
            .unwrap();
        assert_eq!(out.rule_set, RuleSetVersion::V4_2);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["rule_set"], "v4.2");
        assert_eq!(json["main_axis"], "A");
        assert_eq!(json["pattern_id"], "P01");
    }
}
