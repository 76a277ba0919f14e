//! Versioned rule sets.
//!
//! Every constant the adjuster and the decision engine use lives here, so a
//! rule revision is a new `RuleSet` value rather than a code change. Rule
//! sets are plain data: they (de)serialize to JSON and are validated once
//! when an engine is built.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::EngineError;
use crate::flags::{Flag, FlagSet};
use crate::mood::MoodThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSetVersion {
    /// Base secondary scoring, no anti-clustering corrections.
    #[serde(rename = "v4.2")]
    V4_2,
    /// Anti-clustering corrections plus the gated P03 scatter rule.
    #[serde(rename = "v4.6.1")]
    V4_6_1,
    /// Hand-edited or synthetic rule set.
    #[serde(rename = "custom")]
    Custom,
}

impl RuleSetVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSetVersion::V4_2 => "v4.2",
            RuleSetVersion::V4_6_1 => "v4.6.1",
            RuleSetVersion::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleSetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub version: RuleSetVersion,
    pub adjuster: AdjusterRules,
    pub decision: DecisionRules,
    pub mood: MoodThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjusterRules {
    pub rules: Vec<AdjustmentRule>,
    /// Upper bound on the cumulative net delta of one axis. Negative
    /// cumulative deltas are not bounded.
    pub positive_cap: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_discount: Option<CommunicationDiscount>,
    /// Whether the E accumulator is added to the E score. Off in the
    /// built-in rule sets, which read mood off the raw E score.
    pub apply_mood_deltas: bool,
}

/// A secondary scoring rule: when its condition holds, each delta is added
/// to its axis accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentRule {
    pub name: String,
    pub when: FlagCondition,
    pub deltas: Vec<AxisDelta>,
}

/// Holds when every `all` flag is set and no `none` flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagCondition {
    pub all: Vec<Flag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub none: Vec<Flag>,
}

impl FlagCondition {
    pub fn matches(&self, flags: &FlagSet) -> bool {
        flags.all(&self.all) && !flags.any(&self.none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisDelta {
    pub axis: Axis,
    pub delta: f64,
}

/// Communication priority: while any trigger flag is set, negative deltas
/// on E are scaled by `factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommunicationDiscount {
    pub triggers: Vec<Flag>,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionRules {
    /// Tie order for exactly equal scores.
    pub tie_priority: [Axis; 4],
    /// A leading score at or below this is a flat input.
    pub flat_threshold: f64,
    /// Flat inputs with B at or above this are scene-flat.
    pub flat_scene_min_b: f64,
    /// Top-two gap at or below this is a close contest.
    pub close_margin: f64,
    /// Close-contest overrides, checked in order.
    pub overrides: Vec<TieOverride>,
    /// B branch: (B - A) at or below this selects the scene pattern.
    pub scene_margin: f64,
    /// A branch scatter to P03. Absent means the rule never fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scatter: Option<ScatterGate>,
}

/// In a close contest, the first override with any flag set forces `axis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TieOverride {
    pub any: Vec<Flag>,
    pub axis: Axis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScatterGate {
    pub min_b: f64,
    pub max_a_minus_b: f64,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::v4_6_1()
    }
}

impl RuleSet {
    /// The current rule set.
    pub fn v4_6_1() -> Self {
        let mut rules = base_rules(0.2);
        rules.extend([
            rule(
                "closeup_b_penalty",
                &[Flag::CloseDist],
                &[Flag::CrowdVenue, Flag::PropStrong, Flag::GroupFeeling],
                &[(Axis::B, -0.6)],
            ),
            rule("talk_d_boost", &[Flag::TalkTo], &[], &[(Axis::D, 0.2)]),
            rule("casual_a_boost", &[Flag::CasualMoment], &[], &[(Axis::A, 0.2)]),
        ]);

        Self {
            version: RuleSetVersion::V4_6_1,
            adjuster: AdjusterRules {
                rules,
                positive_cap: 1.5,
                communication_discount: Some(CommunicationDiscount {
                    triggers: vec![Flag::TalkTo, Flag::CasualMoment],
                    factor: 0.5,
                }),
                apply_mood_deltas: false,
            },
            decision: DecisionRules {
                scatter: Some(ScatterGate {
                    min_b: 4.2,
                    max_a_minus_b: 0.6,
                }),
                ..base_decision()
            },
            mood: MoodThresholds::default(),
        }
    }

    /// Secondary scoring before the anti-clustering corrections.
    pub fn v4_2() -> Self {
        Self {
            version: RuleSetVersion::V4_2,
            adjuster: AdjusterRules {
                rules: base_rules(0.6),
                positive_cap: 1.5,
                communication_discount: Some(CommunicationDiscount {
                    triggers: vec![Flag::TalkTo, Flag::CasualMoment],
                    factor: 0.5,
                }),
                apply_mood_deltas: false,
            },
            decision: base_decision(),
            mood: MoodThresholds::default(),
        }
    }

    pub fn builtin(version: RuleSetVersion) -> Option<Self> {
        match version {
            RuleSetVersion::V4_2 => Some(Self::v4_2()),
            RuleSetVersion::V4_6_1 => Some(Self::v4_6_1()),
            RuleSetVersion::Custom => None,
        }
    }

    /// Parse and validate a rule set from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let rules: RuleSet =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidRuleSet(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let adjuster = &self.adjuster;
        require_non_negative("adjuster.positive_cap", adjuster.positive_cap)?;

        if let Some(discount) = &adjuster.communication_discount {
            if !(0.0..=1.0).contains(&discount.factor) {
                return Err(invalid(format!(
                    "communication_discount.factor must be within [0, 1], got {}",
                    discount.factor
                )));
            }
            if discount.triggers.is_empty() {
                return Err(invalid("communication_discount.triggers must not be empty"));
            }
        }

        for rule in &adjuster.rules {
            if rule.when.all.is_empty() {
                return Err(invalid(format!(
                    "rule '{}' has no required flags and would always fire",
                    rule.name
                )));
            }
            if rule.when.all.iter().any(|flag| rule.when.none.contains(flag)) {
                return Err(invalid(format!(
                    "rule '{}' requires and excludes the same flag",
                    rule.name
                )));
            }
            if rule.deltas.is_empty() {
                return Err(invalid(format!("rule '{}' has no deltas", rule.name)));
            }
            for delta in &rule.deltas {
                if !delta.delta.is_finite() {
                    return Err(invalid(format!(
                        "rule '{}' has a non-finite delta for axis {}",
                        rule.name, delta.axis
                    )));
                }
            }
        }

        let decision = &self.decision;
        let mut seen = decision.tie_priority.to_vec();
        seen.sort();
        seen.dedup();
        if seen != Axis::PRIMARY {
            return Err(invalid("decision.tie_priority must be a permutation of A, B, C, D"));
        }
        require_non_negative("decision.flat_threshold", decision.flat_threshold)?;
        require_non_negative("decision.flat_scene_min_b", decision.flat_scene_min_b)?;
        require_non_negative("decision.close_margin", decision.close_margin)?;
        require_finite("decision.scene_margin", decision.scene_margin)?;
        for tie_override in &decision.overrides {
            if tie_override.any.is_empty() {
                return Err(invalid("decision.overrides entries need at least one flag"));
            }
            if !tie_override.axis.is_primary() {
                return Err(invalid("decision.overrides may only force axes A to D"));
            }
        }
        if let Some(scatter) = &decision.scatter {
            require_finite("decision.scatter.min_b", scatter.min_b)?;
            require_finite("decision.scatter.max_a_minus_b", scatter.max_a_minus_b)?;
        }

        self.mood.validate()
    }
}

fn base_rules(pose_safe_c: f64) -> Vec<AdjustmentRule> {
    vec![
        rule("casual", &[Flag::CasualMoment], &[], &[(Axis::A, 0.7)]),
        rule("nostalgic", &[Flag::Nostalgic], &[], &[(Axis::A, 0.5)]),
        rule("crowd", &[Flag::CrowdVenue], &[], &[(Axis::B, 0.7)]),
        rule(
            "group",
            &[Flag::GroupFeeling],
            &[],
            &[(Axis::B, 0.5), (Axis::C, 0.5)],
        ),
        rule("talk", &[Flag::TalkTo], &[], &[(Axis::D, 0.5)]),
        rule("close", &[Flag::CloseDist], &[], &[(Axis::D, 0.3)]),
        rule("costume", &[Flag::CostumeStrong], &[], &[(Axis::C, 0.7)]),
        rule(
            "action",
            &[Flag::ActPointOrSalute],
            &[],
            &[(Axis::C, 0.5), (Axis::D, 0.3)],
        ),
        rule("prop", &[Flag::PropStrong], &[], &[(Axis::B, 0.7)]),
        rule(
            "pose_safe",
            &[Flag::PoseSafeTheory],
            &[],
            &[(Axis::C, pose_safe_c), (Axis::E, -0.4)],
        ),
        rule(
            "pose_side",
            &[Flag::PoseSideCool],
            &[],
            &[(Axis::C, 0.7), (Axis::E, -0.5)],
        ),
        rule(
            "pose_front",
            &[Flag::PoseFrontTrue],
            &[],
            &[(Axis::E, 0.6), (Axis::D, 0.2), (Axis::A, 0.2)],
        ),
        rule(
            "pose_angled",
            &[Flag::PoseFrontBodyFaceAngled],
            &[],
            &[(Axis::A, 0.3), (Axis::B, 0.2)],
        ),
    ]
}

fn base_decision() -> DecisionRules {
    DecisionRules {
        tie_priority: Axis::PRIMARY,
        flat_threshold: 2.0,
        flat_scene_min_b: 2.0,
        close_margin: 0.3,
        overrides: vec![
            TieOverride {
                any: vec![Flag::CostumeStrong],
                axis: Axis::C,
            },
            TieOverride {
                any: vec![Flag::ActPointOrSalute],
                axis: Axis::D,
            },
            TieOverride {
                any: vec![Flag::CasualMoment],
                axis: Axis::A,
            },
            TieOverride {
                any: vec![Flag::CrowdVenue, Flag::PropStrong, Flag::GroupFeeling],
                axis: Axis::B,
            },
        ],
        scene_margin: 0.5,
        scatter: None,
    }
}

fn rule(name: &str, all: &[Flag], none: &[Flag], deltas: &[(Axis, f64)]) -> AdjustmentRule {
    AdjustmentRule {
        name: name.to_string(),
        when: FlagCondition {
            all: all.to_vec(),
            none: none.to_vec(),
        },
        deltas: deltas
            .iter()
            .map(|&(axis, delta)| AxisDelta { axis, delta })
            .collect(),
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidRuleSet(message.into())
}

pub(crate) fn require_finite(field: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be finite, got {value}")))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), EngineError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(format!("{field} must not be negative, got {value}")));
    }
    Ok(())
}
