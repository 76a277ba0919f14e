//! Pattern decision engine.
//!
//! Maps an adjusted score vector and a flag set onto one of the twelve
//! patterns:
//!
//! 1. rank A..D (ties by the rule set's priority order),
//! 2. flat inputs (leader at or below the flat threshold) go to P11/P12,
//! 3. close contests let a categorical flag pick the main axis,
//! 4. each main axis branches into its own small set of patterns,
//! 5. the mood modifier is read off axis E.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::adjust;
use crate::axis::{Axis, ScoreVector, ranking_label};
use crate::catalog::PatternId;
use crate::error::EngineError;
use crate::flags::{Flag, FlagSet};
use crate::mood::Mood;
use crate::rules::{DecisionRules, RuleSet};

/// Main axis of a decision; `None` for flat inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
pub enum MainAxis {
    A,
    B,
    C,
    D,
    #[serde(rename = "none")]
    None,
}

impl MainAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            MainAxis::A => "A",
            MainAxis::B => "B",
            MainAxis::C => "C",
            MainAxis::D => "D",
            MainAxis::None => "none",
        }
    }
}

impl From<Axis> for MainAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::A => MainAxis::A,
            Axis::B => MainAxis::B,
            Axis::C => MainAxis::C,
            Axis::D => MainAxis::D,
            // E never ranks; validated rule sets cannot force it either.
            Axis::E => MainAxis::None,
        }
    }
}

impl fmt::Display for MainAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the engine got to its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct DecisionTrace {
    /// Leader at or below the flat threshold.
    pub flat: bool,
    /// Top two within the close-contest margin.
    pub close_contest: bool,
    /// Flag that overrode the score leader in a close contest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_flag: Option<Flag>,
    /// Derived intimacy signal; only evaluated on the A branch.
    pub strong_intimacy: bool,
}

/// Outcome of one classification. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PatternResult {
    pub pattern_id: PatternId,
    pub main_axis: MainAxis,
    /// Permutation of A..D, best first.
    pub ranked_axes: Vec<Axis>,
    pub adjusted_scores: ScoreVector,
    pub mood: Mood,
    pub trace: DecisionTrace,
}

impl PatternResult {
    /// Ranking joined for display, e.g. `"B>A>C>D"`.
    pub fn ranking_label(&self) -> String {
        ranking_label(&self.ranked_axes)
    }
}

/// Stateless engine bound to one immutable rule set. Cheap to share across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct PatternEngine {
    rules: RuleSet,
}

impl PatternEngine {
    pub fn new(rules: RuleSet) -> Result<Self, EngineError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Secondary scoring: apply flag-driven deltas and clip to [0,5].
    pub fn adjust(&self, base: &ScoreVector, flags: &FlagSet) -> Result<ScoreVector, EngineError> {
        adjust::adjust(&self.rules.adjuster, base, flags)
    }

    /// Pick the pattern for already adjusted `scores`.
    pub fn decide(&self, scores: &ScoreVector, flags: &FlagSet) -> PatternResult {
        let rules = &self.rules.decision;
        let ranked = scores.rank(&rules.tie_priority);
        let (top1, top2) = (ranked[0], ranked[1]);

        let mut trace = DecisionTrace::default();
        let main_axis = if top1.score <= rules.flat_threshold {
            trace.flat = true;
            MainAxis::None
        } else if top1.score - top2.score <= rules.close_margin {
            trace.close_contest = true;
            match resolve_close_contest(rules, flags) {
                Some((flag, axis)) => {
                    trace.override_flag = Some(flag);
                    MainAxis::from(axis)
                }
                None => MainAxis::from(top1.axis),
            }
        } else {
            MainAxis::from(top1.axis)
        };

        let pattern_id = match main_axis {
            MainAxis::None => flat_branch(rules, scores, flags),
            MainAxis::A => {
                let (pattern, strong_intimacy) = expression_branch(rules, scores, flags);
                trace.strong_intimacy = strong_intimacy;
                pattern
            }
            MainAxis::B => composition_branch(rules, scores, flags),
            MainAxis::C => asynchrony_branch(flags),
            MainAxis::D => warmth_branch(scores, flags),
        };

        let result = PatternResult {
            pattern_id,
            main_axis,
            ranked_axes: ranked.iter().map(|r| r.axis).collect(),
            adjusted_scores: *scores,
            mood: Mood::from_score(scores.e, &self.rules.mood),
            trace,
        };

        tracing::debug!(
            pattern = %result.pattern_id,
            main = %result.main_axis,
            ranking = %result.ranking_label(),
            mood = %result.mood,
            flat = trace.flat,
            close_contest = trace.close_contest,
            "pattern decided"
        );

        result
    }
}

/// First override whose flags are present, with the flag that triggered it.
fn resolve_close_contest(rules: &DecisionRules, flags: &FlagSet) -> Option<(Flag, Axis)> {
    rules.overrides.iter().find_map(|tie_override| {
        tie_override
            .any
            .iter()
            .find(|flag| flags.contains(**flag))
            .map(|flag| (*flag, tie_override.axis))
    })
}

fn has_scene_flag(flags: &FlagSet) -> bool {
    flags.any(&[Flag::CrowdVenue, Flag::PropStrong, Flag::GroupFeeling])
}

fn flat_branch(rules: &DecisionRules, scores: &ScoreVector, flags: &FlagSet) -> PatternId {
    if scores.b >= rules.flat_scene_min_b || has_scene_flag(flags) {
        PatternId::P12
    } else {
        PatternId::P11
    }
}

/// A branch. Returns the pattern and the derived strong-intimacy signal.
fn expression_branch(
    rules: &DecisionRules,
    scores: &ScoreVector,
    flags: &FlagSet,
) -> (PatternId, bool) {
    let talk = flags.contains(Flag::TalkTo);
    let casual = flags.contains(Flag::CasualMoment);
    let pose_safe = flags.contains(Flag::PoseSafeTheory);
    let communicative = talk && casual;

    let strong_intimacy = flags.contains(Flag::PoseFrontTrue)
        || (talk && flags.contains(Flag::CloseDist) && !pose_safe);

    if communicative && strong_intimacy {
        return (PatternId::P01, strong_intimacy);
    }

    let explicit_perform = flags.any(&[
        Flag::CostumeStrong,
        Flag::ActPointOrSalute,
        Flag::PoseSideCool,
    ]);
    if explicit_perform || (pose_safe && !communicative) {
        return (PatternId::P02, strong_intimacy);
    }

    let scatter = rules.scatter.is_some_and(|gate| {
        pose_safe
            && communicative
            && !strong_intimacy
            && !flags.any(&[
                Flag::CrowdVenue,
                Flag::GroupFeeling,
                Flag::CostumeStrong,
                Flag::ActPointOrSalute,
            ])
            && scores.b >= gate.min_b
            && scores.a - scores.b <= gate.max_a_minus_b
    });

    if scatter {
        (PatternId::P03, strong_intimacy)
    } else {
        (PatternId::P01, strong_intimacy)
    }
}

/// B branch.
fn composition_branch(rules: &DecisionRules, scores: &ScoreVector, flags: &FlagSet) -> PatternId {
    if flags.any(&[Flag::CrowdVenue, Flag::GroupFeeling]) {
        PatternId::P03
    } else if flags.contains(Flag::PropStrong) {
        PatternId::P04
    } else if scores.b - scores.a <= rules.scene_margin {
        PatternId::P03
    } else {
        PatternId::P04
    }
}

/// C branch.
fn asynchrony_branch(flags: &FlagSet) -> PatternId {
    if flags.contains(Flag::GroupFeeling) {
        PatternId::P07
    } else if flags.contains(Flag::CostumeStrong) {
        PatternId::P06
    } else {
        PatternId::P05
    }
}

/// D branch.
fn warmth_branch(scores: &ScoreVector, flags: &FlagSet) -> PatternId {
    if flags.contains(Flag::ActPointOrSalute) {
        PatternId::P10
    } else if scores.a >= scores.b {
        PatternId::P09
    } else {
        PatternId::P08
    }
}
