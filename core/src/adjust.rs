//! Secondary scoring: flag-driven corrections applied on top of the oracle's
//! base scores before ranking.

use crate::axis::{Axis, ScoreVector};
use crate::error::EngineError;
use crate::flags::FlagSet;
use crate::rules::AdjusterRules;

/// Per-axis delta totals for one request, before capping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Deltas([f64; 5]);

impl Deltas {
    pub fn get(&self, axis: Axis) -> f64 {
        self.0[axis as usize]
    }

    fn add(&mut self, axis: Axis, delta: f64) {
        self.0[axis as usize] += delta;
    }
}

/// Sum the deltas of every rule whose condition holds.
pub fn accumulate(rules: &AdjusterRules, flags: &FlagSet) -> Deltas {
    let mood_discount = rules
        .communication_discount
        .as_ref()
        .filter(|discount| flags.any(&discount.triggers))
        .map(|discount| discount.factor);

    let mut deltas = Deltas::default();
    for rule in rules.rules.iter().filter(|rule| rule.when.matches(flags)) {
        tracing::trace!(rule = %rule.name, "adjustment rule fired");
        for delta in &rule.deltas {
            let value = match mood_discount {
                Some(factor) if delta.axis == Axis::E && delta.delta < 0.0 => delta.delta * factor,
                _ => delta.delta,
            };
            deltas.add(delta.axis, value);
        }
    }
    deltas
}

/// Apply the secondary scoring rules to `base` and clip the result into
/// [0,5]. Only the positive side of each axis total is capped.
pub fn adjust(
    rules: &AdjusterRules,
    base: &ScoreVector,
    flags: &FlagSet,
) -> Result<ScoreVector, EngineError> {
    let deltas = accumulate(rules, flags);
    let mut values = base.to_array();

    for axis in Axis::ALL {
        if axis == Axis::E && !rules.apply_mood_deltas {
            continue;
        }
        values[axis as usize] += deltas.get(axis).min(rules.positive_cap);
    }

    // ScoreVector::new clips into [0,5] and rejects non-finite values.
    let [a, b, c, d, e] = values;
    ScoreVector::new(a, b, c, d, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;
    use crate::rules::RuleSet;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    fn current() -> AdjusterRules {
        RuleSet::v4_6_1().adjuster
    }

    #[test]
    fn casual_moment_boosts_only_a() {
        let base = ScoreVector::new(3.0, 3.0, 3.0, 3.0, 3.0).unwrap();
        let flags = FlagSet::new().with(Flag::CasualMoment);
        let adjusted = adjust(&current(), &base, &flags).unwrap();

        assert!(approx(adjusted.a, 3.9));
        assert_eq!(adjusted.b, 3.0);
        assert_eq!(adjusted.c, 3.0);
        assert_eq!(adjusted.d, 3.0);
        assert_eq!(adjusted.e, 3.0);
    }

    #[test]
    fn talk_to_gets_base_and_boost_on_d() {
        let deltas = accumulate(&current(), &FlagSet::new().with(Flag::TalkTo));
        assert!(approx(deltas.get(Axis::D), 0.7));
        assert_eq!(deltas.get(Axis::A), 0.0);
    }

    #[test]
    fn group_feeling_splits_between_b_and_c() {
        let deltas = accumulate(&current(), &FlagSet::new().with(Flag::GroupFeeling));
        assert!(approx(deltas.get(Axis::B), 0.5));
        assert!(approx(deltas.get(Axis::C), 0.5));
    }

    #[test]
    fn closeup_penalty_applies_without_scene_flags() {
        let deltas = accumulate(&current(), &FlagSet::new().with(Flag::CloseDist));
        assert!(approx(deltas.get(Axis::B), -0.6));
        assert!(approx(deltas.get(Axis::D), 0.3));

        let with_prop = FlagSet::new().with(Flag::CloseDist).with(Flag::PropStrong);
        let deltas = accumulate(&current(), &with_prop);
        assert!(approx(deltas.get(Axis::B), 0.7));
    }

    #[test]
    fn communication_priority_halves_pose_penalty_on_e() {
        let side = FlagSet::new().with(Flag::PoseSideCool);
        assert!(approx(accumulate(&current(), &side).get(Axis::E), -0.5));

        let side_talk = side.with(Flag::TalkTo);
        assert!(approx(accumulate(&current(), &side_talk).get(Axis::E), -0.25));

        let safe_casual = FlagSet::new()
            .with(Flag::PoseSafeTheory)
            .with(Flag::CasualMoment);
        assert!(approx(accumulate(&current(), &safe_casual).get(Axis::E), -0.2));
    }

    #[test]
    fn discount_leaves_positive_e_untouched() {
        let front_talk = FlagSet::new()
            .with(Flag::PoseFrontTrue)
            .with(Flag::TalkTo);
        assert!(approx(accumulate(&current(), &front_talk).get(Axis::E), 0.6));
    }

    #[test]
    fn positive_total_is_capped_negative_is_not() {
        // B: crowd 0.7 + group 0.5 + prop 0.7 + angled 0.2 = 2.1, capped at 1.5
        let flags: FlagSet = [
            Flag::CrowdVenue,
            Flag::GroupFeeling,
            Flag::PropStrong,
            Flag::PoseFrontBodyFaceAngled,
        ]
        .into_iter()
        .collect();
        let base = ScoreVector::new(1.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        let adjusted = adjust(&current(), &base, &flags).unwrap();
        assert!(approx(adjusted.b, 2.5));

        let mut rules = current();
        rules.rules.push(crate::rules::AdjustmentRule {
            name: "heavy_penalty".to_string(),
            when: crate::rules::FlagCondition {
                all: vec![Flag::Nostalgic],
                none: vec![],
            },
            deltas: vec![crate::rules::AxisDelta {
                axis: Axis::C,
                delta: -4.0,
            }],
        });
        let base = ScoreVector::new(5.0, 5.0, 5.0, 5.0, 5.0).unwrap();
        let adjusted = adjust(&rules, &base, &FlagSet::new().with(Flag::Nostalgic)).unwrap();
        assert!(approx(adjusted.c, 1.0));
    }

    #[test]
    fn every_axis_stays_in_range_with_all_flags() {
        let all: FlagSet = Flag::ALL.into_iter().collect();
        for value in [0.0, 2.5, 5.0] {
            let base = ScoreVector::new(value, value, value, value, value).unwrap();
            for rules in [RuleSet::v4_2().adjuster, current()] {
                let adjusted = adjust(&rules, &base, &all).unwrap();
                for axis in Axis::ALL {
                    let v = adjusted.get(axis);
                    assert!((0.0..=5.0).contains(&v), "{axis} = {v}");
                }
            }
        }
    }

    #[test]
    fn builtin_rules_leave_mood_axis_alone() {
        let base = ScoreVector::new(3.0, 3.0, 3.0, 3.0, 3.0).unwrap();
        for rules in [RuleSet::v4_2().adjuster, current()] {
            for pose in [Flag::PoseFrontTrue, Flag::PoseSideCool, Flag::PoseSafeTheory] {
                let adjusted = adjust(&rules, &base, &FlagSet::new().with(pose)).unwrap();
                assert_eq!(adjusted.e, 3.0, "{pose}");
            }
        }
    }

    #[test]
    fn mood_deltas_can_be_switched_on() {
        let mut rules = current();
        rules.apply_mood_deltas = true;
        let base = ScoreVector::new(3.0, 3.0, 3.0, 3.0, 3.0).unwrap();
        let adjusted = adjust(&rules, &base, &FlagSet::new().with(Flag::PoseFrontTrue)).unwrap();
        assert!(approx(adjusted.e, 3.6));

        let adjusted = adjust(&rules, &base, &FlagSet::new().with(Flag::PoseSideCool)).unwrap();
        assert!(approx(adjusted.e, 2.5));
    }

    #[test]
    fn no_flags_is_identity() {
        let base = ScoreVector::new(0.5, 1.5, 2.5, 3.5, 4.5).unwrap();
        assert_eq!(adjust(&current(), &base, &FlagSet::new()).unwrap(), base);
    }
}
