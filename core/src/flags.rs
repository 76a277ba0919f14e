use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::EngineError;

/// Closed vocabulary of boolean signals detected by the vision oracle.
///
/// Canonical names are snake_case. The oracle prompt uses prefixed keys
/// (`E10_casual_moment`, `ACT_action_pose`, ...); those are accepted as
/// aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    CasualMoment,
    Nostalgic,
    CrowdVenue,
    GroupFeeling,
    TalkTo,
    CloseDist,
    CostumeStrong,
    ActPointOrSalute,
    PropStrong,
    /// Body angled, face to camera.
    PoseSafeTheory,
    /// Body and face square to camera.
    PoseFrontTrue,
    /// Body and face both angled away.
    PoseSideCool,
    /// Body square, face angled.
    PoseFrontBodyFaceAngled,
}

impl Flag {
    pub const ALL: [Flag; 13] = [
        Flag::CasualMoment,
        Flag::Nostalgic,
        Flag::CrowdVenue,
        Flag::GroupFeeling,
        Flag::TalkTo,
        Flag::CloseDist,
        Flag::CostumeStrong,
        Flag::ActPointOrSalute,
        Flag::PropStrong,
        Flag::PoseSafeTheory,
        Flag::PoseFrontTrue,
        Flag::PoseSideCool,
        Flag::PoseFrontBodyFaceAngled,
    ];

    /// Mutually exclusive pose orientations.
    pub const POSES: [Flag; 4] = [
        Flag::PoseSafeTheory,
        Flag::PoseFrontTrue,
        Flag::PoseSideCool,
        Flag::PoseFrontBodyFaceAngled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::CasualMoment => "casual_moment",
            Flag::Nostalgic => "nostalgic",
            Flag::CrowdVenue => "crowd_venue",
            Flag::GroupFeeling => "group_feeling",
            Flag::TalkTo => "talk_to",
            Flag::CloseDist => "close_dist",
            Flag::CostumeStrong => "costume_strong",
            Flag::ActPointOrSalute => "act_point_or_salute",
            Flag::PropStrong => "prop_strong",
            Flag::PoseSafeTheory => "pose_safe_theory",
            Flag::PoseFrontTrue => "pose_front_true",
            Flag::PoseSideCool => "pose_side_cool",
            Flag::PoseFrontBodyFaceAngled => "pose_front_body_face_angled",
        }
    }

    fn oracle_alias(&self) -> Option<&'static str> {
        match self {
            Flag::CasualMoment => Some("E10_casual_moment"),
            Flag::Nostalgic => Some("E09_nostalgic"),
            Flag::CrowdVenue => Some("E07_08_crowd_venue"),
            Flag::GroupFeeling => Some("E14_group_feeling"),
            Flag::TalkTo => Some("E06_talk_to"),
            Flag::CloseDist => Some("E01_close_dist"),
            Flag::CostumeStrong => Some("C07_costume_strong"),
            Flag::ActPointOrSalute => Some("ACT_action_pose"),
            Flag::PropStrong => Some("B02_objects_strong"),
            _ => None,
        }
    }

    /// Resolve a canonical name or oracle alias.
    pub fn from_key(key: &str) -> Option<Flag> {
        let key = key.trim();
        Flag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == key || flag.oracle_alias() == Some(key))
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Flag::from_key(&key).ok_or_else(|| de::Error::custom(format!("unknown flag '{key}'")))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with flag keys outside the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagPolicy {
    /// Unknown keys set to true are an error; unknown false keys are ignored.
    #[default]
    Strict,
    /// Unknown keys are ignored.
    Lenient,
}

/// The set of flags that are true for one image. Built once per request
/// and never mutated by the engine.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FlagSet(u16);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: Flag) -> Self {
        self.insert(flag);
        self
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.bit();
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn any(&self, flags: &[Flag]) -> bool {
        flags.iter().any(|flag| self.contains(*flag))
    }

    pub fn all(&self, flags: &[Flag]) -> bool {
        flags.iter().all(|flag| self.contains(*flag))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Flags in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = Flag> {
        let set = *self;
        Flag::ALL.into_iter().filter(move |flag| set.contains(*flag))
    }

    /// True when more than one pose orientation is set. That is a contract
    /// violation by the oracle; the engine still produces a result.
    pub fn pose_conflict(&self) -> bool {
        Flag::POSES.iter().filter(|flag| self.contains(**flag)).count() > 1
    }

    /// Parse the untrusted `flags` mapping returned by the vision oracle.
    pub fn from_oracle(
        raw: &BTreeMap<String, serde_json::Value>,
        policy: FlagPolicy,
    ) -> Result<Self, EngineError> {
        let mut set = FlagSet::new();

        for (key, value) in raw {
            let enabled = truthy(value);
            match Flag::from_key(key) {
                Some(flag) if enabled => set.insert(flag),
                Some(_) => {}
                None if enabled && policy == FlagPolicy::Strict => {
                    return Err(EngineError::UnknownFlag(key.clone()));
                }
                None => tracing::debug!(key = %key, "ignoring unknown flag"),
            }
        }

        if set.pose_conflict() {
            tracing::warn!(flags = ?set, "more than one pose orientation flag set");
        }

        Ok(set)
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut set = FlagSet::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1" || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    }
}
