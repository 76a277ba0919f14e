use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::EngineError;

/// One of the twelve persona patterns handed to the comment generator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum PatternId {
    P01,
    P02,
    P03,
    P04,
    P05,
    P06,
    P07,
    P08,
    P09,
    P10,
    P11,
    P12,
}

/// Entry used whenever a rendering context cannot resolve a pattern id.
pub const FALLBACK_PATTERN: PatternId = PatternId::P11;

impl PatternId {
    pub const ALL: [PatternId; 12] = [
        PatternId::P01,
        PatternId::P02,
        PatternId::P03,
        PatternId::P04,
        PatternId::P05,
        PatternId::P06,
        PatternId::P07,
        PatternId::P08,
        PatternId::P09,
        PatternId::P10,
        PatternId::P11,
        PatternId::P12,
    ];

    pub fn as_str(&self) -> &'static str {
        self.entry().id_str
    }

    /// Catalog metadata for this pattern.
    pub fn entry(&self) -> &'static PatternCatalogEntry {
        &CATALOG[*self as usize]
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).map(|entry| entry.id)
    }
}

/// Static metadata for a pattern: display name, the rhetorical angle the
/// comment should attack from, and a short label.
#[derive(Debug, PartialEq, Eq)]
pub struct PatternCatalogEntry {
    pub id: PatternId,
    id_str: &'static str,
    pub name: &'static str,
    pub attack: &'static str,
    pub short_label: &'static str,
}

static CATALOG: [PatternCatalogEntry; 12] = [
    entry(PatternId::P01, "P01", "余韻 (Soft)", "瞳の奥に惹かれる", "感情余韻"),
    entry(PatternId::P02, "P02", "余韻 (Perform)", "表情の演出が光る", "演出余韻"),
    entry(PatternId::P03, "P03", "構図 (Scene)", "情景が物語る", "背景主導"),
    entry(PatternId::P04, "P04", "構図 (Complex)", "情報の密度が高い", "情報量"),
    entry(PatternId::P05, "P05", "クール (Cool)", "鋭さが刺さる", "非同期クール"),
    entry(PatternId::P06, "P06", "キャラ (Character)", "役に入り込んでいる", "役作り"),
    entry(PatternId::P07, "P07", "対比 (Group)", "関係性が尊い", "関係性"),
    entry(PatternId::P08, "P08", "温度 (Bright)", "カワイイが溢れる", "快活"),
    entry(PatternId::P09, "P09", "温度 (Soft)", "癒やしの空気が流れる", "癒し"),
    entry(PatternId::P10, "P10", "温度 (Action)", "動きに目が行く", "アクション"),
    entry(PatternId::P11, "P11", "フラット (Close)", "距離の近さにドキッとする", "関係性フラット"),
    entry(PatternId::P12, "P12", "フラット (Scene)", "その場の空気が伝わる", "状況フラット"),
];

const fn entry(
    id: PatternId,
    id_str: &'static str,
    name: &'static str,
    attack: &'static str,
    short_label: &'static str,
) -> PatternCatalogEntry {
    PatternCatalogEntry {
        id,
        id_str,
        name,
        attack,
        short_label,
    }
}

/// All entries in id order.
pub fn entries() -> impl Iterator<Item = &'static PatternCatalogEntry> {
    CATALOG.iter()
}

/// Look up a pattern by id string (e.g. `"P04"`).
pub fn lookup(id: &str) -> Result<&'static PatternCatalogEntry, EngineError> {
    let id = id.trim();
    CATALOG
        .iter()
        .find(|entry| entry.id_str.eq_ignore_ascii_case(id))
        .ok_or_else(|| EngineError::UnknownPattern(id.to_string()))
}

/// Rendering-context lookup: never fails, resolving misses to
/// [`FALLBACK_PATTERN`].
pub fn lookup_or_fallback(id: &str) -> &'static PatternCatalogEntry {
    lookup(id).unwrap_or_else(|err| {
        tracing::warn!(error = %err, fallback = %FALLBACK_PATTERN, "pattern lookup fell back");
        FALLBACK_PATTERN.entry()
    })
}
