use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::PatternId;
use crate::decision::MainAxis;

/// Share above which a single pattern counts as clustered.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.4;

/// Running tally of classifications over a batch of images. Used to spot
/// rule revisions that pile most images onto one pattern.
#[derive(Debug, Clone, Default)]
pub struct PatternDistribution {
    patterns: BTreeMap<PatternId, usize>,
    main_axes: BTreeMap<MainAxis, usize>,
    failures: usize,
}

impl PatternDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pattern_id: PatternId, main_axis: MainAxis) {
        *self.patterns.entry(pattern_id).or_default() += 1;
        *self.main_axes.entry(main_axis).or_default() += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Successfully classified inputs.
    pub fn total(&self) -> usize {
        self.patterns.values().sum()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn count(&self, pattern_id: PatternId) -> usize {
        self.patterns.get(&pattern_id).copied().unwrap_or(0)
    }

    /// Fraction of successful classifications that landed on `pattern_id`.
    pub fn share(&self, pattern_id: PatternId) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(pattern_id) as f64 / total as f64,
        }
    }

    /// Patterns whose share is strictly above `threshold`.
    pub fn clustered(&self, threshold: f64) -> Vec<PatternId> {
        self.patterns
            .keys()
            .copied()
            .filter(|id| self.share(*id) > threshold)
            .collect()
    }

    pub fn summary(&self, cluster_threshold: f64, generated_at: DateTime<Utc>) -> DistributionSummary {
        let entries = PatternId::ALL
            .into_iter()
            .filter(|id| self.count(*id) > 0)
            .map(|id| DistributionEntry {
                pattern_id: id,
                name: id.entry().name.to_string(),
                count: self.count(id),
                percent: round1(self.share(id) * 100.0),
            })
            .collect();

        DistributionSummary {
            total: self.total(),
            failures: self.failures,
            entries,
            main_axes: self
                .main_axes
                .iter()
                .map(|(axis, count)| (axis.as_str().to_string(), *count))
                .collect(),
            clustered: self.clustered(cluster_threshold),
            cluster_threshold,
            generated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DistributionEntry {
    pub pattern_id: PatternId,
    pub name: String,
    pub count: usize,
    pub percent: f64,
}

/// Serializable snapshot of a [`PatternDistribution`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DistributionSummary {
    pub total: usize,
    pub failures: usize,
    /// Patterns with at least one hit, in id order
    pub entries: Vec<DistributionEntry>,
    /// Hits per main axis ("none" for flat inputs)
    pub main_axes: BTreeMap<String, usize>,
    /// Patterns above the cluster threshold
    pub clustered: Vec<PatternId>,
    pub cluster_threshold: f64,
    pub generated_at: DateTime<Utc>,
}

impl DistributionSummary {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Pattern Distribution\n");
        let _ = writeln!(
            out,
            "**Total**: {} classified, {} failed ({})\n",
            self.total,
            self.failures,
            self.generated_at.to_rfc3339()
        );
        let _ = writeln!(out, "| Pattern | Name | Count | % |");
        let _ = writeln!(out, "|---|---|---|---|");
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.1}% |",
                entry.pattern_id, entry.name, entry.count, entry.percent
            );
        }

        if !self.main_axes.is_empty() {
            let _ = writeln!(out, "\n| Main | Count |");
            let _ = writeln!(out, "|---|---|");
            for (axis, count) in &self.main_axes {
                let _ = writeln!(out, "| {axis} | {count} |");
            }
        }

        if !self.clustered.is_empty() {
            let ids: Vec<&str> = self.clustered.iter().map(PatternId::as_str).collect();
            let _ = writeln!(
                out,
                "\n> Clustering: {} above {:.0}% share",
                ids.join(", "),
                self.cluster_threshold * 100.0
            );
        }
        out
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
