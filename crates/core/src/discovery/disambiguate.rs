//! Splitting name-based merges on conflicting release evidence.
//!
//! Rules for one group, once latest releases are attached:
//! - no entry has release data: the group stays whole, `unverified`
//! - all titles agree: the group stays whole, `verified`
//! - titles disagree: one `verified` result per agreeing set, plus one
//!   `unverified` result holding the entries without release data
//!
//! An entry that could have reported a release but did not is missing data, not a
//! conflict.

use tracing::debug;

use super::types::{AggregatedResult, MatchConfidence, PlatformEntry};
use crate::identity::{normalize, normalized_match};
use crate::metrics::DISAMBIGUATION_SPLITS;

/// Apply [`disambiguate_group`] to every result, preserving order.
pub fn disambiguate(results: Vec<AggregatedResult>) -> Vec<AggregatedResult> {
    results.into_iter().flat_map(disambiguate_group).collect()
}

struct Partition {
    titles: Vec<String>,
    entries: Vec<PlatformEntry>,
}

impl Partition {
    fn accepts(&self, title: &str) -> bool {
        self.titles.iter().any(|t| normalized_match(t, title))
    }
}

fn release_title(entry: &PlatformEntry) -> Option<String> {
    entry
        .latest_release
        .as_ref()
        .map(|r| normalize(&r.title))
        .filter(|t| !t.is_empty())
}

pub fn disambiguate_group(mut group: AggregatedResult) -> Vec<AggregatedResult> {
    let mut partitions: Vec<Partition> = Vec::new();
    let mut missing: Vec<PlatformEntry> = Vec::new();

    for entry in group.platforms.iter().cloned() {
        let Some(title) = release_title(&entry) else {
            missing.push(entry);
            continue;
        };
        match partitions.iter_mut().find(|p| p.accepts(&title)) {
            Some(partition) => {
                partition.titles.push(title);
                partition.entries.push(entry);
            }
            None => partitions.push(Partition {
                titles: vec![title],
                entries: vec![entry],
            }),
        }
    }

    if partitions.len() <= 1 {
        group.match_confidence = if partitions.is_empty() {
            MatchConfidence::Unverified
        } else {
            MatchConfidence::Verified
        };
        return vec![group];
    }

    debug!(key = %group.key, partitions = partitions.len(), "Splitting on release conflict");
    DISAMBIGUATION_SPLITS.inc();

    let mut splits: Vec<AggregatedResult> = partitions
        .into_iter()
        .map(|p| {
            let suffix = p.titles[0].clone();
            split(&group, &suffix, p.entries, MatchConfidence::Verified)
        })
        .collect();
    if !missing.is_empty() {
        splits.push(split(&group, "unverified", missing, MatchConfidence::Unverified));
    }
    splits
}

fn split(
    group: &AggregatedResult,
    suffix: &str,
    platforms: Vec<PlatformEntry>,
    match_confidence: MatchConfidence,
) -> AggregatedResult {
    let image = platforms
        .iter()
        .find_map(|p| p.image.clone())
        .or_else(|| {
            platforms
                .iter()
                .find_map(|p| p.latest_release.as_ref().and_then(|r| r.image.clone()))
        });
    AggregatedResult {
        key: format!("{}:{}", group.key, suffix),
        name: group.name.clone(),
        kind: group.kind,
        image,
        platforms,
        match_confidence,
    }
}
