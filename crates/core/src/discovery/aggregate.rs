//! Merging candidates into canonical identities.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::types::{AggregatedResult, MatchConfidence, PlatformEntry};
use crate::identity::identity_key;
use crate::sources::{Candidate, DirectoryMatch, EntityKind, SourceId};

/// Display order of platform entries: confirmed entries before search-only links,
/// each class in fixed source rank.
pub fn platform_order(a: &PlatformEntry, b: &PlatformEntry) -> Ordering {
    (a.search_only, a.source.rank()).cmp(&(b.search_only, b.source.rank()))
}

/// Group artist candidates by identity key.
///
/// Non-artist candidates and candidates whose name folds to nothing are dropped.
/// Within a group the first entry per source wins and the first non-empty image
/// becomes the group image. Groups are ordered by descending platform count; ties
/// keep first-seen order.
pub fn aggregate(candidates: Vec<Candidate>) -> Vec<AggregatedResult> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<AggregatedResult> = Vec::new();

    for candidate in candidates {
        if candidate.kind != EntityKind::Artist {
            continue;
        }
        let key = identity_key(&candidate.name, candidate.associated_artist.as_deref());
        if key.is_empty() {
            debug!(source = %candidate.source, name = %candidate.name, "Skipping candidate with empty key");
            continue;
        }

        let image = candidate.image.filter(|i| !i.trim().is_empty());
        let entry = PlatformEntry {
            image: image.clone(),
            ..PlatformEntry::new(candidate.source, candidate.url)
        };

        match index.get(&key) {
            Some(&i) => {
                groups[i].push_platform(entry);
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(AggregatedResult {
                    key,
                    name: candidate.name,
                    kind: candidate.kind,
                    image,
                    platforms: vec![entry],
                    match_confidence: MatchConfidence::Unverified,
                });
            }
        }
    }

    for group in &mut groups {
        group.platforms.sort_by(platform_order);
    }
    // `sort_by` is stable.
    groups.sort_by(|a, b| b.platforms.len().cmp(&a.platforms.len()));
    groups
}

/// Attach search-only links and directory matches to groups confirmed on the
/// anchor source. Other groups are left untouched.
pub fn augment(
    results: &mut [AggregatedResult],
    directory_matches: &[(SourceId, HashMap<String, DirectoryMatch>)],
) {
    for group in results.iter_mut() {
        if !group.has_source(SourceId::ANCHOR) {
            continue;
        }

        for source in SourceId::SEARCH_ONLY {
            if let Some(url) = source.search_url(&group.name) {
                group.push_platform(PlatformEntry::search_only(source, url));
            }
        }

        for (source, matches) in directory_matches {
            if let Some(hit) = matches.get(&group.key) {
                group.push_platform(PlatformEntry::new(*source, hit.url.clone()));
            }
        }

        group.platforms.sort_by(platform_order);
    }
}
