//! Types for discovery results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::{EntityKind, LatestRelease, SourceId};

/// How far a result can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Agreeing release evidence, or a single source with no conflicting evidence.
    Verified,
    /// Name-only match.
    Unverified,
}

/// One platform a result is available on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub source: SourceId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Constructed search link, not a confirmed match.
    #[serde(default)]
    pub search_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_release: Option<LatestRelease>,
}

impl PlatformEntry {
    pub fn new(source: SourceId, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            image: None,
            search_only: false,
            latest_release: None,
        }
    }

    pub fn search_only(source: SourceId, url: impl Into<String>) -> Self {
        Self {
            search_only: true,
            ..Self::new(source, url)
        }
    }
}

/// A canonical identity merged from one or more sources.
///
/// Never holds two platform entries with the same source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub key: String,
    pub name: String,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub platforms: Vec<PlatformEntry>,
    pub match_confidence: MatchConfidence,
}

impl AggregatedResult {
    pub fn has_source(&self, source: SourceId) -> bool {
        self.platforms.iter().any(|p| p.source == source)
    }

    /// Add an entry unless the source is already present. Returns whether it was added.
    pub fn push_platform(&mut self, entry: PlatformEntry) -> bool {
        if self.has_source(entry.source) {
            return false;
        }
        if self.image.is_none() {
            self.image = entry.image.clone();
        }
        self.platforms.push(entry);
        true
    }

    /// Number of confirmed (non search-only) platforms.
    pub fn native_platform_count(&self) -> usize {
        self.platforms.iter().filter(|p| !p.search_only).count()
    }
}

/// Outcome status of one adapter during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed,
    Panicked,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Failed => "failed",
            SourceStatus::Panicked => "panicked",
        }
    }
}

/// Per-source line of a search report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub status: SourceStatus,
    pub results: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a search returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<AggregatedResult>,
    /// Whether a follow-up enrichment request is worth making.
    pub enrichment_available: bool,
    #[serde(default)]
    pub sources: Vec<SourceReport>,
}

impl SearchOutcome {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            enrichment_available: false,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Result merging failed: {0}")]
    MergeFailed(String),
}
