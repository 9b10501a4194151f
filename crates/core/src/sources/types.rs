//! Types shared by all source adapters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dates::parse_release_date;

/// Every platform the engine knows about.
///
/// Declaration order is the display rank used when ordering platform entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Bandcamp,
    Qobuz,
    Mirlo,
    Faircamp,
    Ampwall,
    #[serde(rename = "musicbrainz")]
    MusicBrainz,
    Subvert,
    Resonate,
}

impl SourceId {
    /// Source whose confirmation gates augmentation.
    pub const ANCHOR: SourceId = SourceId::Bandcamp;

    /// Platforms without a usable search API; linked through a query URL only.
    pub const SEARCH_ONLY: [SourceId; 2] = [SourceId::Subvert, SourceId::Resonate];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Bandcamp => "bandcamp",
            SourceId::Qobuz => "qobuz",
            SourceId::Mirlo => "mirlo",
            SourceId::Faircamp => "faircamp",
            SourceId::Ampwall => "ampwall",
            SourceId::MusicBrainz => "musicbrainz",
            SourceId::Subvert => "subvert",
            SourceId::Resonate => "resonate",
        }
    }

    /// Position in the fixed display order.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn is_search_only(&self) -> bool {
        Self::SEARCH_ONLY.contains(self)
    }

    /// Platforms that can report an artist's latest release during discovery.
    pub fn reports_releases(&self) -> bool {
        matches!(self, SourceId::Bandcamp | SourceId::Qobuz)
    }

    /// Constructed search URL for search-only platforms.
    pub fn search_url(&self, query: &str) -> Option<String> {
        let q = urlencoding::encode(query);
        match self {
            SourceId::Subvert => Some(format!("https://subvert.fm/search?q={}", q)),
            SourceId::Resonate => Some(format!("https://stream.resonate.coop/search?q={}", q)),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a match refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl EntityKind {
    /// Parse the type labels used on search result pages ("ARTIST", "album", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "artist" | "band" => Some(EntityKind::Artist),
            "album" | "release" | "ep" => Some(EntityKind::Album),
            "track" | "song" => Some(EntityKind::Track),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    Album,
    Track,
}

/// One adapter's claim about a match. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: SourceId,
    pub name: String,
    /// Artist the album or track belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_artist: Option<String>,
    pub kind: EntityKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Candidate {
    pub fn artist(source: SourceId, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            associated_artist: None,
            kind: EntityKind::Artist,
            url: url.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|i| !i.trim().is_empty());
        self
    }
}

/// The most recent release a platform reports for an artist.
///
/// `release_date` keeps the source's own encoding; use [`LatestRelease::date`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRelease {
    pub title: String,
    pub kind: ReleaseKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl LatestRelease {
    pub fn date(&self) -> Option<NaiveDate> {
        self.release_date.as_deref().and_then(parse_release_date)
    }
}

/// A confirmed hit from a directory-style source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMatch {
    pub name: String,
    pub url: String,
}

/// Errors an adapter can hit. Always folded into an empty result at the adapter
/// boundary; they exist for logging and the per-source report.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Resource not found")]
    NotFound,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_serialization() {
        assert_eq!(
            serde_json::to_string(&SourceId::MusicBrainz).unwrap(),
            "\"musicbrainz\""
        );
        assert_eq!(serde_json::to_string(&SourceId::Bandcamp).unwrap(), "\"bandcamp\"");
        let parsed: SourceId = serde_json::from_str("\"faircamp\"").unwrap();
        assert_eq!(parsed, SourceId::Faircamp);
    }

    #[test]
    fn test_search_only_sources_rank_last() {
        let max_native = [
            SourceId::Bandcamp,
            SourceId::Qobuz,
            SourceId::Mirlo,
            SourceId::Faircamp,
            SourceId::Ampwall,
            SourceId::MusicBrainz,
        ]
        .iter()
        .map(|s| s.rank())
        .max()
        .unwrap();
        for s in SourceId::SEARCH_ONLY {
            assert!(s.is_search_only());
            assert!(s.rank() > max_native);
            assert!(s.search_url("a b").unwrap().contains("a%20b"));
        }
        assert!(SourceId::Bandcamp.search_url("x").is_none());
    }

    #[test]
    fn test_entity_kind_from_label() {
        assert_eq!(EntityKind::from_label("ARTIST"), Some(EntityKind::Artist));
        assert_eq!(EntityKind::from_label(" album "), Some(EntityKind::Album));
        assert_eq!(EntityKind::from_label("TRACK"), Some(EntityKind::Track));
        assert_eq!(EntityKind::from_label("label"), None);
    }

    #[test]
    fn test_latest_release_date() {
        let release = LatestRelease {
            title: "Sunrise".to_string(),
            kind: ReleaseKind::Album,
            url: "https://x.bandcamp.com/album/sunrise".to_string(),
            image: None,
            release_date: Some("June 15, 2024".to_string()),
        };
        assert_eq!(release.date(), NaiveDate::from_ymd_opt(2024, 6, 15));
    }
}
