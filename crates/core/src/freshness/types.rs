//! Release state owned by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::sources::{LatestRelease, SourceId};

/// A release already seen for an artist on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownRelease {
    pub name: String,
    pub platform: SourceId,
}

impl KnownRelease {
    /// Same platform and same name ignoring case.
    pub fn matches(&self, name: &str, platform: SourceId) -> bool {
        self.platform == platform && self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// A release detected by a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelease {
    pub name: String,
    pub platform: SourceId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl NewRelease {
    pub fn from_release(platform: SourceId, release: LatestRelease, detected_at: DateTime<Utc>) -> Self {
        Self {
            name: release.title,
            platform,
            url: release.url,
            image: release.image,
            release_date: release.release_date,
            detected_at,
        }
    }

    /// Whether the release is still young enough to show.
    pub fn is_visible(&self, now: DateTime<Utc>, visible_days: i64) -> bool {
        now - self.detected_at < Duration::days(visible_days)
    }

    /// Stable identifier for callers that deduplicate notifications.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.name.to_lowercase().as_bytes());
        let digest = hasher.finalize();
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Per-artist record of known and recently detected releases.
///
/// `known` only grows; [`ArtistReleaseState::reset`] is the one way to clear it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistReleaseState {
    #[serde(default)]
    pub known: Vec<KnownRelease>,
    #[serde(default)]
    pub new_releases: Vec<NewRelease>,
}

impl ArtistReleaseState {
    pub fn is_known(&self, name: &str, platform: SourceId) -> bool {
        self.known.iter().any(|k| k.matches(name, platform))
    }

    /// Record a release as known. Returns false if it already was.
    pub fn record_known(&mut self, name: &str, platform: SourceId) -> bool {
        if self.is_known(name, platform) {
            return false;
        }
        self.known.push(KnownRelease {
            name: name.trim().to_string(),
            platform,
        });
        true
    }

    /// Drop new releases that are no longer visible.
    pub fn prune(&mut self, now: DateTime<Utc>, visible_days: i64) {
        self.new_releases.retain(|r| r.is_visible(now, visible_days));
    }

    /// Operator reset: forget everything.
    pub fn reset(&mut self) {
        self.known.clear();
        self.new_releases.clear();
    }
}

/// Result of one artist check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseCheck {
    pub artist: String,
    pub release: Option<NewRelease>,
    pub state: ArtistReleaseState,
}
