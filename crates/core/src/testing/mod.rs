//! Testing utilities and mock implementations.
//!
//! Mock adapters implement the source traits with configurable data and failure
//! behavior, so the discovery engine and the freshness checker can be exercised
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use indiefind_core::testing::{fixtures, MockCandidateSource, MockBehavior};
//! use indiefind_core::sources::SourceId;
//!
//! let bandcamp = MockCandidateSource::new(SourceId::Bandcamp)
//!     .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Sunrise Collective")]);
//! let qobuz = MockCandidateSource::new(SourceId::Qobuz)
//!     .with_behavior(MockBehavior::Fail("timeout".into()));
//! ```

mod mock_sources;

pub use mock_sources::{MockBehavior, MockCandidateSource, MockDirectorySource, MockReleaseSource};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::sources::{Candidate, LatestRelease, ReleaseKind, SourceId};

    /// Artist page URL used by [`artist`] for a source and name.
    pub fn artist_url(source: SourceId, name: &str) -> String {
        let slug: String = crate::identity::normalize(name);
        match source {
            SourceId::Bandcamp => format!("https://{}.bandcamp.com", slug),
            SourceId::Qobuz => format!("https://www.qobuz.com/us-en/interpreter/{}/1", slug),
            SourceId::Mirlo => format!("https://mirlo.space/{}", slug),
            SourceId::Faircamp => format!("https://{}.example.org", slug),
            SourceId::Ampwall => format!("https://ampwall.com/a/{}", slug),
            SourceId::MusicBrainz => format!("https://musicbrainz.org/artist/mb-{}", slug),
            other => other.search_url(name).unwrap_or_default(),
        }
    }

    /// Artist candidate with a predictable URL.
    pub fn artist(source: SourceId, name: &str) -> Candidate {
        Candidate::artist(source, name, artist_url(source, name))
    }

    /// Album release with an optional ISO date.
    pub fn release(title: &str, date: Option<&str>) -> LatestRelease {
        let slug = crate::identity::normalize(title);
        LatestRelease {
            title: title.to_string(),
            kind: ReleaseKind::Album,
            url: format!("https://example.com/album/{}", slug),
            image: Some(format!("https://example.com/img/{}.jpg", slug)),
            release_date: date.map(str::to_string),
        }
    }

    /// Album release dated `days` days before `now`.
    pub fn release_days_ago(title: &str, days: i64, now: DateTime<Utc>) -> LatestRelease {
        let date = (now - Duration::days(days)).date_naive();
        release(title, Some(&date.format("%Y-%m-%d").to_string()))
    }
}
