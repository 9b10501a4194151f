//! Per-artist new release detection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::store::{KeyedLocks, ReleaseStateStore};
use super::types::{ArtistReleaseState, NewRelease, ReleaseCheck};
use crate::cache::SourceCaches;
use crate::config::{Config, FreshnessConfig};
use crate::dates::days_before;
use crate::identity::normalize;
use crate::metrics::{NEW_RELEASES, RELEASE_CHECKS};
use crate::sources::{
    BandcampSource, FaircampFeed, LatestRelease, MirloFeed, QobuzSource, ReleaseSource,
    SourceError, SourceId,
};

/// Platforms consulted by the checker, most trusted first.
pub const RELEASE_PRIORITY: [SourceId; 4] = [
    SourceId::Mirlo,
    SourceId::Faircamp,
    SourceId::Bandcamp,
    SourceId::Qobuz,
];

/// Finds new releases for saved artists.
pub struct ReleaseChecker {
    sources: HashMap<SourceId, Arc<dyn ReleaseSource>>,
    window_days: i64,
    visible_days: i64,
    locks: KeyedLocks,
}

impl ReleaseChecker {
    pub fn new(config: &FreshnessConfig) -> Self {
        Self {
            sources: HashMap::new(),
            window_days: config.window_days,
            visible_days: config.visible_days,
            locks: KeyedLocks::default(),
        }
    }

    /// Register a release source. Sources outside [`RELEASE_PRIORITY`] are never consulted.
    pub fn with_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.sources.insert(source.id(), source);
        self
    }

    /// Build the checker with every enabled platform.
    pub fn from_config(config: &Config, caches: &SourceCaches) -> Result<Self, SourceError> {
        let sources = &config.sources;
        let mut checker = Self::new(&config.freshness);
        if sources.mirlo.enabled {
            checker = checker.with_source(Arc::new(MirloFeed::new(
                &sources.mirlo,
                Arc::clone(&caches.mirlo_feed),
            )?));
        }
        if sources.faircamp.enabled {
            checker = checker.with_source(Arc::new(FaircampFeed::new(&sources.faircamp)?));
        }
        if sources.bandcamp.enabled {
            checker = checker.with_source(Arc::new(BandcampSource::new(&sources.bandcamp)?));
        }
        if sources.qobuz.enabled {
            checker = checker.with_source(Arc::new(QobuzSource::new(&sources.qobuz)?));
        }
        Ok(checker)
    }

    /// Whether a release date falls inside the freshness window.
    pub fn in_window(&self, release: &LatestRelease, now: DateTime<Utc>) -> bool {
        release
            .date()
            .map(|date| (0..=self.window_days).contains(&days_before(date, now)))
            .unwrap_or(false)
    }

    /// The highest-priority release inside the window across `platforms`.
    ///
    /// All platforms are fetched concurrently; failures count as no release.
    pub async fn latest_qualifying(
        &self,
        platforms: &HashMap<SourceId, String>,
        now: DateTime<Utc>,
    ) -> Option<(SourceId, LatestRelease)> {
        let fetches = RELEASE_PRIORITY.iter().filter_map(|platform| {
            let url = platforms.get(platform)?;
            let Some(source) = self.sources.get(platform) else {
                debug!(platform = %platform, "No release source configured");
                return None;
            };
            Some(async move {
                let release = match source.dated_latest_release(url).await {
                    Ok(release) => release,
                    Err(e) => {
                        warn!(platform = %platform, url = %url, error = %e, "Release check fetch failed");
                        None
                    }
                };
                (*platform, release)
            })
        });
        let fetched = futures::future::join_all(fetches).await;

        // `fetched` follows RELEASE_PRIORITY order.
        fetched.into_iter().find_map(|(platform, release)| {
            let release = release?;
            if self.in_window(&release, now) {
                Some((platform, release))
            } else {
                debug!(
                    platform = %platform,
                    title = %release.title,
                    date = ?release.release_date,
                    "Release outside freshness window"
                );
                None
            }
        })
    }

    /// Check one artist against caller-owned state.
    ///
    /// Returns the release to report, if any, and the updated state. Reporting a
    /// release records it as known, so an unchanged upstream never reports twice.
    pub async fn check(
        &self,
        artist: &str,
        platforms: &HashMap<SourceId, String>,
        mut state: ArtistReleaseState,
        now: DateTime<Utc>,
    ) -> ReleaseCheck {
        state.prune(now, self.visible_days);

        let release = match self.latest_qualifying(platforms, now).await {
            Some((platform, release)) if state.record_known(&release.title, platform) => {
                let new_release = NewRelease::from_release(platform, release, now);
                info!(artist, platform = %platform, release = %new_release.name, "New release detected");
                NEW_RELEASES.with_label_values(&[platform.as_str()]).inc();
                RELEASE_CHECKS.with_label_values(&["new"]).inc();
                state.new_releases.push(new_release.clone());
                Some(new_release)
            }
            Some((platform, release)) => {
                debug!(artist, platform = %platform, release = %release.title, "Release already known");
                RELEASE_CHECKS.with_label_values(&["known"]).inc();
                None
            }
            None => {
                RELEASE_CHECKS.with_label_values(&["none"]).inc();
                None
            }
        };

        ReleaseCheck {
            artist: artist.to_string(),
            release,
            state,
        }
    }

    /// [`ReleaseChecker::check`] against a shared store.
    ///
    /// Load, check and save run under a per-artist lock, so concurrent checks for
    /// the same artist cannot both report the same release.
    pub async fn check_with_store(
        &self,
        store: &dyn ReleaseStateStore,
        artist: &str,
        platforms: &HashMap<SourceId, String>,
        now: DateTime<Utc>,
    ) -> ReleaseCheck {
        let key = normalize(artist);
        let _guard = self.locks.lock(&key).await;
        let state = store.load(&key).await;
        let check = self.check(artist, platforms, state, now).await;
        store.save(&key, check.state.clone()).await;
        check
    }
}
