//! One search, end to end.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::aggregate::{aggregate, augment};
use super::disambiguate::disambiguate;
use super::join::{panic_message, settle_all, SourceOutcome};
use super::types::{AggregatedResult, DiscoveryError, SearchOutcome};
use crate::cache::SourceCaches;
use crate::config::Config;
use crate::identity::Query;
use crate::metrics::{RELEASE_FETCHES_ABANDONED, SEARCHES, SEARCH_DURATION};
use crate::sources::{
    AmpwallSource, BandcampSource, CandidateSource, DirectorySource, FaircampDirectory,
    LatestRelease, MirloSource, MusicBrainzClient, QobuzSource, ReleaseSource, SourceError,
    SourceId,
};

/// Runs every configured adapter for a query and reconciles their answers.
pub struct DiscoveryEngine {
    candidate_sources: Vec<Arc<dyn CandidateSource>>,
    directory_sources: Vec<Arc<dyn DirectorySource>>,
    release_sources: HashMap<SourceId, Arc<dyn ReleaseSource>>,
    release_deadline: Duration,
}

impl DiscoveryEngine {
    /// Empty engine; add adapters with the `with_*` methods.
    pub fn new(release_deadline: Duration) -> Self {
        Self {
            candidate_sources: Vec::new(),
            directory_sources: Vec::new(),
            release_sources: HashMap::new(),
            release_deadline,
        }
    }

    pub fn with_candidate_source(mut self, source: Arc<dyn CandidateSource>) -> Self {
        self.candidate_sources.push(source);
        self
    }

    pub fn with_directory_source(mut self, source: Arc<dyn DirectorySource>) -> Self {
        self.directory_sources.push(source);
        self
    }

    /// Register the release reporter used for entries of `source.id()`.
    pub fn with_release_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.release_sources.insert(source.id(), source);
        self
    }

    /// Build the engine with every enabled adapter.
    pub fn from_config(
        config: &Config,
        musicbrainz: Arc<MusicBrainzClient>,
        caches: &SourceCaches,
    ) -> Result<Self, SourceError> {
        let sources = &config.sources;
        let mut engine = Self::new(config.discovery.release_deadline());

        if sources.bandcamp.enabled {
            let bandcamp = Arc::new(BandcampSource::new(&sources.bandcamp)?);
            engine = engine
                .with_candidate_source(bandcamp.clone())
                .with_release_source(bandcamp);
        }
        if sources.qobuz.enabled {
            let qobuz = Arc::new(QobuzSource::new(&sources.qobuz)?);
            engine = engine
                .with_candidate_source(qobuz.clone())
                .with_release_source(qobuz);
        }
        if sources.ampwall.enabled {
            engine = engine.with_candidate_source(Arc::new(AmpwallSource::new(&sources.ampwall)?));
        }
        if config.musicbrainz.use_in_discovery {
            engine = engine.with_candidate_source(musicbrainz);
        }
        if sources.faircamp.enabled {
            engine = engine.with_directory_source(Arc::new(FaircampDirectory::new(
                &sources.faircamp,
                Arc::clone(&caches.faircamp_directory),
            )?));
        }
        if sources.mirlo.enabled {
            engine = engine.with_directory_source(Arc::new(MirloSource::new(&sources.mirlo)?));
        }

        info!(
            candidate_sources = engine.candidate_sources.len(),
            directory_sources = engine.directory_sources.len(),
            release_sources = engine.release_sources.len(),
            "Discovery engine ready"
        );
        Ok(engine)
    }

    /// Search every source for `raw` and return reconciled results.
    ///
    /// Source failures only shrink the result set. An error is returned only when
    /// the merge itself fails.
    pub async fn search(&self, raw: &str) -> Result<SearchOutcome, DiscoveryError> {
        let start = Instant::now();
        let query = Query::new(raw.trim());
        if query.is_blank() {
            SEARCHES.with_label_values(&["empty"]).inc();
            return Ok(SearchOutcome::empty(raw));
        }

        let candidate_branches: Vec<_> = self
            .candidate_sources
            .iter()
            .map(|s| (s.id(), s.search(&query)))
            .collect();
        let directory_branches: Vec<_> = self
            .directory_sources
            .iter()
            .map(|s| (s.id(), s.search(&query)))
            .collect();
        let (candidate_outcomes, directory_outcomes) =
            tokio::join!(settle_all(candidate_branches), settle_all(directory_branches));

        let mut reports = Vec::with_capacity(candidate_outcomes.len() + directory_outcomes.len());
        reports.extend(candidate_outcomes.iter().map(|o| o.report(Vec::len)));
        reports.extend(directory_outcomes.iter().map(|o| o.report(HashMap::len)));
        log_failures(&query, &candidate_outcomes);
        log_failures(&query, &directory_outcomes);

        let candidates: Vec<_> = candidate_outcomes
            .into_iter()
            .filter_map(SourceOutcome::into_value)
            .flatten()
            .collect();
        let directory_matches: Vec<_> = directory_outcomes
            .into_iter()
            .filter_map(|o| {
                let source = o.source;
                o.into_value().map(|matches| (source, matches))
            })
            .collect();

        let merged = guard_merge(|| {
            let mut results = aggregate(candidates);
            augment(&mut results, &directory_matches);
            results
        });
        let mut results = match merged {
            Ok(results) => results,
            Err(e) => {
                SEARCHES.with_label_values(&["failed"]).inc();
                return Err(e);
            }
        };

        self.attach_releases(&mut results).await;

        let results = match guard_merge(|| disambiguate(results)) {
            Ok(results) => results,
            Err(e) => {
                SEARCHES.with_label_values(&["failed"]).inc();
                return Err(e);
            }
        };

        let label = if results.is_empty() { "empty" } else { "found" };
        SEARCHES.with_label_values(&[label]).inc();
        SEARCH_DURATION
            .with_label_values(&[])
            .observe(start.elapsed().as_secs_f64());
        info!(
            query = %query.raw,
            results = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(SearchOutcome {
            query: raw.to_string(),
            enrichment_available: !results.is_empty(),
            results,
            sources: reports,
        })
    }

    /// Fetch the latest release for every release-capable entry, all under one
    /// deadline. Fetches still running at the deadline are dropped and their
    /// entries keep no release data.
    async fn attach_releases(&self, results: &mut [AggregatedResult]) {
        let mut pending = FuturesUnordered::new();
        for (group_idx, group) in results.iter().enumerate() {
            for (entry_idx, entry) in group.platforms.iter().enumerate() {
                if entry.search_only || !entry.source.reports_releases() {
                    continue;
                }
                let Some(source) = self.release_sources.get(&entry.source) else {
                    continue;
                };
                let source = Arc::clone(source);
                let url = entry.url.clone();
                pending.push(async move {
                    let release = fetch_isolated(source.as_ref(), &url).await;
                    (group_idx, entry_idx, release)
                });
            }
        }

        let total = pending.len();
        if total == 0 {
            return;
        }

        let deadline = Instant::now() + self.release_deadline;
        let mut completed = 0usize;
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((group_idx, entry_idx, release))) => {
                    completed += 1;
                    results[group_idx].platforms[entry_idx].latest_release = release;
                }
                Ok(None) => break,
                Err(_) => {
                    let abandoned = total - completed;
                    warn!(abandoned, total, "Release fetch deadline reached");
                    RELEASE_FETCHES_ABANDONED.inc_by(abandoned as u64);
                    break;
                }
            }
        }
        debug!(completed, total, "Release fetches finished");
    }
}

async fn fetch_isolated(source: &dyn ReleaseSource, url: &str) -> Option<LatestRelease> {
    match AssertUnwindSafe(source.fetch_latest(url)).catch_unwind().await {
        Ok(release) => release,
        Err(payload) => {
            warn!(
                source = %source.id(),
                url,
                panic = %panic_message(payload.as_ref()),
                "Release fetch panicked"
            );
            None
        }
    }
}

fn log_failures<T>(query: &Query, outcomes: &[SourceOutcome<T>]) {
    for outcome in outcomes {
        let report = outcome.report(|_| 0);
        if let Some(error) = report.error {
            warn!(source = %outcome.source, query = %query.raw, error = %error, "Source search failed");
        }
    }
}

/// Run merge logic, turning a panic into [`DiscoveryError::MergeFailed`].
pub fn guard_merge<T>(merge: impl FnOnce() -> T) -> Result<T, DiscoveryError> {
    catch_unwind(AssertUnwindSafe(merge))
        .map_err(|payload| DiscoveryError::MergeFailed(panic_message(payload.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{MatchConfidence, SourceStatus};
    use crate::testing::{
        fixtures, MockBehavior, MockCandidateSource, MockDirectorySource, MockReleaseSource,
    };

    fn engine() -> DiscoveryEngine {
        DiscoveryEngine::new(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_unknown_query_returns_empty() {
        let engine = engine()
            .with_candidate_source(Arc::new(MockCandidateSource::new(SourceId::Bandcamp)))
            .with_candidate_source(Arc::new(MockCandidateSource::new(SourceId::Qobuz)));

        let outcome = engine.search("no such artist anywhere").await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(!outcome.enrichment_available);
        assert_eq!(outcome.query, "no such artist anywhere");
        assert_eq!(outcome.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_query_skips_sources() {
        let bandcamp = Arc::new(MockCandidateSource::new(SourceId::Bandcamp));
        let engine = engine().with_candidate_source(bandcamp.clone());

        let outcome = engine.search("  ?! ").await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(bandcamp.recorded_queries().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_and_panicking_sources_do_not_spoil_results() {
        let engine = engine()
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Bandcamp)
                    .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Echo")]),
            ))
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Qobuz)
                    .with_behavior(MockBehavior::Fail("down".to_string())),
            ))
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Ampwall)
                    .with_behavior(MockBehavior::Panic("bad markup".to_string())),
            ))
            .with_directory_source(Arc::new(
                MockDirectorySource::new(SourceId::Faircamp)
                    .with_behavior(MockBehavior::Fail("directory down".to_string())),
            ));

        let outcome = engine.search("Echo").await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.enrichment_available);

        let statuses: Vec<_> = outcome.sources.iter().map(|r| (r.source, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (SourceId::Bandcamp, SourceStatus::Ok),
                (SourceId::Qobuz, SourceStatus::Failed),
                (SourceId::Ampwall, SourceStatus::Panicked),
                (SourceId::Faircamp, SourceStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn test_conflicting_releases_split() {
        let bandcamp_url = fixtures::artist_url(SourceId::Bandcamp, "Echo");
        let qobuz_url = fixtures::artist_url(SourceId::Qobuz, "Echo");

        let engine = engine()
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Bandcamp)
                    .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Echo")]),
            ))
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Qobuz)
                    .with_candidates(vec![fixtures::artist(SourceId::Qobuz, "Echo")]),
            ))
            .with_release_source(Arc::new(
                MockReleaseSource::new(SourceId::Bandcamp)
                    .with_release(&bandcamp_url, fixtures::release("Sunrise", None)),
            ))
            .with_release_source(Arc::new(
                MockReleaseSource::new(SourceId::Qobuz)
                    .with_release(&qobuz_url, fixtures::release("Nightfall", None)),
            ));

        let outcome = engine.search("Echo").await.unwrap();
        let verified: Vec<_> = outcome
            .results
            .iter()
            .filter(|r| r.match_confidence == MatchConfidence::Verified)
            .collect();
        assert_eq!(verified.len(), 2);
        assert!(verified.iter().all(|r| r.name == "Echo"));
        // The search-only links lack release data and split off.
        assert!(outcome.results.iter().any(|r| r.key == "echo:unverified"));
    }

    #[tokio::test]
    async fn test_augments_anchor_groups_with_directory_matches() {
        let engine = engine()
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Bandcamp)
                    .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Echo")]),
            ))
            .with_directory_source(Arc::new(
                MockDirectorySource::new(SourceId::Mirlo).with_match(
                    "echo",
                    "Echo",
                    "https://mirlo.space/echo",
                ),
            ));

        let outcome = engine.search("echo").await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        let sources: Vec<_> = outcome.results[0].platforms.iter().map(|p| p.source).collect();
        assert_eq!(
            sources,
            vec![SourceId::Bandcamp, SourceId::Mirlo, SourceId::Subvert, SourceId::Resonate]
        );
        assert_eq!(outcome.results[0].match_confidence, MatchConfidence::Unverified);
    }

    #[tokio::test]
    async fn test_slow_release_fetch_abandoned_at_deadline() {
        let bandcamp_url = fixtures::artist_url(SourceId::Bandcamp, "Echo");
        let engine = DiscoveryEngine::new(Duration::from_millis(100))
            .with_candidate_source(Arc::new(
                MockCandidateSource::new(SourceId::Bandcamp)
                    .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Echo")]),
            ))
            .with_release_source(Arc::new(
                MockReleaseSource::new(SourceId::Bandcamp)
                    .with_release(&bandcamp_url, fixtures::release("Sunrise", None))
                    .with_behavior(MockBehavior::Delay(Duration::from_secs(5))),
            ));

        let start = Instant::now();
        let outcome = engine.search("Echo").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].platforms[0].latest_release.is_none());
        assert_eq!(outcome.results[0].match_confidence, MatchConfidence::Unverified);
    }

    #[test]
    fn test_guard_merge_catches_panic() {
        let result: Result<u32, _> = guard_merge(|| panic!("merge defect"));
        match result {
            Err(DiscoveryError::MergeFailed(msg)) => assert!(msg.contains("merge defect")),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(guard_merge(|| 5).unwrap(), 5);
    }
}
