//! Mock source adapters for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::identity::Query;
use crate::sources::{
    Candidate, CandidateSource, DirectoryMatch, DirectorySource, LatestRelease, ReleaseSource,
    SourceError, SourceId,
};

/// How a mock responds besides returning its configured data.
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    #[default]
    Normal,
    /// Fail every call with `SourceError::Http`.
    Fail(String),
    /// Panic on every call.
    Panic(String),
    /// Sleep before answering.
    Delay(Duration),
}

impl MockBehavior {
    async fn apply(&self) -> Result<(), SourceError> {
        match self {
            MockBehavior::Normal => Ok(()),
            MockBehavior::Fail(msg) => Err(SourceError::Http(msg.clone())),
            MockBehavior::Panic(msg) => panic!("{}", msg),
            MockBehavior::Delay(d) => {
                tokio::time::sleep(*d).await;
                Ok(())
            }
        }
    }
}

/// Mock implementation of [`CandidateSource`].
///
/// Returns the configured candidates for every query and records the raw query
/// strings it received.
#[derive(Debug)]
pub struct MockCandidateSource {
    id: SourceId,
    candidates: Arc<RwLock<Vec<Candidate>>>,
    behavior: Arc<RwLock<MockBehavior>>,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockCandidateSource {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            candidates: Arc::new(RwLock::new(Vec::new())),
            behavior: Arc::new(RwLock::new(MockBehavior::Normal)),
            queries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Builder form of [`MockCandidateSource::set_candidates`].
    pub fn with_candidates(self, candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Arc::new(RwLock::new(candidates)),
            ..self
        }
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            ..self
        }
    }

    pub async fn set_candidates(&self, candidates: Vec<Candidate>) {
        *self.candidates.write().await = candidates;
    }

    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl CandidateSource for MockCandidateSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError> {
        self.queries.write().await.push(query.raw.clone());
        let behavior = self.behavior.read().await.clone();
        behavior.apply().await?;
        Ok(self.candidates.read().await.clone())
    }
}

/// Mock implementation of [`DirectorySource`].
#[derive(Debug)]
pub struct MockDirectorySource {
    id: SourceId,
    matches: Arc<RwLock<HashMap<String, DirectoryMatch>>>,
    behavior: Arc<RwLock<MockBehavior>>,
}

impl MockDirectorySource {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            matches: Arc::new(RwLock::new(HashMap::new())),
            behavior: Arc::new(RwLock::new(MockBehavior::Normal)),
        }
    }

    /// Add a match under `key`, which should already be normalized.
    pub fn with_match(self, key: &str, name: &str, url: &str) -> Self {
        if let Ok(mut matches) = self.matches.try_write() {
            matches.insert(
                key.to_string(),
                DirectoryMatch {
                    name: name.to_string(),
                    url: url.to_string(),
                },
            );
        }
        self
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            ..self
        }
    }
}

#[async_trait]
impl DirectorySource for MockDirectorySource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn search(&self, _query: &Query) -> Result<HashMap<String, DirectoryMatch>, SourceError> {
        let behavior = self.behavior.read().await.clone();
        behavior.apply().await?;
        Ok(self.matches.read().await.clone())
    }
}

/// Mock implementation of [`ReleaseSource`].
///
/// Releases are keyed by artist URL; unknown URLs report no release.
#[derive(Debug)]
pub struct MockReleaseSource {
    id: SourceId,
    releases: Arc<RwLock<HashMap<String, LatestRelease>>>,
    behavior: Arc<RwLock<MockBehavior>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockReleaseSource {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            releases: Arc::new(RwLock::new(HashMap::new())),
            behavior: Arc::new(RwLock::new(MockBehavior::Normal)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_release(self, artist_url: &str, release: LatestRelease) -> Self {
        if let Ok(mut releases) = self.releases.try_write() {
            releases.insert(artist_url.to_string(), release);
        }
        self
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            ..self
        }
    }

    pub async fn set_release(&self, artist_url: &str, release: LatestRelease) {
        self.releases
            .write()
            .await
            .insert(artist_url.to_string(), release);
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl ReleaseSource for MockReleaseSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn latest_release(&self, artist_url: &str) -> Result<Option<LatestRelease>, SourceError> {
        self.requests.write().await.push(artist_url.to_string());
        let behavior = self.behavior.read().await.clone();
        behavior.apply().await?;
        Ok(self.releases.read().await.get(artist_url).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_mock_candidate_source_records_queries() {
        let source = MockCandidateSource::new(SourceId::Bandcamp)
            .with_candidates(vec![fixtures::artist(SourceId::Bandcamp, "Echo")]);

        let found = source.find(&Query::new("echo")).await;
        assert_eq!(found.len(), 1);
        assert_eq!(source.recorded_queries().await, vec!["echo".to_string()]);

        source.set_behavior(MockBehavior::Fail("down".to_string())).await;
        assert!(source.find(&Query::new("echo")).await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_release_source_by_url() {
        let source = MockReleaseSource::new(SourceId::Qobuz)
            .with_release("https://q/artist", fixtures::release("Nightfall", Some("2024-06-01")));

        assert!(source.fetch_latest("https://q/artist").await.is_some());
        assert!(source.fetch_latest("https://q/other").await.is_none());
        assert_eq!(source.request_count().await, 2);
    }
}
