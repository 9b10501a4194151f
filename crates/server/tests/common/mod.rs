//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock sources injected, enabling E2E testing of every route without
//! network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use indiefind_core::config::{Config, DiscogsConfig, FreshnessConfig, MusicBrainzConfig};
use indiefind_core::sources::http::{build_client, DEFAULT_USER_AGENT};
use indiefind_core::sources::{DiscogsClient, MusicBrainzClient, SourceId};
use indiefind_core::testing::{MockCandidateSource, MockDirectorySource, MockReleaseSource};
use indiefind_core::{
    DiscoveryEngine, EnrichmentPipeline, InMemoryReleaseStore, ReleaseChecker, UrlResolver,
};
use indiefind_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use indiefind_core::testing::fixtures;

/// Nothing listens here, so every outbound lookup fails fast.
const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Test fixture for E2E testing with mock sources.
///
/// Provides an in-process server with controllable mocks for:
/// - Candidate search (Bandcamp, Qobuz)
/// - Directory lookups (Mirlo)
/// - Latest releases (Bandcamp, Qobuz, Mirlo)
///
/// Enrichment and link resolution point at an unreachable host.
pub struct TestFixture {
    pub router: Router,
    pub bandcamp: Arc<MockCandidateSource>,
    pub qobuz: Arc<MockCandidateSource>,
    pub mirlo_directory: Arc<MockDirectorySource>,
    pub bandcamp_releases: Arc<MockReleaseSource>,
    pub qobuz_releases: Arc<MockReleaseSource>,
    pub mirlo_releases: Arc<MockReleaseSource>,
    pub release_store: Arc<InMemoryReleaseStore>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

/// Options for building a fixture.
#[derive(Default)]
pub struct TestConfig {
    /// Directory entries served by the Mirlo mock: (identity key, name, url).
    pub mirlo_matches: Vec<(&'static str, &'static str, &'static str)>,
}

impl TestFixture {
    /// Create a new test fixture with empty mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let bandcamp = Arc::new(MockCandidateSource::new(SourceId::Bandcamp));
        let qobuz = Arc::new(MockCandidateSource::new(SourceId::Qobuz));
        let mirlo_directory = Arc::new(test_config.mirlo_matches.iter().fold(
            MockDirectorySource::new(SourceId::Mirlo),
            |source, (key, name, url)| source.with_match(key, name, url),
        ));
        let bandcamp_releases = Arc::new(MockReleaseSource::new(SourceId::Bandcamp));
        let qobuz_releases = Arc::new(MockReleaseSource::new(SourceId::Qobuz));
        let mirlo_releases = Arc::new(MockReleaseSource::new(SourceId::Mirlo));
        let release_store = Arc::new(InMemoryReleaseStore::new());

        let discovery = DiscoveryEngine::new(Duration::from_millis(500))
            .with_candidate_source(bandcamp.clone())
            .with_candidate_source(qobuz.clone())
            .with_directory_source(mirlo_directory.clone())
            .with_release_source(bandcamp_releases.clone())
            .with_release_source(qobuz_releases.clone());

        let freshness = ReleaseChecker::new(&FreshnessConfig::default())
            .with_source(mirlo_releases.clone())
            .with_source(bandcamp_releases.clone())
            .with_source(qobuz_releases.clone());

        let client = build_client(DEFAULT_USER_AGENT, Some(Duration::from_secs(2)))
            .expect("Failed to build HTTP client");
        let musicbrainz = Arc::new(
            MusicBrainzClient::new(&MusicBrainzConfig {
                base_url: Some(format!("{}/ws/2", UNREACHABLE)),
                rate_limit_ms: 0,
                ..MusicBrainzConfig::default()
            })
            .expect("Failed to create MusicBrainz client"),
        );
        let discogs = DiscogsClient::new(&DiscogsConfig {
            base_url: UNREACHABLE.to_string(),
            token: None,
            timeout_secs: 2,
        })
        .expect("Failed to create Discogs client");
        let enrichment = EnrichmentPipeline::new(musicbrainz, discogs, client.clone());
        let resolver = UrlResolver::new(client).with_oembed_endpoints(
            &format!("{}/spotify/oembed", UNREACHABLE),
            &format!("{}/youtube/oembed", UNREACHABLE),
        );

        let state = Arc::new(AppState::new(
            Config::default(),
            Arc::new(discovery),
            Arc::new(enrichment),
            Arc::new(freshness),
            Arc::new(resolver),
            release_store.clone(),
        ));

        Self {
            router: create_router(state),
            bandcamp,
            qobuz,
            mirlo_directory,
            bandcamp_releases,
            qobuz_releases,
            mirlo_releases,
            release_store,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        TestResponse { status, body, text }
    }
}
