use std::sync::Arc;

use indiefind_core::{
    Config, DiscoveryEngine, EnrichmentPipeline, InMemoryReleaseStore, ReleaseChecker,
    ReleaseStateStore, SanitizedConfig, SourceCaches, SourceError, UrlResolver,
};
use indiefind_core::sources::MusicBrainzClient;

/// Shared application state
pub struct AppState {
    config: Config,
    discovery: Arc<DiscoveryEngine>,
    enrichment: Arc<EnrichmentPipeline>,
    freshness: Arc<ReleaseChecker>,
    resolver: Arc<UrlResolver>,
    release_store: Arc<dyn ReleaseStateStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        discovery: Arc<DiscoveryEngine>,
        enrichment: Arc<EnrichmentPipeline>,
        freshness: Arc<ReleaseChecker>,
        resolver: Arc<UrlResolver>,
        release_store: Arc<dyn ReleaseStateStore>,
    ) -> Self {
        Self {
            config,
            discovery,
            enrichment,
            freshness,
            resolver,
            release_store,
        }
    }

    /// Build every engine from configuration.
    ///
    /// The directory and feed caches, and the MusicBrainz client with its
    /// request spacing, are shared by all engines.
    pub fn from_config(config: Config) -> Result<Self, SourceError> {
        let caches = SourceCaches::new(&config);
        let musicbrainz = Arc::new(MusicBrainzClient::new(&config.musicbrainz)?);

        let discovery = DiscoveryEngine::from_config(&config, Arc::clone(&musicbrainz), &caches)?;
        let enrichment = EnrichmentPipeline::from_config(&config, musicbrainz)?;
        let freshness = ReleaseChecker::from_config(&config, &caches)?;
        let resolver = UrlResolver::from_config(&config)?;

        Ok(Self::new(
            config,
            Arc::new(discovery),
            Arc::new(enrichment),
            Arc::new(freshness),
            Arc::new(resolver),
            Arc::new(InMemoryReleaseStore::new()),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn discovery(&self) -> Arc<DiscoveryEngine> {
        Arc::clone(&self.discovery)
    }

    pub fn enrichment(&self) -> &EnrichmentPipeline {
        self.enrichment.as_ref()
    }

    pub fn freshness(&self) -> &ReleaseChecker {
        self.freshness.as_ref()
    }

    pub fn resolver(&self) -> &UrlResolver {
        self.resolver.as_ref()
    }

    pub fn release_store(&self) -> &dyn ReleaseStateStore {
        self.release_store.as_ref()
    }
}
