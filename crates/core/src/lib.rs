pub mod cache;
pub mod config;
pub mod dates;
pub mod discovery;
pub mod enrichment;
pub mod freshness;
pub mod identity;
pub mod metrics;
pub mod resolve;
pub mod sources;
pub mod testing;

pub use cache::{FailOpenCache, SourceCaches};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use discovery::{
    AggregatedResult, DiscoveryEngine, DiscoveryError, MatchConfidence, PlatformEntry,
    SearchOutcome, SourceReport, SourceStatus,
};
pub use enrichment::{EnrichmentPipeline, EnrichmentRecord, SocialLink};
pub use freshness::{
    ArtistReleaseState, InMemoryReleaseStore, KnownRelease, NewRelease, ReleaseCheck,
    ReleaseChecker, ReleaseStateStore,
};
pub use identity::{normalize, Query};
pub use resolve::{EmbedReference, LinkService, UrlResolver};
pub use sources::{
    Candidate, CandidateSource, DirectorySource, EntityKind, LatestRelease, ReleaseKind,
    ReleaseSource, SourceError, SourceId,
};
