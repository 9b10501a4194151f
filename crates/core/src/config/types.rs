use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::sources::http::DEFAULT_USER_AGENT;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,
    #[serde(default)]
    pub discogs: DiscogsConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub freshness: FreshnessConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_page_timeout() -> u64 {
    5
}

fn default_listing_timeout() -> u64 {
    10
}

/// Per-source adapter configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub bandcamp: BandcampConfig,
    #[serde(default)]
    pub qobuz: QobuzConfig,
    #[serde(default)]
    pub ampwall: AmpwallConfig,
    #[serde(default)]
    pub mirlo: MirloConfig,
    #[serde(default)]
    pub faircamp: FaircampConfig,
}

/// Bandcamp catalog search (anchor source)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BandcampConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bandcamp_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 5)
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,
}

impl Default for BandcampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_bandcamp_url(),
            timeout_secs: default_page_timeout(),
        }
    }
}

fn default_bandcamp_url() -> String {
    "https://bandcamp.com".to_string()
}

/// Qobuz catalog search
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QobuzConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_qobuz_url")]
    pub base_url: String,
    /// Store locale path segment (default: "us-en")
    #[serde(default = "default_qobuz_locale")]
    pub locale: String,
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,
}

impl Default for QobuzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_qobuz_url(),
            locale: default_qobuz_locale(),
            timeout_secs: default_page_timeout(),
        }
    }
}

fn default_qobuz_url() -> String {
    "https://www.qobuz.com".to_string()
}

fn default_qobuz_locale() -> String {
    "us-en".to_string()
}

/// Ampwall existence check
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmpwallConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ampwall_url")]
    pub base_url: String,
    /// `og:title` values that mean the artist page does not exist
    #[serde(default = "default_ampwall_placeholders")]
    pub placeholder_titles: Vec<String>,
    #[serde(default = "default_ampwall_timeout")]
    pub timeout_secs: u64,
}

impl Default for AmpwallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ampwall_url(),
            placeholder_titles: default_ampwall_placeholders(),
            timeout_secs: default_ampwall_timeout(),
        }
    }
}

fn default_ampwall_url() -> String {
    "https://ampwall.com".to_string()
}

fn default_ampwall_placeholders() -> Vec<String> {
    vec!["Ampwall".to_string(), "Page Not Found".to_string()]
}

fn default_ampwall_timeout() -> u64 {
    4
}

/// Mirlo JSON API and release feed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirloConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_mirlo_api_url")]
    pub api_url: String,
    /// Public site used to build artist URLs
    #[serde(default = "default_mirlo_site_url")]
    pub site_url: String,
    #[serde(default = "default_mirlo_feed_url")]
    pub feed_url: String,
    /// Feed cache time-to-live in seconds (default: 300)
    #[serde(default = "default_mirlo_feed_ttl")]
    pub feed_ttl_secs: u64,
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,
    /// Timeout for the full feed download (default: 10)
    #[serde(default = "default_listing_timeout")]
    pub feed_timeout_secs: u64,
}

impl Default for MirloConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_mirlo_api_url(),
            site_url: default_mirlo_site_url(),
            feed_url: default_mirlo_feed_url(),
            feed_ttl_secs: default_mirlo_feed_ttl(),
            timeout_secs: default_page_timeout(),
            feed_timeout_secs: default_listing_timeout(),
        }
    }
}

fn default_mirlo_api_url() -> String {
    "https://api.mirlo.space/v1".to_string()
}

fn default_mirlo_site_url() -> String {
    "https://mirlo.space".to_string()
}

fn default_mirlo_feed_url() -> String {
    "https://api.mirlo.space/v1/trackGroups?format=rss".to_string()
}

fn default_mirlo_feed_ttl() -> u64 {
    300
}

/// Faircamp site directory and per-site feeds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FaircampConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON listing of known Faircamp sites
    #[serde(default = "default_faircamp_directory_url")]
    pub directory_url: String,
    /// Directory cache time-to-live in seconds (default: 600)
    #[serde(default = "default_faircamp_directory_ttl")]
    pub directory_ttl_secs: u64,
    /// Timeout for the full directory download (default: 10)
    #[serde(default = "default_listing_timeout")]
    pub directory_timeout_secs: u64,
    /// Maximum matches returned per query (default: 10)
    #[serde(default = "default_faircamp_max_matches")]
    pub max_matches: usize,
    /// Timeout for one site's `feed.rss` (default: 5)
    #[serde(default = "default_page_timeout")]
    pub feed_timeout_secs: u64,
}

impl Default for FaircampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory_url: default_faircamp_directory_url(),
            directory_ttl_secs: default_faircamp_directory_ttl(),
            directory_timeout_secs: default_listing_timeout(),
            max_matches: default_faircamp_max_matches(),
            feed_timeout_secs: default_page_timeout(),
        }
    }
}

fn default_faircamp_directory_url() -> String {
    "https://simonrepp.com/faircamp/sites.json".to_string()
}

fn default_faircamp_directory_ttl() -> u64 {
    600
}

fn default_faircamp_max_matches() -> usize {
    10
}

/// MusicBrainz client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    /// User-Agent string (required by MusicBrainz).
    /// Format: "AppName/Version ( contact@example.com )"
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum delay between requests in milliseconds (default: 1100, minimum: 1100).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
    /// Minimum search score to accept the top artist (default: 95).
    #[serde(default = "default_min_score")]
    pub min_score: u8,
    /// Base URL (default: https://musicbrainz.org/ws/2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Also query MusicBrainz during discovery searches (default: true).
    #[serde(default = "default_true")]
    pub use_in_discovery: bool,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_rate_limit() -> u64 {
    1100
}

fn default_min_score() -> u8 {
    95
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit_ms: default_rate_limit(),
            min_score: default_min_score(),
            base_url: None,
            use_in_discovery: true,
        }
    }
}

/// Discogs API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscogsConfig {
    #[serde(default = "default_discogs_url")]
    pub base_url: String,
    /// Personal access token; unauthenticated requests get a lower rate limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,
}

impl Default for DiscogsConfig {
    fn default() -> Self {
        Self {
            base_url: default_discogs_url(),
            token: None,
            timeout_secs: default_page_timeout(),
        }
    }
}

fn default_discogs_url() -> String {
    "https://api.discogs.com".to_string()
}

/// Official-site and link-aggregator scraping during enrichment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_page_timeout(),
        }
    }
}

/// Discovery engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Soft deadline for the release fetch batch in milliseconds (default: 4000)
    #[serde(default = "default_release_deadline")]
    pub release_deadline_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            release_deadline_ms: default_release_deadline(),
        }
    }
}

impl DiscoveryConfig {
    pub fn release_deadline(&self) -> Duration {
        Duration::from_millis(self.release_deadline_ms)
    }
}

fn default_release_deadline() -> u64 {
    4000
}

/// Release freshness checker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FreshnessConfig {
    /// Releases dated up to this many days before the check qualify (default: 8)
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// New releases stay visible for this many days (default: 7)
    #[serde(default = "default_visible_days")]
    pub visible_days: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            visible_days: default_visible_days(),
        }
    }
}

fn default_window_days() -> i64 {
    8
}

fn default_visible_days() -> i64 {
    7
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub discogs: SanitizedDiscogsConfig,
    pub enrichment: EnrichmentConfig,
    pub discovery: DiscoveryConfig,
    pub freshness: FreshnessConfig,
}

/// Sanitized Discogs config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDiscogsConfig {
    pub base_url: String,
    pub token_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            sources: config.sources.clone(),
            musicbrainz: config.musicbrainz.clone(),
            discogs: SanitizedDiscogsConfig {
                base_url: config.discogs.base_url.clone(),
                token_configured: config
                    .discogs
                    .token
                    .as_deref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_secs: config.discogs.timeout_secs,
            },
            enrichment: config.enrichment.clone(),
            discovery: config.discovery.clone(),
            freshness: config.freshness.clone(),
        }
    }
}
