//! Faircamp site directory and per-site release feeds.
//!
//! Faircamp sites are self-hosted, so there is no search. A published directory
//! lists every known site with its member artists; it is downloaded whole and
//! kept in a [`FailOpenCache`]. Each site also publishes `feed.rss`, used for
//! release freshness.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::FailOpenCache;
use crate::config::FaircampConfig;
use crate::identity::{normalize, normalized_match, Query};

use super::feed::{newest, parse_feed};
use super::http::{build_client, get_json, get_text, DEFAULT_USER_AGENT};
use super::{DirectoryMatch, DirectorySource, LatestRelease, ReleaseSource, SourceError, SourceId};

/// One site in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaircampSite {
    pub domain: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "artists")]
    pub members: Vec<String>,
}

impl FaircampSite {
    pub fn url(&self) -> String {
        let domain = self.domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        }
    }

    /// Names the site can be found under. Sites without a member list are
    /// single-artist sites named by their title.
    fn names(&self) -> impl Iterator<Item = &str> {
        let fallback = self.members.is_empty().then_some(self.title.as_str());
        self.members.iter().map(String::as_str).chain(fallback)
    }
}

/// Directory adapter backed by a shared cache.
pub struct FaircampDirectory {
    client: Client,
    directory_url: String,
    max_matches: usize,
    cache: Arc<FailOpenCache<Vec<FaircampSite>>>,
}

impl FaircampDirectory {
    /// Cache handle to share between instances (and with tests).
    pub fn new_cache(config: &FaircampConfig) -> Arc<FailOpenCache<Vec<FaircampSite>>> {
        Arc::new(FailOpenCache::new(
            "faircamp_directory",
            Duration::from_secs(config.directory_ttl_secs),
        ))
    }

    pub fn new(
        config: &FaircampConfig,
        cache: Arc<FailOpenCache<Vec<FaircampSite>>>,
    ) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.directory_timeout_secs)),
        )?;
        Ok(Self {
            client,
            directory_url: config.directory_url.clone(),
            max_matches: config.max_matches,
            cache,
        })
    }

    async fn sites(&self) -> Option<Arc<Vec<FaircampSite>>> {
        self.cache
            .get_or_refresh(|| async {
                get_json::<Vec<FaircampSite>>(
                    &self.client,
                    SourceId::Faircamp.as_str(),
                    "directory",
                    &self.directory_url,
                )
                .await
            })
            .await
    }
}

/// Substring containment in either direction, first `limit` hits.
pub fn match_sites(
    sites: &[FaircampSite],
    query: &Query,
    limit: usize,
) -> HashMap<String, DirectoryMatch> {
    let mut matches = HashMap::new();
    if query.is_blank() {
        return matches;
    }

    'sites: for site in sites {
        for name in site.names() {
            if matches.len() >= limit {
                break 'sites;
            }
            let key = normalize(name);
            if normalized_match(&key, &query.normalized) && !matches.contains_key(&key) {
                matches.insert(
                    key,
                    DirectoryMatch {
                        name: name.to_string(),
                        url: site.url(),
                    },
                );
            }
        }
    }
    matches
}

#[async_trait]
impl DirectorySource for FaircampDirectory {
    fn id(&self) -> SourceId {
        SourceId::Faircamp
    }

    async fn search(&self, query: &Query) -> Result<HashMap<String, DirectoryMatch>, SourceError> {
        let sites = self.sites().await.ok_or_else(|| {
            SourceError::Http("Faircamp directory unavailable".to_string())
        })?;
        let matches = match_sites(&sites, query, self.max_matches);
        debug!(query = %query.raw, sites = sites.len(), matches = matches.len(), "Faircamp directory search");
        Ok(matches)
    }
}

/// Release freshness from a Faircamp site's `feed.rss`.
pub struct FaircampFeed {
    client: Client,
}

impl FaircampFeed {
    pub fn new(config: &FaircampConfig) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.feed_timeout_secs)),
        )?;
        Ok(Self { client })
    }

    pub fn feed_url(site_url: &str) -> String {
        let site = site_url.trim_end_matches('/');
        if site.ends_with(".rss") || site.ends_with(".xml") {
            site.to_string()
        } else {
            format!("{}/feed.rss", site)
        }
    }
}

#[async_trait]
impl ReleaseSource for FaircampFeed {
    fn id(&self) -> SourceId {
        SourceId::Faircamp
    }

    async fn latest_release(&self, site_url: &str) -> Result<Option<LatestRelease>, SourceError> {
        let url = Self::feed_url(site_url);
        let xml = get_text(&self.client, SourceId::Faircamp.as_str(), "feed", &url).await?;
        let items = parse_feed(&xml)?;
        Ok(newest(items).map(|item| item.into_release()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn site(domain: &str, title: &str, members: &[&str]) -> FaircampSite {
        FaircampSite {
            domain: domain.to_string(),
            title: title.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_match_sites_substring_both_directions() {
        let sites = vec![
            site("sunrise.example.com", "Sunrise", &["Sunrise Collective"]),
            site("label.example.com", "A Label", &["Sun", "Moonchild"]),
            site("solo.example.com", "Sunrise Collective Live", &[]),
        ];
        let matches = match_sites(&sites, &Query::new("Sunrise Collective"), 10);

        // "sunrisecollective" == member, "sun" is contained in query,
        // "sunrisecollectivelive" contains query.
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches["sunrisecollective"].url,
            "https://sunrise.example.com"
        );
        assert!(matches.contains_key("sun"));
        assert!(matches.contains_key("sunrisecollectivelive"));
        assert!(!matches.contains_key("moonchild"));
    }

    #[test]
    fn test_match_sites_capped() {
        let sites: Vec<FaircampSite> = (0..25)
            .map(|i| {
                let member = format!("Drone {}", i);
                site(&format!("s{}.example.com", i), "", &[member.as_str()])
            })
            .collect();
        let matches = match_sites(&sites, &Query::new("drone"), 10);
        assert_eq!(matches.len(), 10);
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let sites = vec![site("a.example.com", "A", &["A"])];
        assert!(match_sites(&sites, &Query::new("  "), 10).is_empty());
    }

    #[tokio::test]
    async fn test_directory_is_cached_and_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"domain": "sunrise.example.com", "title": "Sunrise", "members": ["Sunrise Collective"]}
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sites.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = FaircampConfig {
            directory_url: format!("{}/sites.json", server.uri()),
            directory_ttl_secs: 0,
            ..FaircampConfig::default()
        };
        let cache = FaircampDirectory::new_cache(&config);
        let directory = FaircampDirectory::new(&config, Arc::clone(&cache)).unwrap();

        let first = directory.find(&Query::new("sunrise collective")).await;
        assert_eq!(first.len(), 1);

        // TTL 0: every call refreshes, the refresh fails, the stale listing is served.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = directory.find(&Query::new("sunrise collective")).await;
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_feed_latest_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<rss version="2.0"><channel>
                    <item><title>Old</title><link>https://s.example.com/old/</link>
                      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate></item>
                    <item><title>Dawn</title><link>https://s.example.com/dawn/</link>
                      <pubDate>Sat, 15 Jun 2024 00:00:00 +0000</pubDate></item>
                   </channel></rss>"#,
            ))
            .mount(&server)
            .await;

        let feed = FaircampFeed::new(&FaircampConfig::default()).unwrap();
        let release = feed.fetch_latest(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(release.title, "Dawn");
        assert_eq!(release.url, "https://s.example.com/dawn/");
    }

    #[test]
    fn test_feed_url() {
        assert_eq!(
            FaircampFeed::feed_url("https://s.example.com/"),
            "https://s.example.com/feed.rss"
        );
        assert_eq!(
            FaircampFeed::feed_url("https://s.example.com/feed.rss"),
            "https://s.example.com/feed.rss"
        );
    }
}
