//! Mirlo JSON API and release feed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::cache::FailOpenCache;
use crate::config::MirloConfig;
use crate::identity::{normalize, Query};

use super::feed::{newest, owner_slug, parse_feed, FeedItem};
use super::http::{build_client, get_json, get_text, trailing_segment, DEFAULT_USER_AGENT};
use super::{DirectoryMatch, DirectorySource, LatestRelease, ReleaseSource, SourceError, SourceId};

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    #[serde(default)]
    results: Vec<MirloArtist>,
}

#[derive(Debug, Deserialize)]
struct MirloArtist {
    name: String,
    #[serde(rename = "urlSlug")]
    url_slug: String,
}

/// Mirlo artist search.
pub struct MirloSource {
    client: Client,
    api_url: String,
    site_url: String,
}

impl MirloSource {
    pub fn new(config: &MirloConfig) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            site_url: config.site_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Index each artist under its display name and under the URL slug, which can
/// differ ("The Sunrise Collective" at `/sunrise`).
fn index_artists(artists: Vec<MirloArtist>, site_url: &str) -> HashMap<String, DirectoryMatch> {
    let mut matches = HashMap::new();
    for artist in artists {
        let url = format!("{}/{}", site_url, artist.url_slug.trim_matches('/'));
        let entry = DirectoryMatch {
            name: artist.name.clone(),
            url: url.clone(),
        };
        let name_key = normalize(&artist.name);
        if !name_key.is_empty() {
            matches.entry(name_key).or_insert_with(|| entry.clone());
        }
        if let Some(slug_key) = trailing_segment(&url).map(|s| normalize(&s)) {
            if !slug_key.is_empty() {
                matches.entry(slug_key).or_insert(entry);
            }
        }
    }
    matches
}

#[async_trait]
impl DirectorySource for MirloSource {
    fn id(&self) -> SourceId {
        SourceId::Mirlo
    }

    async fn search(&self, query: &Query) -> Result<HashMap<String, DirectoryMatch>, SourceError> {
        if query.is_blank() {
            return Ok(HashMap::new());
        }
        let url = format!(
            "{}/artists?name={}",
            self.api_url,
            urlencoding::encode(&query.raw)
        );
        let response: ArtistsResponse =
            get_json(&self.client, SourceId::Mirlo.as_str(), "search", &url).await?;
        debug!(query = %query.raw, results = response.results.len(), "Mirlo search complete");
        Ok(index_artists(response.results, &self.site_url))
    }
}

/// Mirlo releases from the site-wide feed, filtered per artist.
pub struct MirloFeed {
    client: Client,
    feed_url: String,
    cache: Arc<FailOpenCache<Vec<FeedItem>>>,
}

impl MirloFeed {
    pub fn new_cache(config: &MirloConfig) -> Arc<FailOpenCache<Vec<FeedItem>>> {
        Arc::new(FailOpenCache::new(
            "mirlo_feed",
            Duration::from_secs(config.feed_ttl_secs),
        ))
    }

    pub fn new(
        config: &MirloConfig,
        cache: Arc<FailOpenCache<Vec<FeedItem>>>,
    ) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.feed_timeout_secs)),
        )?;
        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
            cache,
        })
    }

    async fn items(&self) -> Option<Arc<Vec<FeedItem>>> {
        self.cache
            .get_or_refresh(|| async {
                let xml = get_text(&self.client, SourceId::Mirlo.as_str(), "feed", &self.feed_url).await?;
                parse_feed(&xml)
            })
            .await
    }
}

#[async_trait]
impl ReleaseSource for MirloFeed {
    fn id(&self) -> SourceId {
        SourceId::Mirlo
    }

    async fn latest_release(&self, artist_url: &str) -> Result<Option<LatestRelease>, SourceError> {
        let slug = owner_slug(artist_url)
            .ok_or_else(|| SourceError::Parse(format!("No artist slug in {}", artist_url)))?;
        let items = self
            .items()
            .await
            .ok_or_else(|| SourceError::Http("Mirlo feed unavailable".to_string()))?;

        let owned = items
            .iter()
            .filter(|item| item.owner.as_deref() == Some(slug.as_str()))
            .cloned();
        Ok(newest(owned).map(FeedItem::into_release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_index_by_name_and_slug() {
        let artists = vec![MirloArtist {
            name: "The Sunrise Collective".to_string(),
            url_slug: "sunrise".to_string(),
        }];
        let matches = index_artists(artists, "https://mirlo.space");

        assert_eq!(matches.len(), 2);
        assert_eq!(matches["thesunrisecollective"].url, "https://mirlo.space/sunrise");
        assert_eq!(matches["sunrise"].name, "The Sunrise Collective");
    }

    #[tokio::test]
    async fn test_search_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/artists"))
            .and(query_param("name", "sunrise"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": 1, "name": "Sunrise", "urlSlug": "sunrise-band"}],
                "total": 1
            })))
            .mount(&server)
            .await;

        let source = MirloSource::new(&MirloConfig {
            api_url: format!("{}/v1", server.uri()),
            ..MirloConfig::default()
        })
        .unwrap();
        let matches = source.find(&Query::new("sunrise")).await;
        assert_eq!(matches["sunrise"].url, "https://mirlo.space/sunrise-band");
        assert_eq!(matches["sunriseband"].name, "Sunrise");
    }

    #[tokio::test]
    async fn test_feed_filtered_by_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<rss version="2.0"><channel>
                  <item><title>Other</title><link>https://mirlo.space/other/release/x</link>
                    <pubDate>Sun, 16 Jun 2024 00:00:00 +0000</pubDate></item>
                  <item><title>Sunrise</title><link>https://mirlo.space/sunrise-band/release/sunrise</link>
                    <pubDate>Sat, 15 Jun 2024 00:00:00 +0000</pubDate></item>
                  <item><title>Older</title><link>https://mirlo.space/sunrise-band/release/older</link>
                    <pubDate>Sat, 01 Jun 2024 00:00:00 +0000</pubDate></item>
                </channel></rss>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let config = MirloConfig {
            feed_url: format!("{}/feed", server.uri()),
            ..MirloConfig::default()
        };
        let feed = MirloFeed::new(&config, MirloFeed::new_cache(&config)).unwrap();

        let release = feed
            .fetch_latest("https://mirlo.space/sunrise-band")
            .await
            .unwrap();
        assert_eq!(release.title, "Sunrise");

        // Served from the cache, the mock expects exactly one request.
        assert!(feed.fetch_latest("https://mirlo.space/nobody").await.is_none());
    }
}
