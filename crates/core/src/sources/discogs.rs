//! Discogs API client, used for artist profile links during enrichment.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::DiscogsConfig;

use super::http::{get_json, DEFAULT_USER_AGENT};
use super::SourceError;

#[derive(Debug, Deserialize)]
struct DiscogsArtist {
    #[serde(default)]
    urls: Vec<String>,
}

pub struct DiscogsClient {
    client: Client,
    base_url: String,
}

impl DiscogsClient {
    pub fn new(config: &DiscogsConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Discogs token={}", token))
                .map_err(|e| SourceError::NotConfigured(format!("Invalid Discogs token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Profile links listed on an artist, given the artist's Discogs page URL.
    pub async fn artist_urls(&self, discogs_url: &str) -> Result<Vec<String>, SourceError> {
        let id = artist_id(discogs_url).ok_or_else(|| {
            SourceError::Parse(format!("Not a Discogs artist URL: {}", discogs_url))
        })?;
        let url = format!("{}/artists/{}", self.base_url, id);
        let artist: DiscogsArtist = get_json(&self.client, "discogs", "artist", &url).await?;
        debug!(id, urls = artist.urls.len(), "Discogs artist fetched");
        Ok(artist.urls)
    }
}

/// `https://www.discogs.com/artist/12345-Name` -> `12345`
pub fn artist_id(url: &str) -> Option<u64> {
    let parsed = url::Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "artist" {
            let id_part = segments.next()?;
            let digits: String = id_part.chars().take_while(char::is_ascii_digit).collect();
            return digits.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_artist_id() {
        assert_eq!(artist_id("https://www.discogs.com/artist/12345-Sunrise-Collective"), Some(12345));
        assert_eq!(artist_id("https://www.discogs.com/artist/777"), Some(777));
        assert_eq!(artist_id("https://www.discogs.com/release/1-X"), None);
        assert_eq!(artist_id("nonsense"), None);
    }

    #[tokio::test]
    async fn test_artist_urls_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artists/42"))
            .and(header("authorization", "Discogs token=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "urls": ["https://instagram.com/sunrise", "https://sunrise.example.com"]
            })))
            .mount(&server)
            .await;

        let client = DiscogsClient::new(&DiscogsConfig {
            base_url: server.uri(),
            token: Some("abc".to_string()),
            timeout_secs: 2,
        })
        .unwrap();
        let urls = client
            .artist_urls("https://www.discogs.com/artist/42-Sunrise")
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
    }
}
