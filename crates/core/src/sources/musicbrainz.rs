//! MusicBrainz API client.
//!
//! MusicBrainz requires:
//! - User-Agent header with application name/version and contact info
//! - Rate limiting: 1 request per second
//!
//! Requests run one at a time and the enforced delay is measured from the end
//! of the previous response. The client has no request timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::MusicBrainzConfig;
use crate::identity::{normalize, normalized_match, Query};

use super::http::{build_client, get_json};
use super::{Candidate, CandidateSource, SourceError, SourceId};

const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const ARTIST_PAGE_URL: &str = "https://musicbrainz.org/artist";

/// Artist search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
}

/// One URL relationship of an artist ("official homepage", "discogs", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbUrlRelation {
    pub relation_type: String,
    pub url: String,
}

/// One release group of an artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbReleaseGroup {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<String>,
}

impl MbReleaseGroup {
    /// Year of the first release, when MusicBrainz knows it.
    pub fn first_release_year(&self) -> Option<i32> {
        self.first_release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

/// MusicBrainz API client.
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    last_request: Arc<Mutex<Option<Instant>>>,
    rate_limit: Duration,
    min_score: u8,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client.
    pub fn new(config: &MusicBrainzConfig) -> Result<Self, SourceError> {
        let client = build_client(&config.user_agent, None)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: Arc::new(Mutex::new(None)),
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            min_score: config.min_score,
        })
    }

    pub fn artist_page_url(mbid: &str) -> String {
        format!("{}/{}", ARTIST_PAGE_URL, mbid)
    }

    /// Wait out the remainder of the delay since the previous request finished.
    async fn wait_for_rate_limit(&self, last_finished: Option<Instant>) {
        if let Some(last_time) = last_finished {
            let elapsed = last_time.elapsed();
            if elapsed < self.rate_limit {
                let wait_time = self.rate_limit - elapsed;
                debug!("MusicBrainz rate limit: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }
    }

    /// One request at a time; the delay runs from the end of the previous one.
    async fn fetch<T: DeserializeOwned>(&self, operation: &str, url: &str) -> Result<T, SourceError> {
        let mut last = self.last_request.lock().await;
        self.wait_for_rate_limit(*last).await;

        let result = get_json(&self.client, SourceId::MusicBrainz.as_str(), operation, url).await;
        *last = Some(Instant::now());

        if let Err(SourceError::Status(429 | 503)) = result {
            warn!("MusicBrainz rate limit exceeded");
        }
        result
    }

    /// Search for artists by name.
    pub async fn search_artists(&self, query: &str, limit: u32) -> Result<Vec<MbArtist>, SourceError> {
        let limit = limit.min(100); // MusicBrainz max is 100
        debug!("MusicBrainz artist search: query='{}', limit={}", query, limit);

        let url = format!(
            "{}/artist?query={}&fmt=json&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit
        );
        let response: MbArtistSearchResponse = self.fetch("artist_search", &url).await?;
        Ok(response.artists)
    }

    /// Search and apply the acceptance rule to the top hit.
    pub async fn find_artist(&self, query: &Query) -> Result<Option<MbArtist>, SourceError> {
        if query.is_blank() {
            return Ok(None);
        }
        let artists = self.search_artists(&query.raw, 5).await?;
        Ok(accept_top_match(query, &artists, self.min_score).cloned())
    }

    /// URL relationships of an artist.
    pub async fn artist_urls(&self, mbid: &str) -> Result<Vec<MbUrlRelation>, SourceError> {
        debug!("MusicBrainz artist urls: mbid={}", mbid);
        let url = format!("{}/artist/{}?inc=url-rels&fmt=json", self.base_url, mbid);
        let artist: MbArtistWithRelations = self.fetch("artist_urls", &url).await?;

        Ok(artist
            .relations
            .into_iter()
            .filter_map(|rel| {
                let resource = rel.url?.resource;
                Some(MbUrlRelation {
                    relation_type: rel.relation_type,
                    url: resource,
                })
            })
            .collect())
    }

    /// Release groups credited to an artist.
    pub async fn release_groups(&self, mbid: &str) -> Result<Vec<MbReleaseGroup>, SourceError> {
        debug!("MusicBrainz release groups: mbid={}", mbid);
        let url = format!(
            "{}/release-group?artist={}&fmt=json&limit=100",
            self.base_url, mbid
        );
        let response: MbReleaseGroupResponse = self.fetch("release_groups", &url).await?;
        Ok(response.release_groups.into_iter().map(Into::into).collect())
    }
}

/// Accept the best-scored artist only if the score clears `min_score` and the
/// names contain one another after normalization.
///
/// The service sometimes ranks an unrelated artist at 100; the name check
/// catches that.
pub fn accept_top_match<'a>(
    query: &Query,
    artists: &'a [MbArtist],
    min_score: u8,
) -> Option<&'a MbArtist> {
    let top = artists.iter().reduce(|best, a| if a.score > best.score { a } else { best })?;
    if top.score < min_score {
        debug!(name = %top.name, score = top.score, "MusicBrainz top match below threshold");
        return None;
    }
    if !normalized_match(&normalize(&top.name), &query.normalized) {
        debug!(name = %top.name, query = %query.raw, "MusicBrainz top match name mismatch");
        return None;
    }
    Some(top)
}

#[async_trait]
impl CandidateSource for MusicBrainzClient {
    fn id(&self) -> SourceId {
        SourceId::MusicBrainz
    }

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError> {
        Ok(self
            .find_artist(query)
            .await?
            .map(|artist| {
                Candidate::artist(
                    SourceId::MusicBrainz,
                    artist.name,
                    Self::artist_page_url(&artist.id),
                )
            })
            .into_iter()
            .collect())
    }
}

// ============================================================================
// MusicBrainz API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct MbArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Deserialize)]
struct MbArtistWithRelations {
    #[serde(default)]
    relations: Vec<MbRelation>,
}

#[derive(Debug, Deserialize)]
struct MbRelation {
    #[serde(rename = "type")]
    relation_type: String,
    #[serde(default)]
    url: Option<MbUrl>,
}

#[derive(Debug, Deserialize)]
struct MbUrl {
    resource: String,
}

#[derive(Debug, Deserialize)]
struct MbReleaseGroupResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<MbReleaseGroupRaw>,
}

#[derive(Debug, Deserialize)]
struct MbReleaseGroupRaw {
    id: String,
    title: String,
    #[serde(rename = "first-release-date", default)]
    first_release_date: Option<String>,
}

impl From<MbReleaseGroupRaw> for MbReleaseGroup {
    fn from(raw: MbReleaseGroupRaw) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            first_release_date: raw.first_release_date.filter(|d| !d.is_empty()),
        }
    }
}
