//! Bandcamp catalog search and artist release listing.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use tracing::debug;

use crate::config::BandcampConfig;
use crate::identity::Query;

use super::http::{build_client, get_text, DEFAULT_USER_AGENT};
use super::parse::{
    meta_content, page_text, ReleasePageParser, SearchPageParser, SelectorReleaseParser,
    SelectorSearchParser,
};
use super::{Candidate, CandidateSource, LatestRelease, ReleaseKind, ReleaseSource, SourceError, SourceId};

static DATE_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""datePublished"\s*:\s*"([^"]+)""#).unwrap());

/// Bandcamp adapter. The anchor source for discovery.
pub struct BandcampSource {
    client: Client,
    base_url: String,
    search_parser: Box<dyn SearchPageParser>,
    release_parser: Box<dyn ReleasePageParser>,
}

impl BandcampSource {
    pub fn new(config: &BandcampConfig) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_parser: Box::new(SelectorSearchParser::bandcamp()),
            release_parser: Box::new(SelectorReleaseParser::bandcamp()),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base_url, urlencoding::encode(query))
    }

    /// Release date from an album or track page.
    async fn release_date(&self, release_url: &str) -> Result<Option<String>, SourceError> {
        let html = get_text(&self.client, SourceId::Bandcamp.as_str(), "release_page", release_url).await?;
        Ok(release_date_from_page(&html))
    }
}

/// Album pages carry the date in JSON-LD, a meta tag, or the credits block.
fn release_date_from_page(html: &str) -> Option<String> {
    if let Some(caps) = DATE_PUBLISHED.captures(html) {
        return Some(caps[1].to_string());
    }
    if let Some(date) = meta_content(html, "datePublished") {
        return Some(date);
    }
    page_text(html, ".tralbum-credits")?
        .lines()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("released"))
        .map(str::to_string)
}

/// Artists with a single release get redirected from `/music` to that release.
fn single_release_page(html: &str, page_url: &str) -> Option<LatestRelease> {
    let kind = match meta_content(html, "og:type")?.as_str() {
        "album" => ReleaseKind::Album,
        "song" => ReleaseKind::Track,
        _ => return None,
    };
    let title = meta_content(html, "og:title")?;
    // "Sunrise, by Sunrise Collective"
    let title = title
        .rsplit_once(", by ")
        .map(|(t, _)| t.to_string())
        .unwrap_or(title);
    Some(LatestRelease {
        title,
        kind,
        url: meta_content(html, "og:url").unwrap_or_else(|| page_url.to_string()),
        image: meta_content(html, "og:image"),
        release_date: release_date_from_page(html),
    })
}

#[async_trait]
impl CandidateSource for BandcampSource {
    fn id(&self) -> SourceId {
        SourceId::Bandcamp
    }

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError> {
        let url = self.search_url(&query.raw);
        let html = get_text(&self.client, SourceId::Bandcamp.as_str(), "search", &url).await?;
        let candidates = self
            .search_parser
            .parse(&html, SourceId::Bandcamp, &self.base_url);
        debug!(query = %query.raw, results = candidates.len(), "Bandcamp search complete");
        Ok(candidates)
    }
}

#[async_trait]
impl ReleaseSource for BandcampSource {
    fn id(&self) -> SourceId {
        SourceId::Bandcamp
    }

    async fn latest_release(&self, artist_url: &str) -> Result<Option<LatestRelease>, SourceError> {
        let music_url = format!("{}/music", artist_url.trim_end_matches('/'));
        let html = get_text(&self.client, SourceId::Bandcamp.as_str(), "artist_music", &music_url).await?;
        Ok(self
            .release_parser
            .parse(&html, &music_url)
            .or_else(|| single_release_page(&html, &music_url)))
    }

    async fn dated_latest_release(
        &self,
        artist_url: &str,
    ) -> Result<Option<LatestRelease>, SourceError> {
        let Some(mut release) = self.latest_release(artist_url).await? else {
            return Ok(None);
        };
        if release.release_date.is_none() {
            release.release_date = self.release_date(&release.url).await?;
        }
        Ok(Some(release))
    }
}
