//! Ampwall existence check.
//!
//! Ampwall has no search. The artist page URL is built from the normalized query
//! and the page counts as a match only if its `og:title` is a real artist title.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::AmpwallConfig;
use crate::identity::Query;

use super::http::{build_client, get_text, DEFAULT_USER_AGENT};
use super::parse::meta_content;
use super::{Candidate, CandidateSource, SourceError, SourceId};

pub struct AmpwallSource {
    client: Client,
    base_url: String,
    placeholder_titles: Vec<String>,
}

impl AmpwallSource {
    pub fn new(config: &AmpwallConfig) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            placeholder_titles: config
                .placeholder_titles
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
        })
    }

    fn artist_url(&self, slug: &str) -> String {
        format!("{}/a/{}", self.base_url, slug)
    }

    fn is_placeholder(&self, title: &str) -> bool {
        self.placeholder_titles.contains(&title.trim().to_lowercase())
    }
}

/// "Sunrise Collective | Ampwall" -> "Sunrise Collective"
fn artist_name(title: &str) -> &str {
    title
        .split(" | ")
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(title)
}

#[async_trait]
impl CandidateSource for AmpwallSource {
    fn id(&self) -> SourceId {
        SourceId::Ampwall
    }

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError> {
        if query.is_blank() {
            return Ok(Vec::new());
        }

        let url = self.artist_url(&query.normalized);
        let html = match get_text(&self.client, SourceId::Ampwall.as_str(), "artist_page", &url).await {
            Ok(html) => html,
            // Missing artist; not a failure.
            Err(SourceError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let Some(title) = meta_content(&html, "og:title") else {
            debug!(url = %url, "Ampwall page has no og:title");
            return Ok(Vec::new());
        };
        if self.is_placeholder(&title) {
            debug!(url = %url, "Ampwall returned placeholder page");
            return Ok(Vec::new());
        }

        let candidate = Candidate::artist(SourceId::Ampwall, artist_name(&title), url)
            .with_image(meta_content(&html, "og:image"));
        Ok(vec![candidate])
    }
}
