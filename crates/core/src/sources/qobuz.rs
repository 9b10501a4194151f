//! Qobuz artist search and discography.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use tracing::debug;

use crate::config::QobuzConfig;
use crate::identity::Query;

use super::http::{build_client, get_text, DEFAULT_USER_AGENT};
use super::parse::{ReleasePageParser, SearchPageParser, SelectorReleaseParser, SelectorSearchParser};
use super::{Candidate, CandidateSource, LatestRelease, ReleaseSource, SourceError, SourceId};

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{2,4})\b").unwrap());

pub struct QobuzSource {
    client: Client,
    base_url: String,
    locale: String,
    search_parser: Box<dyn SearchPageParser>,
    release_parser: Box<dyn ReleasePageParser>,
}

impl QobuzSource {
    pub fn new(config: &QobuzConfig) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            locale: config.locale.clone(),
            search_parser: Box::new(SelectorSearchParser::qobuz()),
            release_parser: Box::new(SelectorReleaseParser::qobuz()),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/{}/search/artists/{}",
            self.base_url,
            self.locale,
            urlencoding::encode(query)
        )
    }
}

/// Qobuz prints "Released on 6/15/24 by Label"; keep only the date token.
fn slash_date(text: &str) -> Option<String> {
    SLASH_DATE.captures(text).map(|caps| caps[1].to_string())
}

#[async_trait]
impl CandidateSource for QobuzSource {
    fn id(&self) -> SourceId {
        SourceId::Qobuz
    }

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError> {
        let url = self.search_url(&query.raw);
        let html = get_text(&self.client, SourceId::Qobuz.as_str(), "search", &url).await?;
        let candidates = self.search_parser.parse(&html, SourceId::Qobuz, &self.base_url);
        debug!(query = %query.raw, results = candidates.len(), "Qobuz search complete");
        Ok(candidates)
    }
}

#[async_trait]
impl ReleaseSource for QobuzSource {
    fn id(&self) -> SourceId {
        SourceId::Qobuz
    }

    async fn latest_release(&self, artist_url: &str) -> Result<Option<LatestRelease>, SourceError> {
        let html = get_text(&self.client, SourceId::Qobuz.as_str(), "artist_page", artist_url).await?;
        Ok(self.release_parser.parse(&html, artist_url).map(|mut release| {
            release.release_date = release.release_date.as_deref().and_then(slash_date);
            release
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> QobuzSource {
        QobuzSource::new(&QobuzConfig {
            enabled: true,
            base_url: server.uri(),
            locale: "us-en".to_string(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_parses_artist_cards() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/us-en/search/artists/Sunrise%20Collective"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="ArtistCard">
                     <a class="ArtistCard__link" href="/us-en/interpreter/sunrise-collective/123">
                       <img src="https://static.qobuz.com/images/artists/123.jpg">
                       <span class="ArtistCard__name">Sunrise Collective</span>
                     </a>
                   </div>"#,
            ))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let candidates = CandidateSource::find(&source, &Query::new("Sunrise Collective")).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, SourceId::Qobuz);
        assert_eq!(candidates[0].name, "Sunrise Collective");
        assert_eq!(
            candidates[0].url,
            format!("{}/us-en/interpreter/sunrise-collective/123", server.uri())
        );
        assert!(candidates[0].image.is_some());
    }

    #[tokio::test]
    async fn test_latest_release_slash_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/us-en/interpreter/sunrise-collective/123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="ReleaseCard">
                     <a href="/us-en/album/nightfall/abc"><img src="/img/abc.jpg"></a>
                     <p class="ReleaseCardInfosTitle">Nightfall</p>
                     <p class="ReleaseCardInfosData">Released on 6/15/2024 by Indie Label</p>
                   </div>"#,
            ))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let url = format!("{}/us-en/interpreter/sunrise-collective/123", server.uri());
        let release = source.fetch_latest(&url).await.unwrap();
        assert_eq!(release.title, "Nightfall");
        assert_eq!(release.release_date.as_deref(), Some("6/15/2024"));
        assert_eq!(release.date(), NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn test_slash_date() {
        assert_eq!(slash_date("Released on 6/15/24 by X").as_deref(), Some("6/15/24"));
        assert_eq!(slash_date("no date"), None);
    }
}
