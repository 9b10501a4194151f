//! Enrichment chain for one artist.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::social::{is_link_aggregator, merge_first_wins, social_links, SocialLink};
use crate::config::Config;
use crate::identity::Query;
use crate::sources::http::{build_client, get_text, DEFAULT_USER_AGENT};
use crate::sources::parse::outbound_links;
use crate::sources::{DiscogsClient, MbReleaseGroup, MbUrlRelation, MusicBrainzClient, SourceError};

/// Releases before this year set [`EnrichmentRecord::pre_2005`].
const PRE_2005_CUTOFF: i32 = 2005;

/// Secondary facts about an artist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discogs_url: Option<String>,
    pub pre_2005: bool,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
}

impl EnrichmentRecord {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }
}

/// Links pulled from the artist's MusicBrainz relations.
#[derive(Debug, Default)]
struct RelationLinks {
    official_site: Option<String>,
    discogs_url: Option<String>,
    urls: Vec<String>,
}

fn classify_relations(relations: &[MbUrlRelation]) -> RelationLinks {
    let mut links = RelationLinks::default();
    for relation in relations {
        match relation.relation_type.as_str() {
            "official homepage" if links.official_site.is_none() => {
                links.official_site = Some(relation.url.clone());
            }
            "discogs" if links.discogs_url.is_none() => {
                links.discogs_url = Some(relation.url.clone());
            }
            _ => {}
        }
        links.urls.push(relation.url.clone());
    }
    links
}

fn has_pre_2005_release(groups: &[MbReleaseGroup]) -> bool {
    groups
        .iter()
        .filter_map(MbReleaseGroup::first_release_year)
        .any(|year| year < PRE_2005_CUTOFF)
}

/// Looks up official site, Discogs profile, social links and catalog age.
///
/// Makes exactly three MusicBrainz calls per artist; the client spaces them out.
pub struct EnrichmentPipeline {
    musicbrainz: Arc<MusicBrainzClient>,
    discogs: DiscogsClient,
    client: Client,
}

impl EnrichmentPipeline {
    pub fn new(musicbrainz: Arc<MusicBrainzClient>, discogs: DiscogsClient, client: Client) -> Self {
        Self {
            musicbrainz,
            discogs,
            client,
        }
    }

    pub fn from_config(config: &Config, musicbrainz: Arc<MusicBrainzClient>) -> Result<Self, SourceError> {
        let discogs = DiscogsClient::new(&config.discogs)?;
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.enrichment.timeout_secs)),
        )?;
        Ok(Self::new(musicbrainz, discogs, client))
    }

    /// Enrich the artist matching `raw`. Every failure just leaves fields empty.
    pub async fn enrich(&self, raw: &str) -> EnrichmentRecord {
        let query = Query::new(raw.trim());
        let mut record = EnrichmentRecord::empty(raw);

        // 1. Identity
        let artist = match self.musicbrainz.find_artist(&query).await {
            Ok(Some(artist)) => artist,
            Ok(None) => {
                debug!(query = %query.raw, "No trusted MusicBrainz match");
                return record;
            }
            Err(e) => {
                warn!(query = %query.raw, error = %e, "MusicBrainz search failed");
                return record;
            }
        };
        record.musicbrainz_id = Some(artist.id.clone());

        // 2. URL relations
        let relations = match self.musicbrainz.artist_urls(&artist.id).await {
            Ok(relations) => relations,
            Err(e) => {
                warn!(mbid = %artist.id, error = %e, "MusicBrainz relations failed");
                return record;
            }
        };
        let links = classify_relations(&relations);
        record.official_site = links.official_site.clone();
        record.discogs_url = links.discogs_url.clone();

        // 3 and 4 overlap; the release-group call still waits for the rate limit.
        let (external, groups) = futures::join!(
            self.external_links(&links),
            self.musicbrainz.release_groups(&artist.id)
        );
        let (discogs, site, aggregator) = external;

        record.pre_2005 = match groups {
            Ok(groups) => has_pre_2005_release(&groups),
            Err(e) => {
                warn!(mbid = %artist.id, error = %e, "MusicBrainz release groups failed");
                false
            }
        };

        // 5. Merge by source priority
        record.social_links = merge_first_wins([
            social_links(links.urls.iter().map(String::as_str)),
            social_links(discogs.iter().map(String::as_str)),
            social_links(site.iter().map(String::as_str)),
            social_links(aggregator.iter().map(String::as_str)),
        ]);

        info!(
            query = %query.raw,
            mbid = %artist.id,
            social_links = record.social_links.len(),
            pre_2005 = record.pre_2005,
            "Enrichment complete"
        );
        record
    }

    /// Discogs profile links and official site links in parallel, then the first
    /// link aggregator found among everything seen so far.
    async fn external_links(&self, links: &RelationLinks) -> (Vec<String>, Vec<String>, Vec<String>) {
        let discogs = async {
            let Some(url) = links.discogs_url.as_deref() else {
                return Vec::new();
            };
            self.discogs.artist_urls(url).await.unwrap_or_else(|e| {
                warn!(url, error = %e, "Discogs lookup failed");
                Vec::new()
            })
        };
        let site = async {
            match links.official_site.as_deref() {
                Some(url) => self.page_links("official_site", url).await,
                None => Vec::new(),
            }
        };
        let (discogs, site) = futures::join!(discogs, site);

        let aggregator_url = links
            .urls
            .iter()
            .chain(discogs.iter())
            .chain(site.iter())
            .find(|url| is_link_aggregator(url))
            .cloned();
        let aggregator = match aggregator_url {
            Some(url) => self.page_links("link_aggregator", &url).await,
            None => Vec::new(),
        };

        (discogs, site, aggregator)
    }

    async fn page_links(&self, operation: &str, url: &str) -> Vec<String> {
        match get_text(&self.client, "enrichment", operation, url).await {
            Ok(html) => outbound_links(&html, url),
            Err(e) => {
                warn!(url, operation, error = %e, "Page scrape failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscogsConfig, MusicBrainzConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relation(kind: &str, url: &str) -> MbUrlRelation {
        MbUrlRelation {
            relation_type: kind.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_classify_relations() {
        let links = classify_relations(&[
            relation("official homepage", "https://echo.example.com"),
            relation("discogs", "https://www.discogs.com/artist/1-Echo"),
            relation("social network", "https://instagram.com/echo"),
            relation("official homepage", "https://second.example.com"),
        ]);
        assert_eq!(links.official_site.as_deref(), Some("https://echo.example.com"));
        assert_eq!(links.discogs_url.as_deref(), Some("https://www.discogs.com/artist/1-Echo"));
        assert_eq!(links.urls.len(), 4);
    }

    #[test]
    fn test_pre_2005_flag() {
        let group = |date: Option<&str>| MbReleaseGroup {
            id: "rg".to_string(),
            title: "Sunrise".to_string(),
            first_release_date: date.map(str::to_string),
        };
        assert!(has_pre_2005_release(&[group(Some("2010-01-01")), group(Some("1999"))]));
        assert!(!has_pre_2005_release(&[group(Some("2005-01-01")), group(None)]));
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_full_chain() {
        let server = MockServer::start().await;
        let site_url = format!("{}/site", server.uri());

        mount_json(
            &server,
            "/ws/2/artist",
            serde_json::json!({"artists": [{"id": "mb-1", "name": "Echo", "score": 100}]}),
        )
        .await;
        mount_json(
            &server,
            "/ws/2/artist/mb-1",
            serde_json::json!({"relations": [
                {"type": "official homepage", "url": {"resource": site_url}},
                {"type": "discogs", "url": {"resource": "https://www.discogs.com/artist/42-Echo"}},
                {"type": "social network", "url": {"resource": "https://instagram.com/echo_mb"}}
            ]}),
        )
        .await;
        mount_json(
            &server,
            "/ws/2/release-group",
            serde_json::json!({"release-groups": [
                {"id": "rg-1", "title": "Old", "first-release-date": "2001-03-01"}
            ]}),
        )
        .await;
        mount_json(
            &server,
            "/artists/42",
            serde_json::json!({"urls": ["https://instagram.com/echo_discogs", "https://x.com/echo"]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/site"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                   <a href="https://x.com/echo_site">X</a>
                   <a href="https://youtube.com/@echo">YouTube</a>
                   <a href="/about">About</a>
                   </body></html>"#,
            ))
            .mount(&server)
            .await;

        let musicbrainz = Arc::new(
            MusicBrainzClient::new(&MusicBrainzConfig {
                base_url: Some(format!("{}/ws/2", server.uri())),
                rate_limit_ms: 0,
                ..MusicBrainzConfig::default()
            })
            .unwrap(),
        );
        let discogs = DiscogsClient::new(&DiscogsConfig {
            base_url: server.uri(),
            token: None,
            timeout_secs: 2,
        })
        .unwrap();
        let client = build_client(DEFAULT_USER_AGENT, Some(Duration::from_secs(2))).unwrap();
        let pipeline = EnrichmentPipeline::new(musicbrainz, discogs, client);

        let record = pipeline.enrich("Echo").await;
        assert_eq!(record.musicbrainz_id.as_deref(), Some("mb-1"));
        assert_eq!(record.official_site.as_deref(), Some(site_url.as_str()));
        assert!(record.pre_2005);

        let pairs: Vec<_> = record
            .social_links
            .iter()
            .map(|l| (l.platform.as_str(), l.url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("instagram", "https://instagram.com/echo_mb"),
                ("twitter", "https://x.com/echo"),
                ("youtube", "https://youtube.com/@echo"),
            ]
        );
    }

    #[tokio::test]
    async fn test_untrusted_match_stops_after_one_call() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/ws/2/artist",
            serde_json::json!({"artists": [{"id": "mb-9", "name": "Somebody Else", "score": 100}]}),
        )
        .await;

        let musicbrainz = Arc::new(
            MusicBrainzClient::new(&MusicBrainzConfig {
                base_url: Some(format!("{}/ws/2", server.uri())),
                rate_limit_ms: 0,
                ..MusicBrainzConfig::default()
            })
            .unwrap(),
        );
        let discogs = DiscogsClient::new(&DiscogsConfig::default()).unwrap();
        let client = build_client(DEFAULT_USER_AGENT, None).unwrap();
        let pipeline = EnrichmentPipeline::new(musicbrainz, discogs, client);

        let record = pipeline.enrich("Echo").await;
        assert_eq!(record, EnrichmentRecord::empty("Echo"));
    }
}
