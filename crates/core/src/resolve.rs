//! Streaming and catalog URL helpers.
//!
//! [`UrlResolver::resolve_artist_name`] turns a link someone pasted into an
//! artist name to search for. [`UrlResolver::lookup_embed`] finds the player
//! reference for a Bandcamp album or track. Both return `None` on any failure.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::sources::http::{build_client, get_json, get_text, DEFAULT_USER_AGENT};
use crate::sources::parse::MetaTags;
use crate::sources::{SourceError, SourceId};

const SPOTIFY_OEMBED: &str = "https://open.spotify.com/oembed";
const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
const BANDCAMP_PLAYER: &str = "https://bandcamp.com/EmbeddedPlayer";

/// Services a pasted link can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkService {
    Spotify,
    AppleMusic,
    Deezer,
    Tidal,
    YoutubeMusic,
    Bandcamp,
    Mirlo,
    Qobuz,
    Ampwall,
}

impl LinkService {
    pub fn detect(url: &str) -> Option<Self> {
        let parsed = Url::parse(url.trim()).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let service = match host {
            "open.spotify.com" | "spotify.com" => LinkService::Spotify,
            "music.apple.com" => LinkService::AppleMusic,
            "deezer.com" | "link.deezer.com" => LinkService::Deezer,
            "tidal.com" | "listen.tidal.com" => LinkService::Tidal,
            "music.youtube.com" => LinkService::YoutubeMusic,
            "mirlo.space" => LinkService::Mirlo,
            "qobuz.com" | "open.qobuz.com" | "play.qobuz.com" => LinkService::Qobuz,
            "ampwall.com" => LinkService::Ampwall,
            h if h == "bandcamp.com" || h.ends_with(".bandcamp.com") => LinkService::Bandcamp,
            _ => return None,
        };
        Some(service)
    }

    /// Site name as it appears in `og:site_name` and title suffixes.
    fn site_name(&self) -> &'static str {
        match self {
            LinkService::Spotify => "Spotify",
            LinkService::AppleMusic => "Apple Music",
            LinkService::Deezer => "Deezer",
            LinkService::Tidal => "TIDAL",
            LinkService::YoutubeMusic => "YouTube Music",
            LinkService::Bandcamp => "Bandcamp",
            LinkService::Mirlo => "Mirlo",
            LinkService::Qobuz => "Qobuz",
            LinkService::Ampwall => "Ampwall",
        }
    }
}

/// Player reference for a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedReference {
    pub platform: SourceId,
    /// "album" or "track"
    pub item_type: String,
    pub item_id: u64,
    pub embed_url: String,
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BandcampPageProperties {
    item_type: String,
    item_id: u64,
}

pub struct UrlResolver {
    client: Client,
    spotify_oembed: String,
    youtube_oembed: String,
}

impl UrlResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            spotify_oembed: SPOTIFY_OEMBED.to_string(),
            youtube_oembed: YOUTUBE_OEMBED.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = build_client(
            DEFAULT_USER_AGENT,
            Some(Duration::from_secs(config.enrichment.timeout_secs)),
        )?;
        Ok(Self::new(client))
    }

    /// Point the oEmbed lookups somewhere else.
    pub fn with_oembed_endpoints(mut self, spotify: &str, youtube: &str) -> Self {
        self.spotify_oembed = spotify.to_string();
        self.youtube_oembed = youtube.to_string();
        self
    }

    /// Best-guess artist name behind a streaming or catalog link.
    pub async fn resolve_artist_name(&self, url: &str) -> Option<String> {
        let service = LinkService::detect(url)?;
        let path = Url::parse(url.trim()).ok()?.path().to_string();

        let from_oembed = match service {
            LinkService::Spotify if path.starts_with("/artist/") => self
                .oembed(&self.spotify_oembed, url)
                .await
                .and_then(|o| o.title),
            LinkService::YoutubeMusic => self
                .oembed(&self.youtube_oembed, url)
                .await
                .and_then(|o| o.author_name)
                .map(|name| name.trim_end_matches(" - Topic").to_string()),
            _ => None,
        };
        if let Some(name) = from_oembed.filter(|n| !n.trim().is_empty()) {
            return Some(name.trim().to_string());
        }

        let html = match get_text(&self.client, "resolve", "page", url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "Resolve page fetch failed");
                return None;
            }
        };
        let name = artist_name_from_page(service, &path, &html);
        debug!(url, service = ?service, name = ?name, "Resolved link");
        name
    }

    async fn oembed(&self, endpoint: &str, url: &str) -> Option<OEmbed> {
        let request = format!(
            "{}?url={}&format=json",
            endpoint,
            urlencoding::encode(url.trim())
        );
        match get_json::<OEmbed>(&self.client, "resolve", "oembed", &request).await {
            Ok(oembed) => Some(oembed),
            Err(e) => {
                debug!(url, error = %e, "oEmbed lookup failed");
                None
            }
        }
    }

    /// Player reference for a Bandcamp album or track page.
    pub async fn lookup_embed(&self, url: &str) -> Option<EmbedReference> {
        if LinkService::detect(url)? != LinkService::Bandcamp {
            return None;
        }
        if !(url.contains("/album/") || url.contains("/track/")) {
            return None;
        }
        let html = match get_text(&self.client, SourceId::Bandcamp.as_str(), "embed", url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "Embed page fetch failed");
                return None;
            }
        };
        embed_from_page(&html)
    }
}

/// Artist name from a fetched page, by service conventions.
pub fn artist_name_from_page(service: LinkService, path: &str, html: &str) -> Option<String> {
    let tags = MetaTags::parse(html);
    let is_item = ["/album/", "/track/", "/song/", "/video/"]
        .iter()
        .any(|p| path.contains(p));

    let name = match service {
        LinkService::Bandcamp => tags.get("og:site_name").map(str::to_string),
        LinkService::Spotify => tags
            .get("og:description")
            .and_then(spotify_artist_from_description)
            .or_else(|| tags.get("og:title").map(|t| clean_title(service, t, false))),
        LinkService::Mirlo | LinkService::Qobuz | LinkService::Ampwall => tags
            .get("og:site_name")
            .filter(|s| !s.eq_ignore_ascii_case(service.site_name()))
            .map(str::to_string)
            .or_else(|| tags.get("og:title").map(|t| clean_title(service, t, false))),
        LinkService::AppleMusic | LinkService::Deezer | LinkService::Tidal | LinkService::YoutubeMusic => {
            tags.get("og:title").map(|t| clean_title(service, t, is_item))
        }
    };
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// "Listen to Sunrise on Spotify. Song · Echo · 2024" -> "Echo"
fn spotify_artist_from_description(description: &str) -> Option<String> {
    let tail = description.rsplit(". ").next()?;
    let parts: Vec<&str> = tail.split(" · ").map(str::trim).collect();
    (parts.len() >= 2 && !parts[1].is_empty()).then(|| parts[1].to_string())
}

/// Strip site decorations from an `og:title`. For album and track pages the
/// artist follows " by " (or the last " - " on Deezer).
fn clean_title(service: LinkService, title: &str, is_item: bool) -> String {
    let site = service.site_name();
    let mut title = title.trim().trim_start_matches('\u{200e}').trim();
    if let Some((head, _)) = title.split_once(" | ") {
        title = head;
    }
    for suffix in [format!(" on {}", site), format!(" - {}", site)] {
        if let Some(stripped) = title.strip_suffix(suffix.as_str()) {
            title = stripped;
        }
    }
    if is_item {
        let separator = if service == LinkService::Deezer { " - " } else { " by " };
        if let Some((_, artist)) = title.rsplit_once(separator) {
            title = artist;
        }
    } else if let Some((head, _)) = title.split_once(": ").or_else(|| title.split_once(" : ")) {
        title = head;
    }
    title.trim().to_string()
}

/// Read Bandcamp's `bc-page-properties` meta tag.
pub fn embed_from_page(html: &str) -> Option<EmbedReference> {
    let tags = MetaTags::parse(html);
    let raw = tags.get("bc-page-properties")?;
    let properties: BandcampPageProperties = match serde_json::from_str(raw) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "Unreadable bc-page-properties");
            return None;
        }
    };
    let item_type = match properties.item_type.as_str() {
        "a" | "album" => "album",
        "t" | "track" => "track",
        _ => return None,
    };
    Some(EmbedReference {
        platform: SourceId::Bandcamp,
        item_type: item_type.to_string(),
        item_id: properties.item_id,
        embed_url: format!(
            "{}/{}={}/size=large/bgcol=ffffff/linkcol=0687f5/tracklist=false/transparent=true/",
            BANDCAMP_PLAYER, item_type, properties.item_id
        ),
    })
}
