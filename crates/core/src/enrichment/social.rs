//! Social link detection.

use serde::{Deserialize, Serialize};
use url::Url;

/// Platforms recognized as social links, with every domain they are served from.
const SOCIAL_PLATFORMS: &[(&str, &[&str])] = &[
    ("instagram", &["instagram.com", "instagr.am"]),
    ("twitter", &["twitter.com", "x.com"]),
    ("facebook", &["facebook.com", "fb.com"]),
    ("youtube", &["youtube.com", "youtu.be"]),
    ("tiktok", &["tiktok.com"]),
    ("soundcloud", &["soundcloud.com"]),
    ("bluesky", &["bsky.app"]),
    ("threads", &["threads.net"]),
];

/// Link-in-bio pages worth scraping for more links.
const LINK_AGGREGATORS: &[&str] = &["linktr.ee", "lnk.bio", "beacons.ai", "linkin.bio"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

fn host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host)
        .to_string();
    Some(host)
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Social platform a URL belongs to, if any.
pub fn social_platform(url: &str) -> Option<&'static str> {
    let host = host(url)?;
    SOCIAL_PLATFORMS
        .iter()
        .find(|(_, domains)| domains.iter().any(|d| host_matches(&host, d)))
        .map(|(platform, _)| *platform)
}

pub fn is_link_aggregator(url: &str) -> bool {
    host(url)
        .map(|h| LINK_AGGREGATORS.iter().any(|d| host_matches(&h, d)))
        .unwrap_or(false)
}

/// Social links among `urls`, first URL per platform.
pub fn social_links<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<SocialLink> {
    let mut links: Vec<SocialLink> = Vec::new();
    for url in urls {
        let Some(platform) = social_platform(url) else {
            continue;
        };
        if links.iter().any(|l| l.platform == platform) {
            continue;
        }
        links.push(SocialLink {
            platform: platform.to_string(),
            url: url.trim().to_string(),
        });
    }
    links
}

/// Merge link lists in priority order; the first list to name a platform wins.
pub fn merge_first_wins(sources: impl IntoIterator<Item = Vec<SocialLink>>) -> Vec<SocialLink> {
    let mut merged: Vec<SocialLink> = Vec::new();
    for link in sources.into_iter().flatten() {
        if !merged.iter().any(|l| l.platform == link.platform) {
            merged.push(link);
        }
    }
    merged
}
