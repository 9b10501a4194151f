//! Markup extraction strategies.
//!
//! Scraping rules live here as data-driven parsers so each adapter only decides
//! which rules to use. All parsers are synchronous; `scraper::Html` is not `Send`
//! and must never be held across an await point.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use super::http::canonical_url;
use super::{Candidate, EntityKind, LatestRelease, ReleaseKind, SourceId};

/// Turns a search results page into candidates.
pub trait SearchPageParser: Send + Sync {
    fn parse(&self, html: &str, source: SourceId, base_url: &str) -> Vec<Candidate>;
}

/// Extracts the most recent release from an artist page.
pub trait ReleasePageParser: Send + Sync {
    fn parse(&self, html: &str, page_url: &str) -> Option<LatestRelease>;
}

/// How a search result declares what it is.
#[derive(Debug, Clone)]
pub enum KindRule {
    /// Every result on the page has this kind.
    Fixed(EntityKind),
    /// A child element's text holds the type label.
    Label(&'static str),
}

/// CSS selector rules for a search results page.
#[derive(Debug, Clone)]
pub struct SelectorSearchParser {
    pub item: &'static str,
    pub kind: KindRule,
    pub name: &'static str,
    pub link: &'static str,
    /// Element whose text is the canonical URL, preferred over `link`'s href.
    pub url_text: Option<&'static str>,
    pub image: Option<&'static str>,
    /// Byline such as "by Artist" or "from Album by Artist".
    pub byline: Option<&'static str>,
}

impl SelectorSearchParser {
    /// Rules for Bandcamp's mixed-type search results.
    pub fn bandcamp() -> Self {
        Self {
            item: "li.searchresult",
            kind: KindRule::Label(".itemtype"),
            name: ".heading a",
            link: ".heading a",
            url_text: Some(".itemurl"),
            image: Some(".art img"),
            byline: Some(".subhead"),
        }
    }

    /// Rules for Qobuz's artist-only search results.
    pub fn qobuz() -> Self {
        Self {
            item: ".ArtistCard",
            kind: KindRule::Fixed(EntityKind::Artist),
            name: ".ArtistCard__name",
            link: "a.ArtistCard__link",
            url_text: None,
            image: Some("img"),
            byline: None,
        }
    }
}

impl SearchPageParser for SelectorSearchParser {
    fn parse(&self, html: &str, source: SourceId, base_url: &str) -> Vec<Candidate> {
        let Some(item_sel) = compile(self.item) else {
            return Vec::new();
        };
        let Some(name_sel) = compile(self.name) else {
            return Vec::new();
        };
        let Some(link_sel) = compile(self.link) else {
            return Vec::new();
        };
        let kind_sel = match &self.kind {
            KindRule::Label(s) => compile(s),
            KindRule::Fixed(_) => None,
        };
        let url_text_sel = self.url_text.and_then(compile);
        let image_sel = self.image.and_then(compile);
        let byline_sel = self.byline.and_then(compile);

        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        for item in document.select(&item_sel) {
            let kind = match &self.kind {
                KindRule::Fixed(kind) => Some(*kind),
                KindRule::Label(_) => kind_sel
                    .as_ref()
                    .and_then(|sel| first_text(&item, sel))
                    .and_then(|label| EntityKind::from_label(&label)),
            };
            let Some(kind) = kind else {
                continue;
            };

            let Some(name) = first_text(&item, &name_sel) else {
                continue;
            };

            let url = url_text_sel
                .as_ref()
                .and_then(|sel| first_text(&item, sel))
                .filter(|u| u.starts_with("http"))
                .or_else(|| {
                    item.select(&link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .and_then(|href| absolutize(base_url, href))
                });
            let Some(url) = url else {
                continue;
            };

            let image = image_sel
                .as_ref()
                .and_then(|sel| item.select(sel).next())
                .and_then(image_src)
                .and_then(|src| absolutize(base_url, &src));

            let associated_artist = match kind {
                EntityKind::Artist => None,
                _ => byline_sel
                    .as_ref()
                    .and_then(|sel| first_text(&item, sel))
                    .and_then(|b| artist_from_byline(&b)),
            };

            candidates.push(Candidate {
                source,
                name,
                associated_artist,
                kind,
                url: canonical_url(&url),
                image,
            });
        }

        candidates
    }
}

/// CSS selector rules for the release listing on an artist page.
#[derive(Debug, Clone)]
pub struct SelectorReleaseParser {
    pub item: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub image: Option<&'static str>,
    pub date: Option<&'static str>,
}

impl SelectorReleaseParser {
    /// Rules for a Bandcamp artist's music grid (newest first).
    pub fn bandcamp() -> Self {
        Self {
            item: "#music-grid li.music-grid-item",
            title: "p.title",
            link: "a",
            image: Some("img"),
            date: None,
        }
    }

    /// Rules for a Qobuz artist discography (newest first).
    pub fn qobuz() -> Self {
        Self {
            item: ".ReleaseCard",
            title: ".ReleaseCardInfosTitle",
            link: "a",
            image: Some("img"),
            date: Some(".ReleaseCardInfosData"),
        }
    }
}

impl ReleasePageParser for SelectorReleaseParser {
    fn parse(&self, html: &str, page_url: &str) -> Option<LatestRelease> {
        let item_sel = compile(self.item)?;
        let title_sel = compile(self.title)?;
        let link_sel = compile(self.link)?;
        let image_sel = self.image.and_then(compile);
        let date_sel = self.date.and_then(compile);

        let document = Html::parse_document(html);
        let item = document.select(&item_sel).next()?;

        // Titles on grids may include a second line with the artist name.
        let title = first_text(&item, &title_sel)?
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())?
            .to_string();
        let href = item
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))?;
        let url = absolutize(page_url, href)?;
        let kind = if url.contains("/track/") {
            ReleaseKind::Track
        } else {
            ReleaseKind::Album
        };
        let image = image_sel
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .and_then(image_src)
            .and_then(|src| absolutize(page_url, &src));
        let release_date = date_sel.as_ref().and_then(|sel| first_text(&item, sel));

        Some(LatestRelease {
            title,
            kind,
            url: canonical_url(&url),
            image,
            release_date,
        })
    }
}

/// `<meta>` tags of a page keyed by `property`, `name` or `itemprop`.
///
/// The first non-empty value per key wins.
#[derive(Debug, Clone, Default)]
pub struct MetaTags {
    tags: HashMap<String, String>,
}

impl MetaTags {
    pub fn parse(html: &str) -> Self {
        let mut tags = HashMap::new();
        let Some(selector) = compile("meta[content]") else {
            return Self { tags };
        };
        let document = Html::parse_document(html);
        for meta in document.select(&selector) {
            let element = meta.value();
            let key = element
                .attr("property")
                .or_else(|| element.attr("name"))
                .or_else(|| element.attr("itemprop"));
            let (Some(key), Some(content)) = (key, element.attr("content")) else {
                continue;
            };
            let content = content.trim();
            if !content.is_empty() {
                tags.entry(key.to_string())
                    .or_insert_with(|| content.to_string());
            }
        }
        Self { tags }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Content of `<meta property=".." content="..">` (or `name`, `itemprop`).
pub fn meta_content(html: &str, property: &str) -> Option<String> {
    MetaTags::parse(html).get(property).map(str::to_string)
}

/// Text of the first element matching `selector` anywhere in the page.
pub fn page_text(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = compile(selector)?;
    let root = document.root_element();
    first_text(&root, &selector)
}

/// All absolute outbound `http(s)` link targets on a page, in document order.
pub fn outbound_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(selector) = compile("a[href]") else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for a in document.select(&selector) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Some(url) = absolutize(page_url, href) else {
            continue;
        };
        if url.starts_with("http") && !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

/// Resolve `href` against `base`; absolute hrefs pass through.
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .ok()
}

/// "by Artist" or "from Album by Artist" -> "Artist".
fn artist_from_byline(byline: &str) -> Option<String> {
    let text = byline.split_whitespace().collect::<Vec<_>>().join(" ");
    let (idx, _) = text
        .match_indices("by ")
        .filter(|(i, _)| *i == 0 || text[..*i].ends_with(' '))
        .last()?;
    let artist = text[idx + 3..].trim();
    (!artist.is_empty()).then(|| artist.to_string())
}

fn image_src(img: ElementRef<'_>) -> Option<String> {
    let value = img.value();
    value
        .attr("data-original")
        .or_else(|| value.attr("data-src"))
        .or_else(|| value.attr("src"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with("data:"))
}

fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|t| !t.is_empty())
}

fn compile(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(selector, error = %e, "Invalid selector");
            None
        }
    }
}
