//! RSS 2.0 and Atom feed parsing.

use std::borrow::Cow;

use chrono::NaiveDate;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{LatestRelease, ReleaseKind, SourceError};
use crate::dates::parse_release_date;

/// One feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Raw publish date as found in the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// First path segment of the link; identifies the publishing artist on
    /// platforms that host many artists under one domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl FeedItem {
    pub fn date(&self) -> Option<NaiveDate> {
        self.published.as_deref().and_then(parse_release_date)
    }

    pub fn into_release(self) -> LatestRelease {
        let kind = if self.link.contains("/track/") {
            ReleaseKind::Track
        } else {
            ReleaseKind::Album
        };
        LatestRelease {
            title: self.title,
            kind,
            url: self.link,
            image: self.image,
            release_date: self.published,
        }
    }
}

/// Newest item by publish date. Undated items lose to dated ones.
pub fn newest(items: impl IntoIterator<Item = FeedItem>) -> Option<FeedItem> {
    items.into_iter().max_by_key(|item| item.date())
}

/// First non-empty path segment of a URL.
pub fn owner_slug(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.path_segments()?
        .find(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

#[derive(Default)]
struct Pending {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    image: Option<String>,
}

impl Pending {
    fn finish(self) -> Option<FeedItem> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let link = self.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
        Some(FeedItem {
            owner: owner_slug(&link),
            title,
            link,
            published: self.published.map(|p| p.trim().to_string()),
            image: self.image,
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Published,
    Other,
}

/// Parse an RSS or Atom document into items, in document order.
///
/// Items without a title or link are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, SourceError> {
    let mut reader = Reader::from_str(xml);
    // Feeds in the wild carry bare `&` in titles ("R&B").
    reader.config_mut().allow_dangling_amp = true;

    let mut items = Vec::new();
    let mut current: Option<Pending> = None;
    let mut field = Field::Other;
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                saw_root = true;
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => current = Some(Pending::default()),
                    _ if current.is_some() => {
                        field = field_for(name.as_ref());
                        text.clear();
                        if let Some(pending) = current.as_mut() {
                            apply_attributes(pending, &e);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                if let Some(pending) = current.as_mut() {
                    apply_attributes(pending, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if field != Field::Other {
                    if let Ok(raw) = std::str::from_utf8(e.as_ref()) {
                        text.push_str(&unescape(raw).unwrap_or(Cow::Borrowed(raw)));
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if field != Field::Other {
                    if let Ok(raw) = std::str::from_utf8(e.as_ref()) {
                        text.push_str(raw);
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if field != Field::Other {
                    text.push_str(&resolve_reference(&e));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        if let Some(item) = current.take().and_then(Pending::finish) {
                            items.push(item);
                        }
                    }
                    _ => {
                        if let Some(pending) = current.as_mut() {
                            let value = std::mem::take(&mut text);
                            match field {
                                Field::Title if pending.title.is_none() => {
                                    pending.title = Some(value)
                                }
                                Field::Link if pending.link.is_none() && !value.is_empty() => {
                                    pending.link = Some(value)
                                }
                                Field::Published if pending.published.is_none() => {
                                    pending.published = Some(value)
                                }
                                _ => {}
                            }
                        }
                        field = Field::Other;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("Invalid feed: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SourceError::Parse("Empty feed document".to_string()));
    }
    Ok(items)
}

fn field_for(local_name: &[u8]) -> Field {
    match local_name {
        b"title" => Field::Title,
        b"link" | b"guid" => Field::Link,
        b"pubDate" | b"published" | b"updated" | b"date" => Field::Published,
        _ => Field::Other,
    }
}

/// Atom `<link href>`, `<enclosure url>` and `<media:content url>` carry their
/// value in attributes.
fn apply_attributes(pending: &mut Pending, e: &BytesStart<'_>) {
    let local = e.local_name();
    let wanted: &[u8] = match local.as_ref() {
        b"link" => b"href",
        b"enclosure" | b"content" | b"thumbnail" => b"url",
        b"image" => b"href",
        _ => return,
    };

    let mut value = None;
    let mut rel = None;
    let mut mime = None;
    for attr in e.attributes().flatten() {
        let Ok(v) = std::str::from_utf8(&attr.value) else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            k if k == wanted => {
                value = Some(attr.unescape_value().map_or_else(|_| v.to_string(), Cow::into_owned))
            }
            b"rel" => rel = Some(v.to_string()),
            b"type" => mime = Some(v.to_string()),
            _ => {}
        }
    }
    let Some(value) = value else {
        return;
    };

    if local.as_ref() == b"link" {
        if rel.as_deref().is_none_or(|r| r == "alternate") && pending.link.is_none() {
            pending.link = Some(value);
        }
    } else if pending.image.is_none()
        && mime.as_deref().is_none_or(|m| m.starts_with("image/"))
    {
        pending.image = Some(value);
    }
}

/// Character references and the five XML entities resolve; anything else is
/// kept as written.
fn resolve_reference(e: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return ch.to_string();
    }
    let name = String::from_utf8_lossy(e.as_ref());
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{};", name))
}
