//! HTTP plumbing shared by the adapters.

use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::SourceError;
use crate::metrics::{SOURCE_REQUESTS, SOURCE_REQUEST_DURATION};

/// User-Agent sent to every source.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "indiefind/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/lelloman/indiefind )"
);

/// Build a client with the adapter's own timeout. `None` means no timeout.
pub fn build_client(user_agent: &str, timeout: Option<Duration>) -> Result<Client, SourceError> {
    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(SourceError::from)
}

/// GET a URL and return the response if the status is a success.
///
/// `source` labels the request in logs and metrics.
pub async fn get(
    client: &Client,
    source: &str,
    operation: &str,
    url: &str,
) -> Result<Response, SourceError> {
    let start = Instant::now();
    debug!(source, operation, url, "Source request");

    let result = client.get(url).send().await;
    SOURCE_REQUEST_DURATION
        .with_label_values(&[source, operation])
        .observe(start.elapsed().as_secs_f64());

    let response = match result {
        Ok(r) => r,
        Err(e) => {
            SOURCE_REQUESTS
                .with_label_values(&[source, operation, "error"])
                .inc();
            return Err(e.into());
        }
    };

    let status = response.status();
    if status.is_success() {
        SOURCE_REQUESTS
            .with_label_values(&[source, operation, "success"])
            .inc();
        return Ok(response);
    }

    SOURCE_REQUESTS
        .with_label_values(&[source, operation, "error"])
        .inc();
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(SourceError::NotFound)
    } else {
        Err(SourceError::Status(status.as_u16()))
    }
}

/// GET a page body as text.
pub async fn get_text(
    client: &Client,
    source: &str,
    operation: &str,
    url: &str,
) -> Result<String, SourceError> {
    let response = get(client, source, operation, url).await?;
    response.text().await.map_err(SourceError::from)
}

/// GET and decode a JSON body.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    source: &str,
    operation: &str,
    url: &str,
) -> Result<T, SourceError> {
    let response = get(client, source, operation, url).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Drop query string and fragment, and any trailing slash.
pub fn canonical_url(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    base.trim_end_matches('/').to_string()
}

/// Last non-empty path segment of a URL.
pub fn trailing_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.to_string())
}
