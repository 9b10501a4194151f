//! URL resolution and embed lookup handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use indiefind_core::{EmbedReference, LinkService};
use serde::{Deserialize, Serialize};

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<LinkService>,
    pub artist_name: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn require_url(params: &UrlParams) -> Result<&str, HandlerError> {
    let url = params.url.trim();
    if url.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Query parameter url is required"));
    }
    Ok(url)
}

/// GET /api/v1/resolve?url=
///
/// Best-guess artist name behind a streaming or catalog URL.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UrlParams>,
) -> Result<Json<ResolveResponse>, HandlerError> {
    let url = require_url(&params)?;

    match state.resolver().resolve_artist_name(url).await {
        Some(artist_name) => Ok(Json(ResolveResponse {
            url: url.to_string(),
            service: LinkService::detect(url),
            artist_name,
        })),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("Could not resolve an artist name from {}", url),
        )),
    }
}

/// GET /api/v1/embed?url=
///
/// Playable-preview reference for a catalog album or track page.
pub async fn embed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UrlParams>,
) -> Result<Json<EmbedReference>, HandlerError> {
    let url = require_url(&params)?;

    state
        .resolver()
        .lookup_embed(url)
        .await
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No embeddable item at {}", url)))
}
