//! Release freshness handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use indiefind_core::{ArtistReleaseState, ReleaseCheck, SourceId};
use serde::Deserialize;

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReleaseCheckRequest {
    pub artist: String,
    /// Artist page URL per platform.
    #[serde(default)]
    pub platforms: HashMap<SourceId, String>,
    /// Caller-owned state. When absent the server keeps state itself, keyed
    /// by the normalized artist name.
    #[serde(default)]
    pub state: Option<ArtistReleaseState>,
}

/// POST /api/v1/releases/check
///
/// Report at most one new release for the artist and return the updated state.
pub async fn check_releases(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReleaseCheckRequest>,
) -> Result<Json<ReleaseCheck>, (StatusCode, Json<ErrorResponse>)> {
    if body.artist.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "artist cannot be empty".to_string(),
            }),
        ));
    }

    let now = Utc::now();
    let checker = state.freshness();
    let check = match body.state {
        Some(known) => checker.check(&body.artist, &body.platforms, known, now).await,
        None => {
            checker
                .check_with_store(state.release_store(), &body.artist, &body.platforms, now)
                .await
        }
    };
    Ok(Json(check))
}
