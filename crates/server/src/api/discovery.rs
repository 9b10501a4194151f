//! Search and enrichment handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use indiefind_core::discovery::panic_message;
use indiefind_core::{AggregatedResult, EnrichmentRecord, SearchOutcome};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::handlers::ErrorResponse;
use crate::metrics::SEARCH_FAILURES_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TextQueryParams {
    #[serde(default)]
    pub q: String,
}

/// Body of a search that failed as a whole. Same shape as a successful
/// outcome so clients can render it without a special case.
#[derive(Debug, Serialize)]
pub struct SearchErrorResponse {
    pub query: String,
    pub results: Vec<AggregatedResult>,
    pub enrichment_available: bool,
    pub error: String,
}

impl SearchErrorResponse {
    fn new(query: String, error: String) -> Self {
        Self {
            query,
            results: Vec::new(),
            enrichment_available: false,
            error,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/search?q=
///
/// Search every source and return reconciled results. The search runs on its
/// own task, so a panic anywhere in it still produces a JSON answer.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TextQueryParams>,
) -> Result<Json<SearchOutcome>, (StatusCode, Json<SearchErrorResponse>)> {
    let engine = state.discovery();
    let query = params.q.clone();

    let (reason, message) = match tokio::spawn(async move { engine.search(&query).await }).await {
        Ok(Ok(outcome)) => return Ok(Json(outcome)),
        Ok(Err(e)) => ("merge", e.to_string()),
        Err(e) if e.is_panic() => ("panic", panic_message(&*e.into_panic())),
        Err(e) => ("cancelled", e.to_string()),
    };

    error!(query = %params.q, reason, error = %message, "Search failed");
    SEARCH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    Err((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SearchErrorResponse::new(params.q, message)),
    ))
}

/// GET /api/v1/enrich?q=
///
/// Secondary facts about the artist. Lookup failures leave fields empty.
pub async fn enrich(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TextQueryParams>,
) -> Result<Json<EnrichmentRecord>, (StatusCode, Json<ErrorResponse>)> {
    if params.q.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Query parameter q is required".to_string(),
            }),
        ));
    }

    Ok(Json(state.enrichment().enrich(&params.q).await))
}
