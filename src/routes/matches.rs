use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::matches::{MatchListQuery, MatchSummary, SquadPlayerResponse},
    error::AppError,
    services::match_service,
    state::SharedState,
};

/// Read-only views of the provider feed.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches))
        .route("/matches/{match_id}/squad", get(squad))
}

/// Current matches from the provider, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    params(MatchListQuery),
    responses(
        (status = 200, description = "Match feed", body = [MatchSummary]),
        (status = 502, description = "Provider unavailable")
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchSummary>>, AppError> {
    Ok(Json(match_service::list_matches(&state, query.status).await?))
}

/// Players available for drafting.
#[utoipa::path(
    get,
    path = "/matches/{match_id}/squad",
    tag = "matches",
    params(("match_id" = String, Path, description = "Provider match identifier")),
    responses((status = 200, description = "Squad", body = [SquadPlayerResponse]))
)]
pub async fn squad(
    State(state): State<SharedState>,
    Path(match_id): Path<String>,
) -> Result<Json<Vec<SquadPlayerResponse>>, AppError> {
    Ok(Json(match_service::squad(&state, match_id).await?))
}
