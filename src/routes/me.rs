use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::{
        contest::{MyContestsQuery, UserContestResponse},
        identity::Caller,
        team::{SaveTeamRequest, TeamResponse},
    },
    error::AppError,
    services::{contest_service, team_service},
    state::SharedState,
};

/// Endpoints scoped to the calling user.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/me/contests", get(my_contests))
        .route("/me/teams/{match_id}", get(get_team).put(save_team))
}

/// Contests the caller created, joined or can discover through a group.
#[utoipa::path(
    get,
    path = "/me/contests",
    tag = "me",
    params(("X-User-Id" = String, Header, description = "Caller identity"), MyContestsQuery),
    responses((status = 200, description = "Caller's contest index", body = [UserContestResponse]))
)]
pub async fn my_contests(
    State(state): State<SharedState>,
    caller: Caller,
    Query(query): Query<MyContestsQuery>,
) -> Result<Json<Vec<UserContestResponse>>, AppError> {
    Ok(Json(
        contest_service::my_contests(&state, &caller, query.status).await?,
    ))
}

/// Draft or replace the caller's team for a match.
#[utoipa::path(
    put,
    path = "/me/teams/{match_id}",
    tag = "me",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("match_id" = String, Path, description = "Provider match identifier")),
    request_body = SaveTeamRequest,
    responses(
        (status = 200, description = "Team saved", body = TeamResponse),
        (status = 400, description = "Team breaks composition rules")
    )
)]
pub async fn save_team(
    State(state): State<SharedState>,
    caller: Caller,
    Path(match_id): Path<String>,
    Valid(Json(payload)): Valid<Json<SaveTeamRequest>>,
) -> Result<Json<TeamResponse>, AppError> {
    Ok(Json(
        team_service::save_team(&state, &caller, match_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/me/teams/{match_id}",
    tag = "me",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("match_id" = String, Path, description = "Provider match identifier")),
    responses((status = 200, description = "Drafted team", body = TeamResponse))
)]
pub async fn get_team(
    State(state): State<SharedState>,
    caller: Caller,
    Path(match_id): Path<String>,
) -> Result<Json<TeamResponse>, AppError> {
    Ok(Json(team_service::get_team(&state, &caller, match_id).await?))
}
