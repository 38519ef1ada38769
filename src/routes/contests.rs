use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::ContestRef,
    dto::{
        contest::{
            ContestResponse, CreateContestRequest, LeaderboardEntry, UpdateContestStatusRequest,
        },
        identity::Caller,
    },
    error::AppError,
    services::contest_service,
    state::SharedState,
};

/// Contest endpoints nested under a group's match.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/groups/{id}/matches/{match_id}/contests",
            get(list_contests).post(create_contest),
        )
        .route(
            "/groups/{id}/matches/{match_id}/contests/{contest_id}/join",
            post(join_contest),
        )
        .route(
            "/groups/{id}/matches/{match_id}/contests/{contest_id}/leaderboard",
            get(leaderboard),
        )
        .route(
            "/groups/{id}/matches/{match_id}/contests/{contest_id}/status",
            put(update_status),
        )
}

fn contest_ref((group_id, match_id, contest_id): (Uuid, String, Uuid)) -> ContestRef {
    ContestRef {
        group_id,
        match_id,
        contest_id,
    }
}

/// Create a contest; the creator joins it immediately.
#[utoipa::path(
    post,
    path = "/groups/{id}/matches/{match_id}/contests",
    tag = "contests",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier"),
    ("match_id" = String, Path, description = "Provider match identifier")),
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created", body = ContestResponse),
        (status = 404, description = "Group unknown or match absent from the feed")
    )
)]
pub async fn create_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path((id, match_id)): Path<(Uuid, String)>,
    Valid(Json(payload)): Valid<Json<CreateContestRequest>>,
) -> Result<(StatusCode, Json<ContestResponse>), AppError> {
    let contest =
        contest_service::create_contest(&state, &caller, id, match_id, payload).await?;
    Ok((StatusCode::CREATED, Json(contest)))
}

#[utoipa::path(
    get,
    path = "/groups/{id}/matches/{match_id}/contests",
    tag = "contests",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier"),
    ("match_id" = String, Path, description = "Provider match identifier")),
    responses((status = 200, description = "Contests for the match", body = [ContestResponse]))
)]
pub async fn list_contests(
    State(state): State<SharedState>,
    caller: Caller,
    Path((id, match_id)): Path<(Uuid, String)>,
) -> Result<Json<Vec<ContestResponse>>, AppError> {
    Ok(Json(
        contest_service::list_contests(&state, &caller, id, match_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/groups/{id}/matches/{match_id}/contests/{contest_id}/join",
    tag = "contests",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("X-User-Name" = Option<String>, Header, description = "Name shown on the leaderboard"),
    ("id" = Uuid, Path, description = "Group identifier"),
    ("match_id" = String, Path, description = "Provider match identifier"),
    ("contest_id" = Uuid, Path, description = "Contest identifier")),
    responses(
        (status = 200, description = "Joined", body = ContestResponse),
        (status = 409, description = "Already joined, full or completed")
    )
)]
pub async fn join_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(path): Path<(Uuid, String, Uuid)>,
) -> Result<Json<ContestResponse>, AppError> {
    Ok(Json(
        contest_service::join_contest(&state, &caller, contest_ref(path)).await?,
    ))
}

/// Participants ranked by score.
#[utoipa::path(
    get,
    path = "/groups/{id}/matches/{match_id}/contests/{contest_id}/leaderboard",
    tag = "contests",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier"),
    ("match_id" = String, Path, description = "Provider match identifier"),
    ("contest_id" = Uuid, Path, description = "Contest identifier")),
    responses((status = 200, description = "Leaderboard", body = [LeaderboardEntry]))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    caller: Caller,
    Path(path): Path<(Uuid, String, Uuid)>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(
        contest_service::leaderboard(&state, &caller, contest_ref(path)).await?,
    ))
}

/// Move the contest forward (`upcoming` → `live` → `completed`).
#[utoipa::path(
    put,
    path = "/groups/{id}/matches/{match_id}/contests/{contest_id}/status",
    tag = "contests",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier"),
    ("match_id" = String, Path, description = "Provider match identifier"),
    ("contest_id" = Uuid, Path, description = "Contest identifier")),
    request_body = UpdateContestStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ContestResponse),
        (status = 403, description = "Caller is not the creator"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    State(state): State<SharedState>,
    caller: Caller,
    Path(path): Path<(Uuid, String, Uuid)>,
    Json(payload): Json<UpdateContestStatusRequest>,
) -> Result<Json<ContestResponse>, AppError> {
    Ok(Json(
        contest_service::update_status(&state, &caller, contest_ref(path), payload).await?,
    ))
}
