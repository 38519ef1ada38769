use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        chat::{ChatMessageResponse, PostChatMessageRequest},
        group::{CreateGroupRequest, GroupResponse},
        identity::Caller,
    },
    error::AppError,
    services::group_service,
    state::SharedState,
};

/// Group membership and chat endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", get(get_group))
        .route("/groups/{id}/join", post(join_group))
        .route("/groups/{id}/chat", get(list_messages).post(post_message))
}

/// Create a group owned by the caller.
#[utoipa::path(
    post,
    path = "/groups",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity")),
    request_body = CreateGroupRequest,
    responses((status = 201, description = "Group created", body = GroupResponse))
)]
pub async fn create_group(
    State(state): State<SharedState>,
    caller: Caller,
    Valid(Json(payload)): Valid<Json<CreateGroupRequest>>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    let group = group_service::create_group(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// List the groups the caller belongs to.
#[utoipa::path(
    get,
    path = "/groups",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity")),
    responses((status = 200, description = "Caller's groups", body = [GroupResponse]))
)]
pub async fn list_groups(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    Ok(Json(group_service::list_groups(&state, &caller).await?))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier")),
    responses((status = 200, description = "Group", body = GroupResponse))
)]
pub async fn get_group(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, AppError> {
    Ok(Json(group_service::get_group(&state, &caller, id).await?))
}

/// Join a group that still has room.
#[utoipa::path(
    post,
    path = "/groups/{id}/join",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Joined", body = GroupResponse),
        (status = 409, description = "Already a member or group full")
    )
)]
pub async fn join_group(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, AppError> {
    Ok(Json(group_service::join_group(&state, &caller, id).await?))
}

/// Group chat log, oldest first.
#[utoipa::path(
    get,
    path = "/groups/{id}/chat",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("id" = Uuid, Path, description = "Group identifier")),
    responses((status = 200, description = "Chat log", body = [ChatMessageResponse]))
)]
pub async fn list_messages(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessageResponse>>, AppError> {
    Ok(Json(group_service::list_messages(&state, &caller, id).await?))
}

#[utoipa::path(
    post,
    path = "/groups/{id}/chat",
    tag = "groups",
    params(("X-User-Id" = String, Header, description = "Caller identity"),
    ("X-User-Name" = Option<String>, Header, description = "Caller display name"),
    ("id" = Uuid, Path, description = "Group identifier")),
    request_body = PostChatMessageRequest,
    responses((status = 201, description = "Message posted", body = ChatMessageResponse))
)]
pub async fn post_message(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PostChatMessageRequest>>,
) -> Result<(StatusCode, Json<ChatMessageResponse>), AppError> {
    let message = group_service::post_message(&state, &caller, id, payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
