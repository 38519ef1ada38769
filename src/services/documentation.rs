use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the fantasy cricket backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::admin::run_reconcile,
        crate::routes::admin::reconcile_status,
        crate::routes::groups::create_group,
        crate::routes::groups::list_groups,
        crate::routes::groups::get_group,
        crate::routes::groups::join_group,
        crate::routes::groups::list_messages,
        crate::routes::groups::post_message,
        crate::routes::contests::create_contest,
        crate::routes::contests::list_contests,
        crate::routes::contests::join_contest,
        crate::routes::contests::leaderboard,
        crate::routes::contests::update_status,
        crate::routes::me::my_contests,
        crate::routes::me::save_team,
        crate::routes::me::get_team,
        crate::routes::matches::list_matches,
        crate::routes::matches::squad,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::reconcile::TickSummaryResponse,
            crate::dto::reconcile::BranchFailureResponse,
            crate::dto::reconcile::ReconcileStatusResponse,
            crate::dto::group::CreateGroupRequest,
            crate::dto::group::GroupResponse,
            crate::dto::chat::PostChatMessageRequest,
            crate::dto::chat::ChatMessageResponse,
            crate::dto::chat::ChatMessageKind,
            crate::dto::contest::CreateContestRequest,
            crate::dto::contest::UpdateContestStatusRequest,
            crate::dto::contest::ContestResponse,
            crate::dto::contest::LeaderboardEntry,
            crate::dto::contest::ContestStatusFilter,
            crate::dto::contest::UserContestResponse,
            crate::dto::team::PlayerInput,
            crate::dto::team::SaveTeamRequest,
            crate::dto::team::TeamResponse,
            crate::dto::matches::MatchSummary,
            crate::dto::matches::MatchStatusFilter,
            crate::dto::matches::SquadPlayerResponse,
            crate::dao::models::ContestStatus,
            crate::dao::models::PlayerRole,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "admin", description = "Reconciliation control, guarded by X-Admin-Token"),
        (name = "groups", description = "Groups and group chat"),
        (name = "contests", description = "Contests inside a group's match"),
        (name = "me", description = "Caller's contests and drafted teams"),
        (name = "matches", description = "Provider match feed"),
    )
)]
pub struct ApiDoc;
