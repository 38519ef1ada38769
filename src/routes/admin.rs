use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};

use crate::{
    dto::reconcile::{ReconcileStatusResponse, TickSummaryResponse},
    error::AppError,
    services::reconcile_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints driving the reconciliation job.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/reconcile", post(run_reconcile))
        .route("/admin/reconcile/status", get(reconcile_status))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Run one reconciliation tick now and return its summary.
#[utoipa::path(
    post,
    path = "/admin/reconcile",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token configured through ADMIN_TOKEN")),
    responses(
        (status = 200, description = "Tick completed", body = TickSummaryResponse),
        (status = 409, description = "Another tick is in flight"),
        (status = 503, description = "Provider or storage unavailable")
    )
)]
pub async fn run_reconcile(
    State(state): State<SharedState>,
) -> Result<Json<TickSummaryResponse>, AppError> {
    let summary = reconcile_service::run_once(&state).await?;
    Ok(Json(summary.into()))
}

/// Report scheduler settings and the outcome of recent ticks.
#[utoipa::path(
    get,
    path = "/admin/reconcile/status",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token configured through ADMIN_TOKEN")),
    responses((status = 200, description = "Reconciliation status", body = ReconcileStatusResponse))
)]
pub async fn reconcile_status(State(state): State<SharedState>) -> Json<ReconcileStatusResponse> {
    Json(reconcile_service::status(&state).await)
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token.as_deref() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin token not configured on this server".into(),
        )),
    }
}
