use tracing::{debug, error, info};

use crate::{
    dto::reconcile::ReconcileStatusResponse,
    error::ReconcileError,
    services::reconciliation::TickSummary,
    state::SharedState,
};

/// Run one reconciliation tick against the installed store and record the outcome.
pub async fn run_once(state: &SharedState) -> Result<TickSummary, ReconcileError> {
    let store = match state.require_store().await {
        Ok(store) => store,
        Err(_) => {
            debug!("skipping reconciliation tick; storage unavailable");
            state
                .record_tick_error(ReconcileError::Degraded.to_string())
                .await;
            return Err(ReconcileError::Degraded);
        }
    };

    match state.reconciler().run_tick(store).await {
        Ok(summary) => {
            state.record_tick(summary.clone()).await;
            Ok(summary)
        }
        Err(ReconcileError::ConcurrentTickConflict) => {
            info!("reconciliation tick already in flight; skipping");
            Err(ReconcileError::ConcurrentTickConflict)
        }
        Err(err) => {
            let message = match &err {
                ReconcileError::ProviderUnavailable(source) => format!("{err}: {source}"),
                ReconcileError::Lease(source) => format!("{err}: {source}"),
                _ => err.to_string(),
            };
            error!(error = %message, "reconciliation tick aborted");
            state.record_tick_error(message).await;
            Err(err)
        }
    }
}

/// Current reconciliation bookkeeping.
pub async fn status(state: &SharedState) -> ReconcileStatusResponse {
    let config = &state.config().reconcile;
    ReconcileStatusResponse::new(
        state.reconcile_status().await,
        config.enabled,
        config.interval.as_secs(),
        state.is_degraded(),
    )
}
