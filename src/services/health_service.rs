use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let response = if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    };
    response.with_reconcile(state.reconcile_status().await)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::fantasy_store::memory::MemoryFantasyStore,
        provider::CricApiProvider,
        services::{reconciliation::Reconciler, scoring::RosterPointsPolicy},
        state::AppState,
    };

    fn state() -> SharedState {
        let provider = Arc::new(
            CricApiProvider::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap(),
        );
        let reconciler =
            Reconciler::new(provider.clone(), Arc::new(RosterPointsPolicy), Default::default());
        AppState::new(AppConfig::default(), provider, reconciler)
    }

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = state();
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_store(Arc::new(MemoryFantasyStore::new()))
            .await;
        assert_eq!(health_status(&state).await.status, "ok");
    }

    #[tokio::test]
    async fn carries_the_last_reconcile_error() {
        let state = state();
        state.record_tick_error("provider down".into()).await;

        let health = health_status(&state).await;
        assert_eq!(health.last_reconcile_error.as_deref(), Some("provider down"));
        assert!(health.last_summary.is_none());
    }
}
