use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{fantasy_store::FantasyStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Connect the storage backend, poll its health, and keep the shared state in degraded mode
/// while it is unavailable. Never returns.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn FantasyStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                warn!("storage lost; dropping store and reconnecting from scratch");
                state.clear_store().await;
                sleep(delay).await;
                delay = next_delay(delay);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
}

/// Poll `store` until it fails and cannot be revived in place.
async fn watch_health(state: &SharedState, store: &dyn FantasyStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);

                if !reconnect_in_place(store).await {
                    warn!("exhausted storage reconnect attempts");
                    return;
                }

                info!("storage reconnection succeeded after health check failure");
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect_in_place(store: &dyn FantasyStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::fantasy_store::memory::MemoryFantasyStore,
        provider::{MatchProvider, MatchSnapshot, ProviderResult, SquadPlayer},
        services::{reconciliation::Reconciler, scoring::RosterPointsPolicy},
        state::AppState,
    };

    struct EmptyFeed;

    impl MatchProvider for EmptyFeed {
        fn fetch_feed(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn fetch_matches(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn fetch_squad(
            &self,
            _match_id: String,
        ) -> BoxFuture<'static, ProviderResult<Vec<SquadPlayer>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_delay(Duration::from_secs(8)), MAX_DELAY);
        assert_eq!(next_delay(MAX_DELAY), MAX_DELAY);
    }

    #[tokio::test]
    async fn installs_store_and_leaves_degraded_mode() {
        let provider: Arc<dyn MatchProvider> = Arc::new(EmptyFeed);
        let reconciler = Reconciler::new(
            provider.clone(),
            Arc::new(RosterPointsPolicy),
            Default::default(),
        );
        let state = AppState::new(AppConfig::default(), provider, reconciler);
        assert!(state.is_degraded());

        let mut degraded = state.degraded_watcher();
        let supervisor = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(MemoryFantasyStore::new()) as Arc<dyn FantasyStore>)
        }));

        degraded.changed().await.unwrap();
        assert!(!*degraded.borrow());
        assert!(state.require_store().await.is_ok());

        supervisor.abort();
    }
}
