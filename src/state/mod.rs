use std::{sync::Arc, time::SystemTime};

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::fantasy_store::FantasyStore,
    error::ServiceError,
    provider::MatchProvider,
    services::reconciliation::{Reconciler, TickSummary},
};

pub type SharedState = Arc<AppState>;

/// Bookkeeping about the most recent reconciliation ticks, served by the status endpoints.
#[derive(Debug, Clone, Default)]
pub struct ReconcileStatus {
    /// Start time of the last tick that completed (possibly with branch failures).
    pub last_success_at: Option<SystemTime>,
    /// Time and message of the last tick that could not run.
    pub last_error: Option<(SystemTime, String)>,
    /// Summary of the last completed tick.
    pub last_summary: Option<TickSummary>,
    /// Ticks completed since start-up.
    pub completed_ticks: u64,
}

/// Central application state holding the store handle, provider client and reconciler.
pub struct AppState {
    store: RwLock<Option<Arc<dyn FantasyStore>>>,
    degraded: watch::Sender<bool>,
    provider: Arc<dyn MatchProvider>,
    reconciler: Reconciler,
    reconcile_status: RwLock<ReconcileStatus>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn MatchProvider>,
        reconciler: Reconciler,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            provider,
            reconciler,
            reconcile_status: RwLock::new(ReconcileStatus::default()),
            config,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn FantasyStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while the supervisor is reconnecting.
    pub async fn require_store(&self) -> Result<Arc<dyn FantasyStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn FantasyStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn provider(&self) -> Arc<dyn MatchProvider> {
        self.provider.clone()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot of the reconciliation bookkeeping.
    pub async fn reconcile_status(&self) -> ReconcileStatus {
        self.reconcile_status.read().await.clone()
    }

    /// Record a completed tick.
    pub async fn record_tick(&self, summary: TickSummary) {
        let mut status = self.reconcile_status.write().await;
        status.last_success_at = Some(summary.started_at);
        status.last_summary = Some(summary);
        status.completed_ticks += 1;
    }

    /// Record a tick that could not run.
    pub async fn record_tick_error(&self, message: String) {
        let mut status = self.reconcile_status.write().await;
        status.last_error = Some((SystemTime::now(), message));
    }
}
