//! Fantasy cricket backend entrypoint wiring REST routes, storage supervision and the
//! reconciliation scheduler.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use fantasy_cricket_back::dao::fantasy_store::couchdb::{CouchConfig, CouchFantasyStore};
#[cfg(feature = "mongo-store")]
use fantasy_cricket_back::dao::fantasy_store::mongodb::{MongoConfig, MongoFantasyStore};
use fantasy_cricket_back::{
    config::AppConfig,
    dao::fantasy_store::{FantasyStore, memory::MemoryFantasyStore},
    provider::{CricApiProvider, MatchProvider},
    routes,
    services::{
        reconciliation::Reconciler, scheduler, scoring::RosterPointsPolicy, storage_supervisor,
    },
    state::{AppState, SharedState},
};

/// Storage backend selected through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreBackend {
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
    Memory,
}

impl StoreBackend {
    fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORE_BACKEND").unwrap_or_default();
        match raw.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "mongo-store")]
            "" | "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Ok(StoreBackend::Couch),
            #[cfg(all(feature = "couch-store", not(feature = "mongo-store")))]
            "" => Ok(StoreBackend::Couch),
            #[cfg(not(any(feature = "mongo-store", feature = "couch-store")))]
            "" => Ok(StoreBackend::Memory),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unsupported STORE_BACKEND `{other}`"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let provider: Arc<dyn MatchProvider> = Arc::new(
        CricApiProvider::new(
            config.provider.base_url.clone(),
            config.provider.api_key.clone(),
            config.provider.request_timeout,
        )
        .context("building match provider client")?,
    );
    let reconciler = Reconciler::new(
        provider.clone(),
        Arc::new(RosterPointsPolicy),
        config.reconcile.settings(),
    );
    let scheduler_enabled = config.reconcile.enabled;

    let app_state = AppState::new(config, provider, reconciler);

    let backend = StoreBackend::from_env()?;
    info!(?backend, "starting storage supervisor");
    spawn_storage_supervisor(app_state.clone(), backend);

    if scheduler_enabled {
        tokio::spawn(scheduler::run(app_state.clone()));
    } else {
        info!("reconciliation scheduler disabled; on-demand ticks only");
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Launch the supervisor that connects the selected backend and toggles degraded mode.
fn spawn_storage_supervisor(state: SharedState, backend: StoreBackend) {
    match backend {
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoFantasyStore::connect(config).await?;
                Ok(Arc::new(store) as Arc<dyn FantasyStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env()?;
                let store = CouchFantasyStore::connect(config).await?;
                Ok(Arc::new(store) as Arc<dyn FantasyStore>)
            }));
        }
        StoreBackend::Memory => {
            // Reconnecting keeps the same data; nothing survives a restart.
            let store = MemoryFantasyStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok(Arc::new(store) as Arc<dyn FantasyStore>) }
            }));
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler; Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
