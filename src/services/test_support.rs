//! Shared fixtures for service tests: a one-match feed and a state over the memory store.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    config::AppConfig,
    dao::fantasy_store::memory::MemoryFantasyStore,
    dto::identity::Caller,
    provider::{MatchProvider, MatchSnapshot, MatchState, ProviderResult, SquadPlayer},
    services::{reconciliation::Reconciler, scoring::RosterPointsPolicy},
    state::{AppState, SharedState},
};

pub const MATCH_ID: &str = "m-final";

struct FixedFeed;

fn fixture() -> MatchSnapshot {
    MatchSnapshot {
        id: MATCH_ID.into(),
        team_one: "India".into(),
        team_two: "Australia".into(),
        status: "Match starts at 14:00 GMT".into(),
        state: MatchState::Fixture,
        scheduled_at: Some("2025-11-19T14:00:00".into()),
        team_one_score: None,
        team_two_score: None,
        stats: None,
    }
}

impl MatchProvider for FixedFeed {
    fn fetch_feed(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        Box::pin(async { Ok(vec![fixture()]) })
    }

    fn fetch_matches(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        Box::pin(async { Ok(vec![fixture()]) })
    }

    fn fetch_squad(&self, _match_id: String) -> BoxFuture<'static, ProviderResult<Vec<SquadPlayer>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Application state with a fresh memory store installed, plus a handle to that store.
pub async fn state() -> (SharedState, MemoryFantasyStore) {
    let provider: Arc<dyn MatchProvider> = Arc::new(FixedFeed);
    let reconciler = Reconciler::new(
        provider.clone(),
        Arc::new(RosterPointsPolicy),
        Default::default(),
    );
    let state = AppState::new(AppConfig::default(), provider, reconciler);
    let store = MemoryFantasyStore::new();
    state.install_store(Arc::new(store.clone())).await;
    (state, store)
}

pub fn caller(user_id: &str) -> Caller {
    Caller::new(user_id, user_id.to_uppercase())
}
