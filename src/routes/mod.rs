use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod contests;
pub mod docs;
pub mod groups;
pub mod health;
mod identity;
pub mod matches;
pub mod me;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(admin::router(state.clone()))
        .merge(groups::router())
        .merge(contests::router())
        .merge(me::router())
        .merge(matches::router());

    let docs_router = docs::router();

    api_router.merge(docs_router).with_state(state)
}
