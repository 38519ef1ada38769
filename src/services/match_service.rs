use crate::{
    dto::matches::{MatchStatusFilter, MatchSummary, SquadPlayerResponse},
    error::ServiceError,
    provider::MatchSnapshot,
    state::SharedState,
};

/// Current matches from the provider feed that pass `filter`.
///
/// Reads the bare feed; player points are only fetched by reconciliation ticks.
pub async fn list_matches(
    state: &SharedState,
    filter: MatchStatusFilter,
) -> Result<Vec<MatchSummary>, ServiceError> {
    let matches = state.provider().fetch_feed().await?;
    Ok(matches
        .into_iter()
        .filter(|snapshot| filter.accepts(snapshot))
        .map(Into::into)
        .collect())
}

/// Players available for drafting in `match_id`.
pub async fn squad(
    state: &SharedState,
    match_id: String,
) -> Result<Vec<SquadPlayerResponse>, ServiceError> {
    let players = state.provider().fetch_squad(match_id).await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Look a single match up in the live feed.
pub(crate) async fn find_match(
    state: &SharedState,
    match_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    state
        .provider()
        .fetch_feed()
        .await?
        .into_iter()
        .find(|snapshot| snapshot.id == match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id} is not in the feed")))
}
