use std::{collections::HashSet, time::SystemTime};

use tracing::info;

use crate::{
    config::TeamRules,
    dao::models::{PlayerEntity, PlayerRole, UserTeamEntity},
    dto::{
        identity::Caller,
        team::{SaveTeamRequest, TeamResponse},
    },
    error::ServiceError,
    state::SharedState,
};

/// Check a drafted roster against the composition rules.
pub fn validate_team(rules: &TeamRules, players: &[PlayerEntity]) -> Result<(), ServiceError> {
    if players.len() != rules.max_players {
        return Err(ServiceError::InvalidInput(format!(
            "a team needs exactly {} players (got {})",
            rules.max_players,
            players.len()
        )));
    }

    let mut seen = HashSet::with_capacity(players.len());
    if let Some(duplicate) = players.iter().find(|player| !seen.insert(player.id.as_str())) {
        return Err(ServiceError::InvalidInput(format!(
            "player {} is selected more than once",
            duplicate.id
        )));
    }

    let minimums = [
        (PlayerRole::WicketKeeper, rules.min_wicket_keepers, "wicket-keeper"),
        (PlayerRole::Batsman, rules.min_batsmen, "batsman"),
        (PlayerRole::AllRounder, rules.min_all_rounders, "all-rounder"),
        (PlayerRole::Bowler, rules.min_bowlers, "bowler"),
    ];
    for (role, minimum, label) in minimums {
        let count = players.iter().filter(|player| player.role == role).count();
        if count < minimum {
            return Err(ServiceError::InvalidInput(format!(
                "a team needs at least {minimum} {label}(s) (got {count})"
            )));
        }
    }

    Ok(())
}

/// Create or replace the caller's team for a match.
pub async fn save_team(
    state: &SharedState,
    caller: &Caller,
    match_id: String,
    payload: SaveTeamRequest,
) -> Result<TeamResponse, ServiceError> {
    let players = payload
        .players
        .into_iter()
        .map(PlayerEntity::from)
        .collect::<Vec<_>>();
    validate_team(&state.config().team_rules, &players)?;

    let store = state.require_store().await?;
    let team = UserTeamEntity {
        user_id: caller.user_id.clone(),
        match_id,
        match_name: payload.match_name.trim().to_owned(),
        players,
        created_at: SystemTime::now(),
    };
    store.save_user_team(team.clone()).await?;

    info!(team_id = %team.team_id(), "team saved");
    Ok(team.into())
}

/// The caller's team for a match.
pub async fn get_team(
    state: &SharedState,
    caller: &Caller,
    match_id: String,
) -> Result<TeamResponse, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_user_team(caller.user_id.clone(), match_id.clone())
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("no team drafted for match {match_id}")))
}
