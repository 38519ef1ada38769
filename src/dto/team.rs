use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{PlayerEntity, PlayerRole, UserTeamEntity},
    dto::{format_system_time, validation::not_blank},
};

/// Player picked into a team.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct PlayerInput {
    #[validate(length(min = 1), custom(function = "not_blank"))]
    pub id: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub role: PlayerRole,
}

impl From<PlayerInput> for PlayerEntity {
    fn from(value: PlayerInput) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role: value.role,
        }
    }
}

impl From<PlayerEntity> for PlayerInput {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role: value.role,
        }
    }
}

/// Drafted team for one match. Composition rules are checked by the service.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SaveTeamRequest {
    /// Label shown next to the team, e.g. `India vs Australia`.
    #[validate(length(max = 200))]
    #[serde(default)]
    pub match_name: String,
    #[validate(length(min = 1, max = 30), nested)]
    pub players: Vec<PlayerInput>,
}

/// Stored team.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamResponse {
    /// `{matchId}-{userId}`.
    pub team_id: String,
    pub match_id: String,
    pub match_name: String,
    pub players: Vec<PlayerInput>,
    pub created_at: String,
}

impl From<UserTeamEntity> for TeamResponse {
    fn from(value: UserTeamEntity) -> Self {
        Self {
            team_id: value.team_id(),
            match_id: value.match_id,
            match_name: value.match_name,
            players: value.players.into_iter().map(Into::into).collect(),
            created_at: format_system_time(value.created_at),
        }
    }
}
