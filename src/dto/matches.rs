use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    dao::models::PlayerRole,
    provider::{MatchSnapshot, MatchState, SquadPlayer},
};

/// Filter accepted by `GET /matches`.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatusFilter {
    #[default]
    All,
    Live,
    Completed,
    Upcoming,
}

impl MatchStatusFilter {
    /// Whether `snapshot` passes the filter, by parsed state or by the keyword appearing in
    /// the feed's status text.
    pub fn accepts(self, snapshot: &MatchSnapshot) -> bool {
        let (state, keyword) = match self {
            MatchStatusFilter::All => return true,
            MatchStatusFilter::Live => (MatchState::Live, "live"),
            MatchStatusFilter::Completed => (MatchState::Result, "completed"),
            MatchStatusFilter::Upcoming => (MatchState::Fixture, "upcoming"),
        };
        snapshot.state == state || snapshot.status.to_lowercase().contains(keyword)
    }
}

/// Query string of `GET /matches`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MatchListQuery {
    /// `all` (default), `live`, `completed` or `upcoming`.
    #[serde(default)]
    pub status: MatchStatusFilter,
}

/// Match from the live feed.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: String,
    pub name: String,
    pub team_one: String,
    pub team_two: String,
    pub status: String,
    /// `fixture`, `live`, `result` or `unknown`.
    #[schema(value_type = String)]
    pub state: MatchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_one_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_two_score: Option<String>,
    /// Whether the provider publishes player points for matches in this state.
    pub has_points: bool,
}

impl From<MatchSnapshot> for MatchSummary {
    fn from(value: MatchSnapshot) -> Self {
        Self {
            name: value.name(),
            id: value.id,
            team_one: value.team_one,
            team_two: value.team_two,
            status: value.status,
            state: value.state,
            scheduled_at: value.scheduled_at,
            team_one_score: value.team_one_score,
            team_two_score: value.team_two_score,
            has_points: value.state.has_points(),
        }
    }
}

/// Player available for drafting.
#[derive(Debug, Serialize, ToSchema)]
pub struct SquadPlayerResponse {
    pub id: String,
    pub name: String,
    /// Role text as reported by the provider.
    pub role_text: String,
    /// Role used by team rules; absent when the provider text is not recognised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PlayerRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl From<SquadPlayer> for SquadPlayerResponse {
    fn from(value: SquadPlayer) -> Self {
        Self {
            role: PlayerRole::from_provider_role(&value.role),
            id: value.id,
            name: value.name,
            role_text: value.role,
            team: value.team,
        }
    }
}
