use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ContestEntity, ContestStatus, ParticipantEntity, UserContestEntity},
    dto::{
        format_system_time,
        validation::{not_blank, validate_entry_fee},
    },
};

/// Payload used to create a contest for a (group, match) pair.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateContestRequest {
    #[validate(length(min = 1, max = 80), custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "validate_entry_fee"))]
    #[serde(default)]
    pub entry_fee: f64,
    /// Participant cap; the configured default applies when omitted.
    #[validate(range(min = 1, max = 10000))]
    #[serde(default)]
    pub max_participants: Option<u32>,
}

/// Requested lifecycle move for a contest.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateContestStatusRequest {
    pub status: ContestStatus,
}

/// Contest with its current participant count.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContestResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub match_id: String,
    pub name: String,
    pub entry_fee: f64,
    pub max_participants: u32,
    pub participant_count: usize,
    pub status: ContestStatus,
    pub created_at: String,
    pub created_by: String,
}

impl ContestResponse {
    pub fn new(contest: ContestEntity, participant_count: usize) -> Self {
        Self {
            id: contest.id,
            group_id: contest.group_id,
            match_id: contest.match_id,
            name: contest.name,
            entry_fee: contest.entry_fee,
            max_participants: contest.max_participants,
            participant_count,
            status: contest.status,
            created_at: format_system_time(contest.created_at),
            created_by: contest.created_by,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position; ties share the same rank.
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub score: u32,
    pub joined_at: String,
}

impl LeaderboardEntry {
    pub fn new(rank: usize, participant: ParticipantEntity) -> Self {
        Self {
            rank,
            user_id: participant.user_id,
            display_name: participant.display_name,
            score: participant.score,
            joined_at: format_system_time(participant.joined_at),
        }
    }
}

/// Filter accepted by `GET /me/contests`.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatusFilter {
    #[default]
    All,
    Upcoming,
    Live,
    Completed,
}

impl ContestStatusFilter {
    /// Whether a contest in `status` passes the filter.
    pub fn accepts(self, status: ContestStatus) -> bool {
        match self {
            ContestStatusFilter::All => true,
            ContestStatusFilter::Upcoming => status == ContestStatus::Upcoming,
            ContestStatusFilter::Live => status == ContestStatus::Live,
            ContestStatusFilter::Completed => status == ContestStatus::Completed,
        }
    }
}

/// Query string of `GET /me/contests`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyContestsQuery {
    /// `all` (default), `upcoming`, `live` or `completed`.
    #[serde(default)]
    pub status: ContestStatusFilter,
}

/// Entry of the caller's contest index.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserContestResponse {
    pub group_id: Uuid,
    pub match_id: String,
    pub contest_id: Uuid,
    pub name: String,
    pub status: ContestStatus,
    /// False when the contest was only mirrored because the caller belongs to the group.
    pub joined: bool,
}

impl From<UserContestEntity> for UserContestResponse {
    fn from(value: UserContestEntity) -> Self {
        Self {
            group_id: value.contest.group_id,
            match_id: value.contest.match_id,
            contest_id: value.contest.contest_id,
            name: value.name,
            status: value.status,
            joined: value.joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_accepts_matching_contests() {
        assert!(ContestStatusFilter::All.accepts(ContestStatus::Completed));
        assert!(ContestStatusFilter::Live.accepts(ContestStatus::Live));
        assert!(!ContestStatusFilter::Live.accepts(ContestStatus::Upcoming));
        assert!(!ContestStatusFilter::Upcoming.accepts(ContestStatus::Completed));
    }

    #[test]
    fn negative_entry_fee_fails_validation() {
        let request = CreateContestRequest {
            name: "Mega".into(),
            entry_fee: -5.0,
            max_participants: Some(4),
        };
        assert!(request.validate().is_err());

        let request = CreateContestRequest {
            name: "Mega".into(),
            entry_fee: 0.0,
            max_participants: None,
        };
        assert!(request.validate().is_ok());
    }
}
