use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// A set of users sharing contests and a chat log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupEntity {
    /// Stable identifier for the group.
    pub id: Uuid,
    /// Display name of the group.
    pub name: String,
    /// Upper bound on the member count.
    pub max_members: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Identity of the user who created the group. Always a member.
    pub created_by: String,
    /// Member identities, creator first.
    pub members: Vec<String>,
}

impl GroupEntity {
    /// Whether `user_id` belongs to the group.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }

    /// Whether another member can still join.
    pub fn has_room(&self) -> bool {
        self.members.len() < self.max_members as usize
    }
}

/// Per-group copy of a provider match, created when a contest is first set up for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntryEntity {
    /// Owning group.
    pub group_id: Uuid,
    /// Provider-assigned match identifier.
    pub match_id: String,
    /// First team name.
    pub team_one: String,
    /// Second team name.
    pub team_two: String,
    /// Provider status text at registration time.
    pub status: String,
    /// Scheduled start, as reported by the provider.
    pub scheduled_at: Option<String>,
    /// When the entry was created in this group.
    pub registered_at: SystemTime,
}

/// Lifecycle of a contest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    /// Match has not started.
    Upcoming,
    /// Match in progress.
    Live,
    /// Match finished; scores are final.
    Completed,
}

impl ContestStatus {
    fn rank(self) -> u8 {
        match self {
            ContestStatus::Upcoming => 0,
            ContestStatus::Live => 1,
            ContestStatus::Completed => 2,
        }
    }

    /// Status only ever moves forward.
    pub fn can_advance_to(self, next: ContestStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Lower-case label used in storage and over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ContestStatus::Upcoming => "upcoming",
            ContestStatus::Live => "live",
            ContestStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a contest inside the group → match → contest hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContestRef {
    /// Owning group.
    pub group_id: Uuid,
    /// Provider match identifier.
    pub match_id: String,
    /// Contest identifier.
    pub contest_id: Uuid,
}

impl fmt::Display for ContestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group_id, self.match_id, self.contest_id)
    }
}

/// A contest for one (group, match) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContestEntity {
    /// Contest identifier.
    pub id: Uuid,
    /// Owning group.
    pub group_id: Uuid,
    /// Denormalized provider match identifier.
    pub match_id: String,
    /// Display name.
    pub name: String,
    /// Entry fee, never negative.
    pub entry_fee: f64,
    /// Upper bound on the participant count.
    pub max_participants: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Identity of the creator.
    pub created_by: String,
    /// Lifecycle status.
    pub status: ContestStatus,
}

impl ContestEntity {
    /// Hierarchical address of this contest.
    pub fn contest_ref(&self) -> ContestRef {
        ContestRef {
            group_id: self.group_id,
            match_id: self.match_id.clone(),
            contest_id: self.id,
        }
    }
}

/// A user taking part in a contest. Only `score` and `score_version` are touched by
/// reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Identity of the participating user; unique within the contest.
    pub user_id: String,
    /// Name shown on leaderboards.
    pub display_name: String,
    /// Current fantasy score.
    pub score: u32,
    /// Fingerprint of the inputs that produced `score`.
    #[serde(default)]
    pub score_version: Option<String>,
    /// When the user joined.
    pub joined_at: SystemTime,
}

impl ParticipantEntity {
    /// A fresh participant with a zero score.
    pub fn joining(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            score: 0,
            score_version: None,
            joined_at: SystemTime::now(),
        }
    }
}

/// Score write applied by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantScore {
    /// New score.
    pub score: u32,
    /// Fingerprint of the inputs that produced it.
    pub score_version: String,
}

/// Per-user index entry pointing at a contest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContestEntity {
    /// Owner of the index.
    pub user_id: String,
    /// Contest address.
    pub contest: ContestRef,
    /// Contest name at mirror time.
    pub name: String,
    /// Mirrored lifecycle status.
    pub status: ContestStatus,
    /// Whether the owner is a participant (as opposed to merely able to discover it).
    pub joined: bool,
}

/// Role of a cricket player as used by team composition rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum PlayerRole {
    /// Wicket-keeper.
    #[serde(rename = "WK")]
    WicketKeeper,
    /// Batsman.
    #[serde(rename = "BAT")]
    Batsman,
    /// All-rounder.
    #[serde(rename = "AR")]
    AllRounder,
    /// Bowler.
    #[serde(rename = "BOWL")]
    Bowler,
}

impl PlayerRole {
    /// Map the provider's free-form role text onto a role.
    pub fn from_provider_role(role: &str) -> Option<Self> {
        let normalized = role.to_ascii_lowercase();
        if normalized.starts_with("wk") || normalized.contains("keeper") {
            Some(PlayerRole::WicketKeeper)
        } else if normalized.contains("allrounder") || normalized.contains("all-rounder") {
            Some(PlayerRole::AllRounder)
        } else if normalized.contains("bowl") {
            Some(PlayerRole::Bowler)
        } else if normalized.contains("bat") {
            Some(PlayerRole::Batsman)
        } else {
            None
        }
    }
}

/// Player picked into a drafted team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Provider player identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Playing role.
    pub role: PlayerRole,
}

/// A user's drafted team for a match; doubles as the participant roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserTeamEntity {
    /// Owner of the team.
    pub user_id: String,
    /// Provider match identifier.
    pub match_id: String,
    /// Match label shown to the user.
    pub match_name: String,
    /// Selected players.
    pub players: Vec<PlayerEntity>,
    /// Creation (or last replacement) timestamp.
    pub created_at: SystemTime,
}

impl UserTeamEntity {
    /// Storage key of the team, one per user and match.
    pub fn team_id(&self) -> String {
        team_id(&self.match_id, &self.user_id)
    }
}

/// Storage key of a drafted team.
pub fn team_id(match_id: &str, user_id: &str) -> String {
    format!("{match_id}-{user_id}")
}

/// Author of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatSender {
    /// A group member.
    User {
        /// Identity of the member.
        id: String,
        /// Display name at send time.
        name: String,
    },
    /// Automated group event.
    System,
}

/// Append-only chat log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageEntity {
    /// Message identifier.
    pub id: Uuid,
    /// Owning group.
    pub group_id: Uuid,
    /// Message body.
    pub text: String,
    /// Author.
    pub sender: ChatSender,
    /// Send time; the log is ordered by it.
    pub created_at: SystemTime,
}

impl ChatMessageEntity {
    /// Automated message announcing a group event.
    pub fn system(group_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            text: text.into(),
            sender: ChatSender::System,
            created_at: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contest_status_only_moves_forward() {
        assert!(ContestStatus::Upcoming.can_advance_to(ContestStatus::Live));
        assert!(ContestStatus::Upcoming.can_advance_to(ContestStatus::Completed));
        assert!(ContestStatus::Live.can_advance_to(ContestStatus::Completed));
        assert!(!ContestStatus::Live.can_advance_to(ContestStatus::Upcoming));
        assert!(!ContestStatus::Completed.can_advance_to(ContestStatus::Completed));
    }

    #[test]
    fn provider_roles_are_mapped() {
        assert_eq!(
            PlayerRole::from_provider_role("WK-Batsman"),
            Some(PlayerRole::WicketKeeper)
        );
        assert_eq!(
            PlayerRole::from_provider_role("Batting Allrounder"),
            Some(PlayerRole::AllRounder)
        );
        assert_eq!(
            PlayerRole::from_provider_role("Bowler"),
            Some(PlayerRole::Bowler)
        );
        assert_eq!(
            PlayerRole::from_provider_role("Batsman"),
            Some(PlayerRole::Batsman)
        );
        assert_eq!(PlayerRole::from_provider_role("Umpire"), None);
    }

    #[test]
    fn team_id_joins_match_and_user() {
        assert_eq!(team_id("m-1", "u-9"), "m-1-u-9");
    }
}
