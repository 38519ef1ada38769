use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    ChatMessageEntity, ChatSender, ContestEntity, ContestRef, ContestStatus, GroupEntity,
    MatchEntryEntity, ParticipantEntity, PlayerEntity, UserContestEntity, UserTeamEntity,
};

/// Identifiers are stored as hyphenated strings so they stay readable in the shell.
fn parse_id(raw: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(raw)
}

pub fn doc_id(id: impl Into<String>) -> Document {
    doc! {"_id": id.into()}
}

pub fn match_entry_key(group_id: Uuid, match_id: &str) -> String {
    format!("{group_id}:{match_id}")
}

pub fn participant_key(contest_id: Uuid, user_id: &str) -> String {
    format!("{contest_id}:{user_id}")
}

pub fn user_contest_key(user_id: &str, contest_id: Uuid) -> String {
    format!("{user_id}:{contest_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGroupDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    max_members: u32,
    created_at: DateTime,
    created_by: String,
    members: Vec<String>,
}

impl From<GroupEntity> for MongoGroupDocument {
    fn from(value: GroupEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            max_members: value.max_members,
            created_at: DateTime::from_system_time(value.created_at),
            created_by: value.created_by,
            members: value.members,
        }
    }
}

impl TryFrom<MongoGroupDocument> for GroupEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoGroupDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            name: value.name,
            max_members: value.max_members,
            created_at: value.created_at.to_system_time(),
            created_by: value.created_by,
            members: value.members,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchEntryDocument {
    #[serde(rename = "_id")]
    id: String,
    pub group_id: String,
    match_id: String,
    team_one: String,
    team_two: String,
    status: String,
    scheduled_at: Option<String>,
    registered_at: DateTime,
}

impl From<MatchEntryEntity> for MongoMatchEntryDocument {
    fn from(value: MatchEntryEntity) -> Self {
        Self {
            id: match_entry_key(value.group_id, &value.match_id),
            group_id: value.group_id.to_string(),
            match_id: value.match_id,
            team_one: value.team_one,
            team_two: value.team_two,
            status: value.status,
            scheduled_at: value.scheduled_at,
            registered_at: DateTime::from_system_time(value.registered_at),
        }
    }
}

impl TryFrom<MongoMatchEntryDocument> for MatchEntryEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoMatchEntryDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: parse_id(&value.group_id)?,
            match_id: value.match_id,
            team_one: value.team_one,
            team_two: value.team_two,
            status: value.status,
            scheduled_at: value.scheduled_at,
            registered_at: value.registered_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoContestDocument {
    #[serde(rename = "_id")]
    id: String,
    group_id: String,
    match_id: String,
    name: String,
    entry_fee: f64,
    max_participants: u32,
    created_at: DateTime,
    created_by: String,
    status: ContestStatus,
}

impl From<ContestEntity> for MongoContestDocument {
    fn from(value: ContestEntity) -> Self {
        Self {
            id: value.id.to_string(),
            group_id: value.group_id.to_string(),
            match_id: value.match_id,
            name: value.name,
            entry_fee: value.entry_fee,
            max_participants: value.max_participants,
            created_at: DateTime::from_system_time(value.created_at),
            created_by: value.created_by,
            status: value.status,
        }
    }
}

impl TryFrom<MongoContestDocument> for ContestEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoContestDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            group_id: parse_id(&value.group_id)?,
            match_id: value.match_id,
            name: value.name,
            entry_fee: value.entry_fee,
            max_participants: value.max_participants,
            created_at: value.created_at.to_system_time(),
            created_by: value.created_by,
            status: value.status,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    group_id: String,
    match_id: String,
    contest_id: String,
    user_id: String,
    display_name: String,
    score: u32,
    #[serde(default)]
    score_version: Option<String>,
    joined_at: DateTime,
}

impl From<(ContestRef, ParticipantEntity)> for MongoParticipantDocument {
    fn from((contest, participant): (ContestRef, ParticipantEntity)) -> Self {
        Self {
            id: participant_key(contest.contest_id, &participant.user_id),
            group_id: contest.group_id.to_string(),
            match_id: contest.match_id,
            contest_id: contest.contest_id.to_string(),
            user_id: participant.user_id,
            display_name: participant.display_name,
            score: participant.score,
            score_version: participant.score_version,
            joined_at: DateTime::from_system_time(participant.joined_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            user_id: value.user_id,
            display_name: value.display_name,
            score: value.score,
            score_version: value.score_version,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserContestDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    group_id: String,
    match_id: String,
    contest_id: String,
    name: String,
    status: ContestStatus,
    joined: bool,
}

impl From<UserContestEntity> for MongoUserContestDocument {
    fn from(value: UserContestEntity) -> Self {
        Self {
            id: user_contest_key(&value.user_id, value.contest.contest_id),
            user_id: value.user_id,
            group_id: value.contest.group_id.to_string(),
            match_id: value.contest.match_id,
            contest_id: value.contest.contest_id.to_string(),
            name: value.name,
            status: value.status,
            joined: value.joined,
        }
    }
}

impl TryFrom<MongoUserContestDocument> for UserContestEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoUserContestDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: value.user_id,
            contest: ContestRef {
                group_id: parse_id(&value.group_id)?,
                match_id: value.match_id,
                contest_id: parse_id(&value.contest_id)?,
            },
            name: value.name,
            status: value.status,
            joined: value.joined,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserTeamDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    match_id: String,
    match_name: String,
    players: Vec<PlayerEntity>,
    created_at: DateTime,
}

impl From<UserTeamEntity> for MongoUserTeamDocument {
    fn from(value: UserTeamEntity) -> Self {
        Self {
            id: value.team_id(),
            user_id: value.user_id,
            match_id: value.match_id,
            match_name: value.match_name,
            players: value.players,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoUserTeamDocument> for UserTeamEntity {
    fn from(value: MongoUserTeamDocument) -> Self {
        Self {
            user_id: value.user_id,
            match_id: value.match_id,
            match_name: value.match_name,
            players: value.players,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChatDocument {
    #[serde(rename = "_id")]
    id: String,
    group_id: String,
    text: String,
    sender: ChatSender,
    created_at: DateTime,
}

impl From<ChatMessageEntity> for MongoChatDocument {
    fn from(value: ChatMessageEntity) -> Self {
        Self {
            id: value.id.to_string(),
            group_id: value.group_id.to_string(),
            text: value.text,
            sender: value.sender,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoChatDocument> for ChatMessageEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoChatDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            group_id: parse_id(&value.group_id)?,
            text: value.text,
            sender: value.sender,
            created_at: value.created_at.to_system_time(),
        })
    }
}
