use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::dao::models::{ContestRef, ParticipantEntity, UserContestEntity};

pub const GROUP_PREFIX: &str = "group::";
pub const MATCH_PREFIX: &str = "match::";
pub const CONTEST_PREFIX: &str = "contest::";
pub const PARTICIPANT_PREFIX: &str = "participant::";
pub const USER_CONTEST_PREFIX: &str = "user_contest::";
pub const TEAM_PREFIX: &str = "team::";
pub const CHAT_PREFIX: &str = "chat::";
pub const LEASE_PREFIX: &str = "lease::";
pub const SEAT_PREFIX: &str = "seats::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

/// Every document shares the `_id`/`_rev` envelope with its body flattened next to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    pub fn new(id: String, body: T) -> Self {
        Self { id, rev: None, body }
    }
}

/// Participant body carrying its position in the hierarchy for selector queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantBody {
    pub group_id: Uuid,
    pub match_id: String,
    pub contest_id: Uuid,
    #[serde(flatten)]
    pub participant: ParticipantEntity,
}

/// User contest mirror with the contest id lifted to the top level so `_find` can match it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContestBody {
    pub contest_id: Uuid,
    #[serde(flatten)]
    pub mirror: UserContestEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseBody {
    pub holder: String,
    pub expires_at_ms: u64,
}

/// Number of participant seats claimed in one contest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatBody {
    pub taken: u32,
}

pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

pub fn group_doc_id(id: Uuid) -> String {
    format!("{GROUP_PREFIX}{id}")
}

pub fn match_doc_id(group_id: Uuid, match_id: &str) -> String {
    format!("{MATCH_PREFIX}{group_id}:{match_id}")
}

pub fn contest_prefix(group_id: Uuid, match_id: &str) -> String {
    format!("{CONTEST_PREFIX}{group_id}:{match_id}:")
}

pub fn contest_doc_id(contest: &ContestRef) -> String {
    format!(
        "{}{}",
        contest_prefix(contest.group_id, &contest.match_id),
        contest.contest_id
    )
}

pub fn participant_prefix(contest_id: Uuid) -> String {
    format!("{PARTICIPANT_PREFIX}{contest_id}:")
}

pub fn participant_doc_id(contest_id: Uuid, user_id: &str) -> String {
    format!("{}{user_id}", participant_prefix(contest_id))
}

pub fn user_contest_prefix(user_id: &str) -> String {
    format!("{USER_CONTEST_PREFIX}{user_id}:")
}

pub fn user_contest_doc_id(user_id: &str, contest_id: Uuid) -> String {
    format!("{}{contest_id}", user_contest_prefix(user_id))
}

pub fn team_doc_id(team_id: &str) -> String {
    format!("{TEAM_PREFIX}{team_id}")
}

pub fn chat_prefix(group_id: Uuid) -> String {
    format!("{CHAT_PREFIX}{group_id}:")
}

/// Chat ids embed a zero-padded timestamp so `_all_docs` returns the log in send order.
pub fn chat_doc_id(group_id: Uuid, created_at: SystemTime, id: Uuid) -> String {
    format!(
        "{}{:020}:{id}",
        chat_prefix(group_id),
        epoch_millis(created_at)
    )
}

pub fn seat_doc_id(contest_id: Uuid) -> String {
    format!("{SEAT_PREFIX}{contest_id}")
}

pub fn lease_doc_id(name: &str) -> String {
    format!("{LEASE_PREFIX}{name}")
}

/// Mango selector restricting `_id` to one prefix.
pub fn prefix_selector(prefix: &str) -> Value {
    serde_json::json!({
        "$gt": prefix,
        "$lt": format!("{prefix}{END_SUFFIX}"),
    })
}
