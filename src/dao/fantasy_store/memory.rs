//! Process-local store used for development runs and tests.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, ready};
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::{
    fantasy_store::FantasyStore,
    models::{
        ChatMessageEntity, ContestEntity, ContestRef, ContestStatus, GroupEntity,
        MatchEntryEntity, ParticipantEntity, ParticipantScore, UserContestEntity, UserTeamEntity,
        team_id,
    },
    storage::{StorageError, StorageResult},
};

/// Failures specific to the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryDaoError {
    /// Score update addressed a participant that does not exist.
    #[error("participant `{user_id}` not found in contest `{contest}`")]
    MissingParticipant { contest: ContestRef, user_id: String },
}

impl From<MemoryDaoError> for StorageError {
    fn from(err: MemoryDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

#[derive(Debug, Clone)]
struct Lease {
    holder: String,
    expires_at: Instant,
}

#[derive(Default)]
struct MemoryInner {
    groups: DashMap<Uuid, GroupEntity>,
    match_entries: DashMap<(Uuid, String), MatchEntryEntity>,
    contests: DashMap<ContestRef, ContestEntity>,
    participants: DashMap<ContestRef, IndexMap<String, ParticipantEntity>>,
    user_contests: DashMap<(String, Uuid), UserContestEntity>,
    user_teams: DashMap<String, UserTeamEntity>,
    chat: DashMap<Uuid, Vec<ChatMessageEntity>>,
    leases: DashMap<String, Lease>,
}

/// [`FantasyStore`] keeping every collection in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryFantasyStore {
    inner: Arc<MemoryInner>,
}

impl MemoryFantasyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn done<T: Send + 'static>(value: StorageResult<T>) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(ready(value))
}

impl FantasyStore for MemoryFantasyStore {
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.groups.insert(group.id, group);
        done(Ok(()))
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        done(Ok(self.inner.groups.get(&id).map(|group| group.clone())))
    }

    fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        // The shard guard serialises joins on the same group.
        let Some(mut group) = self.inner.groups.get_mut(&group_id) else {
            return done(Ok(None));
        };
        if group.is_member(&user_id) {
            return done(Err(StorageError::Conflict(format!(
                "`{user_id}` is already a member of group `{group_id}`"
            ))));
        }
        if !group.has_room() {
            return done(Err(StorageError::Conflict(format!(
                "group `{group_id}` is full ({} members)",
                group.max_members
            ))));
        }
        group.members.push(user_id);
        done(Ok(Some(group.clone())))
    }

    fn list_groups_for_member(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let mut groups = self
            .inner
            .groups
            .iter()
            .filter(|group| group.is_member(&user_id))
            .map(|group| group.clone())
            .collect::<Vec<_>>();
        groups.sort_by_key(|group| group.created_at);
        done(Ok(groups))
    }

    fn save_match_entry(&self, entry: MatchEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .match_entries
            .insert((entry.group_id, entry.match_id.clone()), entry);
        done(Ok(()))
    }

    fn find_match_entry(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntryEntity>>> {
        done(Ok(self
            .inner
            .match_entries
            .get(&(group_id, match_id))
            .map(|entry| entry.clone())))
    }

    fn list_groups_with_match(
        &self,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let groups = self
            .inner
            .match_entries
            .iter()
            .filter(|entry| entry.key().1 == match_id)
            .map(|entry| entry.key().0)
            .collect();
        done(Ok(groups))
    }

    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.contests.insert(contest.contest_ref(), contest);
        done(Ok(()))
    }

    fn find_contest(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>> {
        done(Ok(self
            .inner
            .contests
            .get(&contest)
            .map(|entity| entity.clone())))
    }

    fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ContestEntity>>> {
        let mut contests = self
            .inner
            .contests
            .iter()
            .filter(|entry| entry.key().group_id == group_id && entry.key().match_id == match_id)
            .map(|entry| entry.clone())
            .collect::<Vec<_>>();
        contests.sort_by_key(|contest| contest.created_at);
        done(Ok(contests))
    }

    fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mut roster = self.inner.participants.entry(contest.clone()).or_default();
        if roster.contains_key(&participant.user_id) {
            return done(Err(StorageError::Conflict(format!(
                "participant `{}` already in contest `{contest}`",
                participant.user_id
            ))));
        }
        if roster.len() >= capacity as usize {
            return done(Err(StorageError::Conflict(format!(
                "contest `{contest}` is full ({capacity} participants)"
            ))));
        }
        roster.insert(participant.user_id.clone(), participant);
        done(Ok(()))
    }

    fn list_participants(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let participants = self
            .inner
            .participants
            .get(&contest)
            .map(|roster| roster.values().cloned().collect())
            .unwrap_or_default();
        done(Ok(participants))
    }

    fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let updated = self
            .inner
            .participants
            .get_mut(&contest)
            .and_then(|mut roster| {
                roster.get_mut(&user_id).map(|participant| {
                    participant.score = score.score;
                    participant.score_version = Some(score.score_version);
                })
            })
            .is_some();

        if updated {
            done(Ok(()))
        } else {
            done(Err(
                MemoryDaoError::MissingParticipant { contest, user_id }.into()
            ))
        }
    }

    fn save_user_contest(&self, mirror: UserContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .user_contests
            .insert((mirror.user_id.clone(), mirror.contest.contest_id), mirror);
        done(Ok(()))
    }

    fn list_user_contests(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserContestEntity>>> {
        let mirrors = self
            .inner
            .user_contests
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.clone())
            .collect();
        done(Ok(mirrors))
    }

    fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        for mut mirror in self.inner.user_contests.iter_mut() {
            if mirror.contest == contest {
                mirror.status = status;
            }
        }
        done(Ok(()))
    }

    fn save_user_team(&self, team: UserTeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.user_teams.insert(team.team_id(), team);
        done(Ok(()))
    }

    fn find_user_team(
        &self,
        user_id: String,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserTeamEntity>>> {
        done(Ok(self
            .inner
            .user_teams
            .get(&team_id(&match_id, &user_id))
            .map(|team| team.clone())))
    }

    fn append_chat_message(
        &self,
        message: ChatMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .chat
            .entry(message.group_id)
            .or_default()
            .push(message);
        done(Ok(()))
    }

    fn list_chat_messages(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>> {
        let mut messages = self
            .inner
            .chat
            .get(&group_id)
            .map(|log| log.clone())
            .unwrap_or_default();
        messages.sort_by_key(|message| message.created_at);
        done(Ok(messages))
    }

    fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let now = Instant::now();
        let lease = Lease {
            holder,
            expires_at: now + ttl,
        };
        let acquired = match self.inner.leases.entry(name) {
            Entry::Occupied(mut current) => {
                if current.get().holder == lease.holder || current.get().expires_at <= now {
                    current.insert(lease);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(lease);
                true
            }
        };
        done(Ok(acquired))
    }

    fn release_lease(&self, name: String, holder: String) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .leases
            .remove_if(&name, |_, lease| lease.holder == holder);
        done(Ok(()))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(Ok(()))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(Ok(()))
    }
}
