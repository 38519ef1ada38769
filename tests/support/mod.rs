//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use fantasy_cricket_back::{
    dao::{
        fantasy_store::{FantasyStore, memory::MemoryFantasyStore},
        models::{
            ChatMessageEntity, ContestEntity, ContestRef, ContestStatus, GroupEntity,
            MatchEntryEntity, ParticipantEntity, ParticipantScore, UserContestEntity,
            UserTeamEntity,
        },
        storage::{StorageError, StorageResult},
    },
    provider::{
        MatchProvider, MatchSnapshot, MatchState, MatchStats, ProviderError, ProviderResult,
        SquadPlayer,
    },
};
use futures::future::BoxFuture;
use tokio::sync::Notify;
use uuid::Uuid;

pub const MATCH_ID: &str = "m-ind-aus";

/// Feed whose matches can be swapped between ticks.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    pub matches: Arc<Mutex<Vec<MatchSnapshot>>>,
    pub unavailable: bool,
    /// Hang inside the stats fetch for this long before answering.
    pub stall: Option<Duration>,
}

impl ScriptedFeed {
    pub fn with(matches: Vec<MatchSnapshot>) -> Self {
        Self {
            matches: Arc::new(Mutex::new(matches)),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn replace(&self, matches: Vec<MatchSnapshot>) {
        *self.matches.lock().unwrap() = matches;
    }

    fn current(&self) -> ProviderResult<Vec<MatchSnapshot>> {
        if self.unavailable {
            Err(ProviderError::MissingApiKey)
        } else {
            Ok(self.matches.lock().unwrap().clone())
        }
    }
}

impl MatchProvider for ScriptedFeed {
    fn fetch_feed(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        let result = self.current().map(|matches| {
            matches
                .into_iter()
                .map(|snapshot| MatchSnapshot {
                    stats: None,
                    ..snapshot
                })
                .collect()
        });
        Box::pin(async move { result })
    }

    fn fetch_matches(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        let result = self.current();
        let stall = self.stall;
        Box::pin(async move {
            if let Some(stall) = stall {
                tokio::time::sleep(stall).await;
            }
            result
        })
    }

    fn fetch_squad(&self, _match_id: String) -> BoxFuture<'static, ProviderResult<Vec<SquadPlayer>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

pub fn snapshot(match_id: &str, stats: Option<MatchStats>) -> MatchSnapshot {
    MatchSnapshot {
        id: match_id.into(),
        team_one: "India".into(),
        team_two: "Australia".into(),
        status: "India won by 5 wickets".into(),
        state: MatchState::Result,
        scheduled_at: None,
        team_one_score: None,
        team_two_score: None,
        stats,
    }
}

pub fn default_stats() -> MatchStats {
    MatchStats::from_points([("kohli", 20.0), ("bumrah", 17.4), ("smith", 50.0), ("starc", 31.0)])
}

/// Store wrapper that delegates to memory and injects failures or stalls.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryFantasyStore,
    pub failing_contest: Option<Uuid>,
    pub stall_contest_listing: bool,
    /// Signalled when the walk lists groups for a match.
    pub entered: Option<Arc<Notify>>,
    /// Awaited before listing groups for a match.
    pub release: Option<Arc<Notify>>,
    /// Slows down group and participant reads so concurrent callers interleave.
    pub read_delay: Option<Duration>,
    pub score_writes: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn over(inner: MemoryFantasyStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.score_writes.load(Ordering::SeqCst)
    }

    fn delayed<T: Send + 'static>(
        &self,
        read: BoxFuture<'static, StorageResult<T>>,
    ) -> BoxFuture<'static, StorageResult<T>> {
        let delay = self.read_delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            read.await
        })
    }
}

impl FantasyStore for FaultyStore {
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_group(group)
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        self.delayed(self.inner.find_group(id))
    }

    fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        self.inner.add_group_member(group_id, user_id)
    }

    fn list_groups_for_member(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        self.inner.list_groups_for_member(user_id)
    }

    fn save_match_entry(&self, entry: MatchEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_match_entry(entry)
    }

    fn find_match_entry(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntryEntity>>> {
        self.inner.find_match_entry(group_id, match_id)
    }

    fn list_groups_with_match(
        &self,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let inner = self.inner.clone();
        let entered = self.entered.clone();
        let release = self.release.clone();
        Box::pin(async move {
            if let Some(entered) = entered {
                entered.notify_one();
            }
            if let Some(release) = release {
                release.notified().await;
            }
            inner.list_groups_with_match(match_id).await
        })
    }

    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_contest(contest)
    }

    fn find_contest(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>> {
        self.inner.find_contest(contest)
    }

    fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ContestEntity>>> {
        let inner = self.inner.clone();
        let stall = self.stall_contest_listing;
        Box::pin(async move {
            if stall {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            inner.list_contests(group_id, match_id).await
        })
    }

    fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_participant(contest, participant, capacity)
    }

    fn list_participants(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        self.delayed(self.inner.list_participants(contest))
    }

    fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if self.failing_contest == Some(contest.contest_id) {
            return Box::pin(async { Err(StorageError::Conflict("injected write failure".into())) });
        }
        self.score_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_participant_score(contest, user_id, score)
    }

    fn save_user_contest(&self, mirror: UserContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_user_contest(mirror)
    }

    fn list_user_contests(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserContestEntity>>> {
        self.inner.list_user_contests(user_id)
    }

    fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.update_user_contest_status(contest, status)
    }

    fn save_user_team(&self, team: UserTeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_user_team(team)
    }

    fn find_user_team(
        &self,
        user_id: String,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserTeamEntity>>> {
        self.inner.find_user_team(user_id, match_id)
    }

    fn append_chat_message(
        &self,
        message: ChatMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.append_chat_message(message)
    }

    fn list_chat_messages(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>> {
        self.inner.list_chat_messages(group_id)
    }

    fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.try_acquire_lease(name, holder, ttl)
    }

    fn release_lease(&self, name: String, holder: String) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.release_lease(name, holder)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
