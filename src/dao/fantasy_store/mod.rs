#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::Duration;

use crate::dao::models::{
    ChatMessageEntity, ContestEntity, ContestRef, ContestStatus, GroupEntity, MatchEntryEntity,
    ParticipantEntity, ParticipantScore, UserContestEntity, UserTeamEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the hierarchical persistence layer:
/// groups → matches → contests → participants, plus per-user mirrors, chat logs and
/// reconciliation leases.
pub trait FantasyStore: Send + Sync {
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>>;
    /// Append `user_id` to the member set, enforcing `max_members` against concurrent joins.
    ///
    /// Returns `None` when the group does not exist and [`StorageError::Conflict`] when the
    /// user is already a member or the group is full.
    ///
    /// [`StorageError::Conflict`]: crate::dao::storage::StorageError::Conflict
    fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>>;
    /// Groups whose member set contains `user_id`.
    fn list_groups_for_member(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>>;

    fn save_match_entry(&self, entry: MatchEntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_match_entry(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntryEntity>>>;
    /// Identifiers of the groups holding an entry for `match_id`.
    fn list_groups_with_match(&self, match_id: String)
    -> BoxFuture<'static, StorageResult<Vec<Uuid>>>;

    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_contest(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>>;
    fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ContestEntity>>>;

    /// Insert a participant, failing with [`StorageError::Conflict`] when the user already
    /// takes part in the contest or `capacity` participants are already in.
    ///
    /// The capacity check and the insert are atomic with respect to other joins.
    ///
    /// [`StorageError::Conflict`]: crate::dao::storage::StorageError::Conflict
    fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_participants(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Overwrite the score fields of one participant, leaving every other field alone.
    fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> BoxFuture<'static, StorageResult<()>>;

    fn save_user_contest(&self, mirror: UserContestEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_user_contests(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserContestEntity>>>;
    /// Propagate a status change to every mirror of the contest.
    fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;

    fn save_user_team(&self, team: UserTeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user_team(
        &self,
        user_id: String,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserTeamEntity>>>;

    fn append_chat_message(
        &self,
        message: ChatMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Chat log of a group, oldest first.
    fn list_chat_messages(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>>;

    /// Take the named lease for `ttl` unless another holder owns an unexpired one.
    /// Returns whether the lease is now held by `holder`.
    fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Release the named lease if `holder` still owns it.
    fn release_lease(&self, name: String, holder: String) -> BoxFuture<'static, StorageResult<()>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
