use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoChatDocument, MongoContestDocument, MongoGroupDocument, MongoMatchEntryDocument,
        MongoParticipantDocument, MongoUserContestDocument, MongoUserTeamDocument, doc_id,
        match_entry_key, participant_key, user_contest_key,
    },
};
use crate::dao::{
    fantasy_store::FantasyStore,
    models::{
        ChatMessageEntity, ContestEntity, ContestRef, ContestStatus, GroupEntity,
        MatchEntryEntity, ParticipantEntity, ParticipantScore, UserContestEntity, UserTeamEntity,
        team_id,
    },
    storage::{StorageError, StorageResult},
};

const GROUPS: &str = "groups";
const MATCH_ENTRIES: &str = "match_entries";
const CONTESTS: &str = "contests";
const PARTICIPANTS: &str = "participants";
/// Per-contest counter of claimed seats, one document per contest.
const CONTEST_SEATS: &str = "contest_seats";
const USER_CONTESTS: &str = "user_contests";
const USER_TEAMS: &str = "user_teams";
const CHAT: &str = "chat";
const LEASES: &str = "leases";

/// [`FantasyStore`] backed by one MongoDB collection per level of the hierarchy.
#[derive(Clone)]
pub struct MongoFantasyStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn invalid_id(collection: &'static str) -> impl FnOnce(uuid::Error) -> MongoDaoError {
    move |source| MongoDaoError::InvalidId { collection, source }
}

impl MongoFantasyStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        self.ensure_index(GROUPS, "members", doc! {"members": 1}, false)
            .await?;
        self.ensure_index(MATCH_ENTRIES, "match_id", doc! {"match_id": 1}, false)
            .await?;
        self.ensure_index(
            CONTESTS,
            "group_id,match_id",
            doc! {"group_id": 1, "match_id": 1},
            false,
        )
        .await?;
        self.ensure_index(
            PARTICIPANTS,
            "contest_id,user_id",
            doc! {"contest_id": 1, "user_id": 1},
            true,
        )
        .await?;
        self.ensure_index(USER_CONTESTS, "user_id", doc! {"user_id": 1}, false)
            .await?;
        self.ensure_index(USER_CONTESTS, "contest_id", doc! {"contest_id": 1}, false)
            .await?;
        self.ensure_index(
            CHAT,
            "group_id,created_at",
            doc! {"group_id": 1, "created_at": 1},
            false,
        )
        .await?;
        Ok(())
    }

    async fn ensure_index(
        &self,
        collection: &'static str,
        index: &'static str,
        keys: Document,
        unique: bool,
    ) -> MongoResult<()> {
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(Some(format!("{collection}_{}_idx", index.replace(',', "_"))))
                    .unique(Some(unique))
                    .build(),
            )
            .build();

        self.collection::<Document>(collection)
            .await
            .create_index(model)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection,
                index,
                source,
            })?;
        Ok(())
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn replace<T>(&self, collection: &'static str, id: String, document: T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .replace_one(doc_id(id.clone()), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_by_id<T>(&self, collection: &'static str, id: String) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find_one(doc_id(id.clone()))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection,
                id,
                source,
            })
    }

    async fn find_many<T>(
        &self,
        collection: &'static str,
        filter: Document,
        sort: Option<Document>,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let coll = self.collection::<T>(collection).await;
        let mut find = coll.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        find.await
            .map_err(|source| MongoDaoError::List { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List { collection, source })
    }

    async fn list_groups_for_member(&self, user_id: String) -> MongoResult<Vec<GroupEntity>> {
        self.find_many::<MongoGroupDocument>(
            GROUPS,
            doc! {"members": user_id},
            Some(doc! {"created_at": 1}),
        )
        .await?
        .into_iter()
        .map(|document| GroupEntity::try_from(document).map_err(invalid_id(GROUPS)))
        .collect()
    }

    async fn list_groups_with_match(&self, match_id: String) -> MongoResult<Vec<Uuid>> {
        self.find_many::<MongoMatchEntryDocument>(
            MATCH_ENTRIES,
            doc! {"match_id": match_id},
            None,
        )
        .await?
        .into_iter()
        .map(|document| Uuid::parse_str(&document.group_id).map_err(invalid_id(MATCH_ENTRIES)))
        .collect()
    }

    async fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> MongoResult<Vec<ContestEntity>> {
        self.find_many::<MongoContestDocument>(
            CONTESTS,
            doc! {"group_id": group_id.to_string(), "match_id": match_id},
            Some(doc! {"created_at": 1}),
        )
        .await?
        .into_iter()
        .map(|document| ContestEntity::try_from(document).map_err(invalid_id(CONTESTS)))
        .collect()
    }

    /// Append a member unless they already belong or the group is full, in one
    /// conditional update. A miss is classified by reloading the group.
    async fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> StorageResult<Option<GroupEntity>> {
        let id = group_id.to_string();
        let updated = self
            .collection::<MongoGroupDocument>(GROUPS)
            .await
            .find_one_and_update(
                doc! {
                    "_id": &id,
                    "members": {"$ne": &user_id},
                    "$expr": {"$lt": [{"$size": "$members"}, "$max_members"]},
                },
                doc! {"$push": {"members": &user_id}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: GROUPS,
                id: id.clone(),
                source,
            })?;

        let document = match updated {
            Some(document) => document,
            None => {
                let Some(current) = self.find_by_id::<MongoGroupDocument>(GROUPS, id).await? else {
                    return Ok(None);
                };
                let group = GroupEntity::try_from(current).map_err(invalid_id(GROUPS))?;
                let reason = if group.is_member(&user_id) {
                    format!("`{user_id}` is already a member of group `{group_id}`")
                } else {
                    format!("group `{group_id}` is full ({} members)", group.max_members)
                };
                return Err(StorageError::Conflict(reason));
            }
        };

        Ok(Some(
            GroupEntity::try_from(document).map_err(invalid_id(GROUPS))?,
        ))
    }

    /// Take one seat of the contest counter. The filter misses once `capacity` seats are
    /// taken and the upsert then collides on `_id`.
    async fn claim_seat(&self, contest: &ContestRef, capacity: u32) -> StorageResult<()> {
        let full = || {
            StorageError::Conflict(format!(
                "contest `{contest}` is full ({capacity} participants)"
            ))
        };
        if capacity == 0 {
            return Err(full());
        }

        let id = contest.contest_id.to_string();
        let result = self
            .collection::<Document>(CONTEST_SEATS)
            .await
            .update_one(
                doc! {"_id": &id, "taken": {"$lt": i64::from(capacity)}},
                doc! {"$inc": {"taken": 1_i64}},
            )
            .upsert(true)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(full()),
            Err(source) => Err(MongoDaoError::Update {
                collection: CONTEST_SEATS,
                id,
                source,
            }
            .into()),
        }
    }

    async fn release_seat(&self, contest: &ContestRef) -> MongoResult<()> {
        let id = contest.contest_id.to_string();
        self.collection::<Document>(CONTEST_SEATS)
            .await
            .update_one(doc_id(id.clone()), doc! {"$inc": {"taken": -1_i64}})
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: CONTEST_SEATS,
                id,
                source,
            })?;
        Ok(())
    }

    async fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> StorageResult<()> {
        self.claim_seat(&contest, capacity).await?;

        let id = participant_key(contest.contest_id, &participant.user_id);
        let document: MongoParticipantDocument = (contest.clone(), participant).into();
        let inserted = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await
            .insert_one(&document)
            .await;

        let err = match inserted {
            Ok(_) => return Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                StorageError::Conflict(format!("participant `{id}` already exists"))
            }
            Err(source) => MongoDaoError::Save {
                collection: PARTICIPANTS,
                id,
                source,
            }
            .into(),
        };

        if let Err(release) = self.release_seat(&contest).await {
            warn!(contest = %contest, error = %release, "failed to release contest seat");
        }
        Err(err)
    }

    async fn list_participants(&self, contest: ContestRef) -> MongoResult<Vec<ParticipantEntity>> {
        Ok(self
            .find_many::<MongoParticipantDocument>(
                PARTICIPANTS,
                doc! {"contest_id": contest.contest_id.to_string()},
                Some(doc! {"joined_at": 1}),
            )
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> MongoResult<()> {
        let id = participant_key(contest.contest_id, &user_id);
        let result = self
            .collection::<Document>(PARTICIPANTS)
            .await
            .update_one(
                doc_id(id.clone()),
                doc! {"$set": {
                    "score": i64::from(score.score),
                    "score_version": score.score_version,
                }},
            )
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: PARTICIPANTS,
                id: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingDocument {
                collection: PARTICIPANTS,
                id,
            });
        }
        Ok(())
    }

    async fn list_user_contests(&self, user_id: String) -> MongoResult<Vec<UserContestEntity>> {
        self.find_many::<MongoUserContestDocument>(USER_CONTESTS, doc! {"user_id": user_id}, None)
            .await?
            .into_iter()
            .map(|document| UserContestEntity::try_from(document).map_err(invalid_id(USER_CONTESTS)))
            .collect()
    }

    async fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> MongoResult<()> {
        let contest_id = contest.contest_id.to_string();
        self.collection::<Document>(USER_CONTESTS)
            .await
            .update_many(
                doc! {"contest_id": &contest_id},
                doc! {"$set": {"status": status.as_str()}},
            )
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: USER_CONTESTS,
                id: contest_id,
                source,
            })?;
        Ok(())
    }

    async fn append_chat_message(&self, message: ChatMessageEntity) -> MongoResult<()> {
        let id = message.id.to_string();
        let document: MongoChatDocument = message.into();
        self.collection::<MongoChatDocument>(CHAT)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: CHAT,
                id,
                source,
            })?;
        Ok(())
    }

    async fn list_chat_messages(&self, group_id: Uuid) -> MongoResult<Vec<ChatMessageEntity>> {
        self.find_many::<MongoChatDocument>(
            CHAT,
            doc! {"group_id": group_id.to_string()},
            Some(doc! {"created_at": 1}),
        )
        .await?
        .into_iter()
        .map(|document| ChatMessageEntity::try_from(document).map_err(invalid_id(CHAT)))
        .collect()
    }

    /// Upsert guarded by the holder/expiry filter: when another holder owns an unexpired
    /// lease the filter misses and the upsert collides on `_id`.
    async fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> MongoResult<bool> {
        let now = DateTime::now();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_millis(now.timestamp_millis().saturating_add(ttl_ms));

        let result = self
            .collection::<Document>(LEASES)
            .await
            .update_one(
                doc! {
                    "_id": &name,
                    "$or": [{"holder": &holder}, {"expires_at": {"$lte": now}}],
                },
                doc! {"$set": {"holder": &holder, "expires_at": expires_at}},
            )
            .upsert(true)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::Lease { name, source }),
        }
    }

    async fn release_lease(&self, name: String, holder: String) -> MongoResult<()> {
        self.collection::<Document>(LEASES)
            .await
            .delete_one(doc! {"_id": &name, "holder": &holder})
            .await
            .map_err(|source| MongoDaoError::Lease { name, source })?;
        Ok(())
    }
}

impl FantasyStore for MongoFantasyStore {
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = group.id.to_string();
            let document: MongoGroupDocument = group.into();
            store
                .replace(GROUPS, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .find_by_id::<MongoGroupDocument>(GROUPS, id.to_string())
                .await?;
            Ok(document
                .map(GroupEntity::try_from)
                .transpose()
                .map_err(invalid_id(GROUPS))?)
        })
    }

    fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.add_group_member(group_id, user_id).await })
    }

    fn list_groups_for_member(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_groups_for_member(user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_match_entry(&self, entry: MatchEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = match_entry_key(entry.group_id, &entry.match_id);
            let document: MongoMatchEntryDocument = entry.into();
            store
                .replace(MATCH_ENTRIES, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_match_entry(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .find_by_id::<MongoMatchEntryDocument>(
                    MATCH_ENTRIES,
                    match_entry_key(group_id, &match_id),
                )
                .await?;
            Ok(document
                .map(MatchEntryEntity::try_from)
                .transpose()
                .map_err(invalid_id(MATCH_ENTRIES))?)
        })
    }

    fn list_groups_with_match(
        &self,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_groups_with_match(match_id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = contest.id.to_string();
            let document: MongoContestDocument = contest.into();
            store
                .replace(CONTESTS, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_contest(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .find_by_id::<MongoContestDocument>(CONTESTS, contest.contest_id.to_string())
                .await?;
            let entity = document
                .map(ContestEntity::try_from)
                .transpose()
                .map_err(invalid_id(CONTESTS))?;
            // A contest id is only meaningful under the group and match it was created in.
            Ok(entity.filter(|found| found.contest_ref() == contest))
        })
    }

    fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ContestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_contests(group_id, match_id)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_participant(contest, participant, capacity).await })
    }

    fn list_participants(
        &self,
        contest: ContestRef,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(contest).await.map_err(Into::into) })
    }

    fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_participant_score(contest, user_id, score)
                .await
                .map_err(Into::into)
        })
    }

    fn save_user_contest(&self, mirror: UserContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = user_contest_key(&mirror.user_id, mirror.contest.contest_id);
            let document: MongoUserContestDocument = mirror.into();
            store
                .replace(USER_CONTESTS, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_contests(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserContestEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_user_contests(user_id).await.map_err(Into::into) })
    }

    fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_user_contest_status(contest, status)
                .await
                .map_err(Into::into)
        })
    }

    fn save_user_team(&self, team: UserTeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = team.team_id();
            let document: MongoUserTeamDocument = team.into();
            store
                .replace(USER_TEAMS, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_team(
        &self,
        user_id: String,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserTeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .find_by_id::<MongoUserTeamDocument>(USER_TEAMS, team_id(&match_id, &user_id))
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn append_chat_message(
        &self,
        message: ChatMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_chat_message(message).await.map_err(Into::into) })
    }

    fn list_chat_messages(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_chat_messages(group_id).await.map_err(Into::into) })
    }

    fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .try_acquire_lease(name, holder, ttl)
                .await
                .map_err(Into::into)
        })
    }

    fn release_lease(&self, name: String, holder: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.release_lease(name, holder).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
