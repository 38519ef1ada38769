use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};
use tracing::warn;
use url::Url;
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

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, END_SUFFIX, FindResponse, GROUP_PREFIX, LeaseBody,
        MATCH_PREFIX, ParticipantBody, SeatBody, USER_CONTEST_PREFIX, UserContestBody,
        chat_doc_id, chat_prefix, contest_doc_id, contest_prefix, epoch_millis, group_doc_id,
        lease_doc_id, match_doc_id, participant_doc_id, participant_prefix, prefix_selector,
        seat_doc_id, team_doc_id, user_contest_doc_id, user_contest_prefix,
    },
};

const ALL_DOCS: &str = "_all_docs";
const FIND: &str = "_find";
/// Attempts at a revision-checked read-modify-write before giving up.
const MAX_WRITE_ATTEMPTS: u32 = 16;

/// Base URL with the database appended as one encoded path segment.
fn database_url(base_url: &str, database: &str) -> CouchResult<Url> {
    let mut url = Url::parse(base_url).map_err(|source| CouchDaoError::InvalidBaseUrl {
        url: base_url.to_owned(),
        source,
    })?;
    url.path_segments_mut()
        .map_err(|()| CouchDaoError::OpaqueBaseUrl {
            url: base_url.to_owned(),
        })?
        .pop_if_empty()
        .push(database);
    Ok(url)
}

/// Address of `segment` inside the database. Document ids embed user and match ids, so
/// `/`, `?` and `#` must stay inside the one segment.
fn document_url(database_url: &Url, segment: &str) -> Url {
    let mut url = database_url.clone();
    // `database_url` was built through `path_segments_mut`, so this cannot fail.
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(segment);
    }
    url
}

/// [`FantasyStore`] backed by a single CouchDB database, with the hierarchy encoded in
/// prefixed document ids.
#[derive(Clone)]
pub struct CouchFantasyStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchFantasyStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let database_url = Arc::new(database_url(&config.base_url, &config.database)?);
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            database_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = document_url(&self.database_url, path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url.as_ref().clone();

        let response = self
            .with_auth(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<CouchDocument<T>>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument<T>>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, document: &CouchDocument<T>) -> CouchResult<()>
    where
        T: Serialize,
    {
        let response = self
            .request(Method::PUT, &document.id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::DocumentConflict {
                path: document.id.clone(),
            }),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status: other,
            }),
        }
    }

    /// Write `body` under `doc_id`, carrying over the current revision when one exists.
    async fn upsert<T>(&self, doc_id: String, body: T) -> CouchResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut document = CouchDocument::new(doc_id, body);
        if let Some(existing) = self.get_document::<Value>(&document.id).await? {
            document.rev = existing.rev;
        }
        self.put_document(&document).await
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<()> {
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::DocumentConflict {
                path: doc_id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// List every document whose id starts with `prefix`, in id order.
    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<CouchDocument<T>>>
    where
        T: DeserializeOwned,
    {
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Run a Mango query and decode the matching documents.
    async fn find_documents<T>(&self, selector: Value) -> CouchResult<Vec<CouchDocument<T>>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, FIND)
            .json(&json!({ "selector": selector }))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: FIND.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: FIND.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<FindResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: FIND.to_string(),
                source,
            }
        })?;

        payload
            .docs
            .into_iter()
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: FIND.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Append a member through a revision-checked write, re-reading after lost races.
    async fn add_group_member(
        &self,
        group_id: Uuid,
        user_id: String,
    ) -> StorageResult<Option<GroupEntity>> {
        let doc_id = group_doc_id(group_id);
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut document) = self.get_document::<GroupEntity>(&doc_id).await? else {
                return Ok(None);
            };
            if document.body.is_member(&user_id) {
                return Err(StorageError::Conflict(format!(
                    "`{user_id}` is already a member of group `{group_id}`"
                )));
            }
            if !document.body.has_room() {
                return Err(StorageError::Conflict(format!(
                    "group `{group_id}` is full ({} members)",
                    document.body.max_members
                )));
            }

            document.body.members.push(user_id.clone());
            match self.put_document(&document).await {
                Ok(()) => return Ok(Some(document.body)),
                Err(CouchDaoError::DocumentConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(CouchDaoError::WriteContention {
            path: doc_id,
            attempts: MAX_WRITE_ATTEMPTS,
        }
        .into())
    }

    /// Take one seat on the contest's counter document.
    async fn claim_seat(&self, contest: &ContestRef, capacity: u32) -> StorageResult<()> {
        let doc_id = seat_doc_id(contest.contest_id);
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut document = self
                .get_document::<SeatBody>(&doc_id)
                .await?
                .unwrap_or_else(|| CouchDocument::new(doc_id.clone(), SeatBody::default()));
            if document.body.taken >= capacity {
                return Err(StorageError::Conflict(format!(
                    "contest `{contest}` is full ({capacity} participants)"
                )));
            }

            document.body.taken += 1;
            match self.put_document(&document).await {
                Ok(()) => return Ok(()),
                Err(CouchDaoError::DocumentConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(CouchDaoError::WriteContention {
            path: doc_id,
            attempts: MAX_WRITE_ATTEMPTS,
        }
        .into())
    }

    async fn release_seat(&self, contest: &ContestRef) -> CouchResult<()> {
        let doc_id = seat_doc_id(contest.contest_id);
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut document) = self.get_document::<SeatBody>(&doc_id).await? else {
                return Ok(());
            };
            document.body.taken = document.body.taken.saturating_sub(1);
            match self.put_document(&document).await {
                Err(CouchDaoError::DocumentConflict { .. }) => continue,
                other => return other,
            }
        }
        Err(CouchDaoError::WriteContention {
            path: doc_id,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn insert_participant(
        &self,
        contest: ContestRef,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> StorageResult<()> {
        self.claim_seat(&contest, capacity).await?;

        // No revision: CouchDB answers 409 when the participant already exists.
        let document = CouchDocument::new(
            participant_doc_id(contest.contest_id, &participant.user_id),
            ParticipantBody {
                group_id: contest.group_id,
                match_id: contest.match_id.clone(),
                contest_id: contest.contest_id,
                participant,
            },
        );
        let Err(err) = self.put_document(&document).await else {
            return Ok(());
        };

        if let Err(release) = self.release_seat(&contest).await {
            warn!(contest = %contest, error = %release, "failed to release contest seat");
        }
        Err(err.into())
    }

    async fn set_participant_score(
        &self,
        contest: ContestRef,
        user_id: String,
        score: ParticipantScore,
    ) -> CouchResult<()> {
        let doc_id = participant_doc_id(contest.contest_id, &user_id);
        let Some(mut document) = self.get_document::<ParticipantBody>(&doc_id).await? else {
            return Err(CouchDaoError::MissingDocument { path: doc_id });
        };
        document.body.participant.score = score.score;
        document.body.participant.score_version = Some(score.score_version);
        self.put_document(&document).await
    }

    async fn update_user_contest_status(
        &self,
        contest: ContestRef,
        status: ContestStatus,
    ) -> CouchResult<()> {
        let mirrors = self
            .find_documents::<UserContestBody>(json!({
                "_id": prefix_selector(USER_CONTEST_PREFIX),
                "contest_id": contest.contest_id,
            }))
            .await?;

        for mut mirror in mirrors {
            mirror.body.mirror.status = status;
            self.put_document(&mirror).await?;
        }
        Ok(())
    }

    async fn try_acquire_lease(
        &self,
        name: String,
        holder: String,
        ttl: Duration,
    ) -> CouchResult<bool> {
        let doc_id = lease_doc_id(&name);
        let now = SystemTime::now();
        let existing = self.get_document::<LeaseBody>(&doc_id).await?;

        let rev = match existing {
            Some(current)
                if current.body.holder != holder
                    && current.body.expires_at_ms > epoch_millis(now) =>
            {
                return Ok(false);
            }
            Some(current) => current.rev,
            None => None,
        };

        let mut document = CouchDocument::new(
            doc_id,
            LeaseBody {
                holder,
                expires_at_ms: epoch_millis(now + ttl),
            },
        );
        document.rev = rev;

        match self.put_document(&document).await {
            Ok(()) => Ok(true),
            // Someone else wrote the lease between our read and write.
            Err(CouchDaoError::DocumentConflict { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn release_lease(&self, name: String, holder: String) -> CouchResult<()> {
        let doc_id = lease_doc_id(&name);
        match self.get_document::<LeaseBody>(&doc_id).await? {
            Some(current) if current.body.holder == holder => match current.rev {
                Some(rev) => self.delete_document(&doc_id, &rev).await,
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

impl FantasyStore for CouchFantasyStore {
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(group_doc_id(group.id), group)
                .await
                .map_err(Into::into)
        })
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<GroupEntity>(&group_doc_id(id))
                .await?;
            Ok(document.map(|document| document.body))
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
            let documents = store
                .find_documents::<GroupEntity>(json!({
                    "_id": prefix_selector(GROUP_PREFIX),
                    "members": { "$elemMatch": { "$eq": user_id } },
                }))
                .await?;
            let mut groups = documents
                .into_iter()
                .map(|document| document.body)
                .collect::<Vec<_>>();
            groups.sort_by_key(|group| group.created_at);
            Ok(groups)
        })
    }

    fn save_match_entry(&self, entry: MatchEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(match_doc_id(entry.group_id, &entry.match_id), entry)
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
                .get_document::<MatchEntryEntity>(&match_doc_id(group_id, &match_id))
                .await?;
            Ok(document.map(|document| document.body))
        })
    }

    fn list_groups_with_match(
        &self,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .find_documents::<MatchEntryEntity>(json!({
                    "_id": prefix_selector(MATCH_PREFIX),
                    "match_id": match_id,
                }))
                .await?;
            Ok(documents
                .into_iter()
                .map(|document| document.body.group_id)
                .collect())
        })
    }

    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(contest_doc_id(&contest.contest_ref()), contest)
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
                .get_document::<ContestEntity>(&contest_doc_id(&contest))
                .await?;
            Ok(document.map(|document| document.body))
        })
    }

    fn list_contests(
        &self,
        group_id: Uuid,
        match_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ContestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_documents::<ContestEntity>(&contest_prefix(group_id, &match_id))
                .await?;
            let mut contests = documents
                .into_iter()
                .map(|document| document.body)
                .collect::<Vec<_>>();
            contests.sort_by_key(|contest| contest.created_at);
            Ok(contests)
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
        Box::pin(async move {
            let documents = store
                .list_documents::<ParticipantBody>(&participant_prefix(contest.contest_id))
                .await?;
            let mut participants = documents
                .into_iter()
                .map(|document| document.body.participant)
                .collect::<Vec<_>>();
            participants.sort_by_key(|participant| participant.joined_at);
            Ok(participants)
        })
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
            let doc_id = user_contest_doc_id(&mirror.user_id, mirror.contest.contest_id);
            let body = UserContestBody {
                contest_id: mirror.contest.contest_id,
                mirror,
            };
            store.upsert(doc_id, body).await.map_err(Into::into)
        })
    }

    fn list_user_contests(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserContestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_documents::<UserContestBody>(&user_contest_prefix(&user_id))
                .await?;
            Ok(documents
                .into_iter()
                .map(|document| document.body.mirror)
                .collect())
        })
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
            store
                .upsert(team_doc_id(&team.team_id()), team)
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
                .get_document::<UserTeamEntity>(&team_doc_id(&team_id(&match_id, &user_id)))
                .await?;
            Ok(document.map(|document| document.body))
        })
    }

    fn append_chat_message(
        &self,
        message: ChatMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = CouchDocument::new(
                chat_doc_id(message.group_id, message.created_at, message.id),
                message,
            );
            store.put_document(&document).await.map_err(Into::into)
        })
    }

    fn list_chat_messages(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChatMessageEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_documents::<ChatMessageEntity>(&chat_prefix(group_id))
                .await?;
            Ok(documents
                .into_iter()
                .map(|document| document.body)
                .collect())
        })
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
        Box::pin(async move {
            let url = store.database_url.as_ref().clone();
            let response = store
                .with_auth(store.client.get(url.clone()))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.to_string(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url.to_string(),
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_is_appended_once_regardless_of_trailing_slash() {
        for base in ["http://couch:5984", "http://couch:5984/"] {
            let url = database_url(base, "fantasy_cricket").unwrap();
            assert_eq!(url.as_str(), "http://couch:5984/fantasy_cricket");
        }
        let nested = database_url("https://proxy.local/couch/", "fantasy_cricket").unwrap();
        assert_eq!(nested.as_str(), "https://proxy.local/couch/fantasy_cricket");
    }

    #[test]
    fn document_ids_stay_in_one_path_segment() {
        let base = database_url("http://couch:5984", "fantasy_cricket").unwrap();
        let contest_id = Uuid::nil();
        let doc_id = participant_doc_id(contest_id, "ann/../bob?rev=1#frag");

        let url = document_url(&base, &doc_id);

        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let segments = url.path_segments().unwrap().collect::<Vec<_>>();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "fantasy_cricket");
        assert!(segments[1].ends_with("ann%2F..%2Fbob%3Frev=1%23frag"));
    }

    #[test]
    fn reserved_endpoints_are_untouched() {
        let base = database_url("http://couch:5984", "fantasy_cricket").unwrap();
        assert_eq!(
            document_url(&base, ALL_DOCS).as_str(),
            "http://couch:5984/fantasy_cricket/_all_docs"
        );
    }

    #[test]
    fn opaque_base_urls_are_rejected() {
        assert!(matches!(
            database_url("mailto:admin@couch", "fantasy_cricket"),
            Err(CouchDaoError::OpaqueBaseUrl { .. })
        ));
        assert!(matches!(
            database_url("not a url", "fantasy_cricket"),
            Err(CouchDaoError::InvalidBaseUrl { .. })
        ));
    }
}
