use std::{sync::Arc, time::SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        fantasy_store::FantasyStore,
        models::{
            ContestEntity, ContestRef, ContestStatus, GroupEntity, MatchEntryEntity,
            ParticipantEntity, UserContestEntity,
        },
    },
    dto::{
        contest::{
            ContestResponse, ContestStatusFilter, CreateContestRequest, LeaderboardEntry,
            UpdateContestStatusRequest, UserContestResponse,
        },
        identity::Caller,
    },
    error::ServiceError,
    services::{
        group_service::{announce, member_group},
        match_service::find_match,
    },
    state::SharedState,
};

/// Create a contest for a match inside a group.
///
/// Registers the match under the group on first use, auto-joins the creator and mirrors the
/// contest into every member's contest index.
pub async fn create_contest(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
    match_id: String,
    payload: CreateContestRequest,
) -> Result<ContestResponse, ServiceError> {
    let store = state.require_store().await?;
    let group = member_group(&store, caller, group_id).await?;
    let entry = ensure_match_entry(state, &store, group_id, &match_id).await?;

    let contest = ContestEntity {
        id: Uuid::new_v4(),
        group_id,
        match_id,
        name: payload.name.trim().to_owned(),
        entry_fee: payload.entry_fee,
        max_participants: payload
            .max_participants
            .unwrap_or(state.config().contests.default_max_participants),
        created_at: SystemTime::now(),
        created_by: caller.user_id.clone(),
        status: ContestStatus::Upcoming,
    };
    let contest_ref = contest.contest_ref();

    store.save_contest(contest.clone()).await?;
    store
        .insert_participant(
            contest_ref.clone(),
            ParticipantEntity::joining(&caller.user_id, &caller.display_name),
            contest.max_participants,
        )
        .await?;
    mirror_to_members(&store, &group, &contest, &caller.user_id).await?;

    info!(
        group_id = %group_id,
        match_id = %contest.match_id,
        contest_id = %contest.id,
        "contest created"
    );
    announce(
        &store,
        group_id,
        format!(
            "{} created contest {} for {} vs {}",
            caller.display_name, contest.name, entry.team_one, entry.team_two
        ),
    )
    .await;

    Ok(ContestResponse::new(contest, 1))
}

/// Contests of a (group, match) pair with their participant counts.
pub async fn list_contests(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
    match_id: String,
) -> Result<Vec<ContestResponse>, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, group_id).await?;

    let contests = store.list_contests(group_id, match_id).await?;
    let mut responses = Vec::with_capacity(contests.len());
    for contest in contests {
        let participants = store.list_participants(contest.contest_ref()).await?;
        responses.push(ContestResponse::new(contest, participants.len()));
    }
    Ok(responses)
}

/// Join a contest as the caller.
///
/// Duplicate and capacity checks run twice: here for readable errors, and atomically in the
/// store so concurrent joins cannot overfill the contest.
pub async fn join_contest(
    state: &SharedState,
    caller: &Caller,
    contest_ref: ContestRef,
) -> Result<ContestResponse, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, contest_ref.group_id).await?;
    let contest = find_contest(&store, &contest_ref).await?;

    if contest.status == ContestStatus::Completed {
        return Err(ServiceError::InvalidState(format!(
            "contest {} is completed",
            contest.id
        )));
    }

    let participants = store.list_participants(contest_ref.clone()).await?;
    if participants
        .iter()
        .any(|participant| participant.user_id == caller.user_id)
    {
        return Err(ServiceError::InvalidState(format!(
            "already joined contest {}",
            contest.id
        )));
    }
    if participants.len() >= contest.max_participants as usize {
        return Err(ServiceError::InvalidState(format!(
            "contest {} is full ({} participants)",
            contest.id, contest.max_participants
        )));
    }

    store
        .insert_participant(
            contest_ref.clone(),
            ParticipantEntity::joining(&caller.user_id, &caller.display_name),
            contest.max_participants,
        )
        .await?;
    store
        .save_user_contest(UserContestEntity {
            user_id: caller.user_id.clone(),
            contest: contest_ref,
            name: contest.name.clone(),
            status: contest.status,
            joined: true,
        })
        .await?;

    info!(contest_id = %contest.id, user_id = %caller.user_id, "participant joined contest");
    Ok(ContestResponse::new(contest, participants.len() + 1))
}

/// Participants ranked by score, highest first; earlier joiners win ties on position.
pub async fn leaderboard(
    state: &SharedState,
    caller: &Caller,
    contest_ref: ContestRef,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, contest_ref.group_id).await?;
    find_contest(&store, &contest_ref).await?;

    let participants = store.list_participants(contest_ref).await?;
    Ok(rank(participants))
}

/// Move a contest forward through its lifecycle. Only the creator may do so.
pub async fn update_status(
    state: &SharedState,
    caller: &Caller,
    contest_ref: ContestRef,
    payload: UpdateContestStatusRequest,
) -> Result<ContestResponse, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, contest_ref.group_id).await?;
    let mut contest = find_contest(&store, &contest_ref).await?;

    if contest.created_by != caller.user_id {
        return Err(ServiceError::Forbidden(
            "only the contest creator can change its status".into(),
        ));
    }
    if !contest.status.can_advance_to(payload.status) {
        return Err(ServiceError::InvalidState(format!(
            "cannot move contest from {} to {}",
            contest.status, payload.status
        )));
    }

    contest.status = payload.status;
    store.save_contest(contest.clone()).await?;
    store
        .update_user_contest_status(contest_ref.clone(), contest.status)
        .await?;

    let participants = store.list_participants(contest_ref).await?;
    info!(contest_id = %contest.id, status = %contest.status, "contest status updated");
    Ok(ContestResponse::new(contest, participants.len()))
}

/// The caller's contest index filtered by status.
pub async fn my_contests(
    state: &SharedState,
    caller: &Caller,
    filter: ContestStatusFilter,
) -> Result<Vec<UserContestResponse>, ServiceError> {
    let store = state.require_store().await?;
    let mirrors = store.list_user_contests(caller.user_id.clone()).await?;
    Ok(mirrors
        .into_iter()
        .filter(|mirror| filter.accepts(mirror.status))
        .map(Into::into)
        .collect())
}

async fn find_contest(
    store: &Arc<dyn FantasyStore>,
    contest_ref: &ContestRef,
) -> Result<ContestEntity, ServiceError> {
    store
        .find_contest(contest_ref.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("contest {contest_ref} not found")))
}

async fn ensure_match_entry(
    state: &SharedState,
    store: &Arc<dyn FantasyStore>,
    group_id: Uuid,
    match_id: &str,
) -> Result<MatchEntryEntity, ServiceError> {
    if let Some(entry) = store.find_match_entry(group_id, match_id.to_owned()).await? {
        return Ok(entry);
    }

    let snapshot = find_match(state, match_id).await?;
    let entry = MatchEntryEntity {
        group_id,
        match_id: snapshot.id,
        team_one: snapshot.team_one,
        team_two: snapshot.team_two,
        status: snapshot.status,
        scheduled_at: snapshot.scheduled_at,
        registered_at: SystemTime::now(),
    };
    store.save_match_entry(entry.clone()).await?;
    info!(group_id = %group_id, match_id = %match_id, "match registered for group");
    Ok(entry)
}

async fn mirror_to_members(
    store: &Arc<dyn FantasyStore>,
    group: &GroupEntity,
    contest: &ContestEntity,
    creator: &str,
) -> Result<(), ServiceError> {
    for member in &group.members {
        let mirror = UserContestEntity {
            user_id: member.clone(),
            contest: contest.contest_ref(),
            name: contest.name.clone(),
            status: contest.status,
            joined: member == creator,
        };
        if let Err(err) = store.save_user_contest(mirror).await {
            // The creator's own index must be written; other members can rediscover it.
            if member == creator {
                return Err(err.into());
            }
            warn!(
                contest_id = %contest.id,
                user_id = %member,
                error = %err,
                "failed to mirror contest for member"
            );
        }
    }
    Ok(())
}

fn rank(mut participants: Vec<ParticipantEntity>) -> Vec<LeaderboardEntry> {
    participants.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });

    let mut entries = Vec::with_capacity(participants.len());
    let mut previous: Option<(u32, usize)> = None;
    for (index, participant) in participants.into_iter().enumerate() {
        let rank = match previous {
            Some((score, rank)) if score == participant.score => rank,
            _ => index + 1,
        };
        previous = Some((participant.score, rank));
        entries.push(LeaderboardEntry::new(rank, participant));
    }
    entries
}
