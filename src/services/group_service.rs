use std::{sync::Arc, time::SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        fantasy_store::FantasyStore,
        models::{ChatMessageEntity, ChatSender, GroupEntity},
    },
    dto::{
        chat::{ChatMessageResponse, PostChatMessageRequest},
        group::{CreateGroupRequest, GroupResponse},
        identity::Caller,
    },
    error::ServiceError,
    state::SharedState,
};

/// Create a group with the caller as its first member.
pub async fn create_group(
    state: &SharedState,
    caller: &Caller,
    payload: CreateGroupRequest,
) -> Result<GroupResponse, ServiceError> {
    let store = state.require_store().await?;
    let max_members = payload
        .max_members
        .unwrap_or(state.config().groups.default_max_members);

    let group = GroupEntity {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_owned(),
        max_members,
        created_at: SystemTime::now(),
        created_by: caller.user_id.clone(),
        members: vec![caller.user_id.clone()],
    };

    store.save_group(group.clone()).await?;
    info!(group_id = %group.id, created_by = %caller.user_id, "group created");

    announce(
        &store,
        group.id,
        format!("{} created the group {}", caller.display_name, group.name),
    )
    .await;

    Ok(group.into())
}

/// Groups the caller belongs to, oldest first.
pub async fn list_groups(
    state: &SharedState,
    caller: &Caller,
) -> Result<Vec<GroupResponse>, ServiceError> {
    let store = state.require_store().await?;
    let groups = store.list_groups_for_member(caller.user_id.clone()).await?;
    Ok(groups.into_iter().map(Into::into).collect())
}

/// One group, visible to members only.
pub async fn get_group(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
) -> Result<GroupResponse, ServiceError> {
    let store = state.require_store().await?;
    let group = member_group(&store, caller, group_id).await?;
    Ok(group.into())
}

/// Add the caller to a group that still has room.
///
/// The read below only produces friendly errors; the store enforces the member cap when
/// several joins race.
pub async fn join_group(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
) -> Result<GroupResponse, ServiceError> {
    let store = state.require_store().await?;
    let group = find_group(&store, group_id).await?;

    if group.is_member(&caller.user_id) {
        return Err(ServiceError::InvalidState(format!(
            "already a member of group {group_id}"
        )));
    }
    if !group.has_room() {
        return Err(ServiceError::InvalidState(format!(
            "group {group_id} is full ({} members)",
            group.max_members
        )));
    }

    let group = store
        .add_group_member(group_id, caller.user_id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("group {group_id} not found")))?;
    info!(group_id = %group_id, user_id = %caller.user_id, "member joined group");

    announce(
        &store,
        group_id,
        format!("{} joined the group", caller.display_name),
    )
    .await;

    Ok(group.into())
}

/// Append a member message to the group chat.
pub async fn post_message(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
    payload: PostChatMessageRequest,
) -> Result<ChatMessageResponse, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, group_id).await?;

    let message = ChatMessageEntity {
        id: Uuid::new_v4(),
        group_id,
        text: payload.text.trim().to_owned(),
        sender: ChatSender::User {
            id: caller.user_id.clone(),
            name: caller.display_name.clone(),
        },
        created_at: SystemTime::now(),
    };
    store.append_chat_message(message.clone()).await?;

    Ok(message.into())
}

/// Full chat log of a group, oldest first.
pub async fn list_messages(
    state: &SharedState,
    caller: &Caller,
    group_id: Uuid,
) -> Result<Vec<ChatMessageResponse>, ServiceError> {
    let store = state.require_store().await?;
    member_group(&store, caller, group_id).await?;

    let messages = store.list_chat_messages(group_id).await?;
    Ok(messages.into_iter().map(Into::into).collect())
}

pub(crate) async fn find_group(
    store: &Arc<dyn FantasyStore>,
    group_id: Uuid,
) -> Result<GroupEntity, ServiceError> {
    store
        .find_group(group_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("group {group_id} not found")))
}

/// Load a group and make sure the caller belongs to it.
pub(crate) async fn member_group(
    store: &Arc<dyn FantasyStore>,
    caller: &Caller,
    group_id: Uuid,
) -> Result<GroupEntity, ServiceError> {
    let group = find_group(store, group_id).await?;
    if !group.is_member(&caller.user_id) {
        return Err(ServiceError::Forbidden(format!(
            "not a member of group {group_id}"
        )));
    }
    Ok(group)
}

/// Post a system message. The triggering operation already succeeded, so failures are logged.
pub(crate) async fn announce(store: &Arc<dyn FantasyStore>, group_id: Uuid, text: String) {
    if let Err(err) = store
        .append_chat_message(ChatMessageEntity::system(group_id, text))
        .await
    {
        warn!(group_id = %group_id, error = %err, "failed to post system chat message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::chat::ChatMessageKind,
        services::test_support::{caller, state},
    };

    fn request(name: &str, max_members: Option<u32>) -> CreateGroupRequest {
        CreateGroupRequest {
            name: name.into(),
            max_members,
        }
    }

    #[tokio::test]
    async fn creator_is_the_first_member_and_default_cap_applies() {
        let (state, _) = state().await;
        let owner = caller("u0");

        let group = create_group(&state, &owner, request("  Office league ", None))
            .await
            .unwrap();

        assert_eq!(group.name, "Office league");
        assert_eq!(group.members, vec!["u0".to_owned()]);
        assert_eq!(group.max_members, state.config().groups.default_max_members);
        assert_eq!(list_groups(&state, &owner).await.unwrap().len(), 1);
        assert!(list_groups(&state, &caller("u9")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joins_stop_at_the_member_cap_and_reject_duplicates() {
        let (state, _) = state().await;
        let group = create_group(&state, &caller("u0"), request("Nets", Some(2)))
            .await
            .unwrap();

        let joined = join_group(&state, &caller("u1"), group.id).await.unwrap();
        assert_eq!(joined.members, vec!["u0".to_owned(), "u1".to_owned()]);

        let again = join_group(&state, &caller("u1"), group.id).await;
        assert!(matches!(again, Err(ServiceError::InvalidState(message)) if message.contains("already")));
        let full = join_group(&state, &caller("u2"), group.id).await;
        assert!(matches!(full, Err(ServiceError::InvalidState(message)) if message.contains("full")));
        let missing = join_group(&state, &caller("u2"), Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn chat_is_members_only_and_logs_joins() {
        let (state, _) = state().await;
        let group = create_group(&state, &caller("u0"), request("Nets", None))
            .await
            .unwrap();

        let outsider = get_group(&state, &caller("u1"), group.id).await;
        assert!(matches!(outsider, Err(ServiceError::Forbidden(_))));
        let post = post_message(
            &state,
            &caller("u1"),
            group.id,
            PostChatMessageRequest { text: "hi".into() },
        )
        .await;
        assert!(matches!(post, Err(ServiceError::Forbidden(_))));

        join_group(&state, &caller("u1"), group.id).await.unwrap();
        post_message(
            &state,
            &caller("u1"),
            group.id,
            PostChatMessageRequest {
                text: " good luck ".into(),
            },
        )
        .await
        .unwrap();

        let log = list_messages(&state, &caller("u0"), group.id).await.unwrap();
        let kinds = log.iter().map(|message| message.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ChatMessageKind::System,
                ChatMessageKind::System,
                ChatMessageKind::User
            ]
        );
        assert_eq!(log[2].text, "good luck");
        assert_eq!(log[2].sender_id.as_deref(), Some("u1"));
    }
}
