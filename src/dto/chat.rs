use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ChatMessageEntity, ChatSender},
    dto::{format_system_time, validation::not_blank},
};

/// Message posted by a group member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PostChatMessageRequest {
    #[validate(length(min = 1, max = 1000), custom(function = "not_blank"))]
    pub text: String,
}

/// Origin of a chat message.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageKind {
    User,
    System,
}

/// Chat log entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub kind: ChatMessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub text: String,
    pub created_at: String,
}

impl From<ChatMessageEntity> for ChatMessageResponse {
    fn from(value: ChatMessageEntity) -> Self {
        let (kind, sender_id, sender_name) = match value.sender {
            ChatSender::User { id, name } => (ChatMessageKind::User, Some(id), Some(name)),
            ChatSender::System => (ChatMessageKind::System, None, None),
        };
        Self {
            id: value.id,
            kind,
            sender_id,
            sender_name,
            text: value.text,
            created_at: format_system_time(value.created_at),
        }
    }
}
