use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::GroupEntity, dto::format_system_time, dto::validation::not_blank};

/// Payload used to create a group.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    /// Member cap; the configured default applies when omitted.
    #[validate(range(min = 2, max = 500))]
    #[serde(default)]
    pub max_members: Option<u32>,
}

/// Group as returned to its members.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub max_members: u32,
    pub created_at: String,
    pub created_by: String,
    pub members: Vec<String>,
}

impl From<GroupEntity> for GroupResponse {
    fn from(value: GroupEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            max_members: value.max_members,
            created_at: format_system_time(value.created_at),
            created_by: value.created_by,
            members: value.members,
        }
    }
}
