//! DTOs exposed by the reconciliation admin routes.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    services::reconciliation::{BranchFailure, BranchFailureKind, TickSummary},
    state::ReconcileStatus,
};

/// Counts produced by one reconciliation tick.
#[derive(Debug, Serialize, ToSchema)]
pub struct TickSummaryResponse {
    pub started_at: String,
    pub duration_ms: u64,
    pub matches_seen: usize,
    pub matches_skipped: usize,
    pub groups_visited: usize,
    pub contests_visited: usize,
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub timed_out: bool,
    pub failures: Vec<BranchFailureResponse>,
}

/// Branch failure as reported over HTTP.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchFailureResponse {
    #[schema(value_type = String, example = "store_write_failure")]
    pub kind: BranchFailureKind,
    pub match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    pub message: String,
}

impl From<BranchFailure> for BranchFailureResponse {
    fn from(value: BranchFailure) -> Self {
        Self {
            kind: value.kind,
            match_id: value.match_id,
            group_id: value.group_id,
            contest_id: value.contest_id,
            participant_id: value.participant_id,
            message: value.message,
        }
    }
}

impl From<TickSummary> for TickSummaryResponse {
    fn from(value: TickSummary) -> Self {
        Self {
            started_at: format_system_time(value.started_at),
            duration_ms: u64::try_from(value.duration.as_millis()).unwrap_or(u64::MAX),
            matches_seen: value.matches_seen,
            matches_skipped: value.matches_skipped,
            groups_visited: value.groups_visited,
            contests_visited: value.contests_visited,
            processed: value.processed,
            updated: value.updated,
            unchanged: value.unchanged,
            failed: value.failed,
            timed_out: value.timed_out,
            failures: value.failures.into_iter().map(Into::into).collect(),
        }
    }
}

/// State of the reconciliation job.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileStatusResponse {
    /// Whether the recurring scheduler is enabled.
    pub scheduler_enabled: bool,
    /// Scheduler period in seconds.
    pub interval_secs: u64,
    /// True while no store is installed; ticks are refused.
    pub degraded: bool,
    pub completed_ticks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<TickSummaryResponse>,
}

impl ReconcileStatusResponse {
    pub fn new(
        status: ReconcileStatus,
        scheduler_enabled: bool,
        interval_secs: u64,
        degraded: bool,
    ) -> Self {
        let (last_error_at, last_error) = match status.last_error {
            Some((at, message)) => (Some(format_system_time(at)), Some(message)),
            None => (None, None),
        };
        Self {
            scheduler_enabled,
            interval_secs,
            degraded,
            completed_ticks: status.completed_ticks,
            last_success_at: status.last_success_at.map(format_system_time),
            last_error_at,
            last_error,
            last_summary: status.last_summary.map(Into::into),
        }
    }
}
