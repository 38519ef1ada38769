use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::format_system_time, state::ReconcileStatus};

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Start time of the last completed reconciliation tick (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconciled_at: Option<String>,
    /// Last reason a tick could not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_error: Option<String>,
    /// Counts from the last completed tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<crate::dto::reconcile::TickSummaryResponse>,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            last_reconciled_at: None,
            last_reconcile_error: None,
            last_summary: None,
        }
    }

    /// Attach reconciliation bookkeeping.
    pub fn with_reconcile(mut self, status: ReconcileStatus) -> Self {
        self.last_reconciled_at = status.last_success_at.map(format_system_time);
        self.last_reconcile_error = status.last_error.map(|(_, message)| message);
        self.last_summary = status.last_summary.map(Into::into);
        self
    }
}
