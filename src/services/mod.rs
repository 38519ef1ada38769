/// Group contests: creation, joining, leaderboards and status transitions.
pub mod contest_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Groups and their chat logs.
pub mod group_service;
/// Health check service.
pub mod health_service;
/// Provider-backed match listing and squads.
pub mod match_service;
/// Running reconciliation ticks on behalf of the scheduler and admin routes.
pub mod reconcile_service;
/// Fan-out score reconciliation.
pub mod reconciliation;
/// Recurring task scheduling.
pub mod scheduler;
/// Scoring policies and score fingerprints.
pub mod scoring;
/// Storage connection supervisor with exponential backoff.
pub mod storage_supervisor;
/// Team drafting and composition rules.
pub mod team_service;
#[cfg(test)]
mod test_support;
