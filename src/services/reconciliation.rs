//! Score reconciliation: walks groups → contests → participants for every scored match and
//! brings stored scores in line with the latest provider snapshot.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant, SystemTime},
};

use futures::{StreamExt, stream};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        fantasy_store::FantasyStore,
        models::{ContestRef, ParticipantEntity, ParticipantScore},
        storage::StorageError,
    },
    error::ReconcileError,
    provider::{MatchProvider, MatchStats},
    services::scoring::{Roster, ScoringPolicy, score_version},
};

/// Name of the store lease that keeps ticks from overlapping across processes.
pub const TICK_LEASE: &str = "reconcile-tick";

/// Tunables for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Budget for the tree walk; branches still running afterwards are abandoned.
    pub tick_timeout: Duration,
    /// Lifetime of the store lease, so a crashed holder cannot block ticks forever.
    pub lease_ttl: Duration,
    /// Concurrent store reads per fan-out stage.
    pub max_in_flight: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            tick_timeout: Duration::from_secs(90),
            lease_ttl: Duration::from_secs(300),
            max_in_flight: 8,
        }
    }
}

impl ReconcileSettings {
    /// Margin the lease must outlive the tick budget by, covering the lease release itself.
    pub const LEASE_GRACE: Duration = Duration::from_secs(30);

    /// Raise `lease_ttl` so it always outlives a tick that runs to its full budget.
    pub fn normalized(mut self) -> Self {
        let floor = self.tick_timeout + Self::LEASE_GRACE;
        if self.lease_ttl < floor {
            warn!(
                lease_ttl = ?self.lease_ttl,
                tick_timeout = ?self.tick_timeout,
                raised_to = ?floor,
                "lease ttl shorter than the tick budget; raising it"
            );
            self.lease_ttl = floor;
        }
        self.max_in_flight = self.max_in_flight.max(1);
        self
    }
}

/// Category of a failure confined to one branch of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchFailureKind {
    /// A list or get against the store failed; the branch below it was skipped.
    StoreReadFailure,
    /// A score write failed for one participant.
    StoreWriteFailure,
}

/// A failure recorded during a tick, with the position in the hierarchy where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub kind: BranchFailureKind,
    pub match_id: String,
    pub group_id: Option<Uuid>,
    pub contest_id: Option<Uuid>,
    pub participant_id: Option<String>,
    pub message: String,
}

impl BranchFailure {
    fn read(match_id: &str, err: &StorageError) -> Self {
        Self {
            kind: BranchFailureKind::StoreReadFailure,
            match_id: match_id.to_owned(),
            group_id: None,
            contest_id: None,
            participant_id: None,
            message: err.to_string(),
        }
    }

    fn write(contest: &ContestRef, participant_id: &str, err: &StorageError) -> Self {
        Self {
            kind: BranchFailureKind::StoreWriteFailure,
            participant_id: Some(participant_id.to_owned()),
            ..Self::read(&contest.match_id, err).in_contest(contest)
        }
    }

    fn in_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    fn in_contest(mut self, contest: &ContestRef) -> Self {
        self.group_id = Some(contest.group_id);
        self.contest_id = Some(contest.contest_id);
        self
    }

    fn for_participant(mut self, participant_id: &str) -> Self {
        self.participant_id = Some(participant_id.to_owned());
        self
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// Matches returned by the provider.
    pub matches_seen: usize,
    /// Matches without score inputs this tick.
    pub matches_skipped: usize,
    /// (group, match) pairs visited.
    pub groups_visited: usize,
    /// Contests whose participants were enumerated.
    pub contests_visited: usize,
    /// Participants considered.
    pub processed: usize,
    /// Participants whose score was rewritten.
    pub updated: usize,
    /// Participants already up to date.
    pub unchanged: usize,
    /// Branch failures, read or write.
    pub failed: usize,
    /// Whether the tick budget ran out before the walk finished.
    pub timed_out: bool,
    pub failures: Vec<BranchFailure>,
    pub started_at: SystemTime,
    pub duration: Duration,
}

/// Counters shared by every branch; they survive the walk being cancelled on timeout.
#[derive(Default)]
struct TickTally {
    matches_seen: AtomicUsize,
    matches_skipped: AtomicUsize,
    groups_visited: AtomicUsize,
    contests_visited: AtomicUsize,
    processed: AtomicUsize,
    updated: AtomicUsize,
    unchanged: AtomicUsize,
    failures: Mutex<Vec<BranchFailure>>,
}

impl TickTally {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self, failure: BranchFailure) {
        warn!(
            kind = ?failure.kind,
            match_id = %failure.match_id,
            group_id = ?failure.group_id,
            contest_id = ?failure.contest_id,
            participant_id = ?failure.participant_id,
            error = %failure.message,
            "reconciliation branch failed"
        );
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    fn into_summary(
        self,
        started_at: SystemTime,
        duration: Duration,
        timed_out: bool,
    ) -> TickSummary {
        let failures = self
            .failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        TickSummary {
            matches_seen: self.matches_seen.into_inner(),
            matches_skipped: self.matches_skipped.into_inner(),
            groups_visited: self.groups_visited.into_inner(),
            contests_visited: self.contests_visited.into_inner(),
            processed: self.processed.into_inner(),
            updated: self.updated.into_inner(),
            unchanged: self.unchanged.into_inner(),
            failed: failures.len(),
            timed_out,
            failures,
            started_at,
            duration,
        }
    }
}

/// Runs reconciliation ticks. Holds no data between ticks besides the exclusion gate.
pub struct Reconciler {
    provider: Arc<dyn MatchProvider>,
    scoring: Arc<dyn ScoringPolicy>,
    settings: ReconcileSettings,
    gate: tokio::sync::Mutex<()>,
    /// Identity written into the tick lease.
    holder: String,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn MatchProvider>,
        scoring: Arc<dyn ScoringPolicy>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            provider,
            scoring,
            settings: settings.normalized(),
            gate: tokio::sync::Mutex::new(()),
            holder: format!("reconciler-{}", Uuid::new_v4()),
        }
    }

    /// Run one tick against `store`.
    ///
    /// Fails only when the tick cannot start: another tick holds the gate or lease, or the
    /// provider feed is unavailable. Branch failures are reported in the summary.
    pub async fn run_tick(
        &self,
        store: Arc<dyn FantasyStore>,
    ) -> Result<TickSummary, ReconcileError> {
        let _gate = self
            .gate
            .try_lock()
            .map_err(|_| ReconcileError::ConcurrentTickConflict)?;

        let acquired = store
            .try_acquire_lease(
                TICK_LEASE.to_owned(),
                self.holder.clone(),
                self.settings.lease_ttl,
            )
            .await
            .map_err(ReconcileError::Lease)?;
        if !acquired {
            return Err(ReconcileError::ConcurrentTickConflict);
        }

        let outcome = self.run_leased(&store).await;

        if let Err(err) = store
            .release_lease(TICK_LEASE.to_owned(), self.holder.clone())
            .await
        {
            warn!(error = %err, "failed to release reconciliation lease; it will expire");
        }

        outcome
    }

    async fn run_leased(
        &self,
        store: &Arc<dyn FantasyStore>,
    ) -> Result<TickSummary, ReconcileError> {
        let started_at = SystemTime::now();
        let clock = Instant::now();
        let tally = TickTally::default();

        // The feed fetch shares the budget so the lease cannot outlive a hung provider.
        let timed_out = match timeout(self.settings.tick_timeout, self.fetch_and_walk(store, &tally))
            .await
        {
            Ok(Ok(())) => false,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                warn!(
                    budget = ?self.settings.tick_timeout,
                    "reconciliation tick timed out; remaining branches abandoned"
                );
                true
            }
        };

        let summary = tally.into_summary(started_at, clock.elapsed(), timed_out);
        info!(
            matches = summary.matches_seen,
            skipped = summary.matches_skipped,
            processed = summary.processed,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            timed_out = summary.timed_out,
            elapsed_ms = summary.duration.as_millis() as u64,
            "reconciliation tick finished"
        );
        Ok(summary)
    }

    async fn fetch_and_walk(
        &self,
        store: &Arc<dyn FantasyStore>,
        tally: &TickTally,
    ) -> Result<(), ReconcileError> {
        let matches = self
            .provider
            .fetch_matches()
            .await
            .map_err(ReconcileError::ProviderUnavailable)?;

        let matches_seen = matches.len();
        let scored = matches
            .into_iter()
            .filter_map(|snapshot| {
                let stats = snapshot.stats?;
                Some((snapshot.id, Arc::new(stats)))
            })
            .collect::<Vec<_>>();
        tally.matches_seen.store(matches_seen, Ordering::Relaxed);
        tally
            .matches_skipped
            .store(matches_seen - scored.len(), Ordering::Relaxed);

        self.walk(store, scored, tally).await;
        Ok(())
    }

    /// Fan out match → groups → contests → participants.
    ///
    /// Each stage is a `buffer_unordered` over the flattened output of the previous one, so
    /// a stage never has more than `max_in_flight` store calls pending.
    async fn walk(
        &self,
        store: &Arc<dyn FantasyStore>,
        scored: Vec<(String, Arc<MatchStats>)>,
        tally: &TickTally,
    ) {
        let in_flight = self.settings.max_in_flight.max(1);

        stream::iter(scored)
            .map(move |(match_id, stats)| async move {
                match store.list_groups_with_match(match_id.clone()).await {
                    Ok(groups) => groups
                        .into_iter()
                        .map(|group_id| (group_id, match_id.clone(), stats.clone()))
                        .collect::<Vec<_>>(),
                    Err(err) => {
                        tally.fail(BranchFailure::read(&match_id, &err));
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(in_flight)
            .flat_map(stream::iter)
            .map(move |(group_id, match_id, stats)| async move {
                TickTally::bump(&tally.groups_visited);
                match store.list_contests(group_id, match_id.clone()).await {
                    Ok(contests) => contests
                        .into_iter()
                        .map(|contest| (Arc::new(contest.contest_ref()), stats.clone()))
                        .collect::<Vec<_>>(),
                    Err(err) => {
                        tally.fail(BranchFailure::read(&match_id, &err).in_group(group_id));
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(in_flight)
            .flat_map(stream::iter)
            .map(move |(contest, stats)| async move {
                TickTally::bump(&tally.contests_visited);
                match store.list_participants(contest.as_ref().clone()).await {
                    Ok(participants) => {
                        debug!(contest = %contest, count = participants.len(), "reconciling contest");
                        participants
                            .into_iter()
                            .map(|participant| (contest.clone(), stats.clone(), participant))
                            .collect::<Vec<_>>()
                    }
                    Err(err) => {
                        tally.fail(
                            BranchFailure::read(&contest.match_id, &err).in_contest(&contest),
                        );
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(in_flight)
            .flat_map(stream::iter)
            .map(move |(contest, stats, participant)| async move {
                self.reconcile_participant(store, &contest, &stats, participant, tally)
                    .await
            })
            .buffer_unordered(in_flight)
            .collect::<()>()
            .await;
    }

    async fn reconcile_participant(
        &self,
        store: &Arc<dyn FantasyStore>,
        contest: &ContestRef,
        stats: &MatchStats,
        participant: ParticipantEntity,
        tally: &TickTally,
    ) {
        TickTally::bump(&tally.processed);

        let roster = match store
            .find_user_team(participant.user_id.clone(), contest.match_id.clone())
            .await
        {
            Ok(Some(team)) => Roster {
                user_id: participant.user_id.clone(),
                player_ids: team.players.into_iter().map(|player| player.id).collect(),
            },
            Ok(None) => Roster::empty(participant.user_id.clone()),
            Err(err) => {
                tally.fail(
                    BranchFailure::read(&contest.match_id, &err)
                        .in_contest(contest)
                        .for_participant(&participant.user_id),
                );
                return;
            }
        };

        let score = self.scoring.score(&roster, stats);
        let version = score_version(&contest.match_id, &roster, stats);

        if participant.score == score && participant.score_version.as_deref() == Some(&version) {
            TickTally::bump(&tally.unchanged);
            return;
        }

        let write = ParticipantScore {
            score,
            score_version: version,
        };
        match store
            .set_participant_score(contest.clone(), participant.user_id.clone(), write)
            .await
        {
            Ok(()) => {
                debug!(
                    contest = %contest,
                    participant_id = %participant.user_id,
                    from = participant.score,
                    to = score,
                    "participant score updated"
                );
                TickTally::bump(&tally.updated);
            }
            Err(err) => tally.fail(BranchFailure::write(contest, &participant.user_id, &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failures_carry_full_position() {
        let contest = ContestRef {
            group_id: Uuid::nil(),
            match_id: "m1".into(),
            contest_id: Uuid::nil(),
        };
        let err = StorageError::Conflict("boom".into());
        let failure = BranchFailure::write(&contest, "p1", &err);

        assert_eq!(failure.kind, BranchFailureKind::StoreWriteFailure);
        assert_eq!(failure.match_id, "m1");
        assert_eq!(failure.group_id, Some(Uuid::nil()));
        assert_eq!(failure.contest_id, Some(Uuid::nil()));
        assert_eq!(failure.participant_id.as_deref(), Some("p1"));
    }

    #[test]
    fn tally_counts_failures() {
        let tally = TickTally::default();
        TickTally::bump(&tally.processed);
        tally.fail(BranchFailure::read("m1", &StorageError::Conflict("x".into())));

        tally.matches_seen.store(1, Ordering::Relaxed);

        let summary = tally.into_summary(SystemTime::now(), Duration::ZERO, false);
        assert_eq!(summary.matches_seen, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].kind, BranchFailureKind::StoreReadFailure);
    }

    #[test]
    fn short_lease_is_raised_past_the_tick_budget() {
        let settings = ReconcileSettings {
            tick_timeout: Duration::from_secs(90),
            lease_ttl: Duration::from_secs(10),
            max_in_flight: 0,
        }
        .normalized();

        assert_eq!(
            settings.lease_ttl,
            Duration::from_secs(90) + ReconcileSettings::LEASE_GRACE
        );
        assert_eq!(settings.max_in_flight, 1);
    }

    #[test]
    fn long_enough_lease_is_kept() {
        let settings = ReconcileSettings::default();
        assert_eq!(settings.clone().normalized(), settings);
    }
}
