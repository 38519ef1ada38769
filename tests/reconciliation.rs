mod support;

use std::{sync::Arc, time::{Duration, SystemTime}};

use fantasy_cricket_back::{
    config::AppConfig,
    dao::{
        fantasy_store::{FantasyStore, memory::MemoryFantasyStore},
        models::{
            ContestEntity, ContestRef, ContestStatus, GroupEntity, MatchEntryEntity,
            ParticipantEntity, PlayerEntity, PlayerRole, UserTeamEntity,
        },
    },
    error::ReconcileError,
    provider::{MatchProvider, MatchStats},
    services::{
        reconcile_service,
        reconciliation::{BranchFailureKind, ReconcileSettings, Reconciler},
        scoring::RosterPointsPolicy,
    },
    state::AppState,
};
use tokio::sync::Notify;
use uuid::Uuid;

use support::{FaultyStore, MATCH_ID, ScriptedFeed, default_stats, snapshot};

/// One group registered for [`MATCH_ID`] with a single contest.
struct Seed {
    store: MemoryFantasyStore,
    group_id: Uuid,
}

impl Seed {
    async fn new() -> Self {
        let store = MemoryFantasyStore::new();
        let group_id = Uuid::new_v4();
        store
            .save_group(GroupEntity {
                id: group_id,
                name: "Office league".into(),
                max_members: 20,
                created_at: SystemTime::now(),
                created_by: "p1".into(),
                members: vec!["p1".into(), "p2".into()],
            })
            .await
            .unwrap();
        store
            .save_match_entry(MatchEntryEntity {
                group_id,
                match_id: MATCH_ID.into(),
                team_one: "India".into(),
                team_two: "Australia".into(),
                status: "Result".into(),
                scheduled_at: None,
                registered_at: SystemTime::now(),
            })
            .await
            .unwrap();
        Self { store, group_id }
    }

    async fn contest(&self, name: &str, participants: &[&str]) -> ContestRef {
        let contest = ContestEntity {
            id: Uuid::new_v4(),
            group_id: self.group_id,
            match_id: MATCH_ID.into(),
            name: name.into(),
            entry_fee: 0.0,
            max_participants: 10,
            created_at: SystemTime::now(),
            created_by: "p1".into(),
            status: ContestStatus::Live,
        };
        let contest_ref = contest.contest_ref();
        self.store.save_contest(contest).await.unwrap();
        for user in participants {
            self.store
                .insert_participant(
                    contest_ref.clone(),
                    ParticipantEntity::joining(*user, *user),
                    10,
                )
                .await
                .unwrap();
        }
        contest_ref
    }

    async fn team(&self, user_id: &str, players: &[&str]) {
        self.store
            .save_user_team(UserTeamEntity {
                user_id: user_id.into(),
                match_id: MATCH_ID.into(),
                match_name: "India vs Australia".into(),
                players: players
                    .iter()
                    .map(|id| PlayerEntity {
                        id: (*id).into(),
                        name: id.to_uppercase(),
                        role: PlayerRole::Batsman,
                    })
                    .collect(),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
    }

    async fn scores(&self, contest: &ContestRef) -> Vec<(String, u32)> {
        self.store
            .list_participants(contest.clone())
            .await
            .unwrap()
            .into_iter()
            .map(|participant| (participant.user_id, participant.score))
            .collect()
    }
}

fn reconciler(feed: &ScriptedFeed, settings: ReconcileSettings) -> Reconciler {
    Reconciler::new(
        Arc::new(feed.clone()),
        Arc::new(RosterPointsPolicy),
        settings,
    )
}

#[tokio::test]
async fn scores_rosters_and_second_tick_is_a_no_op() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1", "p2"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;
    seed.team("p2", &["smith", "starc"]).await;

    let store = FaultyStore::over(seed.store.clone());
    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(&feed, ReconcileSettings::default());

    let first = reconciler.run_tick(Arc::new(store.clone())).await.unwrap();
    assert_eq!(first.matches_seen, 1);
    assert_eq!(first.groups_visited, 1);
    assert_eq!(first.contests_visited, 1);
    assert_eq!(first.processed, 2);
    assert_eq!(first.updated, 2);
    assert_eq!(first.failed, 0);
    assert!(!first.timed_out);
    assert_eq!(
        seed.scores(&contest).await,
        vec![("p1".to_owned(), 37), ("p2".to_owned(), 81)]
    );

    let second = reconciler.run_tick(Arc::new(store.clone())).await.unwrap();
    assert_eq!(second.processed, 2);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(store.writes(), 2);
    assert_eq!(
        seed.scores(&contest).await,
        vec![("p1".to_owned(), 37), ("p2".to_owned(), 81)]
    );
}

#[tokio::test]
async fn changed_stats_rewrite_scores() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(&feed, ReconcileSettings::default());
    let store: Arc<dyn FantasyStore> = Arc::new(seed.store.clone());

    reconciler.run_tick(store.clone()).await.unwrap();
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 37)]);

    feed.replace(vec![snapshot(
        MATCH_ID,
        Some(MatchStats::from_points([("kohli", 64.0), ("bumrah", 17.4)])),
    )]);
    let summary = reconciler.run_tick(store).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 81)]);
}

#[tokio::test]
async fn participant_without_team_scores_zero_once() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(&feed, ReconcileSettings::default());
    let store: Arc<dyn FantasyStore> = Arc::new(seed.store.clone());

    let first = reconciler.run_tick(store.clone()).await.unwrap();
    assert_eq!(first.updated, 1);
    let participants = seed.store.list_participants(contest.clone()).await.unwrap();
    assert_eq!(participants[0].score, 0);
    assert!(participants[0].score_version.is_some());

    let second = reconciler.run_tick(store).await.unwrap();
    assert_eq!(second.unchanged, 1);
}

#[tokio::test]
async fn write_failure_in_one_contest_does_not_stop_the_other() {
    let seed = Seed::new().await;
    let broken = seed.contest("Broken", &["p1"]).await;
    let healthy = seed.contest("Healthy", &["p1", "p2"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;
    seed.team("p2", &["smith", "starc"]).await;

    let store = FaultyStore {
        failing_contest: Some(broken.contest_id),
        ..FaultyStore::over(seed.store.clone())
    };
    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(&feed, ReconcileSettings::default());

    let summary = reconciler.run_tick(Arc::new(store)).await.unwrap();
    assert_eq!(summary.contests_visited, 2);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failed, 1);

    let failure = &summary.failures[0];
    assert_eq!(failure.kind, BranchFailureKind::StoreWriteFailure);
    assert_eq!(failure.match_id, MATCH_ID);
    assert_eq!(failure.group_id, Some(seed.group_id));
    assert_eq!(failure.contest_id, Some(broken.contest_id));
    assert_eq!(failure.participant_id.as_deref(), Some("p1"));

    assert_eq!(seed.scores(&broken).await, vec![("p1".to_owned(), 0)]);
    assert_eq!(
        seed.scores(&healthy).await,
        vec![("p1".to_owned(), 37), ("p2".to_owned(), 81)]
    );
}

#[tokio::test]
async fn empty_feed_is_a_no_op() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;

    let store = FaultyStore::over(seed.store.clone());
    let feed = ScriptedFeed::with(Vec::new());
    let summary = reconciler(&feed, ReconcileSettings::default())
        .run_tick(Arc::new(store.clone()))
        .await
        .unwrap();

    assert_eq!(summary.matches_seen, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 0)]);
}

#[tokio::test]
async fn matches_without_stats_are_skipped_not_zeroed() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(&feed, ReconcileSettings::default());
    let store: Arc<dyn FantasyStore> = Arc::new(seed.store.clone());
    reconciler.run_tick(store.clone()).await.unwrap();

    feed.replace(vec![snapshot(MATCH_ID, None)]);
    let summary = reconciler.run_tick(store).await.unwrap();
    assert_eq!(summary.matches_seen, 1);
    assert_eq!(summary.matches_skipped, 1);
    assert_eq!(summary.processed, 0);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 37)]);
}

#[tokio::test]
async fn unavailable_feed_aborts_the_tick_and_releases_the_lease() {
    let seed = Seed::new().await;
    seed.contest("Friendly", &["p1"]).await;
    let store: Arc<dyn FantasyStore> = Arc::new(seed.store.clone());

    let failing = reconciler(&ScriptedFeed::unavailable(), ReconcileSettings::default());
    let err = failing.run_tick(store.clone()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::ProviderUnavailable(_)));

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let other = reconciler(&feed, ReconcileSettings::default());
    assert!(other.run_tick(store).await.is_ok());
}

#[tokio::test]
async fn overlapping_ticks_are_rejected() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let store: Arc<dyn FantasyStore> = Arc::new(FaultyStore {
        entered: Some(entered.clone()),
        release: Some(release.clone()),
        ..FaultyStore::over(seed.store.clone())
    });

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let first = reconciler(&feed, ReconcileSettings::default());
    let elsewhere = reconciler(&feed, ReconcileSettings::default());

    let (running, (same_process, other_process)) = tokio::join!(first.run_tick(store.clone()), async {
        entered.notified().await;
        let same_process = first.run_tick(store.clone()).await;
        let other_process = elsewhere.run_tick(store.clone()).await;
        release.notify_one();
        (same_process, other_process)
    });

    assert!(matches!(same_process, Err(ReconcileError::ConcurrentTickConflict)));
    assert!(matches!(other_process, Err(ReconcileError::ConcurrentTickConflict)));

    let summary = running.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 37)]);
}

#[tokio::test]
async fn slow_walk_times_out_with_partial_summary() {
    let seed = Seed::new().await;
    seed.contest("Friendly", &["p1"]).await;

    let store: Arc<dyn FantasyStore> = Arc::new(FaultyStore {
        stall_contest_listing: true,
        ..FaultyStore::over(seed.store.clone())
    });
    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let reconciler = reconciler(
        &feed,
        ReconcileSettings {
            tick_timeout: Duration::from_millis(50),
            ..ReconcileSettings::default()
        },
    );

    let summary = reconciler.run_tick(store.clone()).await.unwrap();
    assert!(summary.timed_out);
    assert_eq!(summary.groups_visited, 1);
    assert_eq!(summary.processed, 0);

    // The lease was released, so the next tick starts normally.
    assert!(reconciler.run_tick(store).await.unwrap().timed_out);
}

#[tokio::test]
async fn run_once_records_outcomes_on_shared_state() {
    let seed = Seed::new().await;
    seed.contest("Friendly", &["p1", "p2"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let provider: Arc<dyn MatchProvider> = Arc::new(feed.clone());
    let state = AppState::new(
        AppConfig::default(),
        provider,
        reconciler(&feed, ReconcileSettings::default()),
    );

    let err = reconcile_service::run_once(&state).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Degraded));
    assert!(state.reconcile_status().await.last_error.is_some());

    state.install_store(Arc::new(seed.store.clone())).await;
    let summary = reconcile_service::run_once(&state).await.unwrap();
    assert_eq!(summary.updated, 2);

    let status = state.reconcile_status().await;
    assert_eq!(status.completed_ticks, 1);
    assert!(status.last_success_at.is_some());
    assert_eq!(status.last_summary, Some(summary));
}

#[tokio::test]
async fn groups_without_the_match_entry_are_not_visited() {
    let seed = Seed::new().await;
    let registered = seed.contest("Friendly", &["p1"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    // A contest stored under a group that never registered the match.
    let stray_group = Uuid::new_v4();
    let stray = ContestEntity {
        id: Uuid::new_v4(),
        group_id: stray_group,
        match_id: MATCH_ID.into(),
        name: "Stray".into(),
        entry_fee: 0.0,
        max_participants: 10,
        created_at: SystemTime::now(),
        created_by: "p1".into(),
        status: ContestStatus::Live,
    };
    let stray_ref = stray.contest_ref();
    seed.store.save_contest(stray).await.unwrap();
    seed.store
        .insert_participant(stray_ref.clone(), ParticipantEntity::joining("p1", "p1"), 10)
        .await
        .unwrap();

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let summary = reconciler(&feed, ReconcileSettings::default())
        .run_tick(Arc::new(seed.store.clone()))
        .await
        .unwrap();

    assert_eq!(summary.groups_visited, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(seed.scores(&registered).await, vec![("p1".to_owned(), 37)]);
    assert_eq!(seed.scores(&stray_ref).await, vec![("p1".to_owned(), 0)]);
}

#[tokio::test]
async fn lease_outlives_a_tick_even_when_configured_shorter() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;
    seed.team("p1", &["kohli", "bumrah"]).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let store: Arc<dyn FantasyStore> = Arc::new(FaultyStore {
        entered: Some(entered.clone()),
        release: Some(release.clone()),
        ..FaultyStore::over(seed.store.clone())
    });

    let settings = ReconcileSettings {
        tick_timeout: Duration::from_millis(400),
        lease_ttl: Duration::from_millis(50),
        ..ReconcileSettings::default()
    };
    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let first = reconciler(&feed, settings.clone());
    let elsewhere = reconciler(&feed, settings);

    let (running, other_process) = tokio::join!(first.run_tick(store.clone()), async {
        entered.notified().await;
        // Past the configured ttl, well inside the tick budget.
        tokio::time::sleep(Duration::from_millis(120)).await;
        let other_process = elsewhere.run_tick(store.clone()).await;
        release.notify_one();
        other_process
    });

    assert!(matches!(other_process, Err(ReconcileError::ConcurrentTickConflict)));
    assert_eq!(running.unwrap().updated, 1);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 37)]);
}

#[tokio::test]
async fn hung_feed_counts_against_the_tick_budget() {
    let seed = Seed::new().await;
    let contest = seed.contest("Friendly", &["p1"]).await;
    let store: Arc<dyn FantasyStore> = Arc::new(seed.store.clone());

    let hung = ScriptedFeed {
        stall: Some(Duration::from_secs(30)),
        ..ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))])
    };
    let summary = reconciler(
        &hung,
        ReconcileSettings {
            tick_timeout: Duration::from_millis(50),
            ..ReconcileSettings::default()
        },
    )
    .run_tick(store.clone())
    .await
    .unwrap();

    assert!(summary.timed_out);
    assert_eq!(summary.matches_seen, 0);
    assert_eq!(summary.processed, 0);

    // The lease was released on the way out.
    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let next = reconciler(&feed, ReconcileSettings::default())
        .run_tick(store)
        .await
        .unwrap();
    assert_eq!(next.processed, 1);
    assert_eq!(seed.scores(&contest).await, vec![("p1".to_owned(), 0)]);
}

#[tokio::test]
async fn every_participant_of_many_contests_is_reconciled_with_one_slot() {
    let seed = Seed::new().await;
    let users = ["p1", "p2", "p3", "p4", "p5"];
    let mut contests = Vec::new();
    for name in ["A", "B", "C"] {
        contests.push(seed.contest(name, &users).await);
    }
    seed.team("p1", &["kohli", "bumrah"]).await;

    let feed = ScriptedFeed::with(vec![snapshot(MATCH_ID, Some(default_stats()))]);
    let summary = reconciler(
        &feed,
        ReconcileSettings {
            max_in_flight: 1,
            ..ReconcileSettings::default()
        },
    )
    .run_tick(Arc::new(seed.store.clone()))
    .await
    .unwrap();

    assert_eq!(summary.contests_visited, 3);
    assert_eq!(summary.processed, 15);
    assert_eq!(summary.updated, 15);
    for contest in &contests {
        assert_eq!(seed.scores(contest).await[0], ("p1".to_owned(), 37));
    }
}
