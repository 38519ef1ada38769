use std::{future::Future, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::{services::reconcile_service, state::SharedState};

/// Invoke `task` every `every`, starting immediately. A run that overruns the period delays
/// the next one instead of queueing extra runs.
pub async fn run_recurring<F, Fut>(every: Duration, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        task().await;
    }
}

/// Drive reconciliation ticks at the configured interval. Never returns.
pub async fn run(state: SharedState) {
    // A zero period would make the interval panic.
    let every = state.config().reconcile.interval.max(Duration::from_secs(1));
    info!(interval_secs = every.as_secs(), "reconciliation scheduler started");

    run_recurring(every, move || {
        let state = state.clone();
        async move {
            // Outcomes are logged and recorded by the service.
            let _ = reconcile_service::run_once(&state).await;
        }
    })
    .await;
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn recurring_task_runs_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let job = tokio::spawn(run_recurring(Duration::from_millis(5), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(Duration::from_millis(60)).await;
        job.abort();

        assert!(runs.load(Ordering::SeqCst) >= 3);
    }
}
