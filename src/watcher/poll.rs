use super::signals::{RepoSignals, SignalSource};
use super::ChangeSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

/// Re-read signals every `period` and notify on any difference.
pub(super) fn spawn(
    source: SignalSource,
    project_path: String,
    baseline: Option<RepoSignals>,
    period: Duration,
    sink: Arc<dyn ChangeSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = baseline;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(current) = source.read().await else {
                continue;
            };
            match &last {
                Some(previous) if *previous == current => {}
                Some(_) => {
                    debug!(path = %project_path, "git state changed");
                    sink.notify(&project_path);
                    last = Some(current);
                }
                None => last = Some(current),
            }
        }
    })
}
