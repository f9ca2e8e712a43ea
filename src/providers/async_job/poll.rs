//! Poll loop driving a triggered execution to a terminal remote status

use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

use super::client::{ExecutionState, JobApi};
use super::types::RemoteStatus;
use crate::config::duration::format_duration;
use crate::engine::cancel::CancelToken;
use crate::providers::ProviderError;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound for deadlines and intervals, keeps `Instant` arithmetic in range
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Measured from the trigger time
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("run cancelled")]
    Cancelled,

    #[error("timeout after {}", format_duration(*.0))]
    Timeout(Duration),

    #[error(transparent)]
    Api(#[from] ProviderError),
}

/// Query `execution_id` every `settings.interval` until its remote status is
/// terminal, the deadline passes, or `cancel` fires.
///
/// The first query happens one interval after `triggered_at`. `on_tick`
/// receives the time elapsed since the trigger and the observed status.
pub async fn poll_until_terminal<F>(
    api: &dyn JobApi,
    execution_id: u64,
    settings: PollSettings,
    triggered_at: Instant,
    cancel: &CancelToken,
    mut on_tick: F,
) -> Result<ExecutionState, PollError>
where
    F: FnMut(Duration, &RemoteStatus) + Send,
{
    let period = settings.interval.clamp(MIN_INTERVAL, FAR_FUTURE);
    let deadline = triggered_at + settings.timeout.min(FAR_FUTURE);

    let mut ticker = interval_at(triggered_at + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep_until(deadline) => return Err(PollError::Timeout(settings.timeout)),
            _ = ticker.tick() => {}
        }

        let state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep_until(deadline) => return Err(PollError::Timeout(settings.timeout)),
            state = api.execution(execution_id) => state?,
        };

        on_tick(triggered_at.elapsed(), &state.status);

        if state.status.is_terminal() {
            return Ok(state);
        }
    }
}
