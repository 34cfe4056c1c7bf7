//! Retry pacing for empty link reads.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::TransferError;
use crate::types::ReceiverConfig;

/// Paces retries after empty reads and bounds how long a transfer may stall.
///
/// Every wait observes the cancellation token, and the idle deadline is
/// measured from the last [`activity`](Self::activity).
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    idle_timeout: Duration,
    cancel: CancellationToken,
    last_activity: Instant,
}

impl Poller {
    pub fn new(interval: Duration, idle_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            idle_timeout,
            cancel,
            last_activity: Instant::now(),
        }
    }

    pub fn from_config(config: &ReceiverConfig, cancel: CancellationToken) -> Self {
        Self::new(config.poll_interval(), config.idle_timeout(), cancel)
    }

    /// Records that the link delivered something.
    pub fn activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Fails if the transfer was cancelled.
    pub fn check(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }

    /// Waits one poll interval after an empty read.
    pub async fn idle(&mut self) -> Result<(), TransferError> {
        self.check()?;
        if self.last_activity.elapsed() >= self.idle_timeout {
            return Err(TransferError::Timeout);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransferError::Cancelled),
            _ = tokio::time::sleep(self.interval) => Ok(()),
        }
    }
}
