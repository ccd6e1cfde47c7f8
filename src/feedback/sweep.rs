use std::{sync::Arc, time::Instant};

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::tracker::FeedbackTracker;

// Set to false to silence per-tick logging from the sweep.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Wakes every `period` and turns stale pending notifications into `ignored`
/// feedback. A tick always runs to completion; cancellation is only observed
/// between ticks.
pub async fn timeout_sweep_loop(
    tracker: Arc<FeedbackTracker>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = tracker.expire_stale(Instant::now()).await;
                if report.failed > 0 {
                    log_warn!(
                        "timeout sweep: {} of {} expired notifications were not persisted",
                        report.failed,
                        report.expired
                    );
                } else if report.expired > 0 {
                    log_debug!("timeout sweep: {} notifications marked ignored", report.expired);
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("timeout sweep shutting down");
                break;
            }
        }
    }
}

/// Owns the background sweep task.
pub struct SweepController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SweepController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, tracker: Arc<FeedbackTracker>, period: Duration) -> Result<()> {
        if self.handle.is_some() {
            bail!("timeout sweep already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(timeout_sweep_loop(tracker, period, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        log_info!("timeout sweep started (every {}s)", period.as_secs_f64());
        Ok(())
    }

    /// Cancels the loop and waits until it has exited.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("timeout sweep task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SweepController {
    fn default() -> Self {
        Self::new()
    }
}
