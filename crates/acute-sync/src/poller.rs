use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::ClientError;
use crate::SummarySource;
use acute_core::RawSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Snapshot {
        cycle: u64,
        summaries: Vec<RawSummary>,
    },
    Failed {
        cycle: u64,
        error: ClientError,
    },
}

impl PollEvent {
    pub fn cycle(&self) -> u64 {
        match self {
            PollEvent::Snapshot { cycle, .. } | PollEvent::Failed { cycle, .. } => *cycle,
        }
    }
}

/// Control side of a running poller. Dropping it stops the loop.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    refresh_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Asks for one extra cycle as soon as the current one finishes.
    /// Returns false once the poller has stopped.
    pub fn refresh_now(&self) -> bool {
        match self.refresh_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stops the timer, drops any fetch in flight and waits for the task.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("summary_poller_join_error: {err}");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn spawn_poller<S>(
    source: Arc<S>,
    config: PollerConfig,
    events: mpsc::Sender<PollEvent>,
) -> PollerHandle
where
    S: SummarySource + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (refresh_tx, refresh_rx) = mpsc::channel(1);
    let task = tokio::spawn(run_poller(source, config, events, shutdown_rx, refresh_rx));
    PollerHandle {
        shutdown_tx,
        refresh_tx,
        task: Some(task),
    }
}

async fn run_poller<S: SummarySource>(
    source: Arc<S>,
    config: PollerConfig,
    events: mpsc::Sender<PollEvent>,
    mut shutdown: watch::Receiver<bool>,
    mut refresh_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refresh_open = true;
    let mut cycle: u64 = 0;
    info!(
        interval_ms = config.interval.as_millis() as u64,
        "summary_poller_started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
            request = refresh_rx.recv(), if refresh_open => {
                if request.is_none() {
                    refresh_open = false;
                    continue;
                }
                ticker.reset();
            }
        }

        cycle += 1;
        let result = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = source.fetch_all() => result,
        };
        if *shutdown.borrow() {
            break;
        }

        let event = match result {
            Ok(summaries) => {
                debug!(cycle, count = summaries.len(), "summary_poll_ok");
                PollEvent::Snapshot { cycle, summaries }
            }
            Err(error) => {
                warn!(cycle, "summary_poll_error: {error}");
                PollEvent::Failed { cycle, error }
            }
        };

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            sent = events.send(event) => {
                if sent.is_err() {
                    debug!("summary_poller_receiver_closed");
                    break;
                }
            }
        }
    }

    info!(cycles = cycle, "summary_poller_stopped");
}
