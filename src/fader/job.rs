use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, trace, warn};

use super::batch::{BatchPool, FrameBatch};
use super::FaderError;
use crate::ipc::SwayClient;

/// Frame clock shared by every job; a job resets it when it starts
pub type Ticker = Arc<Mutex<Interval>>;

pub fn ticker(period: Duration) -> Ticker {
    let mut interval = interval_at(Instant::now() + period, period);
    // Late ticks are dropped rather than fired in a burst
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Arc::new(Mutex::new(interval))
}

/// What a job does when sway rejects a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the job; the containers keep the last applied opacity
    #[default]
    Abort,
    /// Log and move on to the next frame
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobOptions {
    pub error_policy: ErrorPolicy,
    /// Send frame 0 right away instead of waiting one interval
    pub immediate_first_frame: bool,
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed { frames: usize },
    Cancelled { dispatched: usize },
    Shutdown { dispatched: usize },
    Failed { dispatched: usize, error: FaderError },
    /// The job's task panicked or was aborted by the runtime
    Lost,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled { .. })
    }
}

/// A running fade: one background task dispatching a batch frame by frame.
pub struct FadeJob {
    id: u64,
    frames: usize,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<JobOutcome>,
}

impl FadeJob {
    pub fn spawn(
        id: u64,
        client: Arc<dyn SwayClient>,
        batch: FrameBatch,
        ticker: Ticker,
        shutdown: watch::Receiver<bool>,
        options: JobOptions,
        pool: Option<BatchPool>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let frames = batch.len();

        debug!(
            "🎬 Starting fade job #{} ({} frames, {} containers)",
            id,
            frames,
            batch.containers()
        );

        let handle = tokio::spawn(async move {
            let outcome = run(id, client.as_ref(), &batch, &ticker, cancel_rx, shutdown, options).await;
            if let Some(pool) = pool {
                pool.put(batch);
            }
            outcome
        });

        Self {
            id,
            frames,
            cancel: Some(cancel_tx),
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal cancellation and wait until the task has stopped.
    ///
    /// A dispatch already in flight completes; no later frame is sent.
    pub async fn cancel(mut self) -> JobOutcome {
        drop(self.cancel.take());
        self.join().await
    }

    /// Wait for the job to finish on its own
    pub async fn wait(mut self) -> JobOutcome {
        self.join().await
    }

    async fn join(&mut self) -> JobOutcome {
        match (&mut self.handle).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Fade job #{} task failed: {}", self.id, e);
                JobOutcome::Lost
            }
        }
    }
}

impl Drop for FadeJob {
    fn drop(&mut self) {
        // A dropped handle must not leave frames running unattended
        if !self.handle.is_finished() {
            self.handle.abort();
        }
    }
}

/// Resolves once shutdown is requested or the shutdown sender is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn run(
    id: u64,
    client: &dyn SwayClient,
    batch: &FrameBatch,
    ticker: &Mutex<Interval>,
    mut cancel: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
    options: JobOptions,
) -> JobOutcome {
    let mut ticker = ticker.lock().await;
    ticker.reset();

    for (frame, command) in batch.iter().enumerate() {
        if frame == 0 && options.immediate_first_frame {
            if !matches!(cancel.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                return JobOutcome::Cancelled { dispatched: 0 };
            }
            let stop = *shutdown.borrow();
            if stop {
                return JobOutcome::Shutdown { dispatched: 0 };
            }
        } else {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!("🛑 Fade job #{} cancelled after {} frames", id, frame);
                    return JobOutcome::Cancelled { dispatched: frame };
                }
                _ = stopped(&mut shutdown) => {
                    debug!("🛑 Fade job #{} stopped by shutdown after {} frames", id, frame);
                    return JobOutcome::Shutdown { dispatched: frame };
                }
                _ = ticker.tick() => {}
            }
        }

        trace!("🖼️  Job #{} frame {}: {}", id, frame, command);
        if let Err(source) = client.run_command(command).await {
            let error = FaderError::Dispatch { frame, source };
            match options.error_policy {
                ErrorPolicy::Abort => {
                    warn!("⚠️  Fade job #{} aborted: {}", id, error);
                    return JobOutcome::Failed {
                        dispatched: frame,
                        error,
                    };
                }
                ErrorPolicy::Continue => warn!("⚠️  Fade job #{}: {}", id, error),
            }
        }
    }

    debug!("✅ Fade job #{} completed", id);
    JobOutcome::Completed {
        frames: batch.len(),
    }
}

/// Holds the single job allowed to run at a time
#[derive(Default)]
pub struct JobSlot {
    current: Option<FadeJob>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current job, if any, and wait for it to stop
    pub async fn cancel(&mut self) -> Option<JobOutcome> {
        let job = self.current.take()?;
        let id = job.id();
        let outcome = job.cancel().await;
        debug!("Job #{} finished as {:?}", id, outcome);
        Some(outcome)
    }

    /// Install a job, stopping whatever ran before it first
    pub async fn replace(&mut self, job: FadeJob) -> Option<JobOutcome> {
        let previous = self.cancel().await;
        self.current = Some(job);
        previous
    }

    /// True while a job is installed and its task has not ended
    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|job| !job.is_finished())
    }

    pub fn current_id(&self) -> Option<u64> {
        self.current.as_ref().map(FadeJob::id)
    }

    /// Take the current job out without cancelling it
    pub fn take(&mut self) -> Option<FadeJob> {
        self.current.take()
    }
}
