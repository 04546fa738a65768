use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use super::batch::{BatchPool, FrameBatch};
use super::job::{self, FadeJob, JobOptions, JobOutcome, JobSlot, Ticker};
use super::rules::RuleSet;
use super::{Fader, FaderError, FrameTiming};
use crate::ipc::{ContainerRef, SwayClient, SwayEvent, WorkspaceRef};

/// How workspace-wide batches address their containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// `[app_id="..."]` / `[class="..."]` criteria built from the matched value
    #[default]
    Selector,
    /// `[con_id=N]` per container
    ConId,
}

/// Lets the owner of the event loop stop running fades from outside
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn trigger(&self) {
        // Receivers live as long as the dispatcher; nobody listening is fine
        let _ = self.sender.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Turns sway events into fade jobs, keeping at most one job running.
pub struct FadeDispatcher {
    client: Arc<dyn SwayClient>,
    rules: RuleSet,
    timing: FrameTiming,
    addressing: Addressing,
    job_options: JobOptions,
    ticker: Ticker,
    pool: BatchPool,
    slot: JobSlot,
    shutdown: ShutdownSignal,
    shutdown_rx: watch::Receiver<bool>,
    next_job_id: u64,
}

impl FadeDispatcher {
    /// Must be called from within a tokio runtime (the frame ticker is a timer).
    pub fn new(client: Arc<dyn SwayClient>, fader: Fader) -> Self {
        let (tx, rx) = watch::channel(false);
        let Fader {
            rules,
            timing,
            addressing,
            job: job_options,
        } = fader;

        Self {
            client,
            rules,
            timing,
            addressing,
            job_options,
            ticker: job::ticker(timing.frame_interval),
            pool: BatchPool::new(timing.num_frames),
            slot: JobSlot::new(),
            shutdown: ShutdownSignal {
                sender: Arc::new(tx),
            },
            shutdown_rx: rx,
            next_job_id: 1,
        }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// True while a job is still dispatching frames
    pub fn is_fading(&self) -> bool {
        self.slot.is_running()
    }

    pub fn current_job(&self) -> Option<u64> {
        self.slot.current_id()
    }

    /// Route an event; only new windows and workspace focus act.
    pub async fn handle_event(&mut self, event: &SwayEvent) -> Result<Option<u64>, FaderError> {
        match event {
            SwayEvent::WindowNew(container) => Ok(self.window_new(container).await),
            SwayEvent::WorkspaceFocus(current) => self.workspace_focus(current.as_ref()).await,
            SwayEvent::Other => {
                trace!("Ignoring event {:?}", event);
                Ok(None)
            }
        }
    }

    /// Fade in a freshly created window, superseding any running fade.
    ///
    /// A window without a rule leaves the running fade alone.
    pub async fn window_new(&mut self, container: &ContainerRef) -> Option<u64> {
        let batch = self.build_window_batch(container)?;
        self.cancel_current().await;
        Some(self.start(batch).await)
    }

    /// Fade every visible container after a workspace switch.
    ///
    /// Tree fetch errors drop the event; the dispatcher stays usable.
    pub async fn workspace_focus(
        &mut self,
        current: Option<&WorkspaceRef>,
    ) -> Result<Option<u64>, FaderError> {
        self.cancel_current().await;

        let Some(current) = current else {
            debug!("Workspace focus without a current workspace, nothing to fade");
            return Ok(None);
        };
        debug!(
            "🔀 Workspace focus: {}",
            current.name.as_deref().unwrap_or("<unnamed>")
        );

        let containers = self
            .client
            .visible_containers()
            .await
            .map_err(FaderError::Tree)?;
        let batch = self.build_workspace_batch(&containers);
        if batch.is_empty() {
            debug!("No visible container matched a fade rule");
            self.pool.put(batch);
            return Ok(None);
        }

        Ok(Some(self.start(batch).await))
    }

    /// Batch for one container, addressed by `con_id`
    pub fn build_window_batch(&mut self, container: &ContainerRef) -> Option<FrameBatch> {
        let Some(rule) = self.rules.resolve_mut(container) else {
            debug!("No fade rule for container {}", container.id);
            return None;
        };

        let mut batch = self.pool.get();
        batch.push_commands(rule.commands_for(container.id));
        Some(batch)
    }

    /// Batch for a set of containers, one command group per frame.
    ///
    /// Containers without a matching rule are left out. In selector mode a
    /// selector shared by several containers is emitted once, and containers
    /// the selector cannot address fall back to `con_id`.
    pub fn build_workspace_batch(&mut self, containers: &[ContainerRef]) -> FrameBatch {
        let mut batch = self.pool.get();
        let mut seen = HashSet::new();

        for container in containers {
            let Some(rule) = self.rules.resolve_mut(container) else {
                trace!("Container {} has no fade rule", container.id);
                continue;
            };

            match (self.addressing, rule.selector(container)) {
                (Addressing::Selector, Some(target)) => {
                    if seen.insert(target.to_string()) {
                        batch.push_commands(rule.render_for(target).as_slice());
                    }
                }
                _ => batch.push_commands(rule.commands_for(container.id)),
            }
        }

        batch
    }

    async fn start(&mut self, batch: FrameBatch) -> u64 {
        let id = self.next_job_id;
        self.next_job_id += 1;

        let job = FadeJob::spawn(
            id,
            Arc::clone(&self.client),
            batch,
            Arc::clone(&self.ticker),
            self.shutdown_rx.clone(),
            self.job_options,
            Some(self.pool.clone()),
        );
        self.slot.replace(job).await;
        id
    }

    /// Cancel the running job and wait until it has stopped
    pub async fn cancel_current(&mut self) -> Option<JobOutcome> {
        self.slot.cancel().await
    }

    /// Wait for the running job to finish without cancelling it
    pub async fn wait_current(&mut self) -> Option<JobOutcome> {
        let job = self.slot.take()?;
        Some(job.wait().await)
    }

    /// Stop all fading for good
    pub async fn shutdown(&mut self) {
        info!("🛑 Stopping fades");
        self.shutdown.trigger();
        self.slot.cancel().await;
    }
}
