use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
use xenia_core::{
    ClassSelector, Fragment, InjectionReport, InjectorPhase, TickOutcome, XeniaError, XeniaResult,
    DEFAULT_POLL_INTERVAL_MS,
};
use xenia_dom::Document;

use crate::tick::try_inject;

#[derive(Debug, Clone)]
pub struct InjectorConfig {
    pub interval: Duration,
    pub target: ClassSelector,
    pub marker: ClassSelector,
    pub fragment: Fragment,
    /// `None` polls indefinitely; a bound makes the task give up with an
    /// observable terminal phase instead of retrying forever.
    pub max_attempts: Option<u64>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            target: ClassSelector::watermark(),
            marker: ClassSelector::badge(),
            fragment: Fragment::badge(),
            max_attempts: None,
        }
    }
}

impl InjectorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_fragment(mut self, fragment: Fragment) -> Self {
        self.fragment = fragment;
        self
    }
}

pub struct Injector;

impl Injector {
    /// Spawn the poll task. The first tick fires one full period after
    /// start; ticks never overlap. The returned handle owns the task's
    /// lifetime: dropping it cancels the poll.
    pub fn start(document: Arc<dyn Document>, config: InjectorConfig) -> PollHandle {
        let id = Uuid::new_v4().to_string();
        let (phase_tx, phase_rx) = watch::channel(InjectorPhase::Waiting);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicU64::new(0));

        let task_id = id.clone();
        let task_attempts = attempts.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
            let mut injected = false;
            let phase = loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        // an Err means the handle was dropped, which also
                        // ends the poll
                        if changed.is_err() || *cancel_rx.borrow() {
                            break InjectorPhase::Cancelled;
                        }
                    }
                    _ = ticker.tick() => {
                        let attempt = task_attempts.fetch_add(1, Ordering::Relaxed) + 1;
                        match try_inject(document.as_ref(), &config) {
                            TickOutcome::Injected => {
                                injected = true;
                                info!(
                                    id = %task_id,
                                    target = %config.target,
                                    attempt,
                                    "badge injected"
                                );
                                break InjectorPhase::Done;
                            }
                            TickOutcome::AlreadyMarked => {
                                info!(
                                    id = %task_id,
                                    target = %config.target,
                                    attempt,
                                    "marker already present"
                                );
                                break InjectorPhase::Done;
                            }
                            TickOutcome::TargetMissing => {
                                debug!(id = %task_id, attempt, "target not present yet");
                                if let Some(max) = config.max_attempts {
                                    if attempt >= max {
                                        warn!(
                                            id = %task_id,
                                            target = %config.target,
                                            attempts = attempt,
                                            "giving up, target never appeared"
                                        );
                                        break InjectorPhase::GaveUp;
                                    }
                                }
                            }
                        }
                    }
                }
            };

            let report = InjectionReport::new(
                task_id,
                config.target.clone(),
                config.marker.clone(),
                phase,
                task_attempts.load(Ordering::Relaxed),
                injected,
            );
            let _ = phase_tx.send(phase);
            info!(
                id = %report.id,
                phase = ?report.phase,
                attempts = report.attempts,
                "poll task finished"
            );
            report
        });

        PollHandle {
            id,
            cancel: cancel_tx,
            phase: phase_rx,
            attempts,
            task,
        }
    }
}

/// Owned handle to a running poll task. Exposes explicit stop and
/// observable state instead of an ambient timer id.
pub struct PollHandle {
    id: String,
    cancel: watch::Sender<bool>,
    phase: watch::Receiver<InjectorPhase>,
    attempts: Arc<AtomicU64>,
    task: JoinHandle<InjectionReport>,
}

impl PollHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> InjectorPhase {
        *self.phase.borrow()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling. Takes effect before the next tick; safe to call more
    /// than once or after the task already finished.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Block until the task reaches a terminal phase and report it without
    /// consuming the handle.
    pub async fn terminal_phase(&mut self) -> InjectorPhase {
        while !self.phase.borrow().is_terminal() {
            if self.phase.changed().await.is_err() {
                break;
            }
        }
        *self.phase.borrow()
    }

    /// Wait for the task to finish and return its report.
    pub async fn wait(self) -> XeniaResult<InjectionReport> {
        self.task
            .await
            .map_err(|e| XeniaError::Inject(format!("poll task failed: {e}")))
    }
}
