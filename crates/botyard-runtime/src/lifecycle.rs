//! Running discovered bots.
//!
//! [`LifecycleManager`] owns nothing but the transport and the stop grace
//! period. [`start`](LifecycleManager::start) spawns one task per
//! [`BotInstance`] and hands back [`RunningBots`]; [`RunningBots::shutdown`]
//! cancels every worker at once, then walks the workers in discovery order:
//! await the task within the grace period, run the bot's cleanup capability
//! and record a [`BotOutcome`]. A failing or panicking cleanup never keeps the
//! remaining bots from being cleaned up.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = LifecycleManager::new(transport).with_stop_grace(Duration::from_secs(5));
//! let report = manager.run(report.bots).await; // returns after Ctrl+C / SIGTERM
//! println!("{report}");
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::error::LifecycleError;
use crate::registry::{BotInstance, InstanceId};
use crate::worker::{SharedStatus, Worker, WorkerExit, WorkerState, new_status, panic_message};
use botyard_core::{BoxedTransport, CleanupError};

/// Default time each worker gets to stop.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

// =============================================================================
// Outcomes
// =============================================================================

/// How one bot ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotOutcome {
    /// Stopped on request and cleaned up.
    Stopped,
    /// The worker had stopped on its own before shutdown.
    Crashed { reason: String },
    /// The worker stopped but its cleanup failed or panicked.
    CleanupFailed { reason: String },
    /// The worker ignored the stop request and was aborted.
    StopTimedOut,
}

impl BotOutcome {
    /// Returns `true` for [`BotOutcome::Stopped`].
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for BotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Crashed { reason } => write!(f, "crashed ({reason})"),
            Self::CleanupFailed { reason } => write!(f, "cleanup failed ({reason})"),
            Self::StopTimedOut => f.write_str("stop timed out"),
        }
    }
}

/// Final status of one bot.
#[derive(Debug, Clone)]
pub struct BotReport {
    pub id: InstanceId,
    pub name: String,
    pub kind: &'static str,
    pub outcome: BotOutcome,
}

/// Final status of every bot, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct LifecycleReport {
    entries: Vec<BotReport>,
}

impl LifecycleReport {
    pub fn entries(&self) -> &[BotReport] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the outcome recorded for `id`.
    pub fn outcome(&self, id: &InstanceId) -> Option<&BotOutcome> {
        self.entries
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| &entry.outcome)
    }

    /// Returns `true` when every bot stopped cleanly.
    pub fn all_clean(&self) -> bool {
        self.entries.iter().all(|entry| entry.outcome.is_clean())
    }
}

impl fmt::Display for LifecycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{} [{}]: {}", entry.name, entry.id, entry.outcome)?;
        }
        Ok(())
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Starts bots and shuts them down on a signal.
pub struct LifecycleManager {
    transport: BoxedTransport,
    grace: Duration,
}

impl LifecycleManager {
    /// Creates a manager connecting every bot through `transport`.
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport,
            grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Sets how long each worker may take to stop and to clean up.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Spawns one worker task per instance.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self, instances: Vec<BotInstance>) -> RunningBots {
        let token = CancellationToken::new();
        let mut workers = Vec::with_capacity(instances.len());

        for instance in instances {
            let status = new_status();
            let name = instance.name();
            let span = info_span!(
                "bot",
                instance = %instance.id,
                bot = %instance.bot.config().bot_id
            );
            let worker = Worker {
                bot: Arc::clone(&instance.bot),
                name: name.clone(),
                transport: Arc::clone(&self.transport),
                token: token.child_token(),
                status: Arc::clone(&status),
            };
            let task = tokio::spawn(worker.run().instrument(span));

            info!(bot = %name, instance = %instance.id, kind = instance.kind, "Bot started");
            workers.push(WorkerHandle {
                instance,
                task,
                status,
            });
        }

        RunningBots {
            workers,
            token,
            grace: self.grace,
        }
    }

    /// Runs `instances` until Ctrl+C or SIGTERM, then shuts them down.
    pub async fn run(&self, instances: Vec<BotInstance>) -> LifecycleReport {
        self.run_until(instances, wait_for_shutdown()).await
    }

    /// Runs `instances` until `shutdown` completes, then shuts them down.
    pub async fn run_until<F>(&self, instances: Vec<BotInstance>, shutdown: F) -> LifecycleReport
    where
        F: Future<Output = ()>,
    {
        let running = self.start(instances);
        info!(bots = running.len(), "All bots started");
        shutdown.await;
        running.shutdown().await
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler, waiting for Ctrl+C only");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// Running bots
// =============================================================================

struct WorkerHandle {
    instance: BotInstance,
    task: JoinHandle<WorkerExit>,
    status: SharedStatus,
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: InstanceId,
    pub state: WorkerState,
    /// Set once the worker stopped on its own.
    pub crashed: Option<String>,
}

/// The fixed set of workers spawned by [`LifecycleManager::start`].
///
/// Dropping it without calling [`shutdown`](Self::shutdown) cancels the
/// workers but skips cleanup.
pub struct RunningBots {
    workers: Vec<WorkerHandle>,
    token: CancellationToken,
    grace: Duration,
}

impl RunningBots {
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Number of worker tasks that have not finished.
    pub fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|worker| !worker.task.is_finished())
            .count()
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers
            .iter()
            .map(|worker| {
                let status = worker.status.lock();
                WorkerSnapshot {
                    id: worker.instance.id.clone(),
                    state: status.state,
                    crashed: status.crash.clone(),
                }
            })
            .collect()
    }

    /// Stops every worker, cleans every bot up once and reports how each ended.
    pub async fn shutdown(mut self) -> LifecycleReport {
        info!(bots = self.workers.len(), "Stopping bots");
        self.token.cancel();

        let mut report = LifecycleReport::default();
        for worker in std::mem::take(&mut self.workers) {
            report.entries.push(self.stop_worker(worker).await);
        }

        info!(
            bots = report.len(),
            clean = report.entries.iter().filter(|e| e.outcome.is_clean()).count(),
            "All bots stopped"
        );
        report
    }

    async fn stop_worker(&self, worker: WorkerHandle) -> BotReport {
        let WorkerHandle {
            instance,
            mut task,
            status,
        } = worker;
        let name = instance.name();
        status.lock().state = WorkerState::StopRequested;

        let exit = match tokio::time::timeout(self.grace, &mut task).await {
            Ok(Ok(exit)) => Some(exit),
            Ok(Err(join_error)) => Some(Err(LifecycleError::Crashed {
                reason: join_failure(join_error),
            })),
            Err(_) => {
                task.abort();
                let e = LifecycleError::StopTimedOut { grace: self.grace };
                error!(bot = %name, instance = %instance.id, error = %e, "Worker aborted");
                None
            }
        };

        let cleanup = run_cleanup(&instance, self.grace).await;
        if let Err(e) = &cleanup {
            error!(bot = %name, instance = %instance.id, error = %e, "Cleanup failed");
        }

        let outcome = match (exit, cleanup) {
            (None, _) => BotOutcome::StopTimedOut,
            (Some(Err(LifecycleError::Crashed { reason })), _) => BotOutcome::Crashed { reason },
            (Some(Err(e)), _) => BotOutcome::Crashed {
                reason: e.to_string(),
            },
            (Some(Ok(())), Err(e)) => BotOutcome::CleanupFailed {
                reason: e.to_string(),
            },
            (Some(Ok(())), Ok(())) => BotOutcome::Stopped,
        };

        status.lock().state = WorkerState::Stopped;
        info!(bot = %name, instance = %instance.id, outcome = %outcome, "Bot stopped");

        BotReport {
            id: instance.id,
            name,
            kind: instance.kind,
            outcome,
        }
    }
}

impl Drop for RunningBots {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Invokes the bot's cleanup capability, containing errors and panics.
async fn run_cleanup(instance: &BotInstance, grace: Duration) -> Result<(), LifecycleError> {
    let Some(cleanup) = instance.bot.cleanup() else {
        return Ok(());
    };

    let guarded = AssertUnwindSafe(cleanup.cleanup()).catch_unwind();
    match tokio::time::timeout(grace, guarded).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(LifecycleError::Cleanup(e)),
        Ok(Err(payload)) => Err(LifecycleError::CleanupPanicked {
            reason: panic_message(payload.as_ref()),
        }),
        Err(_) => Err(LifecycleError::Cleanup(CleanupError::Failed(format!(
            "timed out after {grace:?}"
        )))),
    }
}

fn join_failure(error: JoinError) -> String {
    if error.is_panic() {
        format!("worker panicked: {}", panic_message(error.into_panic().as_ref()))
    } else {
        "worker task was cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(BotOutcome::Stopped.to_string(), "stopped");
        assert_eq!(
            BotOutcome::Crashed {
                reason: "transport closed".into()
            }
            .to_string(),
            "crashed (transport closed)"
        );
        assert!(!BotOutcome::StopTimedOut.is_clean());
    }

    #[test]
    fn test_report_lookup_and_display() {
        let id = InstanceId::new("math", 0);
        let report = LifecycleReport {
            entries: vec![BotReport {
                id: id.clone(),
                name: "Math Bot".into(),
                kind: "math",
                outcome: BotOutcome::Stopped,
            }],
        };
        assert_eq!(report.outcome(&id), Some(&BotOutcome::Stopped));
        assert!(report.all_clean());
        assert_eq!(report.to_string(), "Math Bot [math#0]: stopped\n");
    }
}
