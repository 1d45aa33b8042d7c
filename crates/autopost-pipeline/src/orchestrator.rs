//! Run orchestration and the status state machine.
//!
//! `RunOrchestrator` is the single gate both the scheduler and the manual
//! trigger go through. The busy check-and-set happens atomically under one
//! mutex, and a granted `RunGuard` records completion on every exit path,
//! including a panic inside the pipeline task.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use autopost_models::{RunId, RunOutcome, RunStatus, RunTrigger};

use crate::metrics;

/// Context handed to the pipeline for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub trigger: RunTrigger,
    /// Completion time of the previous run, if any. Selection policies use
    /// this as the "new since last run" cutoff.
    pub last_run: Option<DateTime<Utc>>,
}

/// One execution of the publish pipeline.
///
/// Implementations classify every internal failure into the returned
/// outcome; `execute` is infallible by contract and must not leave working
/// files behind.
#[async_trait]
pub trait RunPipeline: Send + Sync {
    async fn execute(&self, ctx: RunContext) -> RunOutcome;
}

/// Rejection returned when a run is requested while another is in flight.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("a publishing run is already in progress")]
    Busy,
}

/// The run state machine. Owns the process-wide `RunStatus`.
pub struct RunOrchestrator {
    status: Arc<Mutex<RunStatus>>,
    pipeline: Arc<dyn RunPipeline>,
}

impl RunOrchestrator {
    pub fn new(pipeline: Arc<dyn RunPipeline>) -> Self {
        Self {
            status: Arc::new(Mutex::new(RunStatus::default())),
            pipeline,
        }
    }

    /// Atomically claim the single run slot.
    ///
    /// Returns a guard owning the run, or `Busy` with no side effects. This
    /// check-and-set is the sole concurrency guarantee of the system.
    pub fn try_start_run(&self, trigger: RunTrigger) -> Result<RunGuard, TriggerError> {
        let mut status = lock_status(&self.status);
        if status.running {
            metrics::record_busy_rejection(trigger);
            return Err(TriggerError::Busy);
        }
        status.running = true;

        let ctx = RunContext {
            run_id: RunId::new(),
            trigger,
            last_run: status.last_run,
        };
        metrics::record_run_started(trigger);

        Ok(RunGuard {
            status: Arc::clone(&self.status),
            ctx,
            completed: false,
        })
    }

    /// Claim the run slot and execute the pipeline on a background task.
    ///
    /// Returns as soon as the slot is claimed; the outcome becomes visible
    /// through `snapshot` once the run finishes.
    pub fn spawn_run(&self, trigger: RunTrigger) -> Result<RunId, TriggerError> {
        let guard = self.try_start_run(trigger)?;
        let run_id = guard.run_id().clone();
        let pipeline = Arc::clone(&self.pipeline);

        info!(run_id = %run_id, trigger = %trigger, "Run started");

        tokio::spawn(async move {
            let ctx = guard.context().clone();
            let outcome = pipeline.execute(ctx).await;
            guard.complete(outcome);
        });

        Ok(run_id)
    }

    /// Entry point for the on-demand trigger.
    ///
    /// Busy surfaces as an error the HTTP layer turns into a structured
    /// response; on success the run proceeds in the background.
    pub fn manual_trigger(&self) -> Result<RunId, TriggerError> {
        self.spawn_run(RunTrigger::Manual)
    }

    /// Consistent snapshot of the run status.
    ///
    /// Taken under the same lock as writes, so readers never observe a torn
    /// combination of fields.
    pub fn snapshot(&self) -> RunStatus {
        lock_status(&self.status).clone()
    }

    /// Publish the next scheduled fire time.
    pub fn set_next_scheduled_run(&self, when: DateTime<Utc>) {
        lock_status(&self.status).next_scheduled_run = Some(when);
    }
}

/// Owns an in-flight run.
///
/// Completing the guard releases the run slot. If it is dropped without
/// completing (pipeline panic, aborted task) a fatal outcome is recorded
/// instead, so `running` can never stay stuck at true.
#[derive(Debug)]
pub struct RunGuard {
    status: Arc<Mutex<RunStatus>>,
    ctx: RunContext,
    completed: bool,
}

// `Arc<Mutex<_>>` blocks a `#[derive(PartialEq)]`, which the orchestrator
// tests need so `try_start_run`'s `Result<RunGuard, _>` is usable in
// `assert_eq!`. Two guards are equal iff they own the same run.
impl PartialEq for RunGuard {
    fn eq(&self, other: &Self) -> bool {
        self.ctx.run_id == other.ctx.run_id && self.completed == other.completed
    }
}

impl RunGuard {
    pub fn run_id(&self) -> &RunId {
        &self.ctx.run_id
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Record the outcome and release the run slot.
    pub fn complete(mut self, outcome: RunOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: RunOutcome) {
        if self.completed {
            return;
        }
        self.completed = true;

        if outcome.is_success() {
            info!(run_id = %self.ctx.run_id, "Run completed: {}", outcome.body);
        } else {
            warn!(
                run_id = %self.ctx.run_id,
                status_code = outcome.status_code,
                "Run finished with failures: {}", outcome.body
            );
        }
        metrics::record_run_completed(outcome.status_code);

        let mut status = lock_status(&self.status);
        status.running = false;
        status.last_run = Some(Utc::now());
        status.result = Some(outcome);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.completed {
            error!(run_id = %self.ctx.run_id, "Run ended without recording an outcome");
            self.finish(RunOutcome::fatal("run aborted unexpectedly"));
        }
    }
}

/// Lock the status, recovering from a poisoned mutex: the state itself
/// stays consistent because every writer holds the lock only for plain
/// field assignments.
fn lock_status(status: &Mutex<RunStatus>) -> MutexGuard<'_, RunStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
