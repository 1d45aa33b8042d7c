//! Daily run scheduler.
//!
//! Fires `spawn_run(Scheduled)` once per day at the configured UTC time.
//! A fire that lands while a run is in flight is skipped outright, and the
//! next fire time is recomputed either way, so the status display always
//! shows the next intended fire rather than the next successful one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use autopost_models::RunTrigger;

use crate::config::ScheduleConfig;
use crate::orchestrator::{RunOrchestrator, TriggerError};

pub struct Scheduler {
    orchestrator: Arc<RunOrchestrator>,
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<RunOrchestrator>, config: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run the schedule loop forever. Spawn as a background task.
    pub async fn run(self) {
        info!(
            hour = self.config.hour_utc,
            minute = self.config.minute_utc,
            "Scheduler started"
        );
        loop {
            self.tick().await;
        }
    }

    /// One schedule iteration: publish the next fire time, sleep until it,
    /// then attempt to start a run.
    async fn tick(&self) {
        let next = next_fire_time(Utc::now(), &self.config);
        self.orchestrator.set_next_scheduled_run(next);
        info!(next = %next, "Next scheduled run");

        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match self.orchestrator.spawn_run(RunTrigger::Scheduled) {
            Ok(run_id) => info!(run_id = %run_id, "Scheduled run started"),
            Err(TriggerError::Busy) => {
                warn!("Scheduled fire skipped: a run is already in progress");
            }
        }
    }
}

/// Next daily fire time strictly after `now`.
pub fn next_fire_time(now: DateTime<Utc>, config: &ScheduleConfig) -> DateTime<Utc> {
    let fire_today = now
        .date_naive()
        .and_hms_opt(config.hour_utc, config.minute_utc, 0)
        .map(|dt| dt.and_utc());

    match fire_today {
        Some(fire) if fire > now => fire,
        Some(fire) => fire + Duration::days(1),
        // Unreachable with a validated config; fall back to one day out.
        None => now + Duration::days(1),
    }
}
