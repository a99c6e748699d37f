// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Recurring job scheduling
//!
//! The scheduler owns the periodic maintenance jobs: pipeline stat refreshes,
//! the daily snapshot, and the overdue/stale scans. It keeps last-run/next-run
//! state per job and synthesizes queue jobs when a tick finds them due. A
//! long sleep does not cause a burst: a job that missed several windows fires
//! once and its next run is computed from the current tick.

use crate::{jobs, queues};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use loam_adapters::{JobOptions, JobQueue, QueueError};
use loam_core::Clock;
use serde_json::json;
use std::sync::Mutex;

/// When a recurring job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval, first fire one interval after registration
    Every(Duration),
    /// Once a day at the given UTC wall-clock time
    DailyAt { hour: u32, minute: u32 },
}

impl Schedule {
    /// The first fire instant strictly after `now`
    fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Every(interval) => now + *interval,
            Schedule::DailyAt { hour, minute } => {
                let time = NaiveTime::from_hms_opt(*hour % 24, *minute % 60, 0)
                    .unwrap_or(NaiveTime::MIN);
                let mut candidate = now.date_naive().and_time(time).and_utc();
                if candidate <= now {
                    candidate += Duration::days(1);
                }
                candidate
            }
        }
    }
}

/// Spec for one recurring job; `name` doubles as the broker job name
#[derive(Debug, Clone)]
pub struct RecurringJob {
    pub name: String,
    pub queue: String,
    pub schedule: Schedule,
}

impl RecurringJob {
    pub fn new(name: impl Into<String>, queue: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            schedule,
        }
    }
}

struct JobState {
    job: RecurringJob,
    next_run: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
    run_count: u64,
}

/// Tracks recurring job specs and their run state
pub struct RecurringScheduler<C: Clock> {
    clock: C,
    states: Mutex<Vec<JobState>>,
}

impl<C: Clock> RecurringScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            states: Mutex::new(Vec::new()),
        }
    }

    /// Register a job spec; re-registering the same name with the same
    /// schedule keeps the existing run state, so startup is idempotent
    pub fn register(&self, job: RecurringJob) {
        let now = self.clock.now();
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(state) = states.iter_mut().find(|s| s.job.name == job.name) {
            if state.job.schedule != job.schedule {
                state.next_run = job.schedule.next_after(now);
            }
            state.job = job;
            return;
        }

        let next_run = job.schedule.next_after(now);
        states.push(JobState {
            job,
            next_run,
            last_run: None,
            run_count: 0,
        });
    }

    /// Register the standard maintenance jobs; called on every worker start
    pub fn register_recurring_jobs(&self) {
        self.register(RecurringJob::new(
            jobs::REFRESH_PIPELINE_STATS,
            queues::MAINTENANCE,
            Schedule::Every(Duration::hours(2)),
        ));
        self.register(RecurringJob::new(
            jobs::DAILY_PIPELINE_SNAPSHOT,
            queues::MAINTENANCE,
            Schedule::DailyAt { hour: 2, minute: 0 },
        ));
        self.register(RecurringJob::new(
            jobs::CHECK_OVERDUE_TASKS,
            queues::MAINTENANCE,
            Schedule::Every(Duration::minutes(30)),
        ));
        self.register(RecurringJob::new(
            jobs::CHECK_STALE_DEALS,
            queues::MAINTENANCE,
            Schedule::DailyAt { hour: 9, minute: 0 },
        ));
    }

    /// Collect the jobs due at the current instant, advancing their state
    pub fn due_jobs(&self) -> Vec<RecurringJob> {
        let now = self.clock.now();
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();
        for state in states.iter_mut() {
            if state.next_run <= now {
                state.last_run = Some(now);
                state.run_count += 1;
                state.next_run = state.job.schedule.next_after(now);
                due.push(state.job.clone());
            }
        }
        due
    }

    /// Enqueue every due job; returns how many fired
    pub async fn tick(&self, queue: &dyn JobQueue) -> Result<usize, QueueError> {
        let due = self.due_jobs();
        for job in &due {
            tracing::info!(job = %job.name, queue = %job.queue, "recurring job due");
            queue
                .enqueue(&job.queue, &job.name, json!({}), JobOptions::default())
                .await?;
        }
        Ok(due.len())
    }

    /// Run count for a registered job, for tests and introspection
    pub fn run_count(&self, name: &str) -> Option<u64> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.iter().find(|s| s.job.name == name).map(|s| s.run_count)
    }

    /// Next fire instant for a registered job
    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.iter().find(|s| s.job.name == name).map(|s| s.next_run)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
