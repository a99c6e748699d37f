// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Durable job queue contract
//!
//! The broker delivers at-least-once: a claimed job that is never completed
//! comes back, and the same job can reach two workers across a crash. The
//! engine layers its own idempotency on top; the queue's contribution is
//! job-id dedup at enqueue time, retry with exponential backoff, and
//! dead-letter routing once the retry budget is spent.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loam_core::Clock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Retry budget before a job is dead-lettered
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base retry delay; doubles per attempt (3s, 6s, 12s, 24s, 48s)
const RETRY_BASE_SECONDS: i64 = 3;

/// Errors from the queue adapter; always infrastructure-level
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
    #[error("no claimed job {job_id} on queue {queue}")]
    UnknownClaim { queue: String, job_id: String },
}

/// Per-job enqueue options
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Broker-level dedup key: enqueueing an id the broker has already seen
    /// is a silent no-op
    pub job_id: Option<String>,
    /// Delay before the job becomes claimable
    pub delay: Option<std::time::Duration>,
}

impl JobOptions {
    pub fn with_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            delay: None,
        }
    }
}

/// A job handed to a consumer
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job_id: String,
    pub name: String,
    pub payload: Value,
    /// 1-based delivery attempt
    pub attempt: u32,
}

/// A job that exhausted its retry budget, held for manual inspection
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job_id: String,
    pub name: String,
    pub payload: Value,
    pub reason: String,
    pub dead_at: DateTime<Utc>,
}

/// The durable at-least-once broker
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: Value,
        options: JobOptions,
    ) -> Result<(), QueueError>;

    /// Claim the next ready job, if any
    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, QueueError>;

    /// Acknowledge a claimed job as done
    async fn complete(&self, queue: &str, job_id: &str) -> Result<(), QueueError>;

    /// Report a claimed job as failed; the broker requeues with backoff or
    /// dead-letters it
    async fn fail(&self, queue: &str, job_id: &str, reason: &str) -> Result<(), QueueError>;
}

#[derive(Debug, Clone)]
struct Job {
    id: String,
    name: String,
    payload: Value,
    attempts: u32,
    available_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueState {
    items: Vec<Job>,
    claimed: HashMap<String, Job>,
    dead_letters: Vec<DeadLetter>,
    /// Every explicit job id ever accepted, for broker-level dedup
    seen_ids: HashSet<String>,
    /// Every accepted enqueue, for assertions
    history: Vec<(String, Value)>,
}

/// In-memory broker for single-process runs and tests
pub struct MemoryJobQueue<C: Clock> {
    queues: Mutex<HashMap<String, QueueState>>,
    clock: C,
    max_attempts: u32,
    auto_id: AtomicU64,
}

impl<C: Clock> MemoryJobQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            auto_id: AtomicU64::new(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Number of jobs waiting (not claimed) on a queue
    pub fn pending(&self, queue: &str) -> usize {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get(queue).map(|q| q.items.len()).unwrap_or(0)
    }

    /// Dead letters accumulated on a queue
    pub fn dead_letters(&self, queue: &str) -> Vec<DeadLetter> {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .get(queue)
            .map(|q| q.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Every accepted enqueue on a queue, in order, as (job name, payload)
    pub fn accepted(&self, queue: &str) -> Vec<(String, Value)> {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .get(queue)
            .map(|q| q.history.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<C: Clock> JobQueue for MemoryJobQueue<C> {
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: Value,
        options: JobOptions,
    ) -> Result<(), QueueError> {
        let now = self.clock.now();
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let state = queues.entry(queue.to_string()).or_default();

        let id = match options.job_id {
            Some(id) => {
                if state.seen_ids.contains(&id) {
                    // Broker-level dedup: same job id, silently dropped
                    return Ok(());
                }
                state.seen_ids.insert(id.clone());
                id
            }
            None => format!("job-{}", self.auto_id.fetch_add(1, Ordering::SeqCst)),
        };

        let delay = options
            .delay
            .and_then(|d| Duration::from_std(d).ok())
            .unwrap_or_else(Duration::zero);

        state.items.push(Job {
            id,
            name: name.to_string(),
            payload: payload.clone(),
            attempts: 0,
            available_at: now + delay,
        });
        state.history.push((name.to_string(), payload));
        Ok(())
    }

    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, QueueError> {
        let now = self.clock.now();
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let Some(state) = queues.get_mut(queue) else {
            return Ok(None);
        };

        let Some(index) = state.items.iter().position(|j| j.available_at <= now) else {
            return Ok(None);
        };

        let mut job = state.items.remove(index);
        job.attempts += 1;
        let claimed = ClaimedJob {
            job_id: job.id.clone(),
            name: job.name.clone(),
            payload: job.payload.clone(),
            attempt: job.attempts,
        };
        state.claimed.insert(job.id.clone(), job);
        Ok(Some(claimed))
    }

    async fn complete(&self, queue: &str, job_id: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownClaim {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            })?;
        state
            .claimed
            .remove(job_id)
            .ok_or_else(|| QueueError::UnknownClaim {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            })?;
        Ok(())
    }

    async fn fail(&self, queue: &str, job_id: &str, reason: &str) -> Result<(), QueueError> {
        let now = self.clock.now();
        let max_attempts = self.max_attempts;
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownClaim {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            })?;
        let job = state
            .claimed
            .remove(job_id)
            .ok_or_else(|| QueueError::UnknownClaim {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            })?;

        if job.attempts >= max_attempts {
            tracing::error!(queue, job_id, reason, attempts = job.attempts, "job dead-lettered");
            state.dead_letters.push(DeadLetter {
                job_id: job.id,
                name: job.name,
                payload: job.payload,
                reason: reason.to_string(),
                dead_at: now,
            });
        } else {
            // Exponential backoff: 3s, 6s, 12s, 24s, 48s
            let backoff =
                Duration::seconds(RETRY_BASE_SECONDS << (job.attempts.saturating_sub(1)));
            tracing::warn!(
                queue,
                job_id,
                reason,
                attempts = job.attempts,
                backoff_secs = backoff.num_seconds(),
                "job failed, requeueing"
            );
            state.items.push(Job {
                available_at: now + backoff,
                ..job
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
