// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Queue consumers
//!
//! Each queue gets a pool of identical consumer tasks running the
//! claim/handle/ack loop. A handler error fails the job back to the broker,
//! which applies retry backoff and eventually dead-letters it; the loop
//! itself only stops on shutdown. Broker errors are logged and retried after
//! the poll interval.

use async_trait::async_trait;
use loam_adapters::{
    ClaimedJob, EntityRegistry, JobQueue, MailError, Mailer, QueueError, StoreError,
};
use loam_core::{Clock, Entity, EntityKind, TriggerEvent};
use loam_engine::{jobs, queues, AutomationEngine, EmailJob, EngineError, NotificationJob, Scans};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Why a claimed job could not be handled; becomes the broker failure reason
#[derive(Debug, Error)]
pub enum JobError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unknown job {0}")]
    UnknownJob(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// One queue's job handler
#[async_trait]
pub trait Consumer: Send + Sync {
    fn queue_name(&self) -> &'static str;
    async fn handle(&self, job: &ClaimedJob) -> Result<(), JobError>;
}

/// Claim and handle at most one job; `Ok(false)` means the queue was idle
pub async fn run_once(
    queue: &dyn JobQueue,
    consumer: &dyn Consumer,
) -> Result<bool, QueueError> {
    let name = consumer.queue_name();
    let Some(job) = queue.claim(name).await? else {
        return Ok(false);
    };

    match consumer.handle(&job).await {
        Ok(()) => queue.complete(name, &job.job_id).await?,
        Err(job_error) => {
            warn!(
                queue = name,
                job_id = %job.job_id,
                job = %job.name,
                attempt = job.attempt,
                error = %job_error,
                "job handling failed"
            );
            queue.fail(name, &job.job_id, &job_error.to_string()).await?;
        }
    }
    Ok(true)
}

/// Spawn `workers` consumer tasks over one queue
pub fn run_pool(
    queue: Arc<dyn JobQueue>,
    consumer: Arc<dyn Consumer>,
    workers: usize,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..workers.max(1))
        .map(|_| {
            let queue = queue.clone();
            let consumer = consumer.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }
                    match run_once(queue.as_ref(), consumer.as_ref()).await {
                        Ok(true) => continue,
                        Ok(false) => {
                            tokio::select! {
                                _ = tokio::time::sleep(poll_interval) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                        Err(queue_error) => {
                            error!(
                                queue = consumer.queue_name(),
                                error = %queue_error,
                                "broker error, retrying after poll interval"
                            );
                            tokio::time::sleep(poll_interval).await;
                        }
                    }
                }
            })
        })
        .collect()
}

/// Consumes `evaluate-trigger` jobs from the automation queue
pub struct EvaluateTriggerConsumer<C: Clock> {
    engine: Arc<AutomationEngine<C>>,
}

impl<C: Clock> EvaluateTriggerConsumer<C> {
    pub fn new(engine: Arc<AutomationEngine<C>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<C: Clock + 'static> Consumer for EvaluateTriggerConsumer<C> {
    fn queue_name(&self) -> &'static str {
        queues::AUTOMATION
    }

    async fn handle(&self, job: &ClaimedJob) -> Result<(), JobError> {
        if job.name != jobs::EVALUATE_TRIGGER {
            return Err(JobError::UnknownJob(job.name.clone()));
        }
        let event: TriggerEvent = serde_json::from_value(job.payload.clone())?;
        self.engine.handle_trigger_event(&event, &job.job_id).await?;
        Ok(())
    }
}

/// Runs the scheduled scan jobs from the maintenance queue
pub struct MaintenanceConsumer<C: Clock> {
    scans: Arc<Scans<C>>,
}

impl<C: Clock> MaintenanceConsumer<C> {
    pub fn new(scans: Arc<Scans<C>>) -> Self {
        Self { scans }
    }
}

#[async_trait]
impl<C: Clock + 'static> Consumer for MaintenanceConsumer<C> {
    fn queue_name(&self) -> &'static str {
        queues::MAINTENANCE
    }

    async fn handle(&self, job: &ClaimedJob) -> Result<(), JobError> {
        match job.name.as_str() {
            jobs::CHECK_OVERDUE_TASKS => {
                self.scans.check_overdue_tasks().await?;
            }
            jobs::CHECK_STALE_DEALS => {
                self.scans.check_stale_deals().await?;
            }
            jobs::REFRESH_PIPELINE_STATS => {
                self.scans.refresh_pipeline_stats().await?;
            }
            jobs::DAILY_PIPELINE_SNAPSHOT => {
                self.scans.daily_pipeline_snapshot().await?;
            }
            other => return Err(JobError::UnknownJob(other.to_string())),
        }
        Ok(())
    }
}

/// Persists in-app notifications from the notification queue
pub struct NotificationConsumer<C: Clock> {
    registry: EntityRegistry,
    clock: C,
}

impl<C: Clock> NotificationConsumer<C> {
    pub fn new(registry: EntityRegistry, clock: C) -> Self {
        Self { registry, clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> Consumer for NotificationConsumer<C> {
    fn queue_name(&self) -> &'static str {
        queues::NOTIFICATION
    }

    async fn handle(&self, job: &ClaimedJob) -> Result<(), JobError> {
        if job.name != jobs::SEND_NOTIFICATION {
            return Err(JobError::UnknownJob(job.name.clone()));
        }
        let payload: NotificationJob = serde_json::from_value(job.payload.clone())?;

        let mut notification = Entity::new();
        notification.insert("user_id".to_string(), Value::String(payload.user_id));
        notification.insert("title".to_string(), Value::String(payload.title));
        notification.insert("body".to_string(), Value::String(payload.body));
        notification.insert("is_read".to_string(), Value::Bool(false));
        notification.insert(
            "created_at".to_string(),
            Value::String(self.clock.now().to_rfc3339()),
        );
        self.registry
            .repo(EntityKind::Notification)?
            .create(notification)
            .await?;
        Ok(())
    }
}

/// Paces outbound email across the whole consumer pool
pub struct RateGate {
    interval: tokio::sync::Mutex<tokio::time::Interval>,
}

impl RateGate {
    pub fn per_second(rate: u32) -> Self {
        let period = Duration::from_secs(1) / rate.max(1);
        Self {
            interval: tokio::sync::Mutex::new(tokio::time::interval(period)),
        }
    }

    /// Wait for the next send slot
    pub async fn acquire(&self) {
        self.interval.lock().await.tick().await;
    }
}

/// Delivers email jobs through the mailer and records the outcome
pub struct EmailConsumer<C: Clock> {
    registry: EntityRegistry,
    mailer: Arc<dyn Mailer>,
    gate: Arc<RateGate>,
    clock: C,
}

impl<C: Clock> EmailConsumer<C> {
    pub fn new(
        registry: EntityRegistry,
        mailer: Arc<dyn Mailer>,
        gate: Arc<RateGate>,
        clock: C,
    ) -> Self {
        Self {
            registry,
            mailer,
            gate,
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> Consumer for EmailConsumer<C> {
    fn queue_name(&self) -> &'static str {
        queues::EMAIL
    }

    async fn handle(&self, job: &ClaimedJob) -> Result<(), JobError> {
        if job.name != jobs::SEND_EMAIL {
            return Err(JobError::UnknownJob(job.name.clone()));
        }
        let payload: EmailJob = serde_json::from_value(job.payload.clone())?;

        self.gate.acquire().await;
        self.mailer
            .send(&payload.to, &payload.subject, &payload.body)
            .await?;

        let now = self.clock.now();
        let mut activity = Entity::new();
        activity.insert("type".to_string(), Value::String("email_sent".to_string()));
        activity.insert("to".to_string(), Value::String(payload.to.clone()));
        activity.insert(
            "automation_id".to_string(),
            Value::String(payload.automation_id.clone()),
        );
        activity.insert(
            "entity_kind".to_string(),
            Value::String(payload.entity_kind.to_string()),
        );
        activity.insert(
            "entity_id".to_string(),
            Value::String(payload.entity_id.clone()),
        );
        activity.insert("created_at".to_string(), Value::String(now.to_rfc3339()));
        self.registry
            .repo(EntityKind::Activity)?
            .create(activity)
            .await?;

        // Sending to a contact counts as contacting them
        if payload.entity_kind == EntityKind::Contact {
            let mut patch = Entity::new();
            patch.insert(
                "last_contacted_at".to_string(),
                Value::String(now.to_rfc3339()),
            );
            match self
                .registry
                .repo(EntityKind::Contact)?
                .update(&payload.entity_id, patch)
                .await
            {
                Ok(_) | Err(StoreError::NotFound { .. }) => {}
                Err(other) => return Err(other.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
