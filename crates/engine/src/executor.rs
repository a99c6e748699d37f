// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Action execution
//!
//! Actions run sequentially in stored order against the entity snapshot read
//! once at the start of the rule. `create_task` writes through the entity
//! registry; `send_email` and `send_notification` only enqueue delivery jobs,
//! the side effect happens in the delivery consumers; `update_field` patches
//! the entity and hands back the follow-up event that re-enters the engine at
//! `depth + 1`.

use crate::{jobs, queues};
use loam_adapters::{EntityRegistry, JobOptions, JobQueue, QueueError, StoreError};
use loam_core::entity::field;
use loam_core::{
    interpolate, Action, AutomationRule, Clock, Entity, EntityKind, TriggerEvent,
    SYSTEM_AUTOMATION_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// A single action's failure; recorded in the rule's `failed` audit row
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("payload encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Payload of a `send-email` delivery job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub automation_id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
}

/// Payload of a `send-notification` delivery job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Executes one action on behalf of a rule
pub struct ActionExecutor<C: Clock> {
    registry: EntityRegistry,
    queue: Arc<dyn JobQueue>,
    clock: C,
}

impl<C: Clock> ActionExecutor<C> {
    pub fn new(registry: EntityRegistry, queue: Arc<dyn JobQueue>, clock: C) -> Self {
        Self {
            registry,
            queue,
            clock,
        }
    }

    /// Run one action; `Some(event)` is the `update_field` re-trigger
    pub async fn execute(
        &self,
        rule: &AutomationRule,
        action: &Action,
        entity: &Entity,
        event: &TriggerEvent,
    ) -> Result<Option<TriggerEvent>, ExecuteError> {
        let started = Instant::now();
        let result = match action {
            Action::CreateTask {
                title,
                assignee_id,
                due_days,
            } => {
                self.create_task(rule, entity, event, title, assignee_id.as_deref(), *due_days)
                    .await
            }
            Action::SendEmail { to, subject, body } => {
                self.send_email(rule, entity, event, to, subject, body).await
            }
            Action::SendNotification {
                user_id,
                title,
                body,
            } => {
                self.send_notification(rule, entity, event, user_id.as_deref(), title, body)
                    .await
            }
            Action::UpdateField { field, value } => {
                self.update_field(entity, event, field, value).await
            }
        };

        match &result {
            Ok(_) => tracing::info!(
                rule = %rule.id,
                action = action.name(),
                entity = %event.entity_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "action executed"
            ),
            Err(error) => tracing::error!(
                rule = %rule.id,
                action = action.name(),
                entity = %event.entity_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                %error,
                "action failed"
            ),
        }
        result
    }

    async fn create_task(
        &self,
        rule: &AutomationRule,
        entity: &Entity,
        event: &TriggerEvent,
        title: &str,
        assignee_id: Option<&str>,
        due_days: Option<i64>,
    ) -> Result<Option<TriggerEvent>, ExecuteError> {
        let now = self.clock.now();
        let mut task = Entity::new();
        task.insert("title".to_string(), Value::String(interpolate(title, entity)));
        task.insert("status".to_string(), Value::String("pending".to_string()));
        task.insert("is_automated".to_string(), Value::Bool(true));
        task.insert(
            "creator_id".to_string(),
            Value::String(
                rule.created_by
                    .clone()
                    .unwrap_or_else(|| SYSTEM_AUTOMATION_ID.to_string()),
            ),
        );
        task.insert("created_at".to_string(), Value::String(now.to_rfc3339()));

        // Assignment falls back to the triggering entity's owner
        let assignee = assignee_id
            .map(str::to_string)
            .or_else(|| field(entity, "owner_id").as_str().map(str::to_string));
        if let Some(assignee) = assignee {
            task.insert("assignee_id".to_string(), Value::String(assignee));
        }

        if let Some(days) = due_days {
            let due = now + chrono::Duration::days(days);
            task.insert("due_date".to_string(), Value::String(due.to_rfc3339()));
        }

        if event.entity_kind == EntityKind::Deal {
            task.insert(
                "deal_id".to_string(),
                Value::String(event.entity_id.clone()),
            );
        }

        self.registry.repo(EntityKind::Task)?.create(task).await?;
        Ok(None)
    }

    async fn send_email(
        &self,
        rule: &AutomationRule,
        entity: &Entity,
        event: &TriggerEvent,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<TriggerEvent>, ExecuteError> {
        let payload = EmailJob {
            to: interpolate(to, entity),
            subject: interpolate(subject, entity),
            body: interpolate(body, entity),
            automation_id: rule.id.clone(),
            entity_kind: event.entity_kind,
            entity_id: event.entity_id.clone(),
        };

        // One email per rule/entity/recipient per calendar day: the broker's
        // job-id dedup drops repeats within the same day silently
        let job_id = format!(
            "email:{}:{}:{}:{}",
            rule.id,
            event.entity_id,
            payload.to,
            self.clock.now().format("%Y-%m-%d")
        );

        self.queue
            .enqueue(
                queues::EMAIL,
                jobs::SEND_EMAIL,
                serde_json::to_value(&payload)?,
                JobOptions::with_job_id(job_id),
            )
            .await?;
        Ok(None)
    }

    async fn send_notification(
        &self,
        rule: &AutomationRule,
        entity: &Entity,
        event: &TriggerEvent,
        user_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> Result<Option<TriggerEvent>, ExecuteError> {
        let recipient = user_id
            .map(str::to_string)
            .or_else(|| field(entity, "owner_id").as_str().map(str::to_string));
        let Some(recipient) = recipient else {
            tracing::warn!(rule = %rule.id, entity = %event.entity_id, "notification has no recipient, skipping");
            return Ok(None);
        };

        let payload = NotificationJob {
            user_id: recipient,
            title: interpolate(title, entity),
            body: interpolate(body, entity),
        };

        // Time-unique job id: notifications are intentionally not
        // date-deduplicated, repeat triggers notify again
        let job_id = format!(
            "notification:{}:{}:{}",
            rule.id,
            event.entity_id,
            self.clock.now().timestamp_millis()
        );

        self.queue
            .enqueue(
                queues::NOTIFICATION,
                jobs::SEND_NOTIFICATION,
                serde_json::to_value(&payload)?,
                JobOptions::with_job_id(job_id),
            )
            .await?;
        Ok(None)
    }

    async fn update_field(
        &self,
        entity: &Entity,
        event: &TriggerEvent,
        field_name: &str,
        value: &Value,
    ) -> Result<Option<TriggerEvent>, ExecuteError> {
        let old = field(entity, field_name).clone();

        let mut patch = Entity::new();
        patch.insert(field_name.to_string(), value.clone());
        self.registry
            .repo(event.entity_kind)?
            .update(&event.entity_id, patch)
            .await?;

        // The sole re-entrancy point: mutating a field re-enters the engine
        // as an {ENTITYTYPE}_UPDATED event one level deeper
        Ok(event
            .entity_kind
            .updated_trigger()
            .map(|trigger| event.followup(trigger, field_name, old, value.clone())))
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
