// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Trigger event handling
//!
//! One `handle_trigger_event` call processes one delivered queue job. The
//! pipeline per rule is: idempotency claim, permission re-check, entity
//! snapshot, condition evaluation, action chain, audit row. Rules are
//! independent: a failing rule writes its `failed` row and the loop moves on.
//! Only infrastructure errors escape, so the broker redelivers the whole
//! event; every rule already processed holds its idempotency claim and will
//! not run twice.

use crate::error::EngineError;
use crate::executor::ActionExecutor;
use crate::permission::{check_creator, PermissionCheck};
use crate::{jobs, queues};
use loam_adapters::{
    AuditStore, EntityRegistry, IdempotencyStore, JobOptions, JobQueue, RuleStore, StoreError,
    UserDirectory,
};
use loam_core::{
    matches_conditions, AutomationLog, AutomationRule, Clock, Entity, TriggerEvent,
    SYSTEM_AUTOMATION_ID,
};
use std::sync::Arc;

/// How long an execution claim blocks duplicate deliveries
const IDEMPOTENCY_TTL_SECONDS: i64 = 3600;

/// The automation engine: consumes trigger events, runs matching rules
pub struct AutomationEngine<C: Clock> {
    rules: Arc<dyn RuleStore>,
    registry: EntityRegistry,
    audit: Arc<dyn AuditStore>,
    users: Arc<dyn UserDirectory>,
    idempotency: Arc<dyn IdempotencyStore>,
    queue: Arc<dyn JobQueue>,
    executor: ActionExecutor<C>,
    clock: C,
}

impl<C: Clock> AutomationEngine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<dyn RuleStore>,
        registry: EntityRegistry,
        audit: Arc<dyn AuditStore>,
        users: Arc<dyn UserDirectory>,
        idempotency: Arc<dyn IdempotencyStore>,
        queue: Arc<dyn JobQueue>,
        clock: C,
    ) -> Self {
        let executor = ActionExecutor::new(registry.clone(), queue.clone(), clock.clone());
        Self {
            rules,
            registry,
            audit,
            users,
            idempotency,
            queue,
            executor,
            clock,
        }
    }

    /// Process one delivered trigger event
    ///
    /// `job_id` is the broker's delivery id; it scopes the idempotency keys
    /// so redeliveries of the same job collapse while genuinely new events
    /// for the same entity do not.
    pub async fn handle_trigger_event(
        &self,
        event: &TriggerEvent,
        job_id: &str,
    ) -> Result<(), EngineError> {
        if event.depth_exceeded() {
            tracing::warn!(
                trigger = %event.trigger,
                entity = %event.entity_id,
                depth = event.depth,
                "automation depth limit reached, skipping event"
            );
            self.audit
                .append(AutomationLog::skipped(
                    SYSTEM_AUTOMATION_ID,
                    event.entity_kind,
                    &event.entity_id,
                    format!("automation depth limit reached at depth {}", event.depth),
                    self.clock.now(),
                ))
                .await?;
            return Ok(());
        }

        let rules = self.rules.find_active_by_trigger(event.trigger).await?;
        tracing::debug!(
            trigger = %event.trigger,
            entity = %event.entity_id,
            rules = rules.len(),
            "evaluating trigger event"
        );

        for rule in &rules {
            self.run_rule(rule, event, job_id).await?;
        }
        Ok(())
    }

    /// Run one rule against the event; only infrastructure errors escape
    async fn run_rule(
        &self,
        rule: &AutomationRule,
        event: &TriggerEvent,
        job_id: &str,
    ) -> Result<(), EngineError> {
        let key = format!(
            "automation:exec:{}:{}:{}",
            rule.id, event.entity_id, job_id
        );
        if !self.idempotency.claim(&key, IDEMPOTENCY_TTL_SECONDS).await? {
            // Duplicate delivery: already ran (or is running) elsewhere.
            // Deliberately no audit row, the first delivery wrote one.
            tracing::debug!(rule = %rule.id, key = %key, "duplicate delivery, skipping");
            return Ok(());
        }

        match check_creator(self.users.as_ref(), rule, event.entity_kind).await? {
            PermissionCheck::Granted => {}
            PermissionCheck::Denied(reason) => {
                tracing::info!(rule = %rule.id, reason = %reason, "permission denied, skipping rule");
                self.audit
                    .append(AutomationLog::skipped(
                        &rule.id,
                        event.entity_kind,
                        &event.entity_id,
                        reason,
                        self.clock.now(),
                    ))
                    .await?;
                return Ok(());
            }
        }

        // Snapshot read once per rule; actions within the rule see it
        // unchanged even after an update_field
        let entity = match self.fetch_entity(event).await? {
            Some(entity) => entity,
            None => {
                tracing::debug!(
                    rule = %rule.id,
                    entity = %event.entity_id,
                    "entity vanished before evaluation, skipping rule"
                );
                return Ok(());
            }
        };

        let conditions = match rule.conditions() {
            Ok(conditions) => conditions,
            Err(error) => {
                self.fail_rule(rule, event, format!("invalid conditions: {error}"))
                    .await?;
                return Ok(());
            }
        };
        if !matches_conditions(&entity, &conditions) {
            tracing::debug!(rule = %rule.id, entity = %event.entity_id, "conditions not met");
            return Ok(());
        }

        let actions = match rule.actions() {
            Ok(actions) => actions,
            Err(error) => {
                self.fail_rule(rule, event, format!("invalid actions: {error}"))
                    .await?;
                return Ok(());
            }
        };

        for action in &actions {
            match self.executor.execute(rule, action, &entity, event).await {
                Ok(Some(followup)) => {
                    // The mutation is already committed, so the re-trigger is
                    // enqueued right away: a later failing action in this
                    // chain must not suppress it
                    self.queue
                        .enqueue(
                            queues::AUTOMATION,
                            jobs::EVALUATE_TRIGGER,
                            serde_json::to_value(&followup)?,
                            JobOptions::default(),
                        )
                        .await?;
                }
                Ok(None) => {}
                Err(error) => {
                    self.fail_rule(rule, event, format!("{}: {error}", action.name()))
                        .await?;
                    return Ok(());
                }
            }
        }

        self.audit
            .append(AutomationLog::success(
                &rule.id,
                event.entity_kind,
                &event.entity_id,
                self.clock.now(),
            ))
            .await?;
        self.rules
            .increment_run_stats(&rule.id, self.clock.now())
            .await?;
        Ok(())
    }

    /// Fetch the triggering entity; `Ok(None)` means it vanished
    async fn fetch_entity(&self, event: &TriggerEvent) -> Result<Option<Entity>, EngineError> {
        let repo = self.registry.repo(event.entity_kind)?;
        match repo.get(&event.entity_id).await {
            Ok(snapshot) => Ok(snapshot),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    async fn fail_rule(
        &self,
        rule: &AutomationRule,
        event: &TriggerEvent,
        error: String,
    ) -> Result<(), EngineError> {
        tracing::warn!(rule = %rule.id, entity = %event.entity_id, error = %error, "rule failed");
        self.audit
            .append(AutomationLog::failed(
                &rule.id,
                event.entity_kind,
                &event.entity_id,
                error,
                self.clock.now(),
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
