// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

use super::*;
use chrono::{TimeZone, Utc};
use loam_adapters::{
    MemoryAuditStore, MemoryIdempotencyStore, MemoryJobQueue, MemoryRuleStore,
    MemoryUserDirectory,
};
use loam_core::{
    EntityKind, FakeClock, LogStatus, Role, SequentialIdGen, Trigger, MAX_AUTOMATION_DEPTH,
};
use serde_json::{json, Value};

struct Harness {
    engine: AutomationEngine<FakeClock>,
    rules: Arc<MemoryRuleStore>,
    registry: EntityRegistry,
    audit: Arc<MemoryAuditStore>,
    users: Arc<MemoryUserDirectory>,
    queue: Arc<MemoryJobQueue<FakeClock>>,
}

fn harness() -> Harness {
    harness_with_registry(EntityRegistry::in_memory(Arc::new(SequentialIdGen::new("e"))))
}

fn harness_with_registry(registry: EntityRegistry) -> Harness {
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    let rules = Arc::new(MemoryRuleStore::new());
    let audit = Arc::new(MemoryAuditStore::new());
    let users = Arc::new(MemoryUserDirectory::new());
    let idempotency = Arc::new(MemoryIdempotencyStore::new(clock.clone()));
    let queue = Arc::new(MemoryJobQueue::new(clock.clone()));

    let engine = AutomationEngine::new(
        rules.clone(),
        registry.clone(),
        audit.clone(),
        users.clone(),
        idempotency,
        queue.clone(),
        clock,
    );
    Harness {
        engine,
        rules,
        registry,
        audit,
        users,
        queue,
    }
}

fn rule(id: &str, conditions: Value, actions: Value) -> AutomationRule {
    AutomationRule {
        id: id.to_string(),
        name: format!("rule {}", id),
        trigger: Trigger::DealStageChanged,
        is_active: true,
        conditions,
        actions,
        created_by: None,
        run_count: 0,
        last_run_at: None,
    }
}

async fn seed_deal(h: &Harness, id: &str, stage: &str) {
    let mut deal = Entity::new();
    deal.insert("id".to_string(), json!(id));
    deal.insert("name".to_string(), json!("Acme"));
    deal.insert("owner_id".to_string(), json!("u-9"));
    deal.insert("stage".to_string(), json!(stage));
    h.registry
        .repo(EntityKind::Deal)
        .unwrap()
        .create(deal)
        .await
        .unwrap();
}

fn event(id: &str) -> TriggerEvent {
    TriggerEvent::new(Trigger::DealStageChanged, EntityKind::Deal, id)
}

fn notify_action() -> Value {
    json!([{
        "kind": "send_notification",
        "config": {"title": "Deal {{name}} moved"}
    }])
}

#[tokio::test]
async fn matching_rule_runs_and_audits_success() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-1",
        json!({"version": 1, "data": [{"field": "stage", "operator": "equals", "value": "won"}]}),
        notify_action(),
    ));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, LogStatus::Success);
    assert_eq!(entries[0].automation_id, "a-1");
    assert_eq!(h.queue.accepted(queues::NOTIFICATION).len(), 1);

    let updated = h.rules.get("a-1").unwrap();
    assert_eq!(updated.run_count, 1);
    assert!(updated.last_run_at.is_some());
}

#[tokio::test]
async fn non_matching_conditions_leave_no_trace() {
    let h = harness();
    seed_deal(&h, "d-1", "open").await;
    h.rules.insert(rule(
        "a-1",
        json!([{"field": "stage", "operator": "equals", "value": "won"}]),
        notify_action(),
    ));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    assert!(h.audit.entries().is_empty());
    assert!(h.queue.accepted(queues::NOTIFICATION).is_empty());
    assert_eq!(h.rules.get("a-1").unwrap().run_count, 0);
}

#[tokio::test]
async fn depth_limit_writes_one_system_skip_row() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule("a-1", json!([]), notify_action()));

    let mut deep = event("d-1");
    deep.depth = MAX_AUTOMATION_DEPTH;
    h.engine.handle_trigger_event(&deep, "job-1").await.unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, LogStatus::Skipped);
    assert_eq!(entries[0].automation_id, SYSTEM_AUTOMATION_ID);
    assert!(h.queue.accepted(queues::NOTIFICATION).is_empty());
}

#[tokio::test]
async fn redelivery_of_the_same_job_is_collapsed() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule("a-1", json!([]), notify_action()));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();
    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    // One success row, one notification; the duplicate leaves no row at all
    assert_eq!(h.audit.entries().len(), 1);
    assert_eq!(h.rules.get("a-1").unwrap().run_count, 1);
}

#[tokio::test]
async fn a_new_event_for_the_same_entity_runs_again() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule("a-1", json!([]), notify_action()));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();
    h.engine.handle_trigger_event(&event("d-1"), "job-2").await.unwrap();

    assert_eq!(h.audit.entries().len(), 2);
    assert_eq!(h.rules.get("a-1").unwrap().run_count, 2);
}

#[tokio::test]
async fn revoked_creator_permission_skips_with_audit_row() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.users.set_role("u-1", Role::Viewer);
    let mut denied = rule("a-1", json!([]), notify_action());
    denied.created_by = Some("u-1".to_string());
    h.rules.insert(denied);

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, LogStatus::Skipped);
    assert_eq!(entries[0].automation_id, "a-1");
    assert!(h.queue.accepted(queues::NOTIFICATION).is_empty());
    assert_eq!(h.rules.get("a-1").unwrap().run_count, 0);
}

#[tokio::test]
async fn vanished_entity_is_skipped_silently() {
    let h = harness();
    h.rules.insert(rule("a-1", json!([]), notify_action()));

    h.engine.handle_trigger_event(&event("d-404"), "job-1").await.unwrap();

    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn unsupported_payload_version_fails_only_that_rule() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-bad",
        json!({"version": 2, "data": []}),
        notify_action(),
    ));
    h.rules.insert(rule("a-good", json!([]), notify_action()));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].automation_id, "a-bad");
    assert_eq!(entries[0].status, LogStatus::Failed);
    assert!(entries[0].error.as_deref().unwrap().contains("version 2"));
    assert_eq!(entries[1].automation_id, "a-good");
    assert_eq!(entries[1].status, LogStatus::Success);
}

#[tokio::test]
async fn failing_action_audits_failure_and_spares_siblings() {
    // Only deals registered: create_task will fail at the repository
    let registry = EntityRegistry::new().register(
        EntityKind::Deal,
        Arc::new(loam_adapters::MemoryRepository::new(
            EntityKind::Deal,
            Arc::new(SequentialIdGen::new("d")),
        )),
    );
    let h = harness_with_registry(registry);
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-fail",
        json!([]),
        json!([{"kind": "create_task", "config": {"title": "t"}}]),
    ));
    h.rules.insert(rule("a-ok", json!([]), notify_action()));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, LogStatus::Failed);
    assert!(entries[0].error.as_deref().unwrap().contains("create_task"));
    assert_eq!(entries[1].status, LogStatus::Success);
}

#[tokio::test]
async fn update_field_enqueues_a_deeper_followup_event() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-1",
        json!([]),
        json!([{"kind": "update_field", "config": {"field": "priority", "value": "high"}}]),
    ));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let accepted = h.queue.accepted(queues::AUTOMATION);
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].0, jobs::EVALUATE_TRIGGER);
    let followup: TriggerEvent = serde_json::from_value(accepted[0].1.clone()).unwrap();
    assert_eq!(followup.trigger, Trigger::DealUpdated);
    assert_eq!(followup.depth, 1);
    assert_eq!(followup.entity_id, "d-1");
}

#[tokio::test]
async fn followup_survives_a_later_failing_action() {
    // Only deals registered: the create_task after the mutation fails
    let registry = EntityRegistry::new().register(
        EntityKind::Deal,
        Arc::new(loam_adapters::MemoryRepository::new(
            EntityKind::Deal,
            Arc::new(SequentialIdGen::new("d")),
        )),
    );
    let h = harness_with_registry(registry);
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-1",
        json!([]),
        json!([
            {"kind": "update_field", "config": {"field": "priority", "value": "high"}},
            {"kind": "create_task", "config": {"title": "t"}}
        ]),
    ));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    // The mutation persisted and the rule failed on the second action
    let deal = h
        .registry
        .repo(EntityKind::Deal)
        .unwrap()
        .get("d-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deal["priority"], json!("high"));
    assert_eq!(h.audit.entries()[0].status, LogStatus::Failed);

    // The committed mutation's re-trigger was still enqueued
    let accepted = h.queue.accepted(queues::AUTOMATION);
    assert_eq!(accepted.len(), 1);
    let followup: TriggerEvent = serde_json::from_value(accepted[0].1.clone()).unwrap();
    assert_eq!(followup.trigger, Trigger::DealUpdated);
    assert_eq!(followup.depth, 1);
}

#[tokio::test]
async fn actions_see_the_snapshot_read_before_the_rule_ran() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    h.rules.insert(rule(
        "a-1",
        json!([]),
        json!([
            {"kind": "update_field", "config": {"field": "stage", "value": "closed"}},
            {"kind": "send_notification", "config": {"title": "was {{stage}}"}}
        ]),
    ));

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    let accepted = h.queue.accepted(queues::NOTIFICATION);
    assert_eq!(accepted.len(), 1);
    // The notification interpolates the pre-mutation snapshot
    assert_eq!(accepted[0].1["title"], json!("was won"));
}

#[tokio::test]
async fn inactive_rules_never_run() {
    let h = harness();
    seed_deal(&h, "d-1", "won").await;
    let mut dormant = rule("a-1", json!([]), notify_action());
    dormant.is_active = false;
    h.rules.insert(dormant);

    h.engine.handle_trigger_event(&event("d-1"), "job-1").await.unwrap();

    assert!(h.audit.entries().is_empty());
}
