// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

use super::*;
use chrono::{Duration, TimeZone};
use loam_adapters::{MemoryIdempotencyStore, MemoryJobQueue};
use loam_core::{FakeClock, SequentialIdGen};

struct Harness {
    scans: Scans<FakeClock>,
    registry: EntityRegistry,
    queue: Arc<MemoryJobQueue<FakeClock>>,
    clock: FakeClock,
}

fn harness() -> Harness {
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    let registry = EntityRegistry::in_memory(Arc::new(SequentialIdGen::new("e")));
    let queue = Arc::new(MemoryJobQueue::new(clock.clone()));
    let idempotency = Arc::new(MemoryIdempotencyStore::new(clock.clone()));
    let scans = Scans::new(
        registry.clone(),
        queue.clone() as Arc<dyn JobQueue>,
        idempotency,
        clock.clone(),
    );
    Harness {
        scans,
        registry,
        queue,
        clock,
    }
}

async fn seed_task(h: &Harness, id: &str, status: &str, due: Option<DateTime<Utc>>) {
    let mut task = Entity::new();
    task.insert("id".to_string(), json!(id));
    task.insert("title".to_string(), json!(format!("task {id}")));
    task.insert("status".to_string(), json!(status));
    task.insert("assignee_id".to_string(), json!("u-1"));
    if let Some(due) = due {
        task.insert("due_date".to_string(), json!(due.to_rfc3339()));
    }
    h.registry
        .repo(EntityKind::Task)
        .unwrap()
        .create(task)
        .await
        .unwrap();
}

async fn seed_deal(h: &Harness, id: &str, status: &str, stage: &str, value: f64, last_activity: DateTime<Utc>) {
    let mut deal = Entity::new();
    deal.insert("id".to_string(), json!(id));
    deal.insert("status".to_string(), json!(status));
    deal.insert("stage".to_string(), json!(stage));
    deal.insert("value".to_string(), json!(value));
    deal.insert(
        "last_activity_at".to_string(),
        json!(last_activity.to_rfc3339()),
    );
    h.registry
        .repo(EntityKind::Deal)
        .unwrap()
        .create(deal)
        .await
        .unwrap();
}

#[tokio::test]
async fn overdue_scan_notifies_only_open_overdue_tasks() {
    let h = harness();
    let now = h.clock.now();
    seed_task(&h, "t-late", "pending", Some(now - Duration::days(1))).await;
    seed_task(&h, "t-future", "pending", Some(now + Duration::days(1))).await;
    seed_task(&h, "t-done", "completed", Some(now - Duration::days(3))).await;
    seed_task(&h, "t-undated", "pending", None).await;

    let notified = h.scans.check_overdue_tasks().await.unwrap();
    assert_eq!(notified, 1);

    let accepted = h.queue.accepted(queues::NOTIFICATION);
    assert_eq!(accepted.len(), 1);
    let job: NotificationJob = serde_json::from_value(accepted[0].1.clone()).unwrap();
    assert_eq!(job.user_id, "u-1");
    assert!(job.title.contains("task t-late"));
}

#[tokio::test]
async fn overdue_scan_reminds_once_per_day() {
    let h = harness();
    let now = h.clock.now();
    seed_task(&h, "t-late", "pending", Some(now - Duration::days(1))).await;

    assert_eq!(h.scans.check_overdue_tasks().await.unwrap(), 1);
    // Rerun within the same day: dedup claim blocks the repeat
    assert_eq!(h.scans.check_overdue_tasks().await.unwrap(), 0);

    h.clock.advance(Duration::days(1));
    assert_eq!(h.scans.check_overdue_tasks().await.unwrap(), 1);
}

#[tokio::test]
async fn stale_scan_emits_depth_zero_events_for_idle_open_deals() {
    let h = harness();
    let now = h.clock.now();
    seed_deal(&h, "d-stale", "open", "proposal", 100.0, now - Duration::days(40)).await;
    seed_deal(&h, "d-active", "open", "proposal", 100.0, now - Duration::days(2)).await;
    seed_deal(&h, "d-won", "won", "closed", 100.0, now - Duration::days(90)).await;

    let flagged = h.scans.check_stale_deals().await.unwrap();
    assert_eq!(flagged, 1);

    let accepted = h.queue.accepted(queues::AUTOMATION);
    assert_eq!(accepted.len(), 1);
    let event: TriggerEvent = serde_json::from_value(accepted[0].1.clone()).unwrap();
    assert_eq!(event.trigger, Trigger::DealStale);
    assert_eq!(event.entity_id, "d-stale");
    assert_eq!(event.depth, 0);
}

#[tokio::test]
async fn stale_scan_reruns_do_not_double_fire_same_day() {
    let h = harness();
    let now = h.clock.now();
    seed_deal(&h, "d-stale", "open", "proposal", 100.0, now - Duration::days(40)).await;

    h.scans.check_stale_deals().await.unwrap();
    h.scans.check_stale_deals().await.unwrap();

    // Second enqueue carries the same job id and is dropped by the broker
    assert_eq!(h.queue.accepted(queues::AUTOMATION).len(), 1);
}

#[tokio::test]
async fn pipeline_stats_aggregate_open_deals_per_stage() {
    let h = harness();
    let now = h.clock.now();
    seed_deal(&h, "d-1", "open", "proposal", 100.0, now).await;
    seed_deal(&h, "d-2", "open", "proposal", 250.0, now).await;
    seed_deal(&h, "d-3", "open", "negotiation", 1000.0, now).await;
    seed_deal(&h, "d-4", "lost", "negotiation", 400.0, now).await;

    h.scans.refresh_pipeline_stats().await.unwrap();

    let row = h
        .registry
        .repo(EntityKind::Activity)
        .unwrap()
        .get("pipeline-stats-current")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["type"], json!("pipeline_stats"));
    assert_eq!(row["stages"]["proposal"], json!({"count": 2, "value": 350.0}));
    assert_eq!(row["stages"]["negotiation"], json!({"count": 1, "value": 1000.0}));
}

#[tokio::test]
async fn daily_snapshot_is_keyed_by_date() {
    let h = harness();
    let now = h.clock.now();
    seed_deal(&h, "d-1", "open", "proposal", 100.0, now).await;

    h.scans.daily_pipeline_snapshot().await.unwrap();

    let row = h
        .registry
        .repo(EntityKind::Activity)
        .unwrap()
        .get("pipeline-snapshot-2026-03-01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["snapshot_date"], json!("2026-03-01"));
    assert_eq!(row["stages"]["proposal"]["count"], json!(1));
}
