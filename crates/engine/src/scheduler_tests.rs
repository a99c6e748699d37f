// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

use super::*;
use chrono::{TimeZone, Utc};
use loam_adapters::MemoryJobQueue;
use loam_core::FakeClock;

fn clock() -> FakeClock {
    FakeClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
}

#[test]
fn interval_jobs_fire_one_interval_after_registration() {
    let clock = clock();
    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register(RecurringJob::new(
        "scan",
        "maintenance",
        Schedule::Every(Duration::minutes(30)),
    ));

    assert!(scheduler.due_jobs().is_empty());
    clock.advance(Duration::minutes(29));
    assert!(scheduler.due_jobs().is_empty());
    clock.advance(Duration::minutes(1));
    assert_eq!(scheduler.due_jobs().len(), 1);
    // Fired once, next window rearmed
    assert!(scheduler.due_jobs().is_empty());
}

#[test]
fn a_long_sleep_fires_once_not_per_missed_window() {
    let clock = clock();
    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register(RecurringJob::new(
        "scan",
        "maintenance",
        Schedule::Every(Duration::minutes(30)),
    ));

    clock.advance(Duration::hours(6));
    assert_eq!(scheduler.due_jobs().len(), 1);
    assert!(scheduler.due_jobs().is_empty());
    assert_eq!(scheduler.run_count("scan"), Some(1));
}

#[test]
fn daily_jobs_fire_at_the_wall_clock_time() {
    let clock = clock(); // 12:00 UTC
    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register(RecurringJob::new(
        "snapshot",
        "maintenance",
        Schedule::DailyAt { hour: 2, minute: 0 },
    ));

    // 02:00 already passed today; next fire is tomorrow
    let next = scheduler.next_run("snapshot").unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap());

    clock.advance(Duration::hours(13));
    assert!(scheduler.due_jobs().is_empty());
    clock.advance(Duration::hours(1));
    assert_eq!(scheduler.due_jobs().len(), 1);
}

#[test]
fn daily_jobs_later_today_fire_today() {
    let clock = clock(); // 12:00 UTC
    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register(RecurringJob::new(
        "morning",
        "maintenance",
        Schedule::DailyAt { hour: 14, minute: 30 },
    ));

    let next = scheduler.next_run("morning").unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap());
}

#[test]
fn re_registration_keeps_run_state() {
    let clock = clock();
    let scheduler = RecurringScheduler::new(clock.clone());
    let job = || RecurringJob::new("scan", "maintenance", Schedule::Every(Duration::minutes(30)));

    scheduler.register(job());
    clock.advance(Duration::minutes(30));
    assert_eq!(scheduler.due_jobs().len(), 1);

    let next_before = scheduler.next_run("scan").unwrap();
    scheduler.register(job());
    assert_eq!(scheduler.next_run("scan").unwrap(), next_before);
    assert_eq!(scheduler.run_count("scan"), Some(1));
}

#[test]
fn changing_the_schedule_rearms_the_job() {
    let clock = clock();
    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register(RecurringJob::new(
        "scan",
        "maintenance",
        Schedule::Every(Duration::hours(2)),
    ));
    scheduler.register(RecurringJob::new(
        "scan",
        "maintenance",
        Schedule::Every(Duration::minutes(10)),
    ));

    clock.advance(Duration::minutes(10));
    assert_eq!(scheduler.due_jobs().len(), 1);
}

#[test]
fn standard_jobs_register_idempotently() {
    let scheduler = RecurringScheduler::new(clock());
    scheduler.register_recurring_jobs();
    scheduler.register_recurring_jobs();

    for name in [
        jobs::REFRESH_PIPELINE_STATS,
        jobs::DAILY_PIPELINE_SNAPSHOT,
        jobs::CHECK_OVERDUE_TASKS,
        jobs::CHECK_STALE_DEALS,
    ] {
        assert!(scheduler.next_run(name).is_some(), "{name} not registered");
    }
}

#[tokio::test]
async fn tick_enqueues_due_jobs() {
    let clock = clock();
    let scheduler = RecurringScheduler::new(clock.clone());
    let queue = MemoryJobQueue::new(clock.clone());
    scheduler.register_recurring_jobs();

    assert_eq!(scheduler.tick(&queue).await.unwrap(), 0);
    clock.advance(Duration::minutes(30));
    assert_eq!(scheduler.tick(&queue).await.unwrap(), 1);

    let accepted = queue.accepted(queues::MAINTENANCE);
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].0, jobs::CHECK_OVERDUE_TASKS);
}
