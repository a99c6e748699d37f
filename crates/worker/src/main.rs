// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Loam automation worker
//!
//! Background process that consumes trigger events, delivery jobs and
//! maintenance scans from the job queues. This binary wires the engine to
//! the in-memory adapters for single-process deployments; a production
//! deployment swaps in the database- and broker-backed implementations at
//! the same seams.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod consumer;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::consumer::{
    run_pool, EmailConsumer, EvaluateTriggerConsumer, MaintenanceConsumer,
    NotificationConsumer, RateGate,
};
use loam_adapters::{
    EntityRegistry, JobQueue, MemoryAuditStore, MemoryIdempotencyStore, MemoryJobQueue,
    MemoryRuleStore, MemoryUserDirectory, NoOpMailer, TracedJobQueue,
};
use loam_core::{IdGen, SystemClock, UuidIdGen};
use loam_engine::{AutomationEngine, RecurringScheduler, Scans};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file path as the only argument
    let args: Vec<String> = std::env::args().collect();
    let config = if args.len() > 1 {
        WorkerConfig::load(&PathBuf::from(&args[1]))?
    } else {
        WorkerConfig::default()
    };

    setup_logging(&config);
    info!("starting loam-worker");

    let clock = SystemClock;
    let id_gen: Arc<dyn IdGen> = Arc::new(UuidIdGen);
    let registry = EntityRegistry::in_memory(id_gen);
    let queue: Arc<dyn JobQueue> =
        Arc::new(TracedJobQueue::new(MemoryJobQueue::new(clock.clone())));
    let rules = Arc::new(MemoryRuleStore::new());
    let audit = Arc::new(MemoryAuditStore::new());
    let users = Arc::new(MemoryUserDirectory::new());
    let idempotency = Arc::new(MemoryIdempotencyStore::new(clock.clone()));

    let engine = Arc::new(AutomationEngine::new(
        rules,
        registry.clone(),
        audit,
        users,
        idempotency.clone(),
        queue.clone(),
        clock.clone(),
    ));
    let scans = Arc::new(
        Scans::new(
            registry.clone(),
            queue.clone(),
            idempotency,
            clock.clone(),
        )
        .with_stale_after_days(config.stale_after_days),
    );

    let scheduler = RecurringScheduler::new(clock.clone());
    scheduler.register_recurring_jobs();

    // Consumer pools
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();
    handles.extend(run_pool(
        queue.clone(),
        Arc::new(EvaluateTriggerConsumer::new(engine)),
        config.automation_concurrency,
        config.poll_interval,
        shutdown_rx.clone(),
    ));
    handles.extend(run_pool(
        queue.clone(),
        Arc::new(MaintenanceConsumer::new(scans)),
        1,
        config.poll_interval,
        shutdown_rx.clone(),
    ));
    handles.extend(run_pool(
        queue.clone(),
        Arc::new(NotificationConsumer::new(registry.clone(), clock.clone())),
        config.notification_concurrency,
        config.poll_interval,
        shutdown_rx.clone(),
    ));
    let gate = Arc::new(RateGate::per_second(config.email_rate_per_second));
    handles.extend(run_pool(
        queue.clone(),
        Arc::new(EmailConsumer::new(
            registry,
            Arc::new(NoOpMailer),
            gate,
            clock,
        )),
        config.email_concurrency,
        config.poll_interval,
        shutdown_rx,
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        automation = config.automation_concurrency,
        notification = config.notification_concurrency,
        email = config.email_concurrency,
        "loam-worker ready"
    );
    println!("READY");

    let mut tick = tokio::time::interval(config.scheduler_tick);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = scheduler.tick(queue.as_ref()).await {
                    error!("scheduler tick failed: {}", e);
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down...");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }
    info!("loam-worker stopped");
    Ok(())
}

fn setup_logging(config: &WorkerConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fallback = config.log_filter.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
