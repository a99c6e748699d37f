// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Traced adapter wrappers for consistent observability

use crate::queue::{ClaimedJob, JobOptions, JobQueue, QueueError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;

/// Wrapper that adds tracing to any JobQueue
#[derive(Clone)]
pub struct TracedJobQueue<Q> {
    inner: Q,
}

impl<Q> TracedJobQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Q: JobQueue> JobQueue for TracedJobQueue<Q> {
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: Value,
        options: JobOptions,
    ) -> Result<(), QueueError> {
        let span = tracing::info_span!(
            "queue.enqueue",
            queue,
            job = name,
            job_id = ?options.job_id,
            delayed = options.delay.is_some(),
        );
        let result = self
            .inner
            .enqueue(queue, name, payload, options)
            .instrument(span)
            .await;

        match &result {
            Ok(()) => tracing::debug!(queue, job = name, "enqueued"),
            Err(e) => tracing::error!(queue, job = name, error = %e, "enqueue failed"),
        }

        result
    }

    async fn claim(&self, queue: &str) -> Result<Option<ClaimedJob>, QueueError> {
        let result = self.inner.claim(queue).await;
        if let Ok(Some(job)) = &result {
            tracing::debug!(queue, job_id = %job.job_id, attempt = job.attempt, "claimed");
        }
        result
    }

    async fn complete(&self, queue: &str, job_id: &str) -> Result<(), QueueError> {
        let result = self.inner.complete(queue, job_id).await;
        match &result {
            Ok(()) => tracing::debug!(queue, job_id, "completed"),
            Err(e) => tracing::error!(queue, job_id, error = %e, "complete failed"),
        }
        result
    }

    async fn fail(&self, queue: &str, job_id: &str, reason: &str) -> Result<(), QueueError> {
        let result = self.inner.fail(queue, job_id, reason).await;
        match &result {
            Ok(()) => tracing::debug!(queue, job_id, reason, "failed job returned to broker"),
            Err(e) => tracing::error!(queue, job_id, error = %e, "fail reporting failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
