// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Engine-level errors
//!
//! Only infrastructure failures become `EngineError`: a store or broker that
//! cannot be reached, or an event that cannot be re-encoded for the queue.
//! These propagate out of event handling so the broker redelivers with
//! backoff. Business outcomes (depth skips, permission denials, action
//! failures) are absorbed into audit rows and never surface here.

use loam_adapters::{QueueError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("event encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}
