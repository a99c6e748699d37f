// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! TTL-keyed idempotency claims
//!
//! The claim is a distributed "set-if-not-exists with expiry": the first
//! caller to claim a key wins, everyone else loses until the TTL lapses.
//! Expiry is the only release mechanism; there is no explicit unlock. Because
//! the engine runs as multiple parallel worker processes, correctness must
//! come from this external store, never from a process-local cache.

use crate::entity::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loam_core::Clock;
use std::collections::HashMap;
use std::sync::Mutex;

/// Atomic first-writer-wins claim with expiry
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns true iff this call created the entry
    async fn claim(&self, key: &str, ttl_seconds: i64) -> Result<bool, StoreError>;
}

/// In-memory idempotency store driven by a clock
pub struct MemoryIdempotencyStore<C: Clock> {
    deadlines: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: C,
}

impl<C: Clock> MemoryIdempotencyStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            deadlines: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> IdempotencyStore for MemoryIdempotencyStore<C> {
    async fn claim(&self, key: &str, ttl_seconds: i64) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut deadlines = self.deadlines.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(deadline) = deadlines.get(key) {
            if *deadline > now {
                return Ok(false);
            }
        }
        deadlines.insert(key.to_string(), now + Duration::seconds(ttl_seconds));
        Ok(true)
    }
}
