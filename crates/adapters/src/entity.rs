// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Entity store access, dispatched per entity kind
//!
//! Repository selection is an explicit registry keyed by `EntityKind` rather
//! than a stringly-typed index into the ORM client, so an operation against
//! an unregistered kind is a typed error instead of a runtime surprise.

use async_trait::async_trait;
use loam_core::{Entity, EntityKind, IdGen};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by the store adapters
///
/// `Unavailable` marks infrastructure failure: the engine propagates it so
/// the broker redelivers the event.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no repository registered for entity kind {0}")]
    Unregistered(EntityKind),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },
}

/// CRUD surface for one entity kind
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Fetch a snapshot; `None` when the entity does not (or no longer) exist
    async fn get(&self, id: &str) -> Result<Option<Entity>, StoreError>;

    /// All stored entities of this kind, for scan jobs
    async fn list(&self) -> Result<Vec<Entity>, StoreError>;

    /// Insert a new entity, assigning an id when the data carries none
    async fn create(&self, data: Entity) -> Result<Entity, StoreError>;

    /// Shallow-merge a patch into an existing entity
    async fn update(&self, id: &str, patch: Entity) -> Result<Entity, StoreError>;
}

/// Typed dispatch table from entity kind to repository
#[derive(Clone, Default)]
pub struct EntityRegistry {
    repos: HashMap<EntityKind, Arc<dyn EntityRepository>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository for a kind, replacing any previous binding
    pub fn register(mut self, kind: EntityKind, repo: Arc<dyn EntityRepository>) -> Self {
        self.repos.insert(kind, repo);
        self
    }

    /// Look up the repository for a kind
    pub fn repo(&self, kind: EntityKind) -> Result<Arc<dyn EntityRepository>, StoreError> {
        self.repos
            .get(&kind)
            .cloned()
            .ok_or(StoreError::Unregistered(kind))
    }

    /// A registry with every kind backed by its own in-memory repository
    pub fn in_memory(id_gen: Arc<dyn IdGen>) -> Self {
        EntityKind::ALL.iter().fold(Self::new(), |registry, kind| {
            registry.register(*kind, Arc::new(MemoryRepository::new(*kind, id_gen.clone())))
        })
    }
}

/// In-memory repository for one entity kind
pub struct MemoryRepository {
    kind: EntityKind,
    rows: Mutex<HashMap<String, Entity>>,
    id_gen: Arc<dyn IdGen>,
}

impl MemoryRepository {
    pub fn new(kind: EntityKind, id_gen: Arc<dyn IdGen>) -> Self {
        Self {
            kind,
            rows: Mutex::new(HashMap::new()),
            id_gen,
        }
    }

    /// Insert a row directly, for seeding test state
    pub fn seed(&self, entity: Entity) -> String {
        let id = entity
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.id_gen.next());
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.insert(id.clone(), entity);
        id
    }

    /// All rows, for scan jobs and assertions
    pub fn all(&self) -> Vec<Entity> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.values().cloned().collect()
    }

    /// Remove a row, simulating deletion between trigger and processing
    pub fn remove(&self, id: &str) {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.remove(id);
    }
}

#[async_trait]
impl EntityRepository for MemoryRepository {
    async fn get(&self, id: &str) -> Result<Option<Entity>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Entity>, StoreError> {
        Ok(self.all())
    }

    async fn create(&self, mut data: Entity) -> Result<Entity, StoreError> {
        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.id_gen.next());
        data.insert("id".to_string(), serde_json::Value::String(id.clone()));

        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.insert(id, data.clone());
        Ok(data)
    }

    async fn update(&self, id: &str, patch: Entity) -> Result<Entity, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let row = rows.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: self.kind,
            id: id.to_string(),
        })?;
        for (key, value) in patch {
            row.insert(key, value);
        }
        Ok(row.clone())
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
