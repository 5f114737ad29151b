//! Generic persistence seam for domain entities.
//!
//! Workspaces, snapshots, suggestions and the rest of the domain live
//! behind a narrow per-entity store interface; the coordinator never
//! depends on a specific persistence technology. `get` distinguishes
//! [`crate::Error::NotFound`] from other failures so callers can choose
//! create-vs-update semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// A domain entity with a stable string identity.
pub trait Entity: Clone + Send + Sync {
    /// The entity's stable identifier.
    fn id(&self) -> &str;
}

/// Narrow per-entity persistence interface.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Persist a new entity.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` if an entity with the same ID already exists.
    async fn create(&self, entity: T) -> Result<()>;

    /// Fetch an entity by ID.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if no entity has this ID - distinct from any
    /// other failure.
    async fn get(&self, id: &str) -> Result<T>;

    /// Replace an existing entity.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the entity does not exist.
    async fn update(&self, entity: T) -> Result<()>;

    /// List all entities.
    async fn list(&self) -> Result<Vec<T>>;
}

/// In-memory store for tests and embedded single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<T: Entity + 'static> EntityStore<T> for MemoryStore<T> {
    async fn create(&self, entity: T) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(entity.id()) {
            return Err(Error::Conflict(format!("entity '{}'", entity.id())));
        }
        entries.insert(entity.id().to_string(), entity);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<T> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("entity '{id}'")))
    }

    async fn update(&self, entity: T) -> Result<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(entity.id()) {
            return Err(Error::NotFound(format!("entity '{}'", entity.id())));
        }
        entries.insert(entity.id().to_string(), entity);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<T>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
