//! Named provider registry.
//!
//! Pluggable providers (repo path resolvers, integration backends) are
//! registered by name at process start and resolved by name afterwards.
//! The registry is an explicit object constructed once and passed by
//! reference to whatever needs lookup - no global mutable state.

use std::{collections::HashMap, sync::Arc};

use crate::{Error, Result};

/// Registry of named providers of type `T`.
pub struct Registry<T: ?Sized> {
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a provider under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if the name is already taken - duplicate
    /// registrations at startup are configuration bugs, not overrides.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<T>) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::Conflict(format!(
                "provider '{name}' is already registered"
            )));
        }
        self.entries.insert(name, provider);
        Ok(())
    }

    /// Resolve a provider by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no provider was registered under
    /// `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<T>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("provider '{name}'")))
    }

    /// Names of all registered providers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
