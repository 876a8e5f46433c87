//! Directory of intents keyed by fully-qualified name

use std::collections::HashMap;
use std::sync::Arc;

use super::Intent;
use crate::{Error, Result};

/// Registry of every intent known to a router
///
/// Used for uniqueness checking at registration time and for introspection;
/// arbitration works on predictions directly.
#[derive(Debug, Default)]
pub struct IntentRegistry {
    intents: HashMap<String, Arc<Intent>>,
}

impl IntentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intent under its fully-qualified name
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateIntent` if the name is already taken
    pub fn register(&mut self, intent: Arc<Intent>) -> Result<()> {
        let fq_name = intent.fq_name();
        if self.intents.contains_key(&fq_name) {
            return Err(Error::DuplicateIntent(fq_name));
        }

        tracing::debug!(intent = %fq_name, "registered intent");
        self.intents.insert(fq_name, intent);
        Ok(())
    }

    /// Look up an intent by fully-qualified name
    ///
    /// # Errors
    ///
    /// Returns `Error::IntentNotFound` if absent
    pub fn lookup(&self, fq_name: &str) -> Result<Arc<Intent>> {
        self.intents
            .get(fq_name)
            .cloned()
            .ok_or_else(|| Error::IntentNotFound(fq_name.to_string()))
    }

    /// All registered intents, in no meaningful order
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Intent>> {
        self.intents.values().cloned().collect()
    }

    /// Number of registered intents
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Check if no intents are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
