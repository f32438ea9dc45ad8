//! Handler registry for resolving transformation identifiers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::handler::TransformationHandler;

/// Registry of available transformation handlers.
///
/// Populated once at startup by wiring code; a task whose identifier does not
/// resolve here fails without ever running.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TransformationHandler>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler under its own id.
    pub async fn register(&self, handler: Arc<dyn TransformationHandler>) {
        let id = handler.id().to_string();
        self.handlers.write().await.insert(id.clone(), handler);
        tracing::debug!("Registered handler: {}", id);
    }

    /// Resolve a transformation id to its handler.
    pub async fn get(&self, id: &str) -> Option<Arc<dyn TransformationHandler>> {
        self.handlers.read().await.get(id).cloned()
    }

    /// Check if a handler exists.
    pub async fn has(&self, id: &str) -> bool {
        self.handlers.read().await.contains_key(id)
    }

    /// List all registered ids.
    pub async fn list(&self) -> Vec<String> {
        self.handlers.read().await.keys().cloned().collect()
    }

    /// Get the number of registered handlers.
    pub fn count(&self) -> usize {
        self.handlers.try_read().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
