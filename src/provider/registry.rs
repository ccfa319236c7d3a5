//! Dynamic operation registry.
//!
//! [`OperationRegistry`] maps operation identifiers to [`Operation`]
//! implementations behind a read-write lock. Registration and removal take
//! `&self`, so a registry shared with a running gateway can change its
//! capability set between invocations. Lookups happen per call; nothing is
//! snapshotted at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::Arguments;
use super::traits::{Operation, Provider};
use crate::shaper::ShapedClient;
use crate::types::Table;
use crate::{GatewayError, Result};

/// Thread-safe name → operation map implementing [`Provider`].
pub struct OperationRegistry {
    name: String,
    operations: RwLock<HashMap<String, Arc<dyn Operation>>>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new("registry")
    }
}

impl OperationRegistry {
    /// Create an empty registry with a provider name for logging.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: RwLock::new(HashMap::new()),
        }
    }

    /// Register `operation` under `id`, returning any operation it replaced.
    pub fn register(
        &self,
        id: impl Into<String>,
        operation: impl Operation + 'static,
    ) -> Option<Arc<dyn Operation>> {
        self.register_arc(id, Arc::new(operation))
    }

    /// Register an already shared operation.
    pub fn register_arc(
        &self,
        id: impl Into<String>,
        operation: Arc<dyn Operation>,
    ) -> Option<Arc<dyn Operation>> {
        let id = id.into();
        debug!(provider = %self.name, operation = %id, "registering operation");
        self.operations.write().insert(id, operation)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(self, id: impl Into<String>, operation: impl Operation + 'static) -> Self {
        self.register(id, operation);
        self
    }

    /// Remove `id` from the capability set.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn Operation>> {
        debug!(provider = %self.name, operation = %id, "unregistering operation");
        self.operations.write().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.operations.read().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Operation>> {
        self.operations.read().get(id).cloned()
    }

    /// Description of operation `id`, if registered.
    pub fn description(&self, id: &str) -> Option<String> {
        self.get(id).map(|op| op.description().to_string())
    }

    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}

#[async_trait]
impl Provider for OperationRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_operation(&self, id: &str) -> bool {
        self.contains(id)
    }

    fn operations(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.operations.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn call(
        &self,
        id: &str,
        args: &Arguments,
        http: &ShapedClient,
    ) -> Result<Option<Table>> {
        // Clone the handle out so the lock is not held across the call.
        let operation = self
            .get(id)
            .ok_or_else(|| GatewayError::UnknownOperation(id.to_string()))?;
        operation.call(args, http).await
    }
}
