use std::collections::HashMap;
use std::sync::Arc;
use tradecore::{Adapter, EngineError};

/// Live map of adapter identifier to initialized instance, built by the
/// engine at boot and shared with the validator and executor.
pub type AdapterMap = HashMap<String, Arc<dyn Adapter>>;

/// Factory trait for creating adapter instances
pub trait AdapterFactory: Send + Sync {
    /// Implementation reference this factory builds, matched against the
    /// `adapter` field of an adapter config entry.
    fn adapter_ref(&self) -> &str;

    /// Create a fresh, uninitialized instance of the adapter
    fn create(&self) -> Arc<dyn Adapter>;
}

/// Registry of available adapter implementations.
///
/// `create` hands out one cached instance per reference: repeated calls for
/// the same reference return the same `Arc`, so every flow shares a single
/// adapter instance and its connections.
pub struct AdapterRegistry {
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
    instances: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Register an adapter factory
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>) {
        let adapter_ref = factory.adapter_ref().to_string();
        tracing::info!("Registering adapter: {}", adapter_ref);
        self.factories.insert(adapter_ref, factory);
    }

    /// Resolve an adapter reference to its cached instance, creating it on
    /// first use. An unregistered reference is a config/deployment mismatch,
    /// fatal and non-retryable.
    pub fn create(&mut self, adapter_ref: &str) -> Result<Arc<dyn Adapter>, EngineError> {
        if let Some(instance) = self.instances.get(adapter_ref) {
            return Ok(Arc::clone(instance));
        }

        let factory = self
            .factories
            .get(adapter_ref)
            .ok_or_else(|| EngineError::AdapterNotFound(adapter_ref.to_string()))?;

        let instance = factory.create();
        self.instances
            .insert(adapter_ref.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Get all registered adapter references
    pub fn list_adapter_refs(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
