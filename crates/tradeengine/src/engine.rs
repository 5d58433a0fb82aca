use crate::{AdapterMap, AdapterRegistry, FlowExecutor, FlowValidator};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tradecore::{
    ConfigProvider, EngineError, EventBus, ExecutionEvent, ExecutionId, ExecutionResult,
};

/// Top-level orchestrator.
///
/// Two-phase state machine: `init` boots every configured adapter (all or
/// nothing), then `execute` can be called repeatedly to validate and run a
/// named flow.
pub struct Engine {
    config: Arc<ConfigProvider>,
    registry: AdapterRegistry,
    validator: FlowValidator,
    executor: FlowExecutor,
    event_bus: Arc<EventBus>,
    adapters: AdapterMap,
    initialized: bool,
}

impl Engine {
    pub fn new(config: Arc<ConfigProvider>, registry: AdapterRegistry) -> Self {
        Self::with_event_bus(config, registry, Arc::new(EventBus::new(256)))
    }

    pub fn with_event_bus(
        config: Arc<ConfigProvider>,
        registry: AdapterRegistry,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            registry,
            validator: FlowValidator::new(),
            executor: FlowExecutor::new(),
            event_bus,
            adapters: AdapterMap::new(),
            initialized: false,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Create and initialize every adapter in the configured adapter list.
    ///
    /// Any single adapter failure aborts the whole boot sequence and leaves
    /// the engine uninitialized (no partial startup). Calling `init` again
    /// on a Ready engine is a no-op returning Ok.
    pub async fn init(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }

        let mut adapters = AdapterMap::new();
        for adapter_config in self.config.adapters() {
            let adapter = self.registry.create(&adapter_config.adapter)?;

            adapter.init().await.map_err(|source| {
                tracing::error!("Adapter {} failed to initialize: {}", adapter_config.id, source);
                EngineError::AdapterInit {
                    id: adapter_config.id.clone(),
                    source,
                }
            })?;

            tracing::info!("Adapter {} initialized", adapter_config.id);
            adapters.insert(adapter_config.id.clone(), adapter);
        }

        // The live map is only installed once every adapter came up.
        self.adapters = adapters;
        self.initialized = true;
        Ok(())
    }

    /// Look up, validate and execute the flow with the given id, returning
    /// the executor's result. Validation and execution failures are wrapped
    /// with the flow id as context.
    pub async fn execute(&self, flow_id: &str) -> Result<ExecutionResult, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let flow = self
            .config
            .get_flow_by_id(flow_id)
            .ok_or_else(|| EngineError::FlowNotFound(flow_id.to_string()))?;

        let execution_id = ExecutionId::new_v4();
        let start = Instant::now();
        self.event_bus.emit(ExecutionEvent::FlowStarted {
            execution_id,
            flow_id: flow.id.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!("Executing flow {}", flow.id);

        if let Err(source) = self.validator.validate(flow, &self.adapters).await {
            self.emit_completed(execution_id, &flow.id, false, start);
            return Err(EngineError::FlowValidation {
                flow_id: flow_id.to_string(),
                source: Box::new(source),
            });
        }

        let result = self
            .executor
            .execute(flow, &self.adapters, &self.event_bus, execution_id)
            .await
            .map_err(|err| {
                self.emit_completed(execution_id, &flow.id, false, start);
                EngineError::FlowExecution {
                    flow_id: flow_id.to_string(),
                    reason: err.to_string(),
                }
            })?;

        self.emit_completed(execution_id, &flow.id, result.success, start);
        Ok(result)
    }

    /// Validate a flow without executing it.
    pub async fn validate(&self, flow_id: &str) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let flow = self
            .config
            .get_flow_by_id(flow_id)
            .ok_or_else(|| EngineError::FlowNotFound(flow_id.to_string()))?;

        self.validator
            .validate(flow, &self.adapters)
            .await
            .map_err(|source| EngineError::FlowValidation {
                flow_id: flow_id.to_string(),
                source: Box::new(source),
            })
    }

    fn emit_completed(
        &self,
        execution_id: ExecutionId,
        flow_id: &str,
        success: bool,
        start: Instant,
    ) {
        self.event_bus.emit(ExecutionEvent::FlowCompleted {
            execution_id,
            flow_id: flow_id.to_string(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
    }
}
