use crate::AdapterMap;
use chrono::Utc;
use std::time::Instant;
use tradecore::{EngineError, EventBus, ExecutionId, ExecutionResult, Flow};

/// Executes a flow's steps strictly in declaration order, never
/// concurrently: steps commonly form a causal chain (a trade must settle
/// before a withdrawal of its proceeds, a withdrawal's destination must
/// exist before a bridge step consumes it).
///
/// The contract returns only the result of the last completed step, not a
/// per-step audit trail; the event bus carries the observable step-by-step
/// record.
pub struct FlowExecutor;

impl FlowExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        flow: &Flow,
        adapters: &AdapterMap,
        events: &EventBus,
        execution_id: ExecutionId,
    ) -> Result<ExecutionResult, EngineError> {
        // Unreachable through the engine: config loading rejects stepless flows.
        let mut last_result = ExecutionResult::failed("Flow contains no steps");

        for (index, step) in flow.steps.iter().enumerate() {
            let adapter = adapters
                .get(&step.adapter)
                .ok_or_else(|| EngineError::AdapterNotFound(step.adapter.clone()))?;

            events.emit(tradecore::ExecutionEvent::StepStarted {
                execution_id,
                flow_id: flow.id.clone(),
                step_index: index,
                step_type: step.step_type.clone(),
                adapter: step.adapter.clone(),
                timestamp: Utc::now(),
            });

            let start = Instant::now();
            let result = adapter.execute(step).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            if result.success {
                tracing::info!(
                    "Step {} of flow {} completed in {}ms",
                    index,
                    flow.id,
                    duration_ms
                );
                events.emit(tradecore::ExecutionEvent::StepCompleted {
                    execution_id,
                    flow_id: flow.id.clone(),
                    step_index: index,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            } else {
                let error = result
                    .error_message()
                    .unwrap_or("unknown execution failure")
                    .to_string();
                tracing::error!("Step {} of flow {} failed: {}", index, flow.id, error);
                events.emit(tradecore::ExecutionEvent::StepFailed {
                    execution_id,
                    flow_id: flow.id.clone(),
                    step_index: index,
                    error,
                    timestamp: Utc::now(),
                });
                // Sequential, not fault-tolerant: the failing step's result
                // is surfaced and no later step is executed.
                return Ok(result);
            }

            last_result = result;
        }

        Ok(last_result)
    }
}

impl Default for FlowExecutor {
    fn default() -> Self {
        Self::new()
    }
}
