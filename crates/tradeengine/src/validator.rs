use crate::AdapterMap;
use tradecore::{EngineError, Flow};

/// Walks a flow's steps in declaration order, resolving each step's adapter
/// and asking it to validate the step config.
///
/// Fail-fast: the first invalid step aborts with its index and error list;
/// later steps are never validated. A passing walk is advisory, not
/// transactional: a step's semantic state (balance, market availability)
/// can still change before execution reaches it.
pub struct FlowValidator;

impl FlowValidator {
    pub fn new() -> Self {
        Self
    }

    pub async fn validate(&self, flow: &Flow, adapters: &AdapterMap) -> Result<(), EngineError> {
        for (index, step) in flow.steps.iter().enumerate() {
            // Cannot occur after a successful boot: the engine only reaches
            // Ready once every configured adapter initialized.
            let adapter = adapters
                .get(&step.adapter)
                .ok_or_else(|| EngineError::AdapterNotFound(step.adapter.clone()))?;

            let result = adapter.is_valid(step).await;
            if !result.is_valid {
                return Err(EngineError::StepInvalid {
                    index,
                    errors: result.errors,
                });
            }
        }

        Ok(())
    }
}

impl Default for FlowValidator {
    fn default() -> Self {
        Self::new()
    }
}
