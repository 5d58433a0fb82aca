use super::services::MentoService;
use super::types::{DexSwapConfig, StepKind};
use std::sync::Arc;
use tradecore::{Step, ValidationError};

/// Validates DEX steps: the step must target the venue's chain and the
/// token pair must be tradeable there.
pub struct StepConfigValidator {
    service: Arc<MentoService>,
}

impl StepConfigValidator {
    pub fn new(service: Arc<MentoService>) -> Self {
        Self { service }
    }

    pub async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        match StepKind::parse(&step.step_type) {
            Some(StepKind::DexSwap) => self.validate_dex_swap(step).await,
            None => Err(ValidationError::new(format!(
                "Step type not supported: {}",
                step.step_type
            ))),
        }
    }

    async fn validate_dex_swap(&self, step: &Step) -> Result<(), ValidationError> {
        let config: DexSwapConfig = serde_json::from_value(step.config.clone())
            .map_err(|e| ValidationError::decode(vec![e.to_string()]))?;

        let venue_chain = self
            .service
            .chain_id()
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if config.chain_id != venue_chain {
            return Err(ValidationError::new(format!(
                "Chain ID not supported: {}",
                config.chain_id
            )));
        }

        let tradeable = self
            .service
            .is_pair_tradeable(&config.from_token, &config.to_token)
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if !tradeable {
            return Err(ValidationError::new(format!(
                "Pair not supported: {} / {}",
                config.from_token, config.to_token
            )));
        }

        Ok(())
    }
}
