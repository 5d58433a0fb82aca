use super::services::SquidProvider;
use super::types::{BridgeSwapConfig, StepKind};
use std::sync::Arc;
use tradecore::{Step, ValidationError};

/// Validates bridge steps against the provider's chain and token catalogs.
/// Checks run in order and fail fast; both are lookups into the catalog
/// fetched at init.
pub struct StepConfigValidator {
    provider: Arc<SquidProvider>,
}

impl StepConfigValidator {
    pub fn new(provider: Arc<SquidProvider>) -> Self {
        Self { provider }
    }

    pub async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        match StepKind::parse(&step.step_type) {
            Some(StepKind::BridgeSwap) => self.validate_bridge_swap(step).await,
            None => Err(ValidationError::new(format!(
                "Step type not supported: {}",
                step.step_type
            ))),
        }
    }

    async fn validate_bridge_swap(&self, step: &Step) -> Result<(), ValidationError> {
        let config: BridgeSwapConfig = serde_json::from_value(step.config.clone())
            .map_err(|e| ValidationError::decode(vec![e.to_string()]))?;

        self.require_chain(config.from_chain).await?;
        self.require_chain(config.to_chain).await?;
        self.require_token(&config.from_token, config.from_chain)
            .await?;
        self.require_token(&config.to_token, config.to_chain).await?;

        Ok(())
    }

    async fn require_chain(&self, chain_id: u64) -> Result<(), ValidationError> {
        let supported = self
            .provider
            .is_chain_supported(chain_id)
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if !supported {
            return Err(ValidationError::new(format!(
                "Chain ID not supported: {chain_id}"
            )));
        }
        Ok(())
    }

    async fn require_token(&self, address: &str, chain_id: u64) -> Result<(), ValidationError> {
        let supported = self
            .provider
            .is_token_supported(address, chain_id)
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if !supported {
            return Err(ValidationError::new(format!(
                "Token not supported: {address}"
            )));
        }
        Ok(())
    }
}
