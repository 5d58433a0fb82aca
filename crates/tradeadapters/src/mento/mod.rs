//! DEX adapter
//!
//! Swaps stable-asset pairs on a single-chain DEX venue through its trading
//! API.

mod services;
mod types;
mod validation;

pub use services::{DexApiError, MentoService, SwapRequest, TradeablePair};
pub use types::{DexSwapConfig, MentoAdapterConfig, StepKind};
pub use validation::StepConfigValidator;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tradecore::{
    Adapter, AdapterError, ConfigProvider, ExecutionResult, Step, ValidationResult,
};
use tradeengine::AdapterFactory;

pub const ADAPTER_REF: &str = "mento";

pub struct MentoAdapter {
    config_provider: Arc<ConfigProvider>,
    service: Arc<MentoService>,
    validator: StepConfigValidator,
    initialized: RwLock<bool>,
}

impl MentoAdapter {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        let service = Arc::new(MentoService::new());
        Self {
            validator: StepConfigValidator::new(Arc::clone(&service)),
            service,
            config_provider,
            initialized: RwLock::new(false),
        }
    }

    async fn execute_dex_swap(&self, step: &Step) -> ExecutionResult {
        let config: DexSwapConfig = match serde_json::from_value(step.config.clone()) {
            Ok(config) => config,
            Err(e) => return ExecutionResult::failed(format!("Invalid step configuration provided: {e}")),
        };

        let Some(primary_address) = self.config_provider.get_variable("primaryAddress") else {
            return ExecutionResult::failed("Global variable primaryAddress is missing");
        };

        let request = SwapRequest {
            from_token: config.from_token.clone(),
            to_token: config.to_token.clone(),
            from_amount: config.from_amount.clone(),
            max_slippage: config.max_slippage,
            chain_id: config.chain_id,
            from_address: primary_address.to_string(),
        };

        tracing::info!(
            "Submitting DEX swap {} -> {} on chain {}",
            config.from_token,
            config.to_token,
            config.chain_id
        );
        match self.service.swap(&request).await {
            Ok(tx_hash) => {
                tracing::info!("DEX swap submitted: {}", tx_hash);
                ExecutionResult::succeeded(json!({ "txHash": tx_hash }))
            }
            Err(e) => {
                tracing::error!("DEX swap failed: {}", e);
                ExecutionResult::failed(format!("Failed to execute step: {e}"))
            }
        }
    }
}

#[async_trait]
impl Adapter for MentoAdapter {
    fn adapter_id(&self) -> &str {
        ADAPTER_REF
    }

    async fn init(&self) -> Result<(), AdapterError> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let entry = self
            .config_provider
            .get_adapter_config(ADAPTER_REF)
            .ok_or_else(|| AdapterError::ConfigMissing(ADAPTER_REF.to_string()))?;

        let config: MentoAdapterConfig = serde_json::from_value(entry.config.clone())
            .map_err(|e| AdapterError::InitFailed(format!("Invalid adapter configuration: {e}")))?;

        self.service
            .init(&config.api_url, config.chain_id)
            .await
            .map_err(|e| AdapterError::InitFailed(e.to_string()))?;

        tracing::info!("mento adapter initialized for chain {}", config.chain_id);
        *initialized = true;
        Ok(())
    }

    async fn is_valid(&self, step: &Step) -> ValidationResult {
        match self.validator.validate(step).await {
            Ok(()) => ValidationResult::valid(),
            Err(err) => err.into(),
        }
    }

    async fn execute(&self, step: &Step) -> ExecutionResult {
        match StepKind::parse(&step.step_type) {
            Some(StepKind::DexSwap) => self.execute_dex_swap(step).await,
            None => {
                ExecutionResult::failed(format!("Step type not supported: {}", step.step_type))
            }
        }
    }
}

pub struct MentoAdapterFactory {
    config_provider: Arc<ConfigProvider>,
}

impl MentoAdapterFactory {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        Self { config_provider }
    }
}

impl AdapterFactory for MentoAdapterFactory {
    fn adapter_ref(&self) -> &str {
        ADAPTER_REF
    }

    fn create(&self) -> Arc<dyn Adapter> {
        Arc::new(MentoAdapter::new(Arc::clone(&self.config_provider)))
    }
}
