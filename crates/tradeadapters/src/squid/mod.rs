//! Cross-chain bridge adapter
//!
//! Routes swaps between chains through a bridge aggregator's routing API
//! and submits the resulting transaction via the per-chain signing node.

mod services;
mod types;
mod validation;

pub use services::{
    BridgeApiError, ChainData, RouteData, RouteParams, SignerService, SquidProvider, TokenData,
    TransactionRequest,
};
pub use types::{BridgeSwapConfig, SquidAdapterConfig, StepKind};
pub use validation::StepConfigValidator;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tradecore::{
    Adapter, AdapterError, ConfigProvider, ExecutionResult, Step, ValidationResult,
};
use tradeengine::AdapterFactory;

pub const ADAPTER_REF: &str = "squid";

pub struct SquidAdapter {
    config_provider: Arc<ConfigProvider>,
    provider: Arc<SquidProvider>,
    signer: SignerService,
    validator: StepConfigValidator,
    initialized: RwLock<bool>,
}

impl SquidAdapter {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        let provider = Arc::new(SquidProvider::new());
        Self {
            validator: StepConfigValidator::new(Arc::clone(&provider)),
            signer: SignerService::new(Arc::clone(&config_provider)),
            provider,
            config_provider,
            initialized: RwLock::new(false),
        }
    }

    async fn execute_bridge_swap(&self, step: &Step) -> ExecutionResult {
        let config: BridgeSwapConfig = match serde_json::from_value(step.config.clone()) {
            Ok(config) => config,
            Err(e) => return ExecutionResult::failed(format!("Invalid step configuration provided: {e}")),
        };

        let Some(primary_address) = self.config_provider.get_variable("primaryAddress") else {
            return ExecutionResult::failed("Global variable primaryAddress is missing");
        };

        let params = RouteParams {
            from_chain: config.from_chain,
            from_token: config.from_token.clone(),
            from_amount: config.from_amount.clone(),
            to_chain: config.to_chain,
            to_token: config.to_token.clone(),
            from_address: primary_address.to_string(),
            to_address: config.to_address.clone(),
            slippage: config.max_slippage,
        };

        tracing::info!(
            "Requesting bridge route: chain {} -> chain {}",
            config.from_chain,
            config.to_chain
        );
        let route = match self.provider.get_route(&params).await {
            Ok(route) => route,
            Err(e) => {
                tracing::error!("Route request failed: {}", e);
                return ExecutionResult::failed(format!("Failed to execute step: {e}"));
            }
        };

        let tx_hash = match self
            .signer
            .send_transaction(config.from_chain, primary_address, &route.transaction_request)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("Route transaction submission failed: {}", e);
                return ExecutionResult::failed(format!("Failed to execute step: {e}"));
            }
        };

        tracing::info!("Route transaction submitted: {}", tx_hash);
        match self
            .signer
            .wait_for_receipt(config.from_chain, &tx_hash)
            .await
        {
            Ok(Some(hash)) => {
                tracing::info!("Bridge transaction mined: {}", hash);
                ExecutionResult::succeeded(json!({ "txHash": hash }))
            }
            Ok(None) => {
                tracing::error!("No receipt for bridge transaction {}", tx_hash);
                ExecutionResult::failed("Transaction receipt missing")
            }
            Err(e) => {
                tracing::error!("Receipt polling failed: {}", e);
                ExecutionResult::failed(format!("Failed to execute step: {e}"))
            }
        }
    }
}

#[async_trait]
impl Adapter for SquidAdapter {
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

        let config: SquidAdapterConfig = serde_json::from_value(entry.config.clone())
            .map_err(|e| AdapterError::InitFailed(format!("Invalid adapter configuration: {e}")))?;

        self.provider
            .init(&config.base_url, &config.integrator_id)
            .await
            .map_err(|e| AdapterError::InitFailed(e.to_string()))?;

        tracing::info!("squid adapter initialized against {}", config.base_url);
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
            Some(StepKind::BridgeSwap) => self.execute_bridge_swap(step).await,
            None => {
                ExecutionResult::failed(format!("Step type not supported: {}", step.step_type))
            }
        }
    }
}

pub struct SquidAdapterFactory {
    config_provider: Arc<ConfigProvider>,
}

impl SquidAdapterFactory {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        Self { config_provider }
    }
}

impl AdapterFactory for SquidAdapterFactory {
    fn adapter_ref(&self) -> &str {
        ADAPTER_REF
    }

    fn create(&self) -> Arc<dyn Adapter> {
        Arc::new(SquidAdapter::new(Arc::clone(&self.config_provider)))
    }
}
