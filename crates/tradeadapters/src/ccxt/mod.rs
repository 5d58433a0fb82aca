//! Centralized-exchange adapter
//!
//! Drives spot trades, withdrawals and deposit checks on exchanges through
//! their REST APIs, one service connection per configured exchange.

mod exchanges;
mod types;
mod validation;

pub use exchanges::{BinanceApi, ExchangeApi, ExchangeApiError, ExchangeServiceRepo};
pub use types::{
    CcxtAdapterConfig, ChainId, DepositCryptoConfig, ExchangeCredentials, ExchangeId, StepKind,
    SwapConfig, WithdrawCryptoConfig,
};
pub use validation::{StepConfigValidator, StepStrategy};

use async_trait::async_trait;
use exchanges::create_exchange_service;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tradecore::{
    Adapter, AdapterError, ConfigProvider, ExecutionResult, Step, ValidationResult,
};
use tradeengine::AdapterFactory;

pub const ADAPTER_REF: &str = "ccxt";

pub struct CcxtAdapter {
    config_provider: Arc<ConfigProvider>,
    repo: Arc<ExchangeServiceRepo>,
    validator: StepConfigValidator,
    initialized: RwLock<bool>,
}

impl CcxtAdapter {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        let repo = Arc::new(ExchangeServiceRepo::new());
        Self {
            validator: StepConfigValidator::new(Arc::clone(&repo)),
            repo,
            config_provider,
            initialized: RwLock::new(false),
        }
    }

    async fn execute_swap(&self, step: &Step) -> ExecutionResult {
        let config: SwapConfig = match serde_json::from_value(step.config.clone()) {
            Ok(config) => config,
            Err(e) => return ExecutionResult::failed(format!("Invalid step configuration provided: {e}")),
        };

        let Some(exchange) = ExchangeId::parse(&config.exchange) else {
            return ExecutionResult::failed(format!("Exchange not supported: {}", config.exchange));
        };
        let Some(service) = self.repo.get(exchange).await else {
            return ExecutionResult::failed(format!("Service for exchange \"{exchange}\" not found"));
        };

        tracing::info!(
            "Placing market order for {} on {}",
            config.symbol(),
            config.exchange
        );
        match service
            .create_market_order(&config.base, &config.quote, config.amount)
            .await
        {
            Ok(order_id) => {
                tracing::info!("Order {} placed on {}", order_id, config.exchange);
                ExecutionResult::succeeded(json!({
                    "orderId": order_id,
                    "exchange": config.exchange,
                    "symbol": config.symbol(),
                }))
            }
            Err(e) => {
                tracing::error!("Order placement failed: {}", e);
                ExecutionResult::failed(format!("Failed to execute step: {e}"))
            }
        }
    }

    async fn execute_withdraw(&self, step: &Step) -> ExecutionResult {
        let config: WithdrawCryptoConfig = match serde_json::from_value(step.config.clone()) {
            Ok(config) => config,
            Err(e) => return ExecutionResult::failed(format!("Invalid step configuration provided: {e}")),
        };

        let Some(exchange) = ExchangeId::parse(&config.exchange) else {
            return ExecutionResult::failed(format!("Exchange not supported: {}", config.exchange));
        };
        let Some(chain) = ChainId::parse(&config.chain_id) else {
            return ExecutionResult::failed(format!("Chain ID not supported: {}", config.chain_id));
        };
        let Some(service) = self.repo.get(exchange).await else {
            return ExecutionResult::failed(format!("Service for exchange \"{exchange}\" not found"));
        };

        tracing::info!(
            "Submitting withdrawal of {} {} from {} over {}",
            config.amount,
            config.asset,
            config.exchange,
            config.chain_id
        );
        match service
            .withdraw(
                &config.asset,
                chain,
                &config.destination_address,
                config.amount,
            )
            .await
        {
            Ok(withdrawal_id) => {
                tracing::info!("Withdrawal {} accepted by {}", withdrawal_id, config.exchange);
                ExecutionResult::succeeded(json!({
                    "withdrawalId": withdrawal_id,
                    "exchange": config.exchange,
                    "asset": config.asset,
                }))
            }
            Err(e) => {
                tracing::error!("Withdrawal failed: {}", e);
                ExecutionResult::failed(format!("Failed to execute step: {e}"))
            }
        }
    }
}

#[async_trait]
impl Adapter for CcxtAdapter {
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

        let config: CcxtAdapterConfig = serde_json::from_value(entry.config.clone())
            .map_err(|e| AdapterError::InitFailed(format!("Invalid adapter configuration: {e}")))?;

        let mut seen = HashSet::new();
        for credentials in &config.exchanges {
            let exchange = ExchangeId::parse(&credentials.id).ok_or_else(|| {
                AdapterError::InitFailed(format!("Exchange not supported: {}", credentials.id))
            })?;
            if !seen.insert(exchange) {
                return Err(AdapterError::InitFailed(format!(
                    "Duplicate exchange ID detected: {}",
                    credentials.id
                )));
            }
            tracing::info!("Registering exchange service: {}", credentials.id);
            self.repo
                .set(exchange, create_exchange_service(exchange, credentials))
                .await;
        }

        tracing::info!(
            "ccxt adapter initialized with {} exchange(s)",
            config.exchanges.len()
        );
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
            Some(StepKind::Swap) => self.execute_swap(step).await,
            Some(StepKind::WithdrawCrypto) => self.execute_withdraw(step).await,
            // Deposits are funded by the counterparty chain transfer; there
            // is no exchange-side action to perform.
            Some(StepKind::DepositCrypto) => ExecutionResult::failed(
                "Exchange.DepositCrypto has no exchange-side action to execute",
            ),
            None => {
                ExecutionResult::failed(format!("Step type not supported: {}", step.step_type))
            }
        }
    }
}

pub struct CcxtAdapterFactory {
    config_provider: Arc<ConfigProvider>,
}

impl CcxtAdapterFactory {
    pub fn new(config_provider: Arc<ConfigProvider>) -> Self {
        Self { config_provider }
    }
}

impl AdapterFactory for CcxtAdapterFactory {
    fn adapter_ref(&self) -> &str {
        ADAPTER_REF
    }

    fn create(&self) -> Arc<dyn Adapter> {
        Arc::new(CcxtAdapter::new(Arc::clone(&self.config_provider)))
    }
}
