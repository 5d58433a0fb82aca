use super::exchanges::{ExchangeApi, ExchangeServiceRepo};
use super::types::{
    ChainId, DepositCryptoConfig, ExchangeId, StepKind, SwapConfig, WithdrawCryptoConfig,
};
use crate::evm::is_evm_address;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tradecore::{Step, ValidationError};

/// A per-step-type semantic validator. Decodes the step's opaque payload,
/// then runs ordered checks that fail fast on the first violated invariant.
/// Checks needing the exchange are awaited sequentially: later ones consume
/// data fetched by earlier ones.
#[async_trait]
pub trait StepStrategy: Send + Sync {
    async fn validate(&self, step: &Step) -> Result<(), ValidationError>;
}

/// Dispatches a step to the strategy registered for its type tag.
///
/// The table is populated once at adapter construction; supporting a new
/// step type means registering a new strategy here, nothing else changes.
pub struct StepConfigValidator {
    strategies: HashMap<StepKind, Box<dyn StepStrategy>>,
}

impl StepConfigValidator {
    pub fn new(repo: Arc<ExchangeServiceRepo>) -> Self {
        let mut strategies: HashMap<StepKind, Box<dyn StepStrategy>> = HashMap::new();
        strategies.insert(
            StepKind::Swap,
            Box::new(SwapStrategy {
                repo: Arc::clone(&repo),
            }),
        );
        strategies.insert(
            StepKind::WithdrawCrypto,
            Box::new(WithdrawCryptoStrategy {
                repo: Arc::clone(&repo),
            }),
        );
        strategies.insert(StepKind::DepositCrypto, Box::new(DepositCryptoStrategy { repo }));
        Self { strategies }
    }

    pub async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        let strategy = StepKind::parse(&step.step_type)
            .and_then(|kind| self.strategies.get(&kind))
            .ok_or_else(|| {
                ValidationError::new(format!("Step type not supported: {}", step.step_type))
            })?;

        strategy.validate(step).await
    }
}

fn decode<T: DeserializeOwned>(step: &Step) -> Result<T, ValidationError> {
    serde_json::from_value(step.config.clone())
        .map_err(|e| ValidationError::decode(vec![e.to_string()]))
}

fn parse_exchange(value: &str) -> Result<ExchangeId, ValidationError> {
    ExchangeId::parse(value)
        .ok_or_else(|| ValidationError::new(format!("Exchange not supported: {value}")))
}

fn parse_chain(value: &str) -> Result<ChainId, ValidationError> {
    ChainId::parse(value)
        .ok_or_else(|| ValidationError::new(format!("Chain ID not supported: {value}")))
}

async fn resolve_service(
    repo: &ExchangeServiceRepo,
    exchange: ExchangeId,
) -> Result<Arc<dyn ExchangeApi>, ValidationError> {
    repo.get(exchange).await.ok_or_else(|| {
        ValidationError::new(format!("Service for exchange \"{exchange}\" not found"))
    })
}

async fn require_asset_supported(
    service: &dyn ExchangeApi,
    asset: &str,
    exchange: ExchangeId,
) -> Result<(), ValidationError> {
    let supported = service
        .is_asset_supported(asset)
        .await
        .map_err(|e| ValidationError::new(e.to_string()))?;
    if !supported {
        return Err(ValidationError::new(format!(
            "Asset {asset} not supported on exchange {exchange}"
        )));
    }
    Ok(())
}

/// `Exchange.Swap`: the exchange must be known and the market pair listed.
struct SwapStrategy {
    repo: Arc<ExchangeServiceRepo>,
}

#[async_trait]
impl StepStrategy for SwapStrategy {
    async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        let config: SwapConfig = decode(step)?;

        let exchange = parse_exchange(&config.exchange)?;
        let service = resolve_service(&self.repo, exchange).await?;

        let symbol = config.symbol();
        let listed = service
            .is_market_supported(&symbol)
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if !listed {
            return Err(ValidationError::new(format!(
                "Market {symbol} not supported on exchange {exchange}"
            )));
        }

        Ok(())
    }
}

/// `Exchange.WithdrawCrypto`: destination must be a well-formed address,
/// exchange and chain known, asset tradeable on the exchange.
struct WithdrawCryptoStrategy {
    repo: Arc<ExchangeServiceRepo>,
}

#[async_trait]
impl StepStrategy for WithdrawCryptoStrategy {
    async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        let config: WithdrawCryptoConfig = decode(step)?;

        if !is_evm_address(&config.destination_address) {
            return Err(ValidationError::new(format!(
                "Address {} is not a valid address for field destinationAddress",
                config.destination_address
            )));
        }

        let exchange = parse_exchange(&config.exchange)?;
        parse_chain(&config.chain_id)?;

        let service = resolve_service(&self.repo, exchange).await?;
        require_asset_supported(service.as_ref(), &config.asset, exchange).await
    }
}

/// `Exchange.DepositCrypto`: on top of the enum and asset checks, the
/// exchange's own deposit address for (asset, chain) is resolved and must
/// match the configured destination byte for byte.
struct DepositCryptoStrategy {
    repo: Arc<ExchangeServiceRepo>,
}

#[async_trait]
impl StepStrategy for DepositCryptoStrategy {
    async fn validate(&self, step: &Step) -> Result<(), ValidationError> {
        let config: DepositCryptoConfig = decode(step)?;

        // Service resolution comes before the enum checks: an exchange the
        // repo has no service for reads as a missing service, known or not.
        let service = match ExchangeId::parse(&config.exchange) {
            Some(exchange) => resolve_service(&self.repo, exchange).await?,
            None => {
                return Err(ValidationError::new(format!(
                    "Service for exchange \"{}\" not found",
                    config.exchange
                )));
            }
        };

        let exchange = parse_exchange(&config.exchange)?;
        let chain = parse_chain(&config.to_chain)?;

        require_asset_supported(service.as_ref(), &config.asset, exchange).await?;

        let deposit_address = service
            .get_deposit_address(&config.asset, chain)
            .await
            .map_err(|e| ValidationError::new(e.to_string()))?;
        if deposit_address != config.to_address {
            return Err(ValidationError::new(format!(
                "Deposit address for {} on {} does not match toAddress",
                config.asset, config.to_chain
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccxt::exchanges::ExchangeApiError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted exchange double recording which lookups were made.
    struct FakeExchange {
        assets: Vec<&'static str>,
        markets: Vec<&'static str>,
        deposit_address: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl FakeExchange {
        fn new() -> Self {
            Self {
                assets: vec!["BTC", "ETH"],
                markets: vec!["BTC/USDT", "ETH/USDT"],
                deposit_address: "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExchangeApi for FakeExchange {
        async fn is_asset_supported(&self, asset: &str) -> Result<bool, ExchangeApiError> {
            self.calls.lock().unwrap().push(format!("asset:{asset}"));
            Ok(self.assets.contains(&asset))
        }

        async fn is_market_supported(&self, symbol: &str) -> Result<bool, ExchangeApiError> {
            self.calls.lock().unwrap().push(format!("market:{symbol}"));
            Ok(self.markets.contains(&symbol))
        }

        async fn get_currency_balance(&self, _currency: &str) -> Result<f64, ExchangeApiError> {
            Ok(0.0)
        }

        async fn get_deposit_address(
            &self,
            currency: &str,
            chain: ChainId,
        ) -> Result<String, ExchangeApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("deposit:{currency}:{chain}"));
            Ok(self.deposit_address.to_string())
        }

        async fn create_market_order(
            &self,
            _base: &str,
            _quote: &str,
            _amount: f64,
        ) -> Result<String, ExchangeApiError> {
            Ok("1".to_string())
        }

        async fn withdraw(
            &self,
            _asset: &str,
            _chain: ChainId,
            _address: &str,
            _amount: f64,
        ) -> Result<String, ExchangeApiError> {
            Ok("w-1".to_string())
        }
    }

    async fn validator_with_fake() -> (StepConfigValidator, Arc<FakeExchange>) {
        let repo = Arc::new(ExchangeServiceRepo::new());
        let fake = Arc::new(FakeExchange::new());
        repo.set(ExchangeId::Binance, Arc::clone(&fake) as Arc<dyn ExchangeApi>)
            .await;
        (StepConfigValidator::new(repo), fake)
    }

    fn step(step_type: &str, config: serde_json::Value) -> Step {
        Step {
            step_type: step_type.to_string(),
            adapter: "ccxt".to_string(),
            config,
        }
    }

    #[tokio::test]
    async fn unsupported_step_type_names_the_offending_tag() {
        let (validator, _) = validator_with_fake().await;
        let err = validator
            .validate(&step("Exchange.Teleport", json!({})))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Exchange.Teleport"));
        assert!(err
            .to_string()
            .starts_with("Invalid step configuration provided"));
    }

    #[tokio::test]
    async fn swap_accepts_a_listed_market() {
        let (validator, fake) = validator_with_fake().await;
        let step = step(
            "Exchange.Swap",
            json!({ "exchange": "binance", "base": "btc", "quote": "usdt", "amount": 100 }),
        );

        validator.validate(&step).await.unwrap();
        assert_eq!(fake.calls(), vec!["market:BTC/USDT"]);
    }

    #[tokio::test]
    async fn swap_rejects_an_unknown_exchange_before_any_lookup() {
        let (validator, fake) = validator_with_fake().await;
        let step = step(
            "Exchange.Swap",
            json!({ "exchange": "kraken", "base": "BTC", "quote": "USDT", "amount": 100 }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err.to_string().contains("Exchange not supported: kraken"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn swap_rejects_an_unlisted_market() {
        let (validator, _) = validator_with_fake().await;
        let step = step(
            "Exchange.Swap",
            json!({ "exchange": "binance", "base": "DOGE", "quote": "USDT", "amount": 1 }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Market DOGE/USDT not supported on exchange binance"));
    }

    #[tokio::test]
    async fn decode_failure_reports_the_generic_error_with_context() {
        let (validator, _) = validator_with_fake().await;
        // `amount` missing
        let step = step(
            "Exchange.Swap",
            json!({ "exchange": "binance", "base": "BTC", "quote": "USDT" }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Invalid step configuration provided"));
        assert!(!err.context().is_empty());
    }

    #[tokio::test]
    async fn withdraw_rejects_a_malformed_destination_before_any_lookup() {
        let (validator, fake) = validator_with_fake().await;
        let step = step(
            "Exchange.WithdrawCrypto",
            json!({
                "exchange": "binance",
                "asset": "BTC",
                "chainId": "ETHEREUM",
                "destinationAddress": "not-an-address",
                "amount": 0.01
            }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err.to_string().contains("destinationAddress"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn withdraw_rejects_an_unknown_chain() {
        let (validator, _) = validator_with_fake().await;
        let step = step(
            "Exchange.WithdrawCrypto",
            json!({
                "exchange": "binance",
                "asset": "BTC",
                "chainId": "DOGECOIN",
                "destinationAddress": "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                "amount": 0.01
            }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err.to_string().contains("Chain ID not supported: DOGECOIN"));
    }

    #[tokio::test]
    async fn withdraw_accepts_a_supported_asset() {
        let (validator, fake) = validator_with_fake().await;
        let step = step(
            "Exchange.WithdrawCrypto",
            json!({
                "exchange": "binance",
                "asset": "BTC",
                "chainId": "ETHEREUM",
                "destinationAddress": "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                "amount": 0.01
            }),
        );

        validator.validate(&step).await.unwrap();
        assert_eq!(fake.calls(), vec!["asset:BTC"]);
    }

    #[tokio::test]
    async fn withdraw_rejects_an_asset_the_exchange_does_not_carry() {
        let (validator, _) = validator_with_fake().await;
        let step = step(
            "Exchange.WithdrawCrypto",
            json!({
                "exchange": "binance",
                "asset": "XMR",
                "chainId": "ETHEREUM",
                "destinationAddress": "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                "amount": 0.01
            }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Asset XMR not supported on exchange binance"));
    }

    #[tokio::test]
    async fn deposit_requires_the_resolved_address_to_match() {
        let (validator, fake) = validator_with_fake().await;
        let mismatched = step(
            "Exchange.DepositCrypto",
            json!({
                "exchange": "binance",
                "asset": "BTC",
                "toChain": "ETHEREUM",
                "toAddress": "0x0000000000000000000000000000000000000000",
                "amount": 0.5
            }),
        );

        let err = validator.validate(&mismatched).await.unwrap_err();
        assert!(err.to_string().contains("does not match toAddress"));
        // The address lookup happens after the asset check, in order.
        assert_eq!(fake.calls(), vec!["asset:BTC", "deposit:BTC:ETHEREUM"]);
    }

    #[tokio::test]
    async fn deposit_reports_a_missing_service_for_an_unknown_exchange() {
        let (validator, fake) = validator_with_fake().await;
        let step = step(
            "Exchange.DepositCrypto",
            json!({
                "exchange": "kraken",
                "asset": "BTC",
                "toChain": "ETHEREUM",
                "toAddress": "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                "amount": 0.5
            }),
        );

        let err = validator.validate(&step).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Service for exchange \"kraken\" not found"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn deposit_accepts_a_matching_address() {
        let (validator, _) = validator_with_fake().await;
        let matching = step(
            "Exchange.DepositCrypto",
            json!({
                "exchange": "binance",
                "asset": "BTC",
                "toChain": "ETHEREUM",
                "toAddress": "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
                "amount": 0.5
            }),
        );

        validator.validate(&matching).await.unwrap();
    }
}
