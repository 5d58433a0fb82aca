use super::types::{ChainId, ExchangeCredentials, ExchangeId};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum ExchangeApiError {
    #[error("Failed to fetch markets for exchange {exchange}: {reason}")]
    FetchMarkets { exchange: String, reason: String },

    #[error("Failed to fetch balance for currency {currency}: {reason}")]
    FetchBalance { currency: String, reason: String },

    #[error("Failed to fetch deposit address for {currency} on {chain}: {reason}")]
    FetchDepositAddress {
        currency: String,
        chain: ChainId,
        reason: String,
    },

    #[error("Order placement on {exchange} failed: {reason}")]
    PlaceOrder { exchange: String, reason: String },

    #[error("Withdrawal on {exchange} failed: {reason}")]
    Withdraw { exchange: String, reason: String },

    #[error("Request signing failed: {0}")]
    Signing(String),
}

/// What the validation strategies and the executor need from one exchange
/// connection. Everything here is a live REST call against the venue.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn is_asset_supported(&self, asset: &str) -> Result<bool, ExchangeApiError>;

    /// Market symbols use the "BASE/QUOTE" form, e.g. "BTC/USDT".
    async fn is_market_supported(&self, symbol: &str) -> Result<bool, ExchangeApiError>;

    async fn get_currency_balance(&self, currency: &str) -> Result<f64, ExchangeApiError>;

    async fn get_deposit_address(
        &self,
        currency: &str,
        chain: ChainId,
    ) -> Result<String, ExchangeApiError>;

    /// Place a market buy of `amount` base units; returns the venue order id.
    async fn create_market_order(
        &self,
        base: &str,
        quote: &str,
        amount: f64,
    ) -> Result<String, ExchangeApiError>;

    /// Submit a withdrawal; returns the venue withdrawal id.
    async fn withdraw(
        &self,
        asset: &str,
        chain: ChainId,
        address: &str,
        amount: f64,
    ) -> Result<String, ExchangeApiError>;
}

/// Holds the one service instance per exchange built at adapter init and
/// shared by the validation strategies and the executor.
pub struct ExchangeServiceRepo {
    services: RwLock<HashMap<ExchangeId, Arc<dyn ExchangeApi>>>,
}

impl ExchangeServiceRepo {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, exchange: ExchangeId, service: Arc<dyn ExchangeApi>) {
        self.services.write().await.insert(exchange, service);
    }

    pub async fn get(&self, exchange: ExchangeId) -> Option<Arc<dyn ExchangeApi>> {
        self.services.read().await.get(&exchange).cloned()
    }
}

impl Default for ExchangeServiceRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the service for one configured exchange
pub fn create_exchange_service(
    exchange: ExchangeId,
    credentials: &ExchangeCredentials,
) -> Arc<dyn ExchangeApi> {
    match exchange {
        ExchangeId::Binance => Arc::new(BinanceApi::new(credentials.clone())),
    }
}

const BINANCE_BASE_URL: &str = "https://api.binance.com";

/// Binance REST client. Catalog lookups use the public exchange-info
/// endpoint; account operations are signed with HMAC-SHA256 over the query
/// string, per the venue's API contract.
pub struct BinanceApi {
    client: reqwest::Client,
    base_url: String,
    credentials: ExchangeCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_asset: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
struct DepositAddressInfo {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    order_id: u64,
}

#[derive(Debug, Deserialize)]
struct WithdrawAck {
    id: String,
}

impl BinanceApi {
    pub fn new(credentials: ExchangeCredentials) -> Self {
        Self::with_base_url(credentials, BINANCE_BASE_URL)
    }

    pub fn with_base_url(credentials: ExchangeCredentials, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    async fn fetch_exchange_info(&self) -> Result<ExchangeInfo, String> {
        self.client
            .get(format!("{}/api/v3/exchangeInfo", self.base_url))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())
    }

    /// Append the timestamp and HMAC-SHA256 signature the account endpoints
    /// require.
    fn signed_query(&self, params: &[(&str, String)]) -> Result<String, ExchangeApiError> {
        let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.push(format!(
            "timestamp={}",
            chrono::Utc::now().timestamp_millis()
        ));
        let query = pairs.join("&");

        let mut mac = Hmac::<Sha256>::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| ExchangeApiError::Signing(e.to_string()))?;
        mac.update(query.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{query}&signature={signature}"))
    }

    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, String> {
        let query = self.signed_query(params).map_err(|e| e.to_string())?;
        self.client
            .get(format!("{}{}?{}", self.base_url, path, query))
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())
    }

    async fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, String> {
        let query = self.signed_query(params).map_err(|e| e.to_string())?;
        self.client
            .post(format!("{}{}?{}", self.base_url, path, query))
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ExchangeApi for BinanceApi {
    async fn is_asset_supported(&self, asset: &str) -> Result<bool, ExchangeApiError> {
        let normalized = asset.trim().to_uppercase();
        let info = self
            .fetch_exchange_info()
            .await
            .map_err(|reason| ExchangeApiError::FetchMarkets {
                exchange: self.credentials.id.clone(),
                reason,
            })?;
        Ok(info.symbols.iter().any(|s| s.base_asset == normalized))
    }

    async fn is_market_supported(&self, symbol: &str) -> Result<bool, ExchangeApiError> {
        // The venue lists markets in compact form ("BTCUSDT").
        let compact = symbol.replace('/', "");
        let info = self
            .fetch_exchange_info()
            .await
            .map_err(|reason| ExchangeApiError::FetchMarkets {
                exchange: self.credentials.id.clone(),
                reason,
            })?;
        Ok(info.symbols.iter().any(|s| s.symbol == compact))
    }

    async fn get_currency_balance(&self, currency: &str) -> Result<f64, ExchangeApiError> {
        let account: AccountInfo = self
            .signed_get("/api/v3/account", &[])
            .await
            .map_err(|reason| ExchangeApiError::FetchBalance {
                currency: currency.to_string(),
                reason,
            })?;

        let normalized = currency.trim().to_uppercase();
        let balance = account
            .balances
            .iter()
            .find(|b| b.asset == normalized)
            .ok_or_else(|| ExchangeApiError::FetchBalance {
                currency: currency.to_string(),
                reason: "Currency balance was not found".to_string(),
            })?;

        let free: f64 = balance.free.parse().unwrap_or(0.0);
        let locked: f64 = balance.locked.parse().unwrap_or(0.0);
        Ok(free + locked)
    }

    async fn get_deposit_address(
        &self,
        currency: &str,
        chain: ChainId,
    ) -> Result<String, ExchangeApiError> {
        let info: DepositAddressInfo = self
            .signed_get(
                "/sapi/v1/capital/deposit/address",
                &[
                    ("coin", currency.trim().to_uppercase()),
                    ("network", chain.network_param().to_string()),
                ],
            )
            .await
            .map_err(|reason| ExchangeApiError::FetchDepositAddress {
                currency: currency.to_string(),
                chain,
                reason,
            })?;
        Ok(info.address)
    }

    async fn create_market_order(
        &self,
        base: &str,
        quote: &str,
        amount: f64,
    ) -> Result<String, ExchangeApiError> {
        let symbol = format!(
            "{}{}",
            base.trim().to_uppercase(),
            quote.trim().to_uppercase()
        );
        let ack: OrderAck = self
            .signed_post(
                "/api/v3/order",
                &[
                    ("symbol", symbol),
                    ("side", "BUY".to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", amount.to_string()),
                ],
            )
            .await
            .map_err(|reason| ExchangeApiError::PlaceOrder {
                exchange: self.credentials.id.clone(),
                reason,
            })?;
        Ok(ack.order_id.to_string())
    }

    async fn withdraw(
        &self,
        asset: &str,
        chain: ChainId,
        address: &str,
        amount: f64,
    ) -> Result<String, ExchangeApiError> {
        let ack: WithdrawAck = self
            .signed_post(
                "/sapi/v1/capital/withdraw/apply",
                &[
                    ("coin", asset.trim().to_uppercase()),
                    ("network", chain.network_param().to_string()),
                    ("address", address.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await
            .map_err(|reason| ExchangeApiError::Withdraw {
                exchange: self.credentials.id.clone(),
                reason,
            })?;
        Ok(ack.id)
    }
}
