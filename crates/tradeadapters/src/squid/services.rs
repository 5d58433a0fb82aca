use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tradecore::ConfigProvider;

#[derive(Error, Debug)]
pub enum BridgeApiError {
    #[error("Failed to fetch supported chains: {0}")]
    FetchChains(String),

    #[error("Failed to fetch supported tokens: {0}")]
    FetchTokens(String),

    #[error("Failed to fetch route: {0}")]
    FetchRoute(String),

    #[error("No RPC url configured for chain {0}")]
    MissingRpcUrl(u64),

    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Provider has not been initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainData {
    pub chain_id: u64,
    pub chain_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub address: String,
    pub chain_id: u64,
    pub symbol: String,
}

/// Query sent to the routing API when requesting a route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParams {
    pub from_chain: u64,
    pub from_token: String,
    pub from_amount: String,
    pub to_chain: u64,
    pub to_token: String,
    pub from_address: String,
    pub to_address: String,
    pub slippage: f64,
}

/// The transaction the route wants submitted on the source chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub target: String,
    pub data: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    pub transaction_request: TransactionRequest,
}

#[derive(Debug, Deserialize)]
struct ChainsResponse {
    chains: Vec<ChainData>,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    tokens: Vec<TokenData>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    route: RouteData,
}

struct ProviderState {
    base_url: String,
    integrator_id: String,
    chains: Vec<ChainData>,
    tokens: Vec<TokenData>,
}

/// Client for the bridge aggregator's routing API. The handshake at init
/// pulls the chain and token catalogs; validation reads the cached catalogs,
/// route requests go back to the API.
pub struct SquidProvider {
    client: reqwest::Client,
    state: RwLock<Option<ProviderState>>,
}

impl SquidProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            state: RwLock::new(None),
        }
    }

    pub async fn init(&self, base_url: &str, integrator_id: &str) -> Result<(), BridgeApiError> {
        let mut state = self.state.write().await;
        if state.is_some() {
            return Ok(());
        }

        let chains: ChainsResponse = self
            .get_json(base_url, integrator_id, "/v1/chains")
            .await
            .map_err(BridgeApiError::FetchChains)?;
        let tokens: TokensResponse = self
            .get_json(base_url, integrator_id, "/v1/tokens")
            .await
            .map_err(BridgeApiError::FetchTokens)?;

        *state = Some(ProviderState {
            base_url: base_url.to_string(),
            integrator_id: integrator_id.to_string(),
            chains: chains.chains,
            tokens: tokens.tokens,
        });
        Ok(())
    }

    pub async fn is_chain_supported(&self, chain_id: u64) -> Result<bool, BridgeApiError> {
        let state = self.state.read().await;
        let state = state.as_ref().ok_or(BridgeApiError::NotInitialized)?;
        Ok(state.chains.iter().any(|c| c.chain_id == chain_id))
    }

    pub async fn is_token_supported(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<bool, BridgeApiError> {
        let state = self.state.read().await;
        let state = state.as_ref().ok_or(BridgeApiError::NotInitialized)?;
        Ok(state
            .tokens
            .iter()
            .any(|t| t.chain_id == chain_id && t.address.eq_ignore_ascii_case(address)))
    }

    pub async fn get_route(&self, params: &RouteParams) -> Result<RouteData, BridgeApiError> {
        let (base_url, integrator_id) = {
            let state = self.state.read().await;
            let state = state.as_ref().ok_or(BridgeApiError::NotInitialized)?;
            (state.base_url.clone(), state.integrator_id.clone())
        };

        let response: RouteResponse = self
            .client
            .get(format!("{base_url}/v1/route"))
            .header("x-integrator-id", integrator_id)
            .query(params)
            .send()
            .await
            .map_err(|e| BridgeApiError::FetchRoute(e.to_string()))?
            .error_for_status()
            .map_err(|e| BridgeApiError::FetchRoute(e.to_string()))?
            .json()
            .await
            .map_err(|e| BridgeApiError::FetchRoute(e.to_string()))?;

        Ok(response.route)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        base_url: &str,
        integrator_id: &str,
        path: &str,
    ) -> Result<T, String> {
        self.client
            .get(format!("{base_url}{path}"))
            .header("x-integrator-id", integrator_id)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())
    }

    /// Install a pre-fetched catalog, bypassing the network handshake.
    #[cfg(test)]
    pub(crate) async fn seed(&self, chains: Vec<ChainData>, tokens: Vec<TokenData>) {
        *self.state.write().await = Some(ProviderState {
            base_url: String::new(),
            integrator_id: String::new(),
            chains,
            tokens,
        });
    }
}

impl Default for SquidProvider {
    fn default() -> Self {
        Self::new()
    }
}

const RECEIPT_POLL_ATTEMPTS: u32 = 30;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

/// Submits route transactions through the JSON-RPC signing node configured
/// per chain and polls for their receipts.
pub struct SignerService {
    config: Arc<ConfigProvider>,
    client: reqwest::Client,
}

impl SignerService {
    pub fn new(config: Arc<ConfigProvider>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send_transaction(
        &self,
        chain_id: u64,
        from: &str,
        tx: &TransactionRequest,
    ) -> Result<String, BridgeApiError> {
        let params = json!([{
            "from": from,
            "to": tx.target,
            "data": tx.data,
            "value": tx.value,
        }]);
        let result = self
            .rpc_call(chain_id, "eth_sendTransaction", params)
            .await?;
        result
            .as_str()
            .map(String::from)
            .ok_or_else(|| BridgeApiError::Rpc("eth_sendTransaction returned no hash".to_string()))
    }

    /// Poll for the transaction receipt, returning its hash once mined or
    /// None if it never appeared within the polling window.
    pub async fn wait_for_receipt(
        &self,
        chain_id: u64,
        tx_hash: &str,
    ) -> Result<Option<String>, BridgeApiError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let result = self
                .rpc_call(chain_id, "eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(hash) = result.get("transactionHash").and_then(|h| h.as_str()) {
                return Ok(Some(hash.to_string()));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        Ok(None)
    }

    async fn rpc_call(
        &self,
        chain_id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeApiError> {
        let url = self
            .config
            .get_rpc_url(chain_id)
            .ok_or(BridgeApiError::MissingRpcUrl(chain_id))?;

        let response: RpcResponse = self
            .client
            .post(url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| BridgeApiError::Rpc(e.to_string()))?
            .error_for_status()
            .map_err(|e| BridgeApiError::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| BridgeApiError::Rpc(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(BridgeApiError::Rpc(error.message));
        }
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }
}
