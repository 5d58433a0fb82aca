use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum DexApiError {
    #[error("Failed to fetch tradeable pairs: {0}")]
    FetchPairs(String),

    #[error("Swap submission failed: {0}")]
    Swap(String),

    #[error("Venue service has not been initialized")]
    NotInitialized,
}

/// One tradeable pair on the venue, as two token contract addresses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeablePair {
    pub token0: String,
    pub token1: String,
}

#[derive(Debug, Deserialize)]
struct PairsResponse {
    pairs: Vec<TradeablePair>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub max_slippage: f64,
    pub chain_id: u64,
    pub from_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    tx_hash: String,
}

struct VenueState {
    api_url: String,
    chain_id: u64,
    pairs: Vec<TradeablePair>,
}

/// Client for the DEX venue's trading API. The handshake at init pulls the
/// tradeable-pairs catalog; swaps go back to the venue.
pub struct MentoService {
    client: reqwest::Client,
    state: RwLock<Option<VenueState>>,
}

impl MentoService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            state: RwLock::new(None),
        }
    }

    pub async fn init(&self, api_url: &str, chain_id: u64) -> Result<(), DexApiError> {
        let mut state = self.state.write().await;
        if state.is_some() {
            return Ok(());
        }

        let response: PairsResponse = self
            .client
            .get(format!("{api_url}/v1/pairs"))
            .send()
            .await
            .map_err(|e| DexApiError::FetchPairs(e.to_string()))?
            .error_for_status()
            .map_err(|e| DexApiError::FetchPairs(e.to_string()))?
            .json()
            .await
            .map_err(|e| DexApiError::FetchPairs(e.to_string()))?;

        *state = Some(VenueState {
            api_url: api_url.to_string(),
            chain_id,
            pairs: response.pairs,
        });
        Ok(())
    }

    pub async fn chain_id(&self) -> Result<u64, DexApiError> {
        let state = self.state.read().await;
        let state = state.as_ref().ok_or(DexApiError::NotInitialized)?;
        Ok(state.chain_id)
    }

    /// Order-insensitive membership check against the pairs catalog.
    pub async fn is_pair_tradeable(&self, from: &str, to: &str) -> Result<bool, DexApiError> {
        let state = self.state.read().await;
        let state = state.as_ref().ok_or(DexApiError::NotInitialized)?;
        Ok(state.pairs.iter().any(|pair| {
            (pair.token0.eq_ignore_ascii_case(from) && pair.token1.eq_ignore_ascii_case(to))
                || (pair.token0.eq_ignore_ascii_case(to) && pair.token1.eq_ignore_ascii_case(from))
        }))
    }

    pub async fn swap(&self, request: &SwapRequest) -> Result<String, DexApiError> {
        let api_url = {
            let state = self.state.read().await;
            let state = state.as_ref().ok_or(DexApiError::NotInitialized)?;
            state.api_url.clone()
        };

        let response: SwapResponse = self
            .client
            .post(format!("{api_url}/v1/swap"))
            .json(request)
            .send()
            .await
            .map_err(|e| DexApiError::Swap(e.to_string()))?
            .error_for_status()
            .map_err(|e| DexApiError::Swap(e.to_string()))?
            .json()
            .await
            .map_err(|e| DexApiError::Swap(e.to_string()))?;

        Ok(response.tx_hash)
    }

    /// Install a pre-fetched catalog, bypassing the network handshake.
    #[cfg(test)]
    pub(crate) async fn seed(&self, chain_id: u64, pairs: Vec<TradeablePair>) {
        *self.state.write().await = Some(VenueState {
            api_url: String::new(),
            chain_id,
            pairs,
        });
    }
}

impl Default for MentoService {
    fn default() -> Self {
        Self::new()
    }
}
