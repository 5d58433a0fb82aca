use serde::Deserialize;

/// Initialization payload for the bridge adapter: where the routing API
/// lives and the integrator id it expects on every call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquidAdapterConfig {
    pub base_url: String,
    pub integrator_id: String,
}

/// `Bridge.Swap` step payload. Token fields are contract addresses; amounts
/// are base-unit decimal strings, as the routing API expects them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSwapConfig {
    pub from_chain: u64,
    pub from_token: String,
    pub from_amount: String,
    pub to_chain: u64,
    pub to_token: String,
    pub to_address: String,
    pub max_slippage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    BridgeSwap,
}

impl StepKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Bridge.Swap" => Some(Self::BridgeSwap),
            _ => None,
        }
    }
}
