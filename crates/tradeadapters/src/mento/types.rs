use serde::Deserialize;

/// Initialization payload for the DEX adapter: the venue's API endpoint and
/// the chain it trades on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentoAdapterConfig {
    pub api_url: String,
    pub chain_id: u64,
}

/// `Dex.Swap` step payload. Token fields are contract addresses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexSwapConfig {
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub max_slippage: f64,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    DexSwap,
}

impl StepKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Dex.Swap" => Some(Self::DexSwap),
            _ => None,
        }
    }
}
