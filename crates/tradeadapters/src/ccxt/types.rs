use serde::Deserialize;
use std::fmt;

/// Exchanges this adapter knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeId {
    Binance,
}

impl ExchangeId {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "binance" => Some(Self::Binance),
            _ => None,
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
        }
    }
}

/// Chains the adapter can route withdrawals and deposits over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainId {
    Ethereum,
    Celo,
}

impl ChainId {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ETHEREUM" => Some(Self::Ethereum),
            "CELO" => Some(Self::Celo),
            _ => None,
        }
    }

    /// Network parameter the exchange expects for deposit/withdrawal calls.
    pub fn network_param(&self) -> &'static str {
        match self {
            Self::Ethereum => "ERC20",
            Self::Celo => "CELO",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethereum => write!(f, "ETHEREUM"),
            Self::Celo => write!(f, "CELO"),
        }
    }
}

/// Step kinds this adapter owns a validation strategy for. Parsed from the
/// step's type tag; anything else is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Swap,
    WithdrawCrypto,
    DepositCrypto,
}

impl StepKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Exchange.Swap" => Some(Self::Swap),
            "Exchange.WithdrawCrypto" => Some(Self::WithdrawCrypto),
            "Exchange.DepositCrypto" => Some(Self::DepositCrypto),
            _ => None,
        }
    }
}

/// Initialization payload for the ccxt adapter: one credentials entry per
/// exchange it should connect to.
#[derive(Debug, Clone, Deserialize)]
pub struct CcxtAdapterConfig {
    pub exchanges: Vec<ExchangeCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeCredentials {
    pub id: String,
    pub api_key: String,
    pub api_secret: String,
}

/// `Exchange.Swap` step payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapConfig {
    pub exchange: String,
    pub base: String,
    pub quote: String,
    pub amount: f64,
}

impl SwapConfig {
    /// Normalized market symbol, e.g. "BTC/USDT"
    pub fn symbol(&self) -> String {
        format!(
            "{}/{}",
            self.base.trim().to_uppercase(),
            self.quote.trim().to_uppercase()
        )
    }
}

/// `Exchange.WithdrawCrypto` step payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawCryptoConfig {
    pub exchange: String,
    pub asset: String,
    pub chain_id: String,
    pub destination_address: String,
    pub amount: f64,
}

/// `Exchange.DepositCrypto` step payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositCryptoConfig {
    pub exchange: String,
    pub asset: String,
    pub to_chain: String,
    pub to_address: String,
    pub amount: f64,
}
