//! Adapter library
//!
//! Concrete adapters for the families of external financial operations the
//! engine can orchestrate: centralized-exchange trading (ccxt), cross-chain
//! bridge swaps (squid) and on-chain DEX swaps (mento).

pub mod ccxt;
mod evm;
pub mod mento;
pub mod squid;

pub use ccxt::CcxtAdapterFactory;
pub use mento::MentoAdapterFactory;
pub use squid::SquidAdapterFactory;

use std::sync::Arc;
use tradecore::ConfigProvider;
use tradeengine::AdapterRegistry;

/// Register all bundled adapters with a registry
pub fn register_all(registry: &mut AdapterRegistry, config: Arc<ConfigProvider>) {
    registry.register(Arc::new(CcxtAdapterFactory::new(Arc::clone(&config))));
    registry.register(Arc::new(SquidAdapterFactory::new(Arc::clone(&config))));
    registry.register(Arc::new(MentoAdapterFactory::new(config)));
}
