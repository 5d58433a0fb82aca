//! Core abstractions for the trade flow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the flow/step data model, the adapter capability
//! contract, the error taxonomy, execution events and the config provider.

mod adapter;
mod config;
mod error;
mod events;
mod flow;

pub use adapter::{Adapter, ExecutionResult, ValidationResult};
pub use config::{AdapterConfig, Config, ConfigProvider};
pub use error::{AdapterError, ConfigError, EngineError, ValidationError};
pub use events::{EventBus, ExecutionEvent, ExecutionId};
pub use flow::{Flow, Step};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
