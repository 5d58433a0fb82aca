use crate::{AdapterError, Step, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Core trait that all adapters implement.
///
/// An adapter binds one family of external financial operations (exchange
/// trades, bridge swaps, DEX swaps) to the engine. Instances are shared as
/// `Arc<dyn Adapter>` across validation and execution, so implementations
/// keep their post-init state behind interior mutability.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Implementation reference name (e.g. "ccxt", "squid")
    fn adapter_id(&self) -> &str;

    /// Initialize stateful resources (decode adapter config, handshake with
    /// the external service). Idempotent: a second call on an initialized
    /// adapter returns Ok without side effects.
    async fn init(&self) -> Result<(), AdapterError>;

    /// Validate a step's opaque config against the expected shape for its
    /// type, then run the type's semantic checks. Any internal failure is
    /// captured as an entry in the result's error list, never returned as
    /// an error.
    async fn is_valid(&self, step: &Step) -> ValidationResult;

    /// Perform the side-effecting operation for a step. Any internal failure
    /// (network error, rejected transaction, missing receipt) is captured as
    /// `success: false` with a descriptive message in the payload.
    async fn execute(&self, step: &Step) -> ExecutionResult;
}

/// Outcome of validating a single step, returned (never thrown) from the
/// adapter boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

impl From<ValidationError> for ValidationResult {
    fn from(err: ValidationError) -> Self {
        Self::invalid(err.into_errors())
    }
}

/// Outcome of executing a single step. On success the payload carries an
/// operation receipt or identifier; on failure an `errorMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub data: serde_json::Value,
}

impl ExecutionResult {
    pub fn succeeded(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: json!({ "errorMessage": message.into() }),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.data.get("errorMessage").and_then(|v| v.as_str())
    }
}
