use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Adapter {0} was not found. Please check the config.")]
    AdapterNotFound(String),

    #[error("Adapter {id} failed to initialize: {source}")]
    AdapterInit {
        id: String,
        #[source]
        source: AdapterError,
    },

    #[error("Flow with id {0} was not found. Please check the config.")]
    FlowNotFound(String),

    #[error("Step at index {index} is not valid: {}", .errors.join(","))]
    StepInvalid { index: usize, errors: Vec<String> },

    #[error("Flow {flow_id} failed validation: {source}")]
    FlowValidation {
        flow_id: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Flow {flow_id} failed execution: {reason}")]
    FlowExecution { flow_id: String, reason: String },

    #[error("Engine has not been initialized")]
    NotInitialized,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    #[error("Failed to initialize adapter: {0}")]
    InitFailed(String),

    #[error("No configuration found for adapter {0}")]
    ConfigMissing(String),

    #[error("Adapter {0} has not been initialized")]
    NotInitialized(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found at {0}")]
    NotFound(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Expected '{0}' section was not found in the config file")]
    MissingSection(&'static str),

    #[error("Duplicate adapter id found: {0}")]
    DuplicateAdapterId(String),

    #[error("Duplicate flow id found: {0}")]
    DuplicateFlowId(String),

    #[error("Flow {0} has no steps")]
    EmptyFlow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Step-config validation failure raised inside an adapter's validation
/// strategies. Carries the general category message plus the specific
/// violated invariant, with optional decode context paths.
///
/// Never crosses the adapter boundary as an error: `is_valid` flattens it
/// into the `errors` list of a [`ValidationResult`](crate::ValidationResult).
#[derive(Error, Debug, Clone)]
#[error("Invalid step configuration provided: {cause}")]
pub struct ValidationError {
    cause: String,
    context: Vec<String>,
}

impl ValidationError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            context: Vec::new(),
        }
    }

    /// Structural decode failure, annotated with the decode error path(s).
    pub fn decode(context: Vec<String>) -> Self {
        Self {
            cause: "failed to decode step config".to_string(),
            context,
        }
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Flatten into the error entries reported through a ValidationResult:
    /// the prefixed message first, then any decode context lines.
    pub fn into_errors(self) -> Vec<String> {
        let mut errors = vec![self.to_string()];
        errors.extend(self.context);
        errors
    }
}
