use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tradecore::{
    Adapter, AdapterError, ConfigProvider, EngineError, EventBus, ExecutionId, ExecutionResult,
    Flow, Step, ValidationResult,
};
use tradeengine::{AdapterFactory, AdapterMap, AdapterRegistry, Engine, FlowExecutor, FlowValidator};

/// Scripted adapter double: reports configured step types as invalid or
/// failing, and records every call in a shared log.
#[derive(Default)]
struct MockAdapter {
    id: String,
    invalid: HashMap<String, Vec<String>>,
    fail_exec: HashSet<String>,
    init_error: Option<String>,
    init_calls: AtomicUsize,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAdapter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn with_invalid_step(mut self, step_type: &str, errors: Vec<&str>) -> Self {
        self.invalid.insert(
            step_type.to_string(),
            errors.into_iter().map(String::from).collect(),
        );
        self
    }

    fn with_failing_step(mut self, step_type: &str) -> Self {
        self.fail_exec.insert(step_type.to_string());
        self
    }

    fn with_init_error(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn adapter_id(&self) -> &str {
        &self.id
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(message) => Err(AdapterError::InitFailed(message.clone())),
            None => Ok(()),
        }
    }

    async fn is_valid(&self, step: &Step) -> ValidationResult {
        self.calls
            .lock()
            .unwrap()
            .push(format!("validate:{}", step.step_type));
        match self.invalid.get(&step.step_type) {
            Some(errors) => ValidationResult::invalid(errors.clone()),
            None => ValidationResult::valid(),
        }
    }

    async fn execute(&self, step: &Step) -> ExecutionResult {
        self.calls
            .lock()
            .unwrap()
            .push(format!("execute:{}", step.step_type));
        if self.fail_exec.contains(&step.step_type) {
            ExecutionResult::failed(format!("{} was rejected upstream", step.step_type))
        } else {
            ExecutionResult::succeeded(json!({ "receipt": step.step_type }))
        }
    }
}

struct MockFactory {
    adapter: Arc<MockAdapter>,
}

impl AdapterFactory for MockFactory {
    fn adapter_ref(&self) -> &str {
        &self.adapter.id
    }

    fn create(&self) -> Arc<dyn Adapter> {
        Arc::clone(&self.adapter) as Arc<dyn Adapter>
    }
}

fn step(step_type: &str, adapter: &str) -> Step {
    Step {
        step_type: step_type.to_string(),
        adapter: adapter.to_string(),
        config: json!({}),
    }
}

fn flow(id: &str, steps: Vec<Step>) -> Flow {
    Flow {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        steps,
    }
}

fn adapter_map(adapters: Vec<Arc<MockAdapter>>) -> AdapterMap {
    adapters
        .into_iter()
        .map(|a| (a.id.clone(), a as Arc<dyn Adapter>))
        .collect()
}

/// Config with one flow of three mock steps, all bound to adapter "mock".
fn three_step_config() -> Arc<ConfigProvider> {
    let yaml = r#"
adapters:
  - id: mock
    adapter: mock
    config: {}
flows:
  - id: chain
    name: Chain
    description: Three chained steps
    steps:
      - { type: First, adapter: mock, config: {} }
      - { type: Second, adapter: mock, config: {} }
      - { type: Third, adapter: mock, config: {} }
"#;
    Arc::new(ConfigProvider::from_yaml(yaml).unwrap())
}

fn engine_with(config: Arc<ConfigProvider>, adapters: Vec<Arc<MockAdapter>>) -> Engine {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(Arc::new(MockFactory { adapter }));
    }
    Engine::new(config, registry)
}

#[test]
fn registry_returns_the_same_cached_instance() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(MockFactory { adapter }));

    let first = registry.create("mock").unwrap();
    let second = registry.create("mock").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn registry_rejects_unregistered_adapter() {
    let mut registry = AdapterRegistry::new();

    let err = registry.create("ghost").unwrap_err();
    assert!(matches!(err, EngineError::AdapterNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn validator_accepts_a_flow_of_valid_steps() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let adapters = adapter_map(vec![Arc::clone(&adapter)]);
    let flow = flow(
        "f",
        vec![step("A", "mock"), step("B", "mock"), step("C", "mock")],
    );

    FlowValidator::new().validate(&flow, &adapters).await.unwrap();

    assert_eq!(adapter.calls(), vec!["validate:A", "validate:B", "validate:C"]);
}

#[tokio::test]
async fn validator_fails_fast_on_the_first_invalid_step() {
    let adapter = Arc::new(
        MockAdapter::new("mock").with_invalid_step("B", vec!["bad exchange", "bad asset"]),
    );
    let adapters = adapter_map(vec![Arc::clone(&adapter)]);
    let flow = flow(
        "f",
        vec![step("A", "mock"), step("B", "mock"), step("C", "mock")],
    );

    let err = FlowValidator::new().validate(&flow, &adapters).await.unwrap_err();

    match err {
        EngineError::StepInvalid { index, errors } => {
            assert_eq!(index, 1);
            assert_eq!(errors, vec!["bad exchange", "bad asset"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Step C was never validated.
    assert_eq!(adapter.calls(), vec!["validate:A", "validate:B"]);
}

#[tokio::test]
async fn validator_reports_missing_adapter() {
    let adapters = adapter_map(vec![]);
    let flow = flow("f", vec![step("A", "ghost")]);

    let err = FlowValidator::new().validate(&flow, &adapters).await.unwrap_err();
    assert!(matches!(err, EngineError::AdapterNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn executor_runs_each_step_once_in_declaration_order() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let adapters = adapter_map(vec![Arc::clone(&adapter)]);
    let flow = flow(
        "f",
        vec![step("A", "mock"), step("B", "mock"), step("C", "mock")],
    );
    let events = EventBus::new(16);

    let result = FlowExecutor::new()
        .execute(&flow, &adapters, &events, ExecutionId::new_v4())
        .await
        .unwrap();

    assert!(result.success);
    // The executor surfaces the last completed step's result.
    assert_eq!(result.data, json!({ "receipt": "C" }));
    assert_eq!(adapter.calls(), vec!["execute:A", "execute:B", "execute:C"]);
}

#[tokio::test]
async fn executor_stops_at_the_first_failing_step() {
    let adapter = Arc::new(MockAdapter::new("mock").with_failing_step("B"));
    let adapters = adapter_map(vec![Arc::clone(&adapter)]);
    let flow = flow(
        "f",
        vec![step("A", "mock"), step("B", "mock"), step("C", "mock")],
    );
    let events = EventBus::new(16);

    let result = FlowExecutor::new()
        .execute(&flow, &adapters, &events, ExecutionId::new_v4())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_message(), Some("B was rejected upstream"));
    assert_eq!(adapter.calls(), vec!["execute:A", "execute:B"]);
}

#[tokio::test]
async fn executor_emits_step_events() {
    let adapter = Arc::new(MockAdapter::new("mock").with_failing_step("B"));
    let adapters = adapter_map(vec![Arc::clone(&adapter)]);
    let flow = flow("f", vec![step("A", "mock"), step("B", "mock")]);
    let events = EventBus::new(16);
    let mut rx = events.subscribe();

    FlowExecutor::new()
        .execute(&flow, &adapters, &events, ExecutionId::new_v4())
        .await
        .unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(match event {
            tradecore::ExecutionEvent::StepStarted { step_index, .. } => {
                format!("started:{step_index}")
            }
            tradecore::ExecutionEvent::StepCompleted { step_index, .. } => {
                format!("completed:{step_index}")
            }
            tradecore::ExecutionEvent::StepFailed { step_index, .. } => {
                format!("failed:{step_index}")
            }
            _ => "other".to_string(),
        });
    }
    assert_eq!(kinds, vec!["started:0", "completed:0", "started:1", "failed:1"]);
}

#[tokio::test]
async fn engine_init_is_idempotent() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let mut engine = engine_with(three_step_config(), vec![Arc::clone(&adapter)]);

    engine.init().await.unwrap();
    engine.init().await.unwrap();

    assert_eq!(adapter.init_calls(), 1);
}

#[tokio::test]
async fn engine_boot_aborts_when_any_adapter_fails_to_init() {
    let yaml = r#"
adapters:
  - { id: good, adapter: good, config: {} }
  - { id: bad, adapter: bad, config: {} }
flows:
  - id: f
    name: f
    description: d
    steps:
      - { type: A, adapter: good, config: {} }
"#;
    let config = Arc::new(ConfigProvider::from_yaml(yaml).unwrap());
    let good = Arc::new(MockAdapter::new("good"));
    let bad = Arc::new(MockAdapter::new("bad").with_init_error("handshake refused"));
    let mut engine = engine_with(config, vec![good, bad]);

    let err = engine.init().await.unwrap_err();
    match err {
        EngineError::AdapterInit { id, source } => {
            assert_eq!(id, "bad");
            assert!(source.to_string().contains("handshake refused"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // No partial startup: the engine never reached Ready.
    let err = engine.execute("f").await.unwrap_err();
    assert!(matches!(err, EngineError::NotInitialized));
}

#[tokio::test]
async fn engine_rejects_unknown_flow_id() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let mut engine = engine_with(three_step_config(), vec![adapter]);
    engine.init().await.unwrap();

    let err = engine.execute("missing").await.unwrap_err();
    assert!(matches!(err, EngineError::FlowNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn engine_wraps_validation_failure_with_flow_id() {
    let adapter = Arc::new(
        MockAdapter::new("mock").with_invalid_step("Second", vec!["asset not tradeable"]),
    );
    let mut engine = engine_with(three_step_config(), vec![Arc::clone(&adapter)]);
    engine.init().await.unwrap();

    let err = engine.execute("chain").await.unwrap_err();
    match err {
        EngineError::FlowValidation { flow_id, source } => {
            assert_eq!(flow_id, "chain");
            assert!(source.to_string().contains("index 1"));
            assert!(source.to_string().contains("asset not tradeable"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Validation failed before any execution call was made.
    assert!(adapter.calls().iter().all(|c| c.starts_with("validate:")));
}

#[tokio::test]
async fn engine_executes_a_valid_flow_end_to_end() {
    let adapter = Arc::new(MockAdapter::new("mock"));
    let mut engine = engine_with(three_step_config(), vec![Arc::clone(&adapter)]);
    engine.init().await.unwrap();

    let result = engine.execute("chain").await.unwrap();

    assert!(result.success);
    assert_eq!(result.data, json!({ "receipt": "Third" }));
    assert_eq!(
        adapter.calls(),
        vec![
            "validate:First",
            "validate:Second",
            "validate:Third",
            "execute:First",
            "execute:Second",
            "execute:Third",
        ]
    );
}
