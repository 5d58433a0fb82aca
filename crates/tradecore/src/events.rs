use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted while a flow runs. Observability plumbing only: delivery
/// is lossy and nothing in the engine reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    FlowStarted {
        execution_id: ExecutionId,
        flow_id: String,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        execution_id: ExecutionId,
        flow_id: String,
        step_index: usize,
        step_type: String,
        adapter: String,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        execution_id: ExecutionId,
        flow_id: String,
        step_index: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepFailed {
        execution_id: ExecutionId,
        flow_id: String,
        step_index: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },
    FlowCompleted {
        execution_id: ExecutionId,
        flow_id: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Global event bus backed by a broadcast channel.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
}
