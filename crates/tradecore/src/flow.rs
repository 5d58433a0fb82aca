use serde::{Deserialize, Serialize};

/// A named, ordered sequence of steps representing one end-to-end
/// financial operation. Loaded once from config and read-only afterwards;
/// the engine references flows, it never copies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
}

impl Flow {
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}

/// One unit of work within a flow. The type tag identifies the operation
/// kind (e.g. "Exchange.Swap"), the adapter field names the registered
/// adapter that handles it, and the config payload's shape is adapter-
/// and type-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub step_type: String,
    pub adapter: String,
    pub config: serde_json::Value,
}
