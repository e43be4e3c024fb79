use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model-emitted instruction for what the agent loop should do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Final {
        text: String,
    },
    Tool {
        server: String,
        tool: String,
        #[serde(default = "empty_object")]
        args: Value,
    },
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
