//! Renders the tools exposed by every connected server into the prompt
//! fragment the model sees. A pure function of the server list: same input,
//! same text, every time — kept easy to unit-test in isolation from any
//! network or process state.

use serde_json::Value;

use crate::connection::ConnectedServer;

pub fn render_catalogue(servers: &[ConnectedServer]) -> String {
    let mut lines = Vec::new();
    for server in servers {
        lines.push(format!("Server: {}", server.name));
        for tool in &server.tools {
            let description = tool.description.as_deref().unwrap_or("");
            let args = render_args(tool.input_schema.as_ref());
            lines.push(format!(
                "- {}.{} — {description} (args: {args})",
                server.name, tool.name
            ));
        }
    }
    lines.join("\n")
}

fn render_args(schema: Option<&Value>) -> String {
    let Some(schema) = schema else {
        return String::new();
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    // `properties` is a `serde_json::Map`, backed by a `BTreeMap` without
    // the `preserve_order` feature, so iteration order is alphabetical —
    // this is what makes the rendering deterministic without an explicit
    // sort step here.
    properties
        .iter()
        .map(|(key, value_schema)| {
            let ty = schema_type_name(value_schema);
            if required.contains(&key.as_str()) {
                format!("{key}:{ty}")
            } else {
                format!("{key}?:{ty}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn schema_type_name(value_schema: &Value) -> String {
    match value_schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let item_ty = value_schema
                .get("items")
                .map(schema_type_name)
                .unwrap_or_else(|| "any".to_string());
            format!("{item_ty}[]")
        }
        Some(ty) => ty.to_string(),
        None => "any".to_string(),
    }
}
