use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{name, description?, inputSchema?}` — enough to render a tool into a
/// prompt fragment; the schema is otherwise opaque to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// A single request frame sent to the tool server: `{name, arguments}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub r#type: String,
    pub text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            r#type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Only one content kind exists today (`text`); this stays an enum, rather
/// than `TextContent` directly, so a future `image`/`resource` block can be
/// added without breaking the wire shape (`type` discriminates on its own
/// field instead of an externally-added tag, so `#[serde(untagged)]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text(TextContent),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextContent::new(text))
    }
}

/// The confirmation envelope carried in `structuredContent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredContent {
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl StructuredContent {
    pub fn none() -> Self {
        Self {
            requires_confirmation: false,
            token: None,
            reason: None,
            expires_at: None,
        }
    }

    pub fn confirmation(token: String, reason: String, expires_at: String) -> Self {
        Self {
            requires_confirmation: true,
            token: Some(token),
            reason: Some(reason),
            expires_at: Some(expires_at),
        }
    }
}

/// `{content, structuredContent?}` — the full response frame for a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<StructuredContent>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
        }
    }

    pub fn text_with_structured(text: impl Into<String>, structured: StructuredContent) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: Some(structured),
        }
    }

    /// Concatenate the text of every content block, the way the agent loop
    /// turns a tool response into a single tool-role history message.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text(t) => t.text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
