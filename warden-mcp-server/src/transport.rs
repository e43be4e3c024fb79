//! The line-oriented wire protocol: one JSON object per line in each
//! direction. The client-server framing is treated as an opaque transport
//! (assumed to be the public Model Context Protocol in a real deployment);
//! this is the minimal line-delimited shape actually implemented here, not
//! a full JSON-RPC handshake.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_protocol::{ContentBlock, StructuredContent, ToolInfo};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListTools {
        id: String,
    },
    CallTool {
        id: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentBlock>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "structuredContent")]
    pub structured_content: Option<StructuredContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn tools(id: String, tools: Vec<ToolInfo>) -> Self {
        Self {
            id,
            ok: true,
            tools: Some(tools),
            content: None,
            structured_content: None,
            error: None,
        }
    }

    pub fn tool_result(id: String, content: Vec<ContentBlock>, structured_content: Option<StructuredContent>) -> Self {
        Self {
            id,
            ok: true,
            tools: None,
            content: Some(content),
            structured_content,
            error: None,
        }
    }

    pub fn error(id: String, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            tools: None,
            content: None,
            structured_content: None,
            error: Some(error.into()),
        }
    }
}
