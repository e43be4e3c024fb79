//! HTTP client for the local language model: a chat endpoint with a
//! completion-endpoint fallback, the way a thin client for a local-only
//! model backend is built in this codebase — `reqwest` with a bounded
//! connect timeout, `wiremock` in tests, no provider abstraction beyond
//! the one local endpoint.

use std::time::Duration;

use serde_json::{json, Value};

use warden_protocol::WardenError;

use crate::history::{Message, Role};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TEMPERATURE: f64 = 0.2;
const DEFAULT_NUM_PREDICT: i64 = 1024;

pub struct ModelClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    num_predict: i64,
}

impl ModelClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            num_predict: DEFAULT_NUM_PREDICT,
        }
    }

    /// Try the chat endpoint; on any failure (network error, non-2xx, empty
    /// completion), fall back to the completion endpoint.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, WardenError> {
        match self.chat(messages).await {
            Ok(text) if !text.is_empty() => Ok(text),
            _ => self.completion(messages).await,
        }
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, WardenError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": messages.iter().map(message_to_json).collect::<Vec<_>>(),
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.num_predict,
            },
        });
        let text = self.post(&url, &body).await?;
        Ok(merge_fragments(&text, "message", "content"))
    }

    async fn completion(&self, messages: &[Message]) -> Result<String, WardenError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "prompt": render_completion_prompt(messages),
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.num_predict,
            },
        });
        let text = self.post(&url, &body).await?;
        Ok(merge_fragments(&text, "", "response"))
    }

    async fn post(&self, url: &str, body: &Value) -> Result<String, WardenError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| WardenError::ModelUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(WardenError::ModelUnavailable(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| WardenError::ModelUnavailable(e.to_string()))
    }
}

fn message_to_json(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    json!({"role": role, "content": message.content})
}

/// Plaintext rendering for the completion fallback: system messages first,
/// then `User:`/`Assistant:` turns in order, ending with a bare `Assistant:`
/// to prompt the next completion. Tool-role messages have no completion-API
/// analogue, so they are folded into the user channel as bracketed notes.
fn render_completion_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages.iter().filter(|m| m.role == Role::System) {
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    for message in messages.iter().filter(|m| m.role != Role::System) {
        match message.role {
            Role::User => prompt.push_str(&format!("User: {}\n", message.content)),
            Role::Assistant => prompt.push_str(&format!("Assistant: {}\n", message.content)),
            Role::Tool => prompt.push_str(&format!("User: [tool result] {}\n", message.content)),
            Role::System => unreachable!("system messages filtered out above"),
        }
    }
    prompt.push_str("Assistant:");
    prompt
}

/// Each line of the response body is parsed as its own JSON object (true
/// whether the backend returned one compact object for `stream: false` or
/// several NDJSON lines for a streamed reply) and the named text fragment
/// is concatenated. `container` is the nested object holding the field for
/// the chat shape (`message.content`); pass `""` to read a top-level field
/// directly (the completion shape's `response`).
fn merge_fragments(body: &str, container: &str, field: &str) -> String {
    let mut out = String::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let target = if container.is_empty() { Some(&value) } else { value.get(container) };
        if let Some(fragment) = target.and_then(|v| v.get(field)).and_then(Value::as_str) {
            out.push_str(fragment);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_turn(text: &str) -> Vec<Message> {
        vec![Message::new(Role::User, text)]
    }

    #[tokio::test]
    async fn chat_endpoint_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"message": {"role": "assistant", "content": "hello"}}).to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = ModelClient::new(server.uri(), "local-model");
        let reply = client.complete(&user_turn("hi")).await.expect("complete");
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn merges_streamed_ndjson_chat_fragments() {
        let server = MockServer::start().await;
        let body = format!(
            "{}\n{}\n",
            serde_json::json!({"message": {"content": "hel"}}),
            serde_json::json!({"message": {"content": "lo"}}),
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let client = ModelClient::new(server.uri(), "local-model");
        let reply = client.complete(&user_turn("hi")).await.expect("complete");
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn falls_back_to_completion_endpoint_when_chat_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"response": "fallback reply"}).to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = ModelClient::new(server.uri(), "local-model");
        let reply = client.complete(&user_turn("hi")).await.expect("complete");
        assert_eq!(reply, "fallback reply");
    }

    #[test]
    fn completion_prompt_prepends_system_and_ends_with_assistant_marker() {
        let messages = vec![
            Message::new(Role::System, "You are terse."),
            Message::new(Role::User, "hi"),
            Message::new(Role::Assistant, "hello"),
        ];
        let prompt = render_completion_prompt(&messages);
        assert_eq!(prompt, "You are terse.\nUser: hi\nAssistant: hello\nAssistant:");
    }
}
