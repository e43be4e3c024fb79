//! The chat controller: turns a user message into a model call, dispatches
//! the model's chosen tool, and repeats until a final answer or the step
//! budget runs out. Orchestration lives here; the decision logic it calls
//! into (action parsing, catalogue rendering, wizard parsing) is kept in
//! separate pure, independently-tested modules rather than tested through
//! the event loop itself.

use std::collections::HashSet;

use serde_json::{json, Value};

use warden_protocol::{Action, WardenError};

use crate::catalogue::render_catalogue;
use crate::connection::ConnectedServer;
use crate::history::{ConversationHistory, Message, Role};
use crate::model::ModelClient;
use crate::wizard::{expresses_ssh_key_intent, mentions_explicit_defaults, parse_wizard_form, WIZARD_PROMPT};

const SYSTEM_PREAMBLE: &str = "You are a terminal automation assistant. You can inspect files, run commands, and manage SSH keys only by calling the tools listed below; you have no other way to affect the system.";

const ACTION_FORMAT_INSTRUCTIONS: &str = "Respond with exactly one JSON object and nothing else: either {\"type\": \"final\", \"text\": \"...\"} to answer the user directly, or {\"type\": \"tool\", \"server\": \"...\", \"tool\": \"...\", \"args\": {...}} to call one tool.";

const RETRY_NUDGE: &str = "Return ONLY a single valid JSON object.";

pub struct AgentLoopConfig {
    pub max_steps: usize,
    pub terminal_server_name: String,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self { max_steps: 6, terminal_server_name: "terminal-server".to_string() }
    }
}

pub struct AgentLoop {
    history: ConversationHistory,
    awaiting_ssh_wizard_input: bool,
    model: ModelClient,
    servers: Vec<ConnectedServer>,
    config: AgentLoopConfig,
}

impl AgentLoop {
    pub fn new(model: ModelClient, servers: Vec<ConnectedServer>) -> Self {
        Self::with_config(model, servers, AgentLoopConfig::default())
    }

    pub fn with_config(model: ModelClient, servers: Vec<ConnectedServer>, config: AgentLoopConfig) -> Self {
        Self { history: ConversationHistory::new(), awaiting_ssh_wizard_input: false, model, servers, config }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub async fn handle_user_message(&mut self, user_text: &str) -> String {
        if self.awaiting_ssh_wizard_input {
            self.awaiting_ssh_wizard_input = false;
            self.history.push(Role::User, user_text);
            let args = parse_wizard_form(user_text);
            let response = self.call_generate_ssh_key(args).await;
            self.history.push(Role::Assistant, response.clone());
            return response;
        }

        if expresses_ssh_key_intent(user_text) {
            self.history.push(Role::User, user_text);
            let response = if mentions_explicit_defaults(user_text) {
                self.call_generate_ssh_key(json!({})).await
            } else {
                self.awaiting_ssh_wizard_input = true;
                WIZARD_PROMPT.to_string()
            };
            self.history.push(Role::Assistant, response.clone());
            return response;
        }

        self.history.push(Role::User, user_text);
        let response = self.run_reasoning_loop().await;
        self.history.push(Role::Assistant, response.clone());
        response
    }

    async fn call_generate_ssh_key(&self, args: Value) -> String {
        match self.dispatch_tool(&self.config.terminal_server_name, "generate_ssh_key", args).await {
            Ok((text, Some(structured))) => confirmation_instructions(&text, &structured),
            Ok((text, None)) => text,
            Err(e) => format!("Could not generate an SSH key: {e}"),
        }
    }

    async fn run_reasoning_loop(&mut self) -> String {
        let mut seen_calls: HashSet<String> = HashSet::new();
        let max_steps = self.config.max_steps;

        for step in 0..max_steps {
            let catalogue = render_catalogue(&self.servers);
            let action = match self.next_action(&catalogue).await {
                Ok(Some(action)) => action,
                Ok(None) => {
                    return "I couldn't produce a valid action for that. Could you rephrase your request?"
                        .to_string()
                }
                Err(e) => return format!("The model is unavailable: {e}"),
            };

            let (server, tool, args) = match action {
                Action::Final { text } => return text,
                Action::Tool { server, tool, args } => (server, tool, args),
            };

            if server == self.config.terminal_server_name && tool == "confirm" {
                return "Confirmations are not issued automatically — call confirm yourself with the token you were given.".to_string();
            }

            if tool == "generate_ssh_key" && is_empty_object(&args) {
                self.awaiting_ssh_wizard_input = true;
                self.history.push(Role::Tool, WIZARD_PROMPT);
                return WIZARD_PROMPT.to_string();
            }

            let key = call_key(&server, &tool, &args);
            if seen_calls.contains(&key) {
                self.history.push(
                    Role::Tool,
                    format!("{server}.{tool} was already called this turn with the same arguments; skipping the repeat."),
                );
                continue;
            }
            seen_calls.insert(key);

            if within_budget_warning_window(step, max_steps) {
                self.history.push(
                    Role::Tool,
                    "Budget warning: only a couple of turns remain; give a final answer soon.",
                );
            }

            let (text, structured) = match self.dispatch_tool(&server, &tool, args.clone()).await {
                Ok(result) => result,
                Err(e) => {
                    self.history.push(Role::Tool, format!("Tool error: {e}"));
                    continue;
                }
            };
            self.history.push(Role::Tool, text.clone());

            if server == self.config.terminal_server_name && tool == "find_files" {
                return text;
            }
            if server == self.config.terminal_server_name
                && tool == "run"
                && args.get("command").and_then(Value::as_str) == Some("date")
            {
                return text;
            }

            if let Some(structured) = &structured {
                if structured.get("requiresConfirmation").and_then(Value::as_bool) == Some(true) {
                    return confirmation_instructions(&text, structured);
                }
            }
        }

        "I've used up my turns for this request without reaching a final answer. Please try again or narrow the request.".to_string()
    }

    /// Call the model, parse its action, and on a parse failure retry once
    /// with an extra nudge. `Ok(None)` means both attempts failed to parse —
    /// a user-facing (not a connectivity) failure.
    async fn next_action(&mut self, catalogue: &str) -> Result<Option<Action>, WardenError> {
        let messages = render_model_messages(&self.history, catalogue);
        let raw = self.model.complete(&messages).await?;
        self.history.push(Role::Assistant, raw.clone());
        if let Ok(action) = crate::parser::parse_action(&raw) {
            return Ok(Some(action));
        }

        self.history.push(Role::System, RETRY_NUDGE);
        let messages = render_model_messages(&self.history, catalogue);
        let raw = self.model.complete(&messages).await?;
        self.history.push(Role::Assistant, raw.clone());
        Ok(crate::parser::parse_action(&raw).ok())
    }

    async fn dispatch_tool(&self, server_name: &str, tool: &str, args: Value) -> Result<(String, Option<Value>), WardenError> {
        let server = self
            .servers
            .iter()
            .find(|s| s.name == server_name)
            .ok_or_else(|| WardenError::ActionInvalid(format!("unknown server '{server_name}'")))?;
        let (content, structured) = server.call_tool(tool, args).await?;
        Ok((join_content_text(&content), structured))
    }
}

fn render_model_messages(history: &ConversationHistory, catalogue: &str) -> Vec<Message> {
    let system_text = format!("{SYSTEM_PREAMBLE}\n\n{catalogue}\n\n{ACTION_FORMAT_INSTRUCTIONS}");
    let mut messages = vec![Message::new(Role::System, system_text)];
    messages.extend(history.messages().iter().cloned());
    messages
}

fn call_key(server: &str, tool: &str, args: &Value) -> String {
    format!("{server}.{tool} {args}")
}

fn within_budget_warning_window(step: usize, max_steps: usize) -> bool {
    max_steps.saturating_sub(step + 1) <= 2
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

fn join_content_text(content: &Value) -> String {
    content
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn confirmation_instructions(text: &str, structured: &Value) -> String {
    if structured.get("requiresConfirmation").and_then(Value::as_bool) == Some(true) {
        let token = structured.get("token").and_then(Value::as_str).unwrap_or("");
        format!("{text}\n\nThis requires confirmation. Call confirm with token \"{token}\" to proceed.")
    } else {
        text.to_string()
    }
}
