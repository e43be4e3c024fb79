//! The deterministic SSH-key intent gate and wizard-reply parser. These run
//! before the model ever sees the turn: a user asking for an SSH key always
//! gets the same prompt or the same `generate_ssh_key` call, regardless of
//! what the model would have produced, closing off a class of prompt
//! injection that would otherwise let a model-controlled turn skip the
//! wizard.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

pub const WIZARD_PROMPT: &str = "Generating an SSH key. Reply with \"use defaults\" for an ed25519 key at ~/.ssh/id_ed25519, or describe the type, filename, comment, passphrase, and overwrite behavior you want.";

/// True if the free-form message expresses intent to generate an SSH key:
/// contains both "ssh" and "key", or the single token "ssh-key"/"sshkey".
pub fn expresses_ssh_key_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("ssh-key") || lower.contains("sshkey") || (lower.contains("ssh") && lower.contains("key"))
}

/// True if the message explicitly asks to skip the wizard and use defaults.
pub fn mentions_explicit_defaults(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("use defaults") || lower.contains("defaults") || lower.contains("default")
}

/// Parse a reply to the wizard prompt into `generate_ssh_key` arguments.
/// Always returns a JSON object (possibly empty, meaning "all defaults").
pub fn parse_wizard_form(text: &str) -> Value {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    if lower == "use defaults" || lower == "defaults" || lower == "default" {
        return json!({});
    }

    if bare_word_re().is_match(trimmed)
        && !lower.contains("type")
        && !lower.contains("pass")
        && !lower.contains("comment")
    {
        return json!({ "filename": trimmed });
    }

    let mut args = Map::new();
    if let Some(key_type) = extract_type(trimmed) {
        args.insert("type".to_string(), json!(key_type));
    }
    if let Some(filename) = extract_filename(trimmed) {
        args.insert("filename".to_string(), json!(filename));
    }
    if let Some(comment) = extract_comment(trimmed) {
        args.insert("comment".to_string(), json!(comment));
    }
    if let Some(passphrase) = extract_passphrase(&lower) {
        args.insert("passphrase".to_string(), json!(passphrase));
    }
    if let Some(overwrite) = extract_overwrite(&lower) {
        args.insert("overwrite".to_string(), json!(overwrite));
    }
    Value::Object(args)
}

fn bare_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"))
}

fn extract_type(text: &str) -> Option<&'static str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(ed25519|rsa)\b").expect("valid regex"));
    match re.captures(text)?.get(1)?.as_str().to_lowercase().as_str() {
        "ed25519" => Some("ed25519"),
        "rsa" => Some("rsa"),
        _ => None,
    }
}

fn extract_filename(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)filename\s*[:=]?\s*([A-Za-z0-9._-]+)").expect("valid regex"));
    re.captures(text).map(|c| c[1].to_string())
}

fn extract_comment(text: &str) -> Option<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| Regex::new(r#"(?i)comment\s*[:=]?\s*"([^"]*)""#).expect("valid regex"));
    if let Some(c) = quoted.captures(text) {
        return Some(c[1].to_string());
    }

    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let trailing = TRAILING.get_or_init(|| Regex::new(r"(?i)comment\s*[:=]?\s+(.+)$").expect("valid regex"));
    trailing.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_passphrase(lower_text: &str) -> Option<String> {
    if lower_text.contains("no passphrase") || lower_text.contains("empty passphrase") {
        return Some(String::new());
    }
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"(?i)passphrase\s*[:=]?\s*"([^"]*)""#).expect("valid regex"));
    re.captures(lower_text).map(|c| c[1].to_string())
}

fn extract_overwrite(lower_text: &str) -> Option<bool> {
    if lower_text.contains("no overwrite") {
        Some(false)
    } else if lower_text.contains("overwrite") {
        Some(true)
    } else {
        None
    }
}
