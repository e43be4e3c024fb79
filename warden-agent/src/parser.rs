//! Extracts a single [`Action`] from free-form model output. A naive
//! "find the last `}`" approach breaks the moment a tool argument string
//! contains a brace or the model wraps its answer in explanatory prose, so
//! this tracks string/escape state while scanning for the first balanced
//! object — a streaming JSON scanner, not a regex.

use serde_json::Value;

use warden_protocol::{Action, WardenError};

pub fn parse_action(raw: &str) -> Result<Action, WardenError> {
    let unfenced = strip_fence(raw.trim());
    let json_text = extract_first_json_object(&unfenced)
        .ok_or_else(|| WardenError::ActionInvalid("no JSON object found in model output".to_string()))?;

    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| WardenError::ActionInvalid(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(WardenError::ActionInvalid(
            "top-level action must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| WardenError::ActionInvalid(format!("invalid action: {e}")))
}

/// Strip one leading fenced-code marker (with an optional language tag, e.g.
/// ` ```json `) and one trailing ` ``` `. Text with no fence is returned
/// unchanged.
fn strip_fence(s: &str) -> String {
    let Some(rest) = s.strip_prefix("```") else {
        return s.to_string();
    };
    let after_lang = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    after_lang.strip_suffix("```").unwrap_or(after_lang).trim().to_string()
}

/// Scan `s` for the first `{`, then walk forward tracking brace depth and
/// quoted-string state (with backslash-escape awareness) until that brace
/// closes. Returns the matched slice, braces included.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let rest = &s[start..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (offset, c) in rest.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = offset + c.len_utf8();
                    return Some(&rest[..end]);
                }
            }
            _ => {}
        }
    }

    None
}
