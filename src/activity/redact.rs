//! Write-time payload hygiene for the activity log.
//!
//! Tool inputs and outputs routinely carry credentials and can be arbitrarily
//! large. Before anything reaches the `activities` table, sensitive fields
//! are masked and oversized payloads truncated. Raw payloads are never
//! persisted anywhere, so redaction cannot be undone.

use serde_json::Value;

/// Marker written in place of a sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Largest serialized payload stored per activity column.
pub const MAX_PAYLOAD_LEN: usize = 10_000;

const TRUNCATION_SUFFIX: &str = "\n... [truncated]";

/// Key fragments that mark a field as sensitive. Compared against keys
/// lowercased with `-` and `_` stripped, so `API-Key`, `api_key`, and
/// `apiKey` all match.
const SENSITIVE_FRAGMENTS: &[&str] = &[
    "apikey",
    "password",
    "passwd",
    "pwd",
    "secret",
    "token",
    "credential",
    "privatekey",
    "sshkey",
];

/// Serialize a JSON payload with sensitive fields masked and the result
/// capped at [`MAX_PAYLOAD_LEN`].
pub fn sanitize_payload(value: &Value) -> String {
    let mut copy = value.clone();
    redact_value(&mut copy);
    truncate_payload(&copy.to_string())
}

/// Recursively mask sensitive fields in place. Recurses through objects and
/// arrays; scalar values under a sensitive key are replaced wholesale.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *entry = Value::String(REDACTED.to_string());
                } else {
                    redact_value(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        _ => {}
    }
}

/// Cap a payload at [`MAX_PAYLOAD_LEN`], marking the cut.
pub fn truncate_payload(payload: &str) -> String {
    if payload.len() <= MAX_PAYLOAD_LEN {
        return payload.to_string();
    }
    let budget = MAX_PAYLOAD_LEN - TRUNCATION_SUFFIX.len();
    // Cut on a char boundary at or below the budget
    let mut end = budget;
    while end > 0 && !payload.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_SUFFIX}", &payload[..end])
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .to_lowercase()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_sensitive_keys_in_any_spelling() {
        let mut value = json!({
            "api_key": "sk-123",
            "API-Key": "sk-456",
            "Authorization_Token": "bearer xyz",
            "path": "/some/file"
        });
        redact_value(&mut value);

        assert_eq!(value["api_key"], REDACTED);
        assert_eq!(value["API-Key"], REDACTED);
        assert_eq!(value["Authorization_Token"], REDACTED);
        assert_eq!(value["path"], "/some/file");
    }

    #[test]
    fn recurses_into_nested_structures() {
        let mut value = json!({
            "config": {
                "db": { "password": "hunter2", "host": "localhost" }
            },
            "accounts": [
                { "ssh_key": "AAAA...", "name": "ci" },
                { "name": "dev" }
            ]
        });
        redact_value(&mut value);

        assert_eq!(value["config"]["db"]["password"], REDACTED);
        assert_eq!(value["config"]["db"]["host"], "localhost");
        assert_eq!(value["accounts"][0]["ssh_key"], REDACTED);
        assert_eq!(value["accounts"][0]["name"], "ci");
        assert_eq!(value["accounts"][1]["name"], "dev");
    }

    #[test]
    fn non_object_payloads_pass_through() {
        let mut value = json!("plain string with password word");
        redact_value(&mut value);
        // Only keys are matched, not values
        assert_eq!(value, json!("plain string with password word"));
    }

    #[test]
    fn truncation_preserves_limit_and_marks_cut() {
        let long = "x".repeat(MAX_PAYLOAD_LEN + 500);
        let truncated = truncate_payload(&long);
        assert_eq!(truncated.len(), MAX_PAYLOAD_LEN);
        assert!(truncated.ends_with(TRUNCATION_SUFFIX));

        let short = "short payload";
        assert_eq!(truncate_payload(short), short);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multibyte characters straddling the cut must not panic
        let long = "é".repeat(MAX_PAYLOAD_LEN);
        let truncated = truncate_payload(&long);
        assert!(truncated.len() <= MAX_PAYLOAD_LEN);
        assert!(truncated.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn sanitize_combines_redaction_and_truncation() {
        let value = json!({ "api_key": "sk-123", "data": "ok" });
        let sanitized = sanitize_payload(&value);
        assert!(sanitized.contains(REDACTED));
        assert!(!sanitized.contains("sk-123"));
    }
}
