use crate::error::SanitizeError;
use crate::event::{EventPayload, EventRecord};
use serde_json::Value;
use tracing::debug;

/// Opening marker of a markdown fenced block
const FENCE: &str = "```";

/// Remove a markdown code fence wrapped around the backend text.
///
/// Only a fence marker on the first line triggers stripping; the first and
/// last lines are then dropped. Text without a fence is returned unchanged.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let lines: Vec<&str> = trimmed.lines().collect();

    match lines.first() {
        Some(first) if first.contains(FENCE) => {
            debug!("Stripping code fence from backend response");
            if lines.len() <= 2 {
                String::new()
            } else {
                lines[1..lines.len() - 1].join("\n")
            }
        }
        _ => raw.to_string(),
    }
}

/// Turn raw backend text into an event record.
///
/// `selected_text` is the description used when the backend gives none.
pub fn sanitize(raw: &str, selected_text: &str) -> Result<EventRecord, SanitizeError> {
    let payload = parse_payload(raw)?;
    Ok(EventRecord::from_payload(payload, selected_text))
}

/// Strip formatting and parse the remaining text as an event object
pub fn parse_payload(raw: &str) -> Result<EventPayload, SanitizeError> {
    let cleaned = strip_code_fence(raw);

    let value: Value = serde_json::from_str(cleaned.trim()).map_err(|e| SanitizeError::NotJson {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(SanitizeError::NotAnObject {
            raw: raw.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| SanitizeError::InvalidField {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}
