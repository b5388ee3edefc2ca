use crate::utils::time::{normalize_compact, one_hour_after, parse_compact};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Fields the backend may report as undetectable in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "timestamp_start")]
    Start,
    #[serde(rename = "timestamp_end")]
    End,
    #[serde(rename = "location")]
    Location,
    #[serde(rename = "description")]
    Description,
}

impl EventField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventField::Title => "title",
            EventField::Start => "timestamp_start",
            EventField::End => "timestamp_end",
            EventField::Location => "location",
            EventField::Description => "description",
        }
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title" => Ok(EventField::Title),
            "timestamp_start" | "start" | "startUtc" => Ok(EventField::Start),
            "timestamp_end" | "end" | "endUtc" => Ok(EventField::End),
            "location" => Ok(EventField::Location),
            "description" => Ok(EventField::Description),
            other => Err(format!("Unknown event field: {}", other)),
        }
    }
}

/// Event JSON exactly as the backend produced it, before defaulting.
///
/// Every key is optional; absent keys and `null` both deserialize to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timestamp_start: Option<String>,
    #[serde(default)]
    pub timestamp_end: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Anything other than a list of names is ignored
    #[serde(default, deserialize_with = "lenient_field_list")]
    pub missing: Option<Vec<String>>,
}

fn lenient_field_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    other => {
                        warn!("Ignoring non-string missing entry {}", other);
                        None
                    }
                })
                .collect(),
        )),
        other => {
            warn!("Ignoring missing field that is not a list: {}", other);
            Ok(None)
        }
    }
}

/// The typed event extracted from one attempt.
///
/// Serializes to the flat outbound shape
/// `{title, timestamp_start, timestamp_end, location, description, missing}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: Option<String>,
    #[serde(rename = "timestamp_start")]
    pub start_utc: Option<String>,
    #[serde(rename = "timestamp_end")]
    pub end_utc: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "missing", default)]
    pub missing_fields: Vec<EventField>,
}

impl EventRecord {
    /// Build a record from backend output, applying the defaulting rules:
    ///
    /// * blank title stays absent (renderers substitute a placeholder)
    /// * absent end becomes start + 1 hour, and so does an end before the
    ///   start or an end that is not a timestamp
    /// * absent location becomes empty
    /// * absent description falls back to the selected text
    /// * `missing` keeps the backend's order, drops duplicates and unknown names
    pub fn from_payload(payload: EventPayload, selected_text: &str) -> Self {
        let title = non_blank(payload.title);
        let start_utc = non_blank(payload.timestamp_start).map(|s| normalize_compact(&s));
        let end_utc = non_blank(payload.timestamp_end).map(|s| normalize_compact(&s));

        let end_utc = match (&start_utc, end_utc) {
            (Some(start), None) => one_hour_after(start),
            (Some(start), Some(end)) => match (parse_compact(start), parse_compact(&end)) {
                (Some(s), Some(e)) if e < s => {
                    warn!(
                        "End {} is before start {}, using one hour after start",
                        end, start
                    );
                    one_hour_after(start)
                }
                (Some(_), None) => {
                    warn!("End {} is not a timestamp, using one hour after start", end);
                    one_hour_after(start)
                }
                _ => Some(end),
            },
            (None, end) => end,
        };

        let location = payload.location.unwrap_or_default();
        let description =
            non_blank(payload.description).unwrap_or_else(|| selected_text.to_string());

        let mut missing_fields = Vec::new();
        for name in payload.missing.unwrap_or_default() {
            match name.parse::<EventField>() {
                Ok(field) if !missing_fields.contains(&field) => missing_fields.push(field),
                Ok(_) => {}
                Err(e) => warn!("{}", e),
            }
        }

        Self {
            title,
            start_utc,
            end_utc,
            location,
            description,
            missing_fields,
        }
    }

    /// Title to display, with the placeholder substituted when absent
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(PLACEHOLDER_TITLE)
    }

    /// Whether both timestamps are well-formed compact values
    pub fn has_valid_timestamps(&self) -> bool {
        self.start_utc.as_deref().and_then(parse_compact).is_some()
            && self.end_utc.as_deref().and_then(parse_compact).is_some()
    }
}

/// Title used when the backend could not find one
pub const PLACEHOLDER_TITLE: &str = "Untitled Event";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
