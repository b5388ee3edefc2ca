//! Rendering of extracted events into calendar artifacts.
//!
//! Every render is a pure function of the event (and, for the file format,
//! the render time). Artifacts are produced fresh on each call.

pub mod google;
pub mod ics;
pub mod outlook;

use crate::error::FormatError;
use crate::event::EventRecord;
use crate::utils::time::{is_compact, one_hour_after};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Destination calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarFormat {
    /// Google Calendar template link
    #[default]
    Google,
    /// Outlook compose deep link
    Outlook,
    /// Portable iCalendar file
    Ics,
}

impl CalendarFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarFormat::Google => "google_calendar",
            CalendarFormat::Outlook => "outlook_calendar",
            CalendarFormat::Ics => "ics",
        }
    }
}

impl fmt::Display for CalendarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarFormat {
    type Err = String;

    /// Accepts the stored preference keys as well as the short names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "google_calendar" => Ok(CalendarFormat::Google),
            "outlook" | "outlook_calendar" => Ok(CalendarFormat::Outlook),
            "ics" | "ical" | "apple_calendar" | "other_calendar" => Ok(CalendarFormat::Ics),
            other => Err(format!("Unknown calendar format: {}", other)),
        }
    }
}

/// Output of a render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalendarArtifact {
    /// A URL to open in a browser
    WebLink { url: String },
    /// A downloadable file
    FileContent { mime_type: String, body: String },
}

/// Render an event for the given destination at the current time
pub fn render(event: &EventRecord, format: CalendarFormat) -> Result<CalendarArtifact, FormatError> {
    render_at(event, format, Utc::now())
}

/// Render an event for the given destination.
///
/// `now` only affects the file format (identifier and creation stamp).
pub fn render_at(
    event: &EventRecord,
    format: CalendarFormat,
    now: DateTime<Utc>,
) -> Result<CalendarArtifact, FormatError> {
    match format {
        CalendarFormat::Google => Ok(CalendarArtifact::WebLink {
            url: google::render_link(event)?,
        }),
        CalendarFormat::Outlook => Ok(CalendarArtifact::WebLink {
            url: outlook::render_link(event)?,
        }),
        CalendarFormat::Ics => Ok(CalendarArtifact::FileContent {
            mime_type: ics::ICS_MIME_TYPE.to_string(),
            body: ics::render_file(event, now)?,
        }),
    }
}

/// Copy of the event with the processing time appended to its description
pub fn annotate_processing_time(event: &EventRecord, elapsed: Duration) -> EventRecord {
    let mut annotated = event.clone();
    annotated.description = format!(
        "{}  Added by QuickCal in {:.2} seconds.",
        event.description,
        elapsed.as_secs_f64()
    );
    annotated
}

/// Start and end of the event as compact timestamps.
///
/// The start must be present and well-formed; a missing end is one hour after start.
pub(crate) fn time_range(event: &EventRecord) -> Result<(String, String), FormatError> {
    let start = event
        .start_utc
        .as_deref()
        .ok_or(FormatError::MissingTimestamp { field: "start" })?;
    if !is_compact(start) {
        return Err(FormatError::InvalidTimestamp {
            value: start.to_string(),
        });
    }

    let end = match event.end_utc.as_deref() {
        Some(end) if is_compact(end) => end.to_string(),
        Some(end) => {
            return Err(FormatError::InvalidTimestamp {
                value: end.to_string(),
            })
        }
        None => one_hour_after(start).ok_or_else(|| FormatError::InvalidTimestamp {
            value: start.to_string(),
        })?,
    };

    Ok((start.to_string(), end))
}
