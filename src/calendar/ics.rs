use super::time_range;
use crate::error::FormatError;
use crate::event::EventRecord;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const ICS_MIME_TYPE: &str = "text/calendar";

const PRODUCT_ID: &str = "-//QuickCal//NONSGML v1.0//EN";
const LINE_BREAK: &str = "\r\n";

/// Render a single-event iCalendar document.
///
/// Start and end are the compact UTC timestamps as extracted. The UID is
/// fresh on every call, so two renders of the same event differ only there.
pub fn render_file(event: &EventRecord, now: DateTime<Utc>) -> Result<String, FormatError> {
    let (start, end) = time_range(event)?;
    let uid = format!(
        "quickcal-{}-{}",
        now.format("%Y%m%dT%H%M%S"),
        Uuid::new_v4().simple()
    );

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODUCT_ID),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", uid),
        format!("SUMMARY:{}", escape_text(event.display_title())),
        format!("DESCRIPTION:{}", escape_text(&event.description)),
        format!("DTSTART:{}", start),
        format!("DTEND:{}", end),
        format!("DTSTAMP:{}", now.format("%Y%m%dT%H%M%SZ")),
        format!("LOCATION:{}", escape_text(&event.location)),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    let mut body = lines.join(LINE_BREAK);
    body.push_str(LINE_BREAK);
    Ok(body)
}

/// Line breaks inside a value would end the property early
fn escape_text(value: &str) -> String {
    value.replace("\r\n", "\\n").replace(['\n', '\r'], "\\n")
}
