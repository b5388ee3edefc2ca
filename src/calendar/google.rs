use super::time_range;
use crate::error::FormatError;
use crate::event::EventRecord;
use urlencoding::encode;

/// Google Calendar event template endpoint
pub const GOOGLE_CALENDAR_URL: &str = "https://www.google.com/calendar/render";

/// Build a Google Calendar "create event" link.
///
/// The compact timestamps carry no zone marker, and Google reads unmarked
/// values as local time, so `Z` is appended to both ends of the range.
pub fn render_link(event: &EventRecord) -> Result<String, FormatError> {
    let (start, end) = time_range(event)?;

    Ok(format!(
        "{}?action=TEMPLATE&text={}&dates={}Z/{}Z&details={}&location={}",
        GOOGLE_CALENDAR_URL,
        encode(event.display_title()),
        start,
        end,
        encode(&event.description),
        encode(&event.location)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventRecord {
        EventRecord {
            title: Some("Lunch with Sam".to_string()),
            start_utc: Some("20250611T170000".to_string()),
            end_utc: Some("20250611T180000".to_string()),
            location: String::new(),
            description: "Lunch meeting.".to_string(),
            missing_fields: Vec::new(),
        }
    }

    #[test]
    fn test_dates_carry_utc_marker() {
        let url = render_link(&event()).unwrap();
        assert!(url.contains("&dates=20250611T170000Z/20250611T180000Z&"));
        assert_eq!(
            url,
            "https://www.google.com/calendar/render?action=TEMPLATE&text=Lunch%20with%20Sam\
             &dates=20250611T170000Z/20250611T180000Z&details=Lunch%20meeting.&location="
        );
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let mut event = event();
        event.title = Some("Q&A / Demo #3".to_string());
        event.description = "Bring notes? 50% off=yes".to_string();
        event.location = "Room 1, Floor 2 & 3".to_string();

        let url = render_link(&event).unwrap();
        assert!(url.contains("text=Q%26A%20%2F%20Demo%20%233&"));
        assert!(url.contains("details=Bring%20notes%3F%2050%25%20off%3Dyes&"));
        assert!(url.ends_with("location=Room%201%2C%20Floor%202%20%26%203"));
        // Only the separators this renderer adds remain unencoded
        assert_eq!(url.matches('&').count(), 4);
    }

    #[test]
    fn test_placeholder_title() {
        let mut event = event();
        event.title = None;
        let url = render_link(&event).unwrap();
        assert!(url.contains("text=Untitled%20Event&"));
    }

    #[test]
    fn test_malformed_end_is_rejected() {
        let mut event = event();
        event.end_utc = Some("tomorrow".to_string());
        assert!(matches!(
            render_link(&event),
            Err(FormatError::InvalidTimestamp { .. })
        ));
    }
}
