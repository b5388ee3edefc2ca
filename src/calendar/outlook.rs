use super::time_range;
use crate::error::FormatError;
use crate::event::EventRecord;
use crate::utils::time::compact_to_delimited;
use urlencoding::encode;

/// Outlook.com compose deep link
pub const OUTLOOK_COMPOSE_URL: &str = "https://outlook.live.com/calendar/0/deeplink/compose";

/// Build an Outlook "compose event" link.
///
/// Outlook wants `YYYY-MM-DDTHH:MM:SS`; timestamps of any other length are a
/// `FormatError`.
pub fn render_link(event: &EventRecord) -> Result<String, FormatError> {
    let (start, end) = time_range(event)?;
    let start = compact_to_delimited(&start)?;
    let end = compact_to_delimited(&end)?;

    Ok(format!(
        "{}?allday=false&subject={}&body={}&startdt={}&enddt={}&location={}&path=%2Fcalendar%2Faction%2Fcompose&rru=addevent",
        OUTLOOK_COMPOSE_URL,
        encode(event.display_title()),
        encode(&event.description),
        start,
        end,
        encode(&event.location)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventRecord {
        EventRecord {
            title: Some("Team sync".to_string()),
            start_utc: Some("20250611T170000".to_string()),
            end_utc: Some("20250611T183000".to_string()),
            location: "Room A".to_string(),
            description: "Weekly sync.".to_string(),
            missing_fields: Vec::new(),
        }
    }

    #[test]
    fn test_delimited_timestamps() {
        let url = render_link(&event()).unwrap();
        assert!(url.starts_with(OUTLOOK_COMPOSE_URL));
        assert!(url.contains("&startdt=2025-06-11T17:00:00&enddt=2025-06-11T18:30:00&"));
        assert!(url.contains("subject=Team%20sync&body=Weekly%20sync.&"));
        assert!(url.contains("location=Room%20A&"));
        assert!(url.ends_with("&rru=addevent"));
    }

    #[test]
    fn test_wrong_length_is_format_error() {
        let mut short_start = event();
        short_start.start_utc = Some("20250611T1700".to_string());
        assert_eq!(
            render_link(&short_start),
            Err(FormatError::InvalidTimestamp {
                value: "20250611T1700".to_string()
            })
        );

        let mut long_end = event();
        long_end.end_utc = Some("20250611T18300000".to_string());
        assert!(render_link(&long_end).is_err());
    }
}
