use crate::error::FormatError;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Compact UTC timestamp layout used by the backend and by iCalendar
pub const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Length of a well-formed compact timestamp (`YYYYMMDDTHHMMSS`)
pub const COMPACT_LEN: usize = 15;

/// Long human-readable date, e.g. "Tuesday, June 10, 2025"
pub const LONG_DATE_FORMAT: &str = "%A, %B %-d, %Y";

/// Timezone name used when none is given
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Parse a compact timestamp into a naive UTC datetime
pub fn parse_compact(value: &str) -> Option<NaiveDateTime> {
    if !is_compact(value) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, COMPACT_FORMAT).ok()
}

/// Format a datetime in the compact layout
pub fn format_compact(value: &NaiveDateTime) -> String {
    value.format(COMPACT_FORMAT).to_string()
}

/// Shape check only: 8 digits, `T`, 6 digits
pub fn is_compact(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == COMPACT_LEN
        && bytes[8] == b'T'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

/// Trim whitespace and a trailing `Z`, which some backends add even when asked not to
pub fn normalize_compact(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
        .unwrap_or(trimmed)
        .to_string()
}

/// One hour after the given compact timestamp
pub fn one_hour_after(start: &str) -> Option<String> {
    let start = parse_compact(start)?;
    let end = start.checked_add_signed(Duration::hours(1))?;
    Some(format_compact(&end))
}

/// Reformat `YYYYMMDDTHHMMSS` into `YYYY-MM-DDTHH:MM:SS`.
///
/// Anything that is not exactly the compact layout is rejected instead of
/// being sliced into a garbled value.
pub fn compact_to_delimited(value: &str) -> Result<String, FormatError> {
    if !is_compact(value) {
        return Err(FormatError::InvalidTimestamp {
            value: value.to_string(),
        });
    }
    Ok(format!(
        "{}-{}-{}:{}:{}",
        &value[0..4],
        &value[4..6],
        &value[6..11],
        &value[11..13],
        &value[13..15]
    ))
}

/// "Now" resolved in a named timezone, used to ground the extraction prompt
#[derive(Debug, Clone)]
pub struct TemporalContext {
    /// IANA timezone name as it will appear in the prompt
    pub timezone: String,
    /// The resolved zone
    pub tz: Tz,
    /// Current instant in that zone
    pub now: DateTime<Tz>,
    /// `now` in long form, e.g. "Tuesday, June 10, 2025"
    pub long_date: String,
}

impl TemporalContext {
    /// Resolve `now` in the given timezone.
    ///
    /// Unknown zone names fall back to UTC.
    pub fn resolve(timezone: Option<&str>, now: DateTime<Utc>) -> Self {
        let requested = timezone
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .unwrap_or(DEFAULT_TIMEZONE);

        let (timezone, tz) = match requested.parse::<Tz>() {
            Ok(tz) => (requested.to_string(), tz),
            Err(_) => {
                warn!("Unknown timezone {:?}, falling back to UTC", requested);
                (DEFAULT_TIMEZONE.to_string(), Tz::UTC)
            }
        };

        let now = now.with_timezone(&tz);
        let long_date = now.format(LONG_DATE_FORMAT).to_string();

        Self {
            timezone,
            tz,
            now,
            long_date,
        }
    }
}
