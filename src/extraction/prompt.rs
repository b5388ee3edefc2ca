use crate::utils::time::DEFAULT_TIMEZONE;

const PROMPT_TEMPLATE: &str = "I will give you some text that I want you to parse. The text should describe an event.
Please provide a raw JSON response (no prose, no explanations) with the following fields:

title: the title of the event.
timestamp_start: a UTC timestamp of when the event starts in the format YYYYMMDDTHHMMSS. If no year is given, default to the upcoming instance of that date.
timestamp_end: a UTC timestamp of when the event ends in the format YYYYMMDDTHHMMSS. (If not given, default to one hour after start.)
location: the location of the event.
description: a short 2-3 sentence description of the event containing any pertinent information or links.

missing: a list with any of the above fields (title, timestamp_start, timestamp_end, location, description) which are not described in the event.

IMPORTANT: The user is in the {timezone} timezone. When parsing times mentioned in the text (like \"3 PM\", \"2:30\", \"tomorrow at 5\", etc.), interpret them as being in the user's timezone ({timezone}) and then convert them to UTC for the timestamp fields.

Please parse the following text:
Today's date is {date}. User timezone: {timezone}. {text}";

/// Render the extraction instructions for one selection.
///
/// Output is a pure function of the inputs so the exact prompt can be
/// reproduced from the attempt log.
pub fn build_prompt(selected_text: &str, current_date: &str, timezone: Option<&str>) -> String {
    let timezone = timezone
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE);

    fill(
        PROMPT_TEMPLATE,
        &[
            ("{timezone}", timezone),
            ("{date}", current_date),
            ("{text}", selected_text),
        ],
    )
}

/// Substitute placeholders in one pass over the template.
///
/// Substituted values are never scanned again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        match values.iter().find(|(key, _)| rest.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
