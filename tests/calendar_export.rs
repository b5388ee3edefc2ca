use chrono::{TimeZone, Utc};
use quickcal::calendar::{annotate_processing_time, render, render_at, CalendarArtifact, CalendarFormat};
use quickcal::error::FormatError;
use quickcal::event::{EventPayload, EventRecord};
use quickcal::extraction::sanitize;
use std::time::Duration;

fn extracted(raw: &str, selected: &str) -> EventRecord {
    sanitize(raw, selected).unwrap()
}

fn url(artifact: CalendarArtifact) -> String {
    match artifact {
        CalendarArtifact::WebLink { url } => url,
        other => panic!("expected a link, got {other:?}"),
    }
}

#[test]
fn test_every_format_from_one_extraction() {
    let event = extracted(
        r#"{"title":"Board meeting","timestamp_start":"20251103T150000","timestamp_end":"20251103T163000","location":"HQ, Room 4","description":"Q3 review","missing":[]}"#,
        "Board meeting Nov 3 9am-10:30 CST at HQ",
    );
    let now = Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap();

    let google = url(render_at(&event, CalendarFormat::Google, now).unwrap());
    assert!(google.contains("text=Board%20meeting"));
    assert!(google.contains("dates=20251103T150000Z/20251103T163000Z"));
    assert!(google.contains("location=HQ%2C%20Room%204"));

    let outlook = url(render_at(&event, CalendarFormat::Outlook, now).unwrap());
    assert!(outlook.contains("startdt=2025-11-03T15:00:00"));
    assert!(outlook.contains("enddt=2025-11-03T16:30:00"));

    match render_at(&event, CalendarFormat::Ics, now).unwrap() {
        CalendarArtifact::FileContent { mime_type, body } => {
            assert_eq!(mime_type, "text/calendar");
            assert!(body.contains("\r\nDTSTART:20251103T150000\r\n"));
            assert!(body.contains("\r\nDTEND:20251103T163000\r\n"));
            assert!(body.contains("\r\nLOCATION:HQ, Room 4\r\n"));
            assert!(body.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        }
        other => panic!("expected a file, got {other:?}"),
    }
}

#[test]
fn test_fenced_and_bare_payloads_render_identically() {
    let bare = r#"{"title":"Dentist","timestamp_start":"20250702T130000Z","missing":["location"]}"#;
    let fenced = format!("```json\n{}\n```", bare);

    let from_bare = extracted(bare, "Dentist July 2 at 1pm");
    let from_fenced = extracted(&fenced, "Dentist July 2 at 1pm");
    assert_eq!(from_bare, from_fenced);

    // The trailing Z is dropped on the way in and added back by the Google renderer
    let google = url(render(&from_bare, CalendarFormat::Google).unwrap());
    assert!(google.contains("dates=20250702T130000Z/20250702T140000Z"));
}

#[test]
fn test_untitled_event_uses_placeholder() {
    let event = EventRecord::from_payload(
        EventPayload {
            timestamp_start: Some("20250702T130000".to_string()),
            ..Default::default()
        },
        "something at 1",
    );

    let outlook = url(render(&event, CalendarFormat::Outlook).unwrap());
    assert!(outlook.contains("subject=Untitled%20Event"));
    assert!(outlook.contains("body=something%20at%201"));
}

#[test]
fn test_event_without_start_cannot_be_exported() {
    let event = extracted(
        r#"{"title":"Someday","missing":["timestamp_start","timestamp_end"]}"#,
        "Someday we should get coffee",
    );
    assert!(!event.has_valid_timestamps());

    for format in [CalendarFormat::Google, CalendarFormat::Outlook, CalendarFormat::Ics] {
        assert_eq!(
            render(&event, format),
            Err(FormatError::MissingTimestamp { field: "start" })
        );
    }
}

#[test]
fn test_annotation_shows_in_rendered_description() {
    let event = extracted(
        r#"{"title":"Call","timestamp_start":"20250702T130000","description":"Weekly call."}"#,
        "Call at 1",
    );
    let annotated = annotate_processing_time(&event, Duration::from_millis(1500));

    let google = url(render(&annotated, CalendarFormat::Google).unwrap());
    assert!(google.contains("details=Weekly%20call.%20%20Added%20by%20QuickCal%20in%201.50%20seconds."));
}
