use crate::event::{EventField, EventRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier used when neither caller nor transport supplies one
pub const UNKNOWN_ATTEMPT_ID: &str = "unknown";
/// User identifier used when the caller supplies none
pub const ANONYMOUS_USER: &str = "anonymous";
/// Session identifier used when the caller supplies none
pub const UNKNOWN_SESSION: &str = "unknown";

/// Where an attempt currently stands, with the data each state carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Written before the backend call
    Processing,
    Success {
        /// Backend text after fence stripping
        response_text: String,
        response_length: usize,
        result_title: Option<String>,
        result_location: String,
        result_start: Option<String>,
        result_end: Option<String>,
        result_missing: Vec<EventField>,
    },
    Error {
        error_type: String,
        error_message: String,
        /// Backend text, when the failure happened after it arrived
        raw_response: Option<String>,
    },
}

impl AttemptOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            AttemptOutcome::Processing => "processing",
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::Error { .. } => "error",
        }
    }
}

/// Audit entry describing one extraction request end to end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,

    // Inputs
    pub user_id: String,
    pub session_id: String,
    pub selected_text: String,
    pub selected_text_length: usize,
    pub selected_text_words: usize,
    pub current_date: String,
    pub timezone: String,
    pub source_url: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,

    // Process data
    pub prompt: String,
    pub backend_started_at: Option<DateTime<Utc>>,
    pub backend_finished_at: Option<DateTime<Utc>>,
    pub backend_latency_ms: Option<i64>,
    pub processing_time_ms: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,

    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    /// Mark the backend call as started
    pub fn backend_started(&mut self, at: DateTime<Utc>) {
        self.backend_started_at = Some(at);
    }

    /// Mark the backend call as finished and compute its latency
    pub fn backend_finished(&mut self, at: DateTime<Utc>) {
        self.backend_finished_at = Some(at);
        self.backend_latency_ms = self
            .backend_started_at
            .map(|start| (at - start).num_milliseconds());
    }

    /// Move to the success state
    pub fn succeed(&mut self, response_text: &str, event: &EventRecord, at: DateTime<Utc>) {
        self.outcome = AttemptOutcome::Success {
            response_text: response_text.to_string(),
            response_length: response_text.len(),
            result_title: event.title.clone(),
            result_location: event.location.clone(),
            result_start: event.start_utc.clone(),
            result_end: event.end_utc.clone(),
            result_missing: event.missing_fields.clone(),
        };
        self.complete(at);
    }

    /// Move to the error state
    pub fn fail(
        &mut self,
        error_type: &str,
        error_message: &str,
        raw_response: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.outcome = AttemptOutcome::Error {
            error_type: error_type.to_string(),
            error_message: error_message.to_string(),
            raw_response,
        };
        self.complete(at);
    }

    fn complete(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
        self.processing_time_ms = Some((at - self.started_at).num_milliseconds());
    }
}
