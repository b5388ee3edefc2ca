//! Sequencing of one extraction request.
//!
//! The orchestrator owns the attempt identifier and timing, writes the attempt
//! record before and after the backend call, and translates every internal
//! error into an [`ExtractionFailure`] with a stable code.

use crate::attempt_log::{
    AttemptLog, AttemptOutcome, AttemptRecord, ANONYMOUS_USER, UNKNOWN_ATTEMPT_ID, UNKNOWN_SESSION,
};
use crate::error::Error;
use crate::event::EventRecord;
use crate::extraction::{build_prompt, sanitize, strip_code_fence, CompletionBackend};
use crate::utils::time::TemporalContext;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Code for a pipeline that died without reaching a terminal state
const INTERNAL_ERROR: &str = "internal_error";

/// Inbound extraction request as sent by the browser extension
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub current_date: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default, alias = "userEmail")]
    pub user_identifier: Option<String>,
    #[serde(default, alias = "sessionId")]
    pub session_identifier: Option<String>,
    /// Caller-supplied id; the transport fills one in when absent
    #[serde(default)]
    pub attempt_id: Option<String>,
    #[serde(skip)]
    pub source_ip: Option<String>,
    #[serde(skip)]
    pub user_agent: Option<String>,
}

impl ExtractionRequest {
    pub fn new(selected_text: impl Into<String>) -> Self {
        Self {
            selected_text: Some(selected_text.into()),
            ..Default::default()
        }
    }
}

/// Whether the caller or the pipeline is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ClientInput,
    Processing,
}

/// Failure as seen by the caller.
///
/// `code` is the internal classification (also written to the attempt
/// record); the user-facing message never includes backend diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub kind: FailureKind,
    pub code: &'static str,
    pub message: String,
}

impl ExtractionFailure {
    pub fn client_input(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ClientInput,
            code: "client_input_error",
            message: message.into(),
        }
    }

    pub fn processing(code: &'static str) -> Self {
        Self {
            kind: FailureKind::Processing,
            code,
            message: "Could not extract an event from the selected text".to_string(),
        }
    }

    /// HTTP status that communicates the failure category
    pub fn status(&self) -> u16 {
        match self.kind {
            FailureKind::ClientInput => 400,
            FailureKind::Processing => 500,
        }
    }

    /// Body sent to the caller
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self.kind {
            FailureKind::ClientInput => "Invalid request",
            FailureKind::Processing => "Processing failed",
        };
        ErrorResponse {
            error: error.to_string(),
            message: self.message.clone(),
        }
    }
}

impl From<&Error> for ExtractionFailure {
    fn from(err: &Error) -> Self {
        match err {
            Error::ClientInput(message) => Self::client_input(message.clone()),
            other => Self::processing(other.error_code()),
        }
    }
}

/// Outbound error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type ExtractionOutcome = Result<EventRecord, ExtractionFailure>;

/// Runs extraction requests against a backend and an attempt log
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    log: AttemptLog,
    default_timezone: String,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        log: AttemptLog,
        default_timezone: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            log,
            default_timezone: default_timezone.into(),
        }
    }

    pub fn attempt_log(&self) -> &AttemptLog {
        &self.log
    }

    /// Run one extraction.
    ///
    /// The pipeline runs on its own task: if the caller stops waiting, the
    /// backend call still completes and the terminal attempt record is still
    /// written. A pipeline that panics leaves an `internal_error` record.
    pub async fn run_extraction(&self, request: ExtractionRequest) -> ExtractionOutcome {
        let selected_text = match validate(&request) {
            Ok(text) => text,
            Err(e) => {
                warn!("Rejected extraction request: {}", e);
                return Err(ExtractionFailure::from(&e));
            }
        };

        let attempt = self.accept(request, &selected_text);
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.supervise(attempt, selected_text).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Extraction task failed: {}", e);
                Err(ExtractionFailure::processing(INTERNAL_ERROR))
            }
        }
    }

    /// Run the pipeline on a child task and close the record if it dies
    async fn supervise(&self, attempt: AttemptRecord, selected_text: String) -> ExtractionOutcome {
        let mut fallback = attempt.clone();
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.extract(attempt, selected_text).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(attempt_id = %fallback.attempt_id, "Extraction pipeline aborted: {}", e);
                fallback.fail(INTERNAL_ERROR, &e.to_string(), None, Utc::now());
                self.log.record(&fallback).await;
                Err(ExtractionFailure::processing(INTERNAL_ERROR))
            }
        }
    }

    /// Build the processing record for an accepted request
    fn accept(&self, request: ExtractionRequest, selected_text: &str) -> AttemptRecord {
        let started_at = Utc::now();
        let attempt_id = non_blank(request.attempt_id.as_deref())
            .unwrap_or(UNKNOWN_ATTEMPT_ID)
            .to_string();

        let timezone = non_blank(request.timezone.as_deref()).unwrap_or(self.default_timezone.as_str());
        let context = TemporalContext::resolve(Some(timezone), started_at);
        let current_date = non_blank(request.current_date.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| context.long_date.clone());

        let prompt = build_prompt(selected_text, &current_date, Some(&context.timezone));

        AttemptRecord {
            attempt_id,
            started_at,
            user_id: non_blank(request.user_identifier.as_deref())
                .unwrap_or(ANONYMOUS_USER)
                .to_string(),
            session_id: non_blank(request.session_identifier.as_deref())
                .unwrap_or(UNKNOWN_SESSION)
                .to_string(),
            selected_text_length: selected_text.chars().count(),
            selected_text_words: selected_text.split_whitespace().count(),
            selected_text: selected_text.to_string(),
            current_date,
            timezone: context.timezone,
            source_url: request.source_url,
            source_ip: request.source_ip,
            user_agent: request.user_agent,
            prompt,
            backend_started_at: None,
            backend_finished_at: None,
            backend_latency_ms: None,
            processing_time_ms: None,
            completed_at: None,
            outcome: AttemptOutcome::Processing,
        }
    }

    async fn extract(&self, mut attempt: AttemptRecord, selected_text: String) -> ExtractionOutcome {
        let attempt_id = attempt.attempt_id.clone();

        info!(
            attempt_id = %attempt_id,
            text_length = attempt.selected_text_length,
            words = attempt.selected_text_words,
            timezone = %attempt.timezone,
            "Extraction request accepted"
        );
        self.log.record(&attempt).await;

        attempt.backend_started(Utc::now());
        let response = self.backend.complete(&attempt.prompt).await;
        attempt.backend_finished(Utc::now());

        let outcome = match response {
            Ok(raw) => match sanitize(&raw, &selected_text) {
                Ok(event) => {
                    attempt.succeed(&strip_code_fence(&raw), &event, Utc::now());
                    info!(
                        attempt_id = %attempt_id,
                        latency_ms = attempt.backend_latency_ms,
                        processing_ms = attempt.processing_time_ms,
                        has_title = event.title.is_some(),
                        has_start = event.start_utc.is_some(),
                        has_location = !event.location.is_empty(),
                        missing = ?event.missing_fields,
                        "Extraction succeeded"
                    );
                    Ok(event)
                }
                Err(e) => {
                    attempt.fail(e.error_code(), &e.to_string(), Some(e.raw_text().to_string()), Utc::now());
                    warn!(attempt_id = %attempt_id, code = e.error_code(), "Extraction failed: {}", e);
                    Err(ExtractionFailure::processing(e.error_code()))
                }
            },
            Err(e) => {
                attempt.fail(e.error_code(), &e.to_string(), None, Utc::now());
                warn!(
                    attempt_id = %attempt_id,
                    code = e.error_code(),
                    retryable = e.is_retryable(),
                    latency_ms = attempt.backend_latency_ms,
                    "Extraction failed: {}",
                    e
                );
                Err(ExtractionFailure::processing(e.error_code()))
            }
        };

        self.log.record(&attempt).await;
        outcome
    }
}

/// The selected text, or the client error for its absence
fn validate(request: &ExtractionRequest) -> Result<String, Error> {
    match non_blank(request.selected_text.as_deref()) {
        Some(text) => Ok(text.trim().to_string()),
        None => Err(Error::ClientInput("selectedText is required".to_string())),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
