use super::AppState;
use crate::calendar::{self, annotate_processing_time, CalendarArtifact, CalendarFormat};
use crate::event::EventRecord;
use crate::orchestrator::{ErrorResponse, ExtractionFailure, ExtractionRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Body of `POST /render`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub event: EventRecord,
    /// Preference key such as `google_calendar`; Google when absent
    #[serde(default)]
    pub format: Option<String>,
    /// When set, the description is annotated with the processing time
    #[serde(default)]
    pub processing_ms: Option<u64>,
}

/// Peer address, present when the server runs with connect info
pub struct PeerAddr(Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PeerAddr(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

pub async fn process_handler(
    State(state): State<AppState>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    payload: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Response {
    let Json(mut request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Malformed extraction request: {}", rejection);
            return failure_response(&ExtractionFailure::client_input(rejection.body_text()));
        }
    };

    if request.attempt_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        request.attempt_id = Some(Uuid::new_v4().to_string());
    }
    request.source_ip = forwarded_for(&headers)
        .or_else(|| peer.map(|addr| addr.ip().to_string()));
    request.user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let attempt_id = request.attempt_id.clone().unwrap_or_default();
    let run = state.orchestrator.run_extraction(request);

    match tokio::time::timeout(state.request_deadline, run).await {
        Ok(Ok(event)) => (StatusCode::OK, Json(event)).into_response(),
        Ok(Err(failure)) => failure_response(&failure),
        Err(_) => {
            warn!(
                attempt_id = %attempt_id,
                "No result within {:?}, answering without it",
                state.request_deadline
            );
            failure_response(&ExtractionFailure::processing("deadline_exceeded"))
        }
    }
}

pub async fn render_handler(payload: Result<Json<RenderRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return failure_response(&ExtractionFailure::client_input(rejection.body_text()));
        }
    };

    let format = match request.format.as_deref() {
        Some(name) => match name.parse::<CalendarFormat>() {
            Ok(format) => format,
            Err(e) => return failure_response(&ExtractionFailure::client_input(e)),
        },
        None => CalendarFormat::default(),
    };

    let event = match request.processing_ms {
        Some(ms) => annotate_processing_time(&request.event, Duration::from_millis(ms)),
        None => request.event,
    };

    match calendar::render(&event, format) {
        Ok(CalendarArtifact::WebLink { url }) => {
            debug!("Rendered {} link", format);
            (StatusCode::OK, Json(json!({ "url": url }))).into_response()
        }
        Ok(CalendarArtifact::FileContent { mime_type, body }) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, format!("{}; charset=utf-8", mime_type)),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"event.ics\"".to_string(),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(code = e.error_code(), "Render failed: {}", e);
            let body = ErrorResponse {
                error: "Invalid event".to_string(),
                message: e.to_string(),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}

pub async fn health_handler() -> &'static str {
    "OK"
}

fn failure_response(failure: &ExtractionFailure) -> Response {
    let status =
        StatusCode::from_u16(failure.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(failure.to_response())).into_response()
}

/// First address of `X-Forwarded-For`, set when running behind a proxy
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
