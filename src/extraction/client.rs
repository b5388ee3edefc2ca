use crate::config::{ApiKey, BackendConfig, KeyPlacement};
use crate::error::{config_error, ExtractionError, QuickCalResult};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the credential when it is not sent as a query parameter
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// A text-completion backend that turns a prompt into generated text
#[async_trait]
pub trait CompletionBackend: Send + Sync + 'static {
    /// Send one prompt and return the generated text.
    ///
    /// Exactly one request is made; retrying is up to the caller.
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Request envelope: one message with one text part
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response envelope; generated text lives at `candidates[0].content.parts[0].text`
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, ExtractionError> {
        self.candidates
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::BackendParse("Response has no candidates".to_string()))?
            .content
            .ok_or_else(|| ExtractionError::BackendParse("Candidate has no content".to_string()))?
            .parts
            .into_iter()
            .next()
            .and_then(|part| part.text)
            .ok_or_else(|| ExtractionError::BackendParse("Candidate has no text part".to_string()))
    }
}

/// HTTP client for the Gemini `generateContent` API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    url: Url,
    api_key: ApiKey,
    key_placement: KeyPlacement,
}

impl GeminiClient {
    /// Create a client from backend configuration
    pub fn new(config: &BackendConfig) -> QuickCalResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| config_error(&format!("Failed to build HTTP client: {}", e)))?;

        let url_str = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        let url = Url::parse(&url_str)
            .map_err(|e| config_error(&format!("Invalid backend endpoint {}: {}", url_str, e)))?;

        info!("Using extraction backend {}", url);

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            key_placement: config.key_placement,
        })
    }

    /// Check that the backend accepts the configured credential
    pub async fn validate_key(&self) -> bool {
        match self.complete("ping").await {
            Ok(_) => true,
            Err(e) => {
                warn!("Backend key validation failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let mut request = match self.key_placement {
            KeyPlacement::Query => {
                let mut url = self.url.clone();
                url.query_pairs_mut().append_pair("key", self.api_key.expose());
                self.client.post(url)
            }
            KeyPlacement::Header => self
                .client
                .post(self.url.clone())
                .header(API_KEY_HEADER, self.api_key.expose()),
        };
        request = request
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);

        debug!("Sending prompt ({} chars) to {}", prompt.len(), self.url);

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(ExtractionError::Backend {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| ExtractionError::BackendParse(format!("{}: {}", e, text)))?;

        envelope.into_text()
    }
}

/// The credential may be in the URL, so the URL never reaches the message
fn transport_error(err: reqwest::Error) -> ExtractionError {
    let err = err.without_url();
    if err.is_timeout() {
        ExtractionError::Transport(format!("Request timed out: {}", err))
    } else if err.is_connect() {
        ExtractionError::Transport(format!("Connection failed: {}", err))
    } else {
        ExtractionError::Transport(format!("Request failed: {}", err))
    }
}
