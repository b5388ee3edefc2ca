use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Invalid request: {0}")]
    #[diagnostic(code(quickcal::client_input))]
    ClientInput(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),

    #[error("Attempt log write failed: {0}")]
    #[diagnostic(code(quickcal::audit_write))]
    AuditWrite(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(quickcal::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(quickcal::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(quickcal::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(quickcal::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(quickcal::other))]
    Other(String),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ClientInput(_) => "client_input_error",
            Error::Extraction(e) => e.error_code(),
            Error::Sanitize(e) => e.error_code(),
            Error::Format(e) => e.error_code(),
            Error::AuditWrite(_) => "audit_write_error",
            Error::Environment(_) | Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

/// Failure of the single call to the extraction backend
#[derive(Debug, Error, Diagnostic)]
pub enum ExtractionError {
    /// Connection, DNS/TLS or timeout failure. Retryable by the caller.
    #[error("Transport error: {0}")]
    #[diagnostic(code(quickcal::transport))]
    Transport(String),

    #[error("Backend returned HTTP {status}: {body}")]
    #[diagnostic(code(quickcal::backend))]
    Backend { status: u16, body: String },

    #[error("Failed to parse backend response: {0}")]
    #[diagnostic(code(quickcal::backend_parse))]
    BackendParse(String),
}

impl ExtractionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExtractionError::Transport(_) => "transport_error",
            ExtractionError::Backend { .. } => "backend_error",
            ExtractionError::BackendParse(_) => "backend_parse_error",
        }
    }

    /// Whether a caller may reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::Transport(_) => true,
            ExtractionError::Backend { status, .. } => *status == 429 || *status >= 500,
            ExtractionError::BackendParse(_) => false,
        }
    }
}

/// The backend text could not be turned into an event.
/// Every variant keeps the raw text for diagnosis.
#[derive(Debug, Error, Diagnostic)]
pub enum SanitizeError {
    #[error("Backend text is not valid JSON: {reason}")]
    #[diagnostic(code(quickcal::sanitize::not_json))]
    NotJson { raw: String, reason: String },

    #[error("Backend JSON is not an object")]
    #[diagnostic(code(quickcal::sanitize::not_an_object))]
    NotAnObject { raw: String },

    #[error("Backend JSON has an invalid field: {reason}")]
    #[diagnostic(code(quickcal::sanitize::invalid_field))]
    InvalidField { raw: String, reason: String },
}

impl SanitizeError {
    pub fn error_code(&self) -> &'static str {
        "sanitize_error"
    }

    /// The backend text as it was received
    pub fn raw_text(&self) -> &str {
        match self {
            SanitizeError::NotJson { raw, .. }
            | SanitizeError::NotAnObject { raw }
            | SanitizeError::InvalidField { raw, .. } => raw,
        }
    }
}

/// An event could not be rendered into the requested calendar format
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum FormatError {
    #[error("Event has no {field} timestamp")]
    #[diagnostic(code(quickcal::format::missing_timestamp))]
    MissingTimestamp { field: &'static str },

    #[error("Timestamp {value:?} is not in YYYYMMDDTHHMMSS form")]
    #[diagnostic(code(quickcal::format::invalid_timestamp))]
    InvalidTimestamp { value: String },
}

impl FormatError {
    pub fn error_code(&self) -> &'static str {
        "format_error"
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type QuickCalResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create attempt log errors
pub fn audit_error(message: &str) -> Error {
    Error::AuditWrite(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
