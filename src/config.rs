use crate::error::{config_error, env_error, QuickCalResult};
use crate::utils::time::DEFAULT_TIMEZONE;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default Gemini API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Optional file with non-secret overrides
pub const CONFIG_FILE: &str = "config/quickcal.toml";
/// 30 days in seconds
pub const DEFAULT_ATTEMPT_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Most attempts the in-memory store keeps before dropping the oldest
pub const DEFAULT_MEMORY_ATTEMPT_CAPACITY: usize = 10_000;

/// Backend credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Where the credential travels in the backend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPlacement {
    /// `?key=...`
    #[default]
    Query,
    /// `x-goog-api-key` header
    Header,
}

impl FromStr for KeyPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(KeyPlacement::Query),
            "header" => Ok(KeyPlacement::Header),
            other => Err(format!("Invalid key placement: {}", other)),
        }
    }
}

/// Settings for the extraction backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: ApiKey,
    /// Base URL; the request goes to `{endpoint}/{model}:generateContent`
    pub endpoint: String,
    pub model: String,
    pub key_placement: KeyPlacement,
    /// Upper bound on the single backend call
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            key_placement: KeyPlacement::Query,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    /// Redis connection for the attempt log; in-memory when absent
    pub redis_url: Option<String>,
    /// Expiry applied to stored attempts
    pub attempt_ttl_secs: u64,
    /// Record limit of the in-memory attempt store
    pub memory_attempt_capacity: usize,
    /// Upper bound on one attempt log write
    pub audit_write_timeout: Duration,
    /// How long the transport waits for a pipeline run
    pub request_deadline: Duration,
    /// Timezone used when a request names none
    pub default_timezone: String,
    pub bind_addr: String,
    pub port: u16,
    /// Send a short prompt at startup to check the API key
    pub validate_key_on_start: bool,
}

/// Non-secret overrides read from `config/quickcal.toml`
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    endpoint: Option<String>,
    model: Option<String>,
    key_placement: Option<KeyPlacement>,
    backend_timeout_secs: Option<u64>,
    default_timezone: Option<String>,
    attempt_ttl_secs: Option<u64>,
}

impl Config {
    /// Load configuration from `.env`, the environment and the optional config file
    pub fn load() -> QuickCalResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        if Path::new(CONFIG_FILE).exists() {
            let content = fs::read_to_string(CONFIG_FILE)?;
            config.apply_overrides(&content)?;
        }

        Ok(config)
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> QuickCalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| env_error("GEMINI_API_KEY"))?;

        let mut backend = BackendConfig::new(api_key);
        if let Some(endpoint) = lookup("GEMINI_ENDPOINT") {
            backend.endpoint = endpoint;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            backend.model = model;
        }
        if let Some(placement) = lookup("GEMINI_KEY_PLACEMENT") {
            backend.key_placement = placement.parse().map_err(|e: String| config_error(&e))?;
        }
        if let Some(secs) = parse_number(&lookup, "BACKEND_TIMEOUT_SECS")? {
            backend.timeout = Duration::from_secs(secs);
        }

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        let attempt_ttl_secs =
            parse_number(&lookup, "ATTEMPT_TTL_SECS")?.unwrap_or(DEFAULT_ATTEMPT_TTL_SECS);
        let memory_attempt_capacity = parse_number(&lookup, "MEMORY_ATTEMPT_CAPACITY")?
            .unwrap_or(DEFAULT_MEMORY_ATTEMPT_CAPACITY);
        let audit_write_timeout =
            Duration::from_millis(parse_number(&lookup, "AUDIT_WRITE_TIMEOUT_MS")?.unwrap_or(2000));
        let request_deadline =
            Duration::from_secs(parse_number(&lookup, "REQUEST_DEADLINE_SECS")?.unwrap_or(45));
        let default_timezone =
            lookup("DEFAULT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_number(&lookup, "PORT")?.unwrap_or(3000);
        let validate_key_on_start = lookup("VALIDATE_KEY_ON_START")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        Ok(Config {
            backend,
            redis_url,
            attempt_ttl_secs,
            memory_attempt_capacity,
            audit_write_timeout,
            request_deadline,
            default_timezone,
            bind_addr,
            port,
            validate_key_on_start,
        })
    }

    /// Merge overrides from TOML content
    pub fn apply_overrides(&mut self, content: &str) -> QuickCalResult<()> {
        let overrides: FileOverrides = toml::from_str(content)?;

        if let Some(endpoint) = overrides.endpoint {
            self.backend.endpoint = endpoint;
        }
        if let Some(model) = overrides.model {
            self.backend.model = model;
        }
        if let Some(placement) = overrides.key_placement {
            self.backend.key_placement = placement;
        }
        if let Some(secs) = overrides.backend_timeout_secs {
            self.backend.timeout = Duration::from_secs(secs);
        }
        if let Some(tz) = overrides.default_timezone {
            self.default_timezone = tz;
        }
        if let Some(ttl) = overrides.attempt_ttl_secs {
            self.attempt_ttl_secs = ttl;
        }

        Ok(())
    }
}

fn parse_number<F, T>(lookup: &F, key: &str) -> QuickCalResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| config_error(&format!("Invalid {} format", key))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "secret")])).unwrap();
        assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert_eq!(config.backend.key_placement, KeyPlacement::Query);
        assert_eq!(config.backend.timeout, Duration::from_secs(30));
        assert_eq!(config.redis_url, None);
        assert_eq!(config.attempt_ttl_secs, DEFAULT_ATTEMPT_TTL_SECS);
        assert_eq!(config.memory_attempt_capacity, DEFAULT_MEMORY_ATTEMPT_CAPACITY);
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "super-secret")])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_file_overrides() {
        let mut config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_KEY_PLACEMENT", "query"),
        ]))
        .unwrap();

        config
            .apply_overrides(
                r#"
                model = "gemini-2.0-flash"
                key_placement = "header"
                backend_timeout_secs = 10
                default_timezone = "Europe/Helsinki"
                "#,
            )
            .unwrap();

        assert_eq!(config.backend.model, "gemini-2.0-flash");
        assert_eq!(config.backend.key_placement, KeyPlacement::Header);
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert_eq!(config.default_timezone, "Europe/Helsinki");
        assert_eq!(config.backend.api_key.expose(), "secret");
    }
}
