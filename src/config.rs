//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Production backend.
pub const DEFAULT_API_BASE: &str = "https://bbscart.com/api";

/// Default on-device database location.
pub const DEFAULT_DB_PATH: &str = "./data/bbscart.db";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    /// libSQL file backing the key-value store.
    pub db_path: PathBuf,
    /// Per-request timeout. `None` means requests never time out.
    pub request_timeout: Option<Duration>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            request_timeout: None,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Build from `BBSCART_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("BBSCART_API_BASE")
            .map(|s| normalize_base_url(&s))
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let db_path = std::env::var("BBSCART_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

        let request_timeout = std::env::var("BBSCART_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let user_agent = std::env::var("BBSCART_USER_AGENT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            api_base_url,
            db_path,
            request_timeout,
            user_agent,
        }
    }

    /// Override the base URL (tests point this at a local fake backend).
    pub fn with_api_base(mut self, base: &str) -> Result<Self, ConfigError> {
        let normalized = normalize_base_url(base);
        if !normalized.starts_with("http://") && !normalized.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "api_base_url".into(),
                message: format!("expected an http(s) URL, got {base:?}"),
            });
        }
        self.api_base_url = normalized;
        Ok(self)
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(s: &str) -> String {
    s.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "https://bbscart.com/api");
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ClientConfig::default()
            .with_api_base("http://127.0.0.1:9000/api/")
            .unwrap();
        assert_eq!(config.endpoint("/upload"), "http://127.0.0.1:9000/api/upload");
        assert_eq!(
            config.endpoint("vendors/step"),
            "http://127.0.0.1:9000/api/vendors/step"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        let err = ClientConfig::default().with_api_base("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("api_base_url"));
    }
}
