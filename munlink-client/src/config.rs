//! Client configuration

use munlink_core::{ErrorContext, MunlinkError, MunlinkResult};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Default backend origin for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration for a [`crate::MunlinkClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the MunLink API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional default headers
    pub headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            user_agent: format!("munlink-client/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Base URL from `MUNLINK_API_URL`, falling back to localhost.
    pub fn from_env() -> Self {
        match std::env::var("MUNLINK_API_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    /// Set an additional default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn parse_base_url(&self) -> MunlinkResult<Url> {
        Url::parse(&self.base_url).map_err(|e| MunlinkError::Config {
            message: format!("Invalid base URL '{}': {}", self.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("client_config")
                .with_operation("parse_base_url")
                .with_suggestion("Use an absolute URL like http://localhost:5000"),
        })
    }

    /// Build the shared HTTP client. The cookie jar carries the HTTP-only
    /// refresh credential between calls.
    pub(crate) fn build_http_client(
        &self,
        cookies: Arc<reqwest::cookie::Jar>,
    ) -> MunlinkResult<reqwest::Client> {
        let mut headers = reqwest::header::HeaderMap::new();

        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_str(&self.user_agent).map_err(|e| {
                MunlinkError::Config {
                    message: format!("Invalid user agent: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("client_config").with_operation("build_http_client"),
                }
            })?,
        );

        for (key, value) in &self.headers {
            let header_name =
                reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                    MunlinkError::Config {
                        message: format!("Invalid header name '{}': {}", key, e),
                        source: Some(Box::new(e)),
                        context: ErrorContext::new("client_config")
                            .with_operation("build_http_client"),
                    }
                })?;

            let header_value =
                reqwest::header::HeaderValue::from_str(value).map_err(|e| MunlinkError::Config {
                    message: format!("Invalid header value for '{}': {}", key, e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("client_config").with_operation("build_http_client"),
                })?;

            headers.insert(header_name, header_value);
        }

        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .default_headers(headers)
            .cookie_provider(cookies)
            .build()
            .map_err(|e| MunlinkError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("client_config").with_operation("build_http_client"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_compose() {
        let config = ClientConfig::new("https://munlink.example")
            .with_timeout(60)
            .with_header("X-Forwarded-Host", "munlink.example")
            .with_user_agent("munlink-test/1.0");

        assert_eq!(config.base_url, "https://munlink.example");
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(
            config.headers.get("X-Forwarded-Host"),
            Some(&"munlink.example".to_string())
        );
        assert_eq!(config.user_agent, "munlink-test/1.0");
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(ClientConfig::new("not-a-url").parse_base_url().is_err());
        assert!(ClientConfig::default().parse_base_url().is_ok());
    }

    #[test]
    fn http_client_builds_with_defaults() {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let client = ClientConfig::default().build_http_client(jar);
        assert!(client.is_ok());
    }
}
