//! Network operations for session renewal

use async_trait::async_trait;
use reqwest::cookie::CookieStore;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Name of the CSRF companion cookie the backend sets alongside the HTTP-only
/// refresh cookie.
pub const CSRF_COOKIE_NAME: &str = "csrf_refresh_token";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshStatusResponse {
    #[serde(default)]
    has_refresh: bool,
}

/// Network seam for session renewal.
///
/// Split from the session manager so tests can count refresh calls without a
/// backend. Both operations report failure as a value; neither ever errors.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    /// Attempt to mint a new access token from the refresh credential.
    /// Any non-200 status or transport failure yields `None`.
    async fn refresh(&self) -> Option<String>;

    /// Ask the backend whether a usable refresh credential is present,
    /// without spending a refresh attempt. Failures read as "no".
    async fn probe(&self) -> bool;
}

/// reqwest-backed transport. The refresh credential rides along automatically
/// via the shared cookie jar; the CSRF token is read from the same jar and
/// attached as a header when present.
pub struct HttpRefreshTransport {
    http: reqwest::Client,
    cookies: Arc<reqwest::cookie::Jar>,
    base_url: Url,
}

impl HttpRefreshTransport {
    pub fn new(http: reqwest::Client, cookies: Arc<reqwest::cookie::Jar>, base_url: Url) -> Self {
        Self {
            http,
            cookies,
            base_url,
        }
    }

    /// Read a cookie value by name from the jar, scoped to the API origin.
    fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.cookies.cookies(&self.base_url)?;
        let raw = header.to_str().ok()?;
        raw.split("; ").find_map(|pair| {
            pair.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self) -> Option<String> {
        let url = self.base_url.join("/api/auth/refresh").ok()?;
        let mut request = self.http.post(url);
        if let Some(csrf) = self.cookie_value(CSRF_COOKIE_NAME) {
            request = request.header("X-CSRF-TOKEN", csrf);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Refresh request failed to send");
                return None;
            }
        };

        // Status is checked by hand; every non-200 uniformly means "no token".
        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "Token refresh rejected");
            return None;
        }

        match response.json::<RefreshResponse>().await {
            Ok(body) => Some(body.access_token),
            Err(e) => {
                warn!(error = %e, "Refresh response body had an unexpected shape");
                None
            }
        }
    }

    async fn probe(&self) -> bool {
        let Ok(url) = self.base_url.join("/api/auth/refresh-status") else {
            return false;
        };
        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<RefreshStatusResponse>()
                .await
                .map(|body| body.has_refresh)
                .unwrap_or(false),
            Ok(response) => {
                debug!(status = %response.status(), "Refresh-status probe rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "Refresh-status probe failed");
                false
            }
        }
    }
}
