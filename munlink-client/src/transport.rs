//! Authenticated HTTP plumbing shared by all endpoint groups
//!
//! Every outgoing request uniformly gets the bearer header when a token is
//! held. A 401 response triggers exactly one refresh-and-retry pass through
//! the session's shared refresh slot; an unrecoverable 401 evicts the session.

use munlink_core::{ErrorContext, MunlinkError, MunlinkResult};
use reqwest::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::session::SessionManager;

/// Error envelope the backend emits on failures.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

pub struct ApiTransport {
    http: reqwest::Client,
    base_url: Url,
    session: SessionManager,
}

impl ApiTransport {
    pub fn new(http: reqwest::Client, base_url: Url, session: SessionManager) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn endpoint(&self, path: &str) -> MunlinkResult<Url> {
        self.base_url.join(path).map_err(|e| MunlinkError::Config {
            message: format!("Invalid API path '{}': {}", path, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("api_transport").with_operation("endpoint"),
        })
    }

    fn attach_bearer(&self, request: &mut Request, token: &str) {
        if let Ok(value) =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
        {
            request
                .headers_mut()
                .insert(reqwest::header::AUTHORIZATION, value);
        }
    }

    async fn send(&self, request: Request) -> MunlinkResult<Response> {
        self.http
            .execute(request)
            .await
            .map_err(|e| MunlinkError::Http {
                message: format!("Request failed: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("api_transport")
                    .with_operation("send")
                    .with_suggestion("Check network connectivity and API status"),
            })
    }

    /// Send a request with the bearer header attached, retrying once through
    /// the shared refresh slot on 401.
    ///
    /// The retry clone is taken before the first send; requests whose bodies
    /// cannot be replayed (streaming multipart) are never retried. A retried
    /// request that fails again propagates as-is - no second cycle.
    pub async fn execute(&self, mut request: Request) -> MunlinkResult<Response> {
        let retry = request.try_clone();
        if let Some(token) = self.session.access_token() {
            self.attach_bearer(&mut request, &token);
        }

        let response = self.send(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(mut retry) = retry else {
            return Ok(response);
        };

        debug!(url = %response.url(), "Request returned 401, refreshing session");
        match self.session.refresh().await {
            Some(token) => {
                self.attach_bearer(&mut retry, &token);
                self.send(retry).await
            }
            None => {
                warn!("Session could not be recovered, evicting");
                self.session.expire();
                Ok(response)
            }
        }
    }

    /// Turn a response into `T`, mapping non-2xx statuses onto
    /// [`MunlinkError::Api`] with the backend's error envelope when present.
    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        operation: &str,
    ) -> MunlinkResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response, operation).await);
        }

        response.json::<T>().await.map_err(|e| MunlinkError::Http {
            message: format!("Failed to parse response body: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("api_transport").with_operation(operation),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .get(self.endpoint(path)?)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .get(self.endpoint(path)?)
            .query(query)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .post(self.endpoint(path)?)
            .json(body)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    /// POST without a body, for lifecycle endpoints that take none.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .post(self.endpoint(path)?)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .put(self.endpoint(path)?)
            .json(body)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> MunlinkResult<T> {
        let request = self
            .http
            .delete(self.endpoint(path)?)
            .build()
            .map_err(|e| build_error(e, operation))?;
        let response = self.execute(request).await?;
        self.decode(response, operation).await
    }

    /// Multipart upload. The streaming body cannot be replayed, so this path
    /// never retries on 401; callers see the failure directly.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        operation: &str,
    ) -> MunlinkResult<T> {
        let mut builder = self.http.post(self.endpoint(path)?).multipart(form);
        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token);
        }
        let request = builder.build().map_err(|e| build_error(e, operation))?;
        let response = self.send(request).await?;
        self.decode(response, operation).await
    }
}

fn build_error(e: reqwest::Error, operation: &str) -> MunlinkError {
    MunlinkError::Http {
        message: format!("Failed to build request: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("api_transport").with_operation(operation),
    }
}

/// Map an error response onto [`MunlinkError::Api`], preferring the backend's
/// `{"error", "details"}` envelope over raw body text.
pub(crate) async fn api_error(response: Response, operation: &str) -> MunlinkError {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|envelope| match envelope.details {
            Some(details) => format!("{}: {}", envelope.error, details),
            None => envelope.error,
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });

    MunlinkError::Api {
        status: status.as_u16(),
        message,
        context: ErrorContext::new("api_transport")
            .with_operation(operation)
            .with_metadata("url", url.as_str())
            .with_suggestion(match status.as_u16() {
                401 => "Log in again",
                403 => "Check account verification status and permissions",
                404 => "Resource not found or no longer available",
                _ => "Check network connectivity and API status",
            }),
    }
}
