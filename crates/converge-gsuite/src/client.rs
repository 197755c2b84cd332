//! Shared HTTP plumbing for the Google Admin APIs.
//!
//! One `GoogleClient` is cloned into every API facade; it owns the token and
//! maps Google's error envelope (`{"error": {"code", "message"}}`) onto
//! [`GsuiteError`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::BearerToken;
use crate::error::{GsuiteError, GsuiteResult};

#[derive(Debug, Clone)]
pub struct GoogleClient {
    auth: BearerToken,
    http_client: Client,
}

impl GoogleClient {
    pub fn new(auth: BearerToken, timeout: Duration) -> GsuiteResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("converge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GsuiteError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { auth, http_client })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(auth: BearerToken, http_client: Client) -> Self {
        Self { auth, http_client }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> GsuiteResult<T> {
        debug!("Google GET {}", url);
        let builder = self.auth.apply(self.http_client.get(url));
        let response = builder.send().await?;
        handle_response(response).await
    }

    /// GET that reads a 404 as absence.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> GsuiteResult<Option<T>> {
        match self.get(url).await {
            Ok(value) => Ok(Some(value)),
            Err(GsuiteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> GsuiteResult<T> {
        debug!("Google POST {}", url);
        let builder = self.auth.apply(self.http_client.post(url));
        let response = builder.json(body).send().await?;
        handle_response(response).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> GsuiteResult<T> {
        debug!("Google PUT {}", url);
        let builder = self.auth.apply(self.http_client.put(url));
        let response = builder.json(body).send().await?;
        handle_response(response).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> GsuiteResult<T> {
        debug!("Google PATCH {}", url);
        let builder = self.auth.apply(self.http_client.patch(url));
        let response = builder.json(body).send().await?;
        handle_response(response).await
    }

    pub(crate) async fn delete(&self, url: &str) -> GsuiteResult<()> {
        debug!("Google DELETE {}", url);
        let builder = self.auth.apply(self.http_client.delete(url));
        let response = builder.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            handle_error_response(response).await
        }
    }
}

/// Percent-encode a single path segment (group keys, emails, aliases).
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> GsuiteResult<T> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        // Some mutations answer 204; treat that as an empty object.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|e| GsuiteError::ParseError(format!("Failed to parse response: {e}")))
    } else {
        handle_error_response(response).await
    }
}

async fn handle_error_response<T>(response: reqwest::Response) -> GsuiteResult<T> {
    let status = response.status();

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    let message = error_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        }
    });

    match status {
        StatusCode::NOT_FOUND => Err(GsuiteError::NotFound(message)),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Google API rate limited, retry after {:?}s", retry_after);
            Err(GsuiteError::RateLimited {
                retry_after_secs: retry_after,
            })
        }
        StatusCode::UNAUTHORIZED => Err(GsuiteError::Auth(message)),
        _ => Err(GsuiteError::Api {
            status: status.as_u16(),
            message,
        }),
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
