//! SCIM user endpoint client (reqwest-based).
//!
//! Speaks just enough of SCIM 1.1 and 2.0 to search, create, patch, replace
//! and delete `/Users` resources. Request bodies are built by the caller;
//! this client only moves them.

use std::time::Duration;

use async_trait::async_trait;
use converge_core::{ProviderResult, Resource, ScimAccounts};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::auth::ScimAuth;
use crate::error::{ScimClientError, ScimClientResult};

const SCIM_CONTENT_TYPE: &str = "application/scim+json";

#[derive(Debug, Clone)]
pub struct ScimClient {
    /// Base URL of the SCIM target, without `/Users`.
    base_url: String,
    auth: ScimAuth,
    http_client: Client,
}

impl ScimClient {
    pub fn new(base_url: &str, auth: ScimAuth, timeout: Duration) -> ScimClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("converge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScimClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self::with_http_client(base_url, auth, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: &str, auth: ScimAuth, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/Users/{}", self.base_url, urlencoding::encode(id))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ScimClientResult<T> {
        debug!("SCIM GET {}", url);
        let builder = self.auth.apply(self.http_client.get(url));
        let response = builder.send().await?;
        handle_response(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> ScimClientResult<T> {
        debug!("SCIM {} {}", method, url);
        let builder = self.auth.apply(self.http_client.request(method, url));
        let response = builder
            .header("Content-Type", SCIM_CONTENT_TYPE)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn delete_url(&self, url: &str) -> ScimClientResult<()> {
        debug!("SCIM DELETE {}", url);
        let builder = self.auth.apply(self.http_client.delete(url));
        let response = builder.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            handle_error_response(response).await
        }
    }
}

#[async_trait]
impl ScimAccounts for ScimClient {
    #[instrument(skip(self))]
    async fn find(&self, filter: &str) -> ProviderResult<Option<Resource>> {
        let url = format!(
            "{}/Users?filter={}",
            self.base_url,
            urlencoding::encode(filter)
        );
        let list: ListResponse = self.get(&url).await?;
        if list.resources.len() > 1 {
            warn!(matches = list.resources.len(), "filter matched several accounts, using the first");
        }
        match list.resources.into_iter().next() {
            Some(user) => Ok(Some(to_resource(user)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, payload))]
    async fn create(&self, payload: &Value) -> ProviderResult<Resource> {
        let url = format!("{}/Users", self.base_url);
        let created: Value = self.send_json(reqwest::Method::POST, &url, payload).await?;
        Ok(to_resource(created)?)
    }

    #[instrument(skip(self, payload))]
    async fn patch(&self, id: &str, payload: &Value) -> ProviderResult<()> {
        let _: Value = self
            .send_json(reqwest::Method::PATCH, &self.user_url(id), payload)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn replace(&self, id: &str, payload: &Value) -> ProviderResult<Resource> {
        let replaced: Value = self
            .send_json(reqwest::Method::PUT, &self.user_url(id), payload)
            .await?;
        Ok(to_resource(replaced)?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> ProviderResult<()> {
        Ok(self.delete_url(&self.user_url(id)).await?)
    }
}

fn to_resource(user: Value) -> ScimClientResult<Resource> {
    let id = match user.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    let canonical_key = user
        .get("userName")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Resource {
        id: Some(id.ok_or_else(|| ScimClientError::ParseError("user without id".into()))?),
        canonical_key,
        attributes: user,
    })
}

/// `ListResponse` body; SCIM 1.1 and 2.0 both use `Resources`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(rename = "Resources", default)]
    resources: Vec<Value>,
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ScimClientResult<T> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|e| ScimClientError::ParseError(format!("Failed to parse response: {e}")))
    } else {
        handle_error_response(response).await
    }
}

async fn handle_error_response<T>(response: reqwest::Response) -> ScimClientResult<T> {
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
    let detail = error_detail(&body).unwrap_or_else(|| {
        if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        }
    });

    match status {
        StatusCode::NOT_FOUND => Err(ScimClientError::NotFound(detail)),
        StatusCode::CONFLICT => Err(ScimClientError::Conflict(detail)),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("SCIM target rate limited, retry after {:?}s", retry_after);
            Err(ScimClientError::RateLimited {
                retry_after_secs: retry_after,
            })
        }
        StatusCode::UNAUTHORIZED => Err(ScimClientError::AuthError(format!(
            "Authentication failed (401): {detail}"
        ))),
        _ => Err(ScimClientError::ScimError {
            status: status.as_u16(),
            detail,
        }),
    }
}

/// Error text from a SCIM 2.0 `detail` or a SCIM 1.1 `Errors[0].description`.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .or_else(|| value.pointer("/Errors/0/description"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
