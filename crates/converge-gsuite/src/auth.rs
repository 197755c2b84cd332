//! Bearer credentials for the Admin SDK.
//!
//! Tokens are obtained out of band (service account delegation, `gcloud`)
//! and handed in as-is.

use std::sync::Arc;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

/// An OAuth access token for the Admin SDK scopes.
///
/// The [`Debug`] impl redacts the token.
#[derive(Clone)]
pub struct BearerToken {
    token: Arc<SecretString>,
}

impl BearerToken {
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self {
            token: Arc::new(token),
        }
    }

    /// Attach the `Authorization: Bearer` header to a request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.token.expose_secret())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
