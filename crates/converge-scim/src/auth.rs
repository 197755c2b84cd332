//! SCIM target authentication.
//!
//! Targets are addressed with a caller-supplied `Authorization` header value
//! (`Bearer ...`, `Basic ...`), passed through unchanged.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ScimClientError, ScimClientResult};

/// A complete `Authorization` header value.
///
/// The [`Debug`] impl redacts the credential.
#[derive(Clone)]
pub struct ScimAuth {
    header: HeaderValue,
}

impl ScimAuth {
    /// Validate the header value once, up front.
    pub fn new(authorization: &SecretString) -> ScimClientResult<Self> {
        let mut header = HeaderValue::from_str(authorization.expose_secret()).map_err(|_| {
            ScimClientError::InvalidConfig("authorization is not a valid header value".into())
        })?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    /// Attach the header to a request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, self.header.clone())
    }
}

impl std::fmt::Debug for ScimAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScimAuth")
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}
