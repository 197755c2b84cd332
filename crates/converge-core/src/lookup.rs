//! Three-way lookup result distinguishing absence from failure.

use crate::error::{ProviderError, ProviderResult};

/// Result of looking a resource up by key.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The provider returned the resource.
    Found(T),
    /// The provider reported that no such resource exists.
    NotFound,
    /// The lookup failed before the provider could answer either way.
    TransportError(ProviderError),
}

impl<T> Lookup<T> {
    /// Classify a provider result, folding not-found errors into [`Lookup::NotFound`].
    pub fn from_result(result: ProviderResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::NotFound,
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::TransportError(e),
        }
    }

    /// The found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::TransportError(_) => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
