//! Error types for the convergence engine.
//!
//! Two tiers: [`ProviderError`] is what a provider port reports for a single
//! remote call, [`ConvergeError`] is a fatal condition that aborts the whole
//! reconciliation run.

use std::fmt;

use thiserror::Error;

use crate::provider::ResourceKind;

/// Result type alias using `ProviderError`.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias using `ConvergeError`.
pub type ConvergeResult<T> = Result<T, ConvergeError>;

/// Errors reported by a provider collaborator for a single remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a provider answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered, but the body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether this error signals absence rather than failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Api { status: 404, .. })
    }
}

/// The mutating (or safety-relevant) remote operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Modify,
    Delete,
    Suspend,
    AddAlias,
    RemoveAlias,
    ListMemberships,
    AddMember,
    UpdateMember,
    RemoveMember,
    UpdateSettings,
    ListTransferApplications,
    FindTransfer,
    StartTransfer,
    PollTransfer,
    Activate,
    Deactivate,
}

impl Operation {
    /// Verb phrase used in fatal error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "creating",
            Self::Modify => "modifying",
            Self::Delete => "deleting",
            Self::Suspend => "suspending",
            Self::AddAlias => "adding alias to",
            Self::RemoveAlias => "removing alias from",
            Self::ListMemberships => "finding group memberships for",
            Self::AddMember => "adding group membership of",
            Self::UpdateMember => "updating group membership of",
            Self::RemoveMember => "removing group membership of",
            Self::UpdateSettings => "updating settings for",
            Self::ListTransferApplications => "listing data transfer applications for",
            Self::FindTransfer => "looking up existing data transfer for",
            Self::StartTransfer => "initiating data transfer from",
            Self::PollTransfer => "polling data transfer from",
            Self::Activate => "activating",
            Self::Deactivate => "deactivating",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal conditions that abort a reconciliation run.
///
/// Previously completed mutations are never rolled back; the run report keeps
/// the outcomes recorded before the failure.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// The caller-supplied key resolved to a resource with a different
    /// canonical identifier (the key is only an alias).
    #[error("{kind} exists, but {key} is an alias for {canonical}")]
    IdentityMismatch {
        kind: ResourceKind,
        key: String,
        canonical: String,
    },

    /// Existence could not be determined because the lookup itself failed.
    #[error("ERROR looking up {kind} {key}: {source}")]
    Lookup {
        kind: ResourceKind,
        key: String,
        #[source]
        source: ProviderError,
    },

    /// A provider call failed.
    #[error("ERROR {operation} {kind} {key}: {source}")]
    Provider {
        operation: Operation,
        kind: ResourceKind,
        key: String,
        #[source]
        source: ProviderError,
    },

    /// The data transfer reached a terminal status other than completed.
    #[error("Data transfer {job_id} from {from} to {to} failed ({status})")]
    TransferFailed {
        job_id: String,
        from: String,
        to: String,
        status: String,
    },

    /// The data transfer did not finish within the poll bound.
    #[error("Data transfer {job_id} from {from} to {to} still in progress after {attempts} polls")]
    TransferTimeout {
        job_id: String,
        from: String,
        to: String,
        attempts: u32,
    },

    /// The user that should receive transferred data does not exist.
    #[error("Data transfer target {0} does not exist")]
    TransferTargetMissing(String),

    /// The desired-state document is not usable.
    #[error("Invalid desired state: {0}")]
    InvalidDesiredState(String),
}

impl ConvergeError {
    pub(crate) fn provider(
        operation: Operation,
        kind: ResourceKind,
        key: &str,
        source: ProviderError,
    ) -> Self {
        Self::Provider {
            operation,
            kind,
            key: key.to_string(),
            source,
        }
    }
}
