//! Provider ports.
//!
//! Capability traits the convergence engine drives. Adapters (the Google
//! Workspace Admin SDK, SCIM endpoints, in-memory fakes in tests) implement
//! the subset they support; the engine never sees transport details.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderResult;

/// Kind of directory resource a port manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Group,
    User,
    ScimUser,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("Group"),
            Self::User => f.write_str("User"),
            Self::ScimUser => f.write_str("SCIM user"),
        }
    }
}

/// A resource as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Provider-assigned opaque identifier, once known.
    pub id: Option<String>,
    /// The provider's authoritative primary key (primary email, `userName`).
    pub canonical_key: String,
    /// Raw attribute document as returned by the provider.
    pub attributes: Value,
}

impl Resource {
    /// Boolean attribute lookup; absent or non-boolean values read as `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Group membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Member,
    Manager,
    Owner,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Manager => "MANAGER",
            Self::Owner => "OWNER",
        }
    }

    /// Parse a provider role string, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MEMBER" => Some(Self::Member),
            "MANAGER" => Some(Self::Manager),
            "OWNER" => Some(Self::Owner),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observed membership of a member in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Group key (the group's email address).
    pub group: String,
    /// Observed role; `None` when the provider reported a role we do not know.
    pub role: Option<Role>,
}

/// A provider-defined data category that may be handed over on deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCategory {
    pub id: String,
    pub name: String,
    /// Category-specific transfer parameters; empty is valid.
    pub transfer_params: Vec<Value>,
}

/// One category entry of a transfer job request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationTransfer {
    pub application_id: String,
    pub params: Option<Value>,
}

/// Status of a transfer job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    InProgress,
    Completed,
    /// Anything else the provider reports; treated as terminal failure.
    Other(String),
}

impl TransferStatus {
    /// Classify a provider status code, case-insensitively.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        if code.eq_ignore_ascii_case("inProgress") {
            Self::InProgress
        } else if code.eq_ignore_ascii_case("completed") {
            Self::Completed
        } else {
            Self::Other(code.to_string())
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("inProgress"),
            Self::Completed => f.write_str("completed"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A transfer job as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub id: String,
    pub status: TransferStatus,
}

/// Keyed CRUD over one kind of directory resource.
#[async_trait]
pub trait DirectoryResources: Send + Sync {
    /// The kind of resource this port manages.
    fn kind(&self) -> ResourceKind;

    /// Look a resource up by key. `Ok(None)` and a not-found error both mean absence.
    async fn get(&self, key: &str) -> ProviderResult<Option<Resource>>;

    async fn insert(&self, payload: &Value) -> ProviderResult<Resource>;

    /// Partial update: keys absent from `payload` are left untouched.
    async fn patch(&self, key: &str, payload: &Value) -> ProviderResult<Resource>;

    async fn delete(&self, key: &str) -> ProviderResult<()>;
}

/// Secondary identifiers attached to a resource.
#[async_trait]
pub trait AliasOps: Send + Sync {
    async fn list_aliases(&self, key: &str) -> ProviderResult<BTreeSet<String>>;

    async fn insert_alias(&self, key: &str, alias: &str) -> ProviderResult<()>;

    async fn delete_alias(&self, key: &str, alias: &str) -> ProviderResult<()>;
}

/// Group membership of a member resource.
#[async_trait]
pub trait MembershipOps: Send + Sync {
    /// All groups the member belongs to, with the member's role in each.
    async fn list_groups_for_member(&self, member: &str) -> ProviderResult<Vec<Membership>>;

    async fn has_member(&self, group: &str, member: &str) -> ProviderResult<bool>;

    async fn insert_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()>;

    async fn update_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()>;

    async fn delete_member(&self, group: &str, member: &str) -> ProviderResult<()>;
}

/// Asynchronous data-ownership transfer between two users.
#[async_trait]
pub trait TransferOps: Send + Sync {
    async fn list_transferable_categories(&self) -> ProviderResult<Vec<TransferCategory>>;

    /// Submit a transfer job between two user identifiers.
    async fn create_transfer_job(
        &self,
        from_id: &str,
        to_id: &str,
        categories: &[ApplicationTransfer],
    ) -> ProviderResult<TransferJob>;

    async fn get_transfer_job(&self, job_id: &str) -> ProviderResult<TransferJob>;

    /// A transfer job between the two users that is still in progress, if any.
    async fn find_transfer_job(&self, from_id: &str, to_id: &str)
        -> ProviderResult<Option<TransferJob>>;
}

/// Partial update of a resource's settings document.
#[async_trait]
pub trait SettingsOps: Send + Sync {
    async fn patch_settings(&self, key: &str, settings: &Map<String, Value>) -> ProviderResult<()>;
}

/// SCIM user accounts, addressed by provider id.
#[async_trait]
pub trait ScimAccounts: Send + Sync {
    /// First account matching a SCIM filter expression.
    async fn find(&self, filter: &str) -> ProviderResult<Option<Resource>>;

    async fn create(&self, payload: &Value) -> ProviderResult<Resource>;

    async fn patch(&self, id: &str, payload: &Value) -> ProviderResult<()>;

    /// Full replacement (PUT) of the account.
    async fn replace(&self, id: &str, payload: &Value) -> ProviderResult<Resource>;

    async fn delete(&self, id: &str) -> ProviderResult<()>;
}
