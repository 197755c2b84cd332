//! Directory resource convergence engine.
//!
//! Reconciles groups, users and SCIM accounts held by an external provider
//! against a declared desired state, issuing only the calls needed to
//! converge.
//!
//! # Components
//!
//! - [`set_reconciler`] computes add/remove deltas for aliases
//! - [`existence`] resolves a key and rejects alias keys
//! - [`convergence`] inserts, patches (only on a field diff) or deletes
//! - [`membership`] converges group memberships with roles
//! - [`transfer`] hands user data over before deletion
//! - [`settings`] filters and applies group settings
//!
//! [`group`], [`user`] and [`scim`] chain these into one run per resource
//! and produce a serializable report. Providers are reached only through the
//! ports in [`provider`].
//!
//! # Example
//!
//! ```ignore
//! use converge_core::{DesiredGroup, GroupConverger};
//!
//! let converger = GroupConverger::new(&groups, &settings);
//! let report = converger.run(&desired).await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod convergence;
pub mod desired;
pub mod diff;
pub mod error;
pub mod existence;
pub mod group;
pub mod lookup;
pub mod membership;
pub mod outcome;
pub mod provider;
pub mod scim;
pub mod set_reconciler;
pub mod settings;
pub mod transfer;
pub mod user;

pub use convergence::{ConvergenceEngine, Converged, Step};
pub use desired::{DesiredGroup, DesiredScimUser, DesiredUser, ScimVersion, State};
pub use error::{ConvergeError, ConvergeResult, Operation, ProviderError, ProviderResult};
pub use existence::Existence;
pub use group::{GroupConverger, GroupReport};
pub use lookup::Lookup;
pub use outcome::Outcome;
pub use provider::{
    AliasOps, ApplicationTransfer, DirectoryResources, MembershipOps, Membership, Resource,
    ResourceKind, Role, ScimAccounts, SettingsOps, TransferCategory, TransferJob, TransferOps,
    TransferStatus,
};
pub use scim::{ScimConverger, ScimReport};
pub use set_reconciler::{reconcile, SetDelta};
pub use transfer::{PollPolicy, TransferWorkflow};
pub use user::{UserConverger, UserReport};
