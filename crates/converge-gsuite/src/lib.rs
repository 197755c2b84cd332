//! Google Workspace Admin SDK adapter.
//!
//! Implements the `converge-core` provider ports over three REST APIs:
//!
//! - [`DirectoryApi`]: groups, users, aliases and group members
//! - [`GroupsSettingsApi`]: per-group settings
//! - [`DataTransferApi`]: ownership transfers for departing users
//!
//! All three share one [`GoogleClient`] carrying the bearer token. Requests
//! are issued once; there is no retry layer.

pub mod auth;
pub mod client;
pub mod datatransfer;
pub mod directory;
pub mod error;
pub mod groups_settings;

pub use auth::BearerToken;
pub use client::GoogleClient;
pub use datatransfer::{DataTransferApi, DEFAULT_DATATRANSFER_URL};
pub use directory::{Collection, DirectoryApi, DEFAULT_DIRECTORY_URL};
pub use error::{GsuiteError, GsuiteResult};
pub use groups_settings::{GroupsSettingsApi, DEFAULT_GROUPS_SETTINGS_URL};
