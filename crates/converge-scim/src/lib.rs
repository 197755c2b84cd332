//! SCIM 1.1/2.0 adapter for the converge engine.
//!
//! [`ScimClient`] implements [`converge_core::ScimAccounts`] against a
//! single target's `/Users` endpoint.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::ScimAuth;
pub use client::ScimClient;
pub use error::{ScimClientError, ScimClientResult};
