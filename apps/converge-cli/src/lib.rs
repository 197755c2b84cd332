//! `converge` command-line front end.
//!
//! Loads one desired-state document, builds the provider adapters from the
//! environment and runs a single reconciliation.

pub mod commands;
pub mod config;
pub mod document;
pub mod error;
