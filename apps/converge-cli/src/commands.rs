//! Subcommands: one reconciliation run per invocation.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use converge_core::{
    DesiredGroup, DesiredScimUser, DesiredUser, GroupConverger, GroupReport, ScimConverger,
    ScimReport, UserConverger, UserReport,
};
use converge_gsuite::{BearerToken, DataTransferApi, DirectoryApi, GoogleClient, GroupsSettingsApi};
use converge_scim::{ScimAuth, ScimClient};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::document::load_document;
use crate::error::{CliError, CliResult};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge a Google Workspace group
    Group(ResourceArgs),

    /// Converge a Google Workspace user
    User(ResourceArgs),

    /// Converge a user account on a SCIM endpoint
    ScimUser(ResourceArgs),
}

#[derive(Args, Debug)]
pub struct ResourceArgs {
    /// Path to the desired-state document (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Validate the document and print the report skeleton without contacting any provider
    #[arg(long)]
    pub check: bool,
}

/// Result document of any run.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Group(GroupReport),
    User(UserReport),
    Scim(ScimReport),
}

impl Report {
    #[must_use]
    pub fn failed(&self) -> bool {
        match self {
            Self::Group(report) => report.failed,
            Self::User(report) => report.failed,
            Self::Scim(report) => report.failed,
        }
    }

    /// The error that ended a failed run, carrying the report's `msg`.
    #[must_use]
    pub fn failure(&self) -> Option<CliError> {
        if !self.failed() {
            return None;
        }
        let msg = match self {
            Self::Group(report) => report.msg.as_deref(),
            Self::User(report) => report.msg.as_deref(),
            Self::Scim(report) => report.msg.as_deref(),
        };
        Some(CliError::ConvergenceFailed(
            msg.unwrap_or("run did not complete").to_string(),
        ))
    }
}

pub async fn execute(command: Commands, config: &Config) -> CliResult<Report> {
    match command {
        Commands::Group(args) => converge_group(&args, config).await,
        Commands::User(args) => converge_user(&args, config).await,
        Commands::ScimUser(args) => converge_scim_user(&args, config).await,
    }
}

fn google_client(config: &Config) -> CliResult<GoogleClient> {
    let token = config.require_gsuite_token()?;
    let token = BearerToken::new(SecretString::from(token.expose_secret().to_owned()));
    Ok(GoogleClient::new(token, config.http_timeout)?)
}

async fn converge_group(args: &ResourceArgs, config: &Config) -> CliResult<Report> {
    let desired: DesiredGroup = load_document(&args.file)?;
    desired.validate()?;
    if args.check {
        return Ok(Report::Group(GroupReport::seeded()));
    }

    let client = google_client(config)?;
    let directory = DirectoryApi::new(client.clone(), &config.directory_url);
    let settings = GroupsSettingsApi::new(client, &config.groups_settings_url);
    let groups = directory.groups();

    info!(group = %desired.email, state = ?desired.state, "converging group");
    let report = GroupConverger::new(&groups, &settings).run(&desired).await;
    Ok(Report::Group(report))
}

async fn converge_user(args: &ResourceArgs, config: &Config) -> CliResult<Report> {
    let desired: DesiredUser = load_document(&args.file)?;
    desired.validate()?;
    if args.check {
        return Ok(Report::User(UserReport::seeded()));
    }

    let client = google_client(config)?;
    let directory = DirectoryApi::new(client.clone(), &config.directory_url);
    let transfers = DataTransferApi::new(client, &config.datatransfer_url);
    let users = directory.users();

    info!(user = %desired.email, state = ?desired.state, "converging user");
    let report = UserConverger::new(&users, &directory, &transfers)
        .with_poll_policy(config.poll)
        .run(&desired)
        .await;
    Ok(Report::User(report))
}

async fn converge_scim_user(args: &ResourceArgs, config: &Config) -> CliResult<Report> {
    let desired: DesiredScimUser = load_document(&args.file)?;
    desired.validate()?;
    if args.check {
        return Ok(Report::Scim(ScimReport::seeded()));
    }

    let auth = ScimAuth::new(&desired.authorization)?;
    let client = ScimClient::new(&desired.base_url, auth, config.http_timeout)?;

    info!(user_name = %desired.user_name, base_url = %client.base_url(), "converging SCIM user");
    let report = ScimConverger::new(&client).run(&desired).await;
    Ok(Report::Scim(report))
}
