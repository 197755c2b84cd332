//! Transfer-and-delete workflow.
//!
//! Before a user is deleted, their data is handed over to another user:
//!
//! 1. suspend the source user (skipped when already suspended)
//! 2. pick the transferable application categories
//! 3. start a transfer job, or resume the one already running between the
//!    same two users
//! 4. poll the job until it leaves `inProgress`, bounded by [`PollPolicy`]
//!
//! Deletion itself is left to the caller and must only happen after
//! [`TransferWorkflow::run`] returned `Ok`.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ConvergeError, ConvergeResult, Operation, ProviderError};
use crate::lookup::Lookup;
use crate::outcome::Outcome;
use crate::provider::{
    ApplicationTransfer, DirectoryResources, Resource, ResourceKind, TransferCategory, TransferJob,
    TransferOps, TransferStatus,
};

/// Application categories whose data is handed over.
pub const TRANSFERABLE_APPLICATIONS: [&str; 2] = ["Drive and Docs", "Calendar"];

/// Default wait between two status reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on status reads (one hour at the default interval).
pub const DEFAULT_MAX_POLLS: u32 = 720;

/// How a transfer job is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Maximum number of status reads, the first one included. `None` polls forever.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    #[must_use]
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, Some(DEFAULT_MAX_POLLS))
    }
}

/// Select the allow-listed categories and their first transfer parameter.
#[must_use]
pub fn select_categories(categories: &[TransferCategory]) -> Vec<ApplicationTransfer> {
    categories
        .iter()
        .filter(|category| TRANSFERABLE_APPLICATIONS.contains(&category.name.as_str()))
        .map(|category| ApplicationTransfer {
            application_id: category.id.clone(),
            params: category.transfer_params.first().cloned(),
        })
        .collect()
}

/// Suspends, transfers and waits. See the module docs.
pub struct TransferWorkflow<'a, U: ?Sized, T: ?Sized> {
    users: &'a U,
    transfers: &'a T,
    policy: PollPolicy,
}

impl<'a, U, T> TransferWorkflow<'a, U, T>
where
    U: DirectoryResources + ?Sized,
    T: TransferOps + ?Sized,
{
    pub fn new(users: &'a U, transfers: &'a T, policy: PollPolicy) -> Self {
        Self {
            users,
            transfers,
            policy,
        }
    }

    /// Hand the data of `source` over to `target_key`.
    ///
    /// Returns once the transfer job completed. Any other terminal status,
    /// exhausting the poll bound, or a provider error aborts with the source
    /// user possibly left suspended.
    pub async fn run(&self, source: &Resource, target_key: &str) -> ConvergeResult<Outcome> {
        let from_key = source.canonical_key.as_str();
        let from_id = required_id(source, Operation::StartTransfer)?;

        let target = match Lookup::from_result(self.users.get(target_key).await) {
            Lookup::Found(target) => target,
            Lookup::NotFound => {
                return Err(ConvergeError::TransferTargetMissing(target_key.to_string()))
            }
            Lookup::TransportError(source) => {
                return Err(ConvergeError::Lookup {
                    kind: ResourceKind::User,
                    key: target_key.to_string(),
                    source,
                })
            }
        };
        let to_id = required_id(&target, Operation::StartTransfer)?;

        let mut messages = vec![self.suspend(source).await?];

        let job = match self.resumable_job(from_key, from_id, to_id).await? {
            Some(job) => {
                info!(from = %from_key, to = %target_key, job_id = %job.id, "Resuming data transfer");
                messages.push(format!(
                    "Resumed data transfer {} from {from_key} to {target_key}.",
                    job.id
                ));
                job
            }
            None => {
                let job = self.start(from_key, from_id, to_id).await?;
                info!(from = %from_key, to = %target_key, job_id = %job.id, "Data transfer initiated");
                messages.push(format!(
                    "Data transfer {} from {from_key} to {target_key} initiated.",
                    job.id
                ));
                job
            }
        };

        let attempts = self.wait(&job.id, from_key, target_key).await?;
        info!(from = %from_key, to = %target_key, job_id = %job.id, attempts, "Data transfer completed");
        messages.push(format!(
            "Data transfer from {from_key} to {target_key} completed."
        ));

        Ok(Outcome::changed(messages.join(" ")))
    }

    async fn suspend(&self, source: &Resource) -> ConvergeResult<String> {
        let key = source.canonical_key.as_str();
        if source.flag("suspended") {
            debug!(key = %key, "User already suspended");
            return Ok(format!("User {key} already suspended."));
        }
        self.users
            .patch(key, &json!({ "suspended": true }))
            .await
            .map_err(|e| ConvergeError::provider(Operation::Suspend, ResourceKind::User, key, e))?;
        info!(key = %key, "User suspended");
        Ok(format!("User {key} suspended."))
    }

    /// A job between the two users that is still running.
    ///
    /// Finished jobs are never resumed: data created after they completed
    /// would be lost on delete.
    async fn resumable_job(
        &self,
        from_key: &str,
        from_id: &str,
        to_id: &str,
    ) -> ConvergeResult<Option<TransferJob>> {
        let existing = self
            .transfers
            .find_transfer_job(from_id, to_id)
            .await
            .map_err(|e| {
                ConvergeError::provider(Operation::FindTransfer, ResourceKind::User, from_key, e)
            })?;
        Ok(existing.filter(|job| {
            let running = job.status == TransferStatus::InProgress;
            if !running {
                warn!(job_id = %job.id, status = %job.status, "Ignoring finished data transfer");
            }
            running
        }))
    }

    async fn start(&self, from_key: &str, from_id: &str, to_id: &str) -> ConvergeResult<TransferJob> {
        let categories = self
            .transfers
            .list_transferable_categories()
            .await
            .map_err(|e| {
                ConvergeError::provider(
                    Operation::ListTransferApplications,
                    ResourceKind::User,
                    from_key,
                    e,
                )
            })?;
        let selected = select_categories(&categories);
        debug!(from = %from_key, count = selected.len(), "Selected applications for transfer");

        self.transfers
            .create_transfer_job(from_id, to_id, &selected)
            .await
            .map_err(|e| {
                ConvergeError::provider(Operation::StartTransfer, ResourceKind::User, from_key, e)
            })
    }

    /// Poll until the job completes. Returns the number of status reads.
    async fn wait(&self, job_id: &str, from: &str, to: &str) -> ConvergeResult<u32> {
        let mut attempts = 0u32;
        loop {
            let job = self.transfers.get_transfer_job(job_id).await.map_err(|e| {
                ConvergeError::provider(Operation::PollTransfer, ResourceKind::User, from, e)
            })?;
            attempts += 1;

            match job.status {
                TransferStatus::Completed => return Ok(attempts),
                TransferStatus::Other(status) => {
                    return Err(ConvergeError::TransferFailed {
                        job_id: job_id.to_string(),
                        from: from.to_string(),
                        to: to.to_string(),
                        status,
                    })
                }
                TransferStatus::InProgress => {
                    if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(ConvergeError::TransferTimeout {
                            job_id: job_id.to_string(),
                            from: from.to_string(),
                            to: to.to_string(),
                            attempts,
                        });
                    }
                    debug!(job_id = %job_id, attempts, "Data transfer in progress");
                    tokio::time::sleep(self.policy.interval).await;
                }
            }
        }
    }
}

fn required_id(resource: &Resource, operation: Operation) -> ConvergeResult<&str> {
    resource.id.as_deref().ok_or_else(|| {
        ConvergeError::provider(
            operation,
            ResourceKind::User,
            &resource.canonical_key,
            ProviderError::InvalidResponse("user has no id".to_string()),
        )
    })
}
