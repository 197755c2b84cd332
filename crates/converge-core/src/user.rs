//! User reconciliation run.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::convergence::{ConvergenceEngine, Step};
use crate::desired::{DesiredUser, State};
use crate::error::ConvergeResult;
use crate::existence::{self, Existence};
use crate::membership::reconcile_memberships;
use crate::outcome::Outcome;
use crate::provider::{AliasOps, DirectoryResources, MembershipOps, ResourceKind, TransferOps};
use crate::set_reconciler::reconcile_aliases;
use crate::transfer::{PollPolicy, TransferWorkflow};

/// Result document of a user run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub success: bool,
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub user_insert: Outcome,
    pub user_patch: Outcome,
    pub user_delete: Outcome,
    pub aliases_upsert: Outcome,
    /// One outcome per processed group key.
    pub manage_groups: BTreeMap<String, Outcome>,
}

impl UserReport {
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            success: false,
            changed: false,
            failed: false,
            msg: None,
            user_insert: Outcome::not_executed(),
            user_patch: Outcome::not_executed(),
            user_delete: Outcome::not_executed(),
            aliases_upsert: Outcome::not_executed(),
            manage_groups: BTreeMap::new(),
        }
    }

    /// Aggregate of all group membership outcomes.
    #[must_use]
    pub fn memberships(&self) -> Outcome {
        Outcome::aggregate(self.manage_groups.values())
    }

    fn finish(&mut self, result: ConvergeResult<()>) {
        self.changed = self.user_insert.changed
            || self.user_patch.changed
            || self.user_delete.changed
            || self.aliases_upsert.changed
            || self.memberships().changed;
        match result {
            Ok(()) => self.success = true,
            Err(e) => {
                self.failed = true;
                self.msg = Some(e.to_string());
            }
        }
    }
}

/// Converges one user, their group memberships and aliases, or deletes them
/// after handing their data over.
pub struct UserConverger<'a, U: ?Sized, M: ?Sized, T: ?Sized> {
    users: &'a U,
    members: &'a M,
    transfers: &'a T,
    poll: PollPolicy,
}

impl<'a, U, M, T> UserConverger<'a, U, M, T>
where
    U: DirectoryResources + AliasOps + ?Sized,
    M: MembershipOps + ?Sized,
    T: TransferOps + ?Sized,
{
    pub fn new(users: &'a U, members: &'a M, transfers: &'a T) -> Self {
        Self {
            users,
            members,
            transfers,
            poll: PollPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Run one reconciliation. Fatal errors are reported, not returned.
    #[instrument(skip(self, desired), fields(user = %desired.email))]
    pub async fn run(&self, desired: &DesiredUser) -> UserReport {
        let mut report = UserReport::seeded();
        let result = self.converge(desired, &mut report).await;
        if let Err(e) = &result {
            error!(user = %desired.email, error = %e, "User reconciliation failed");
        }
        report.finish(result);
        info!(user = %desired.email, changed = report.changed, failed = report.failed, "User reconciliation finished");
        report
    }

    async fn converge(&self, desired: &DesiredUser, report: &mut UserReport) -> ConvergeResult<()> {
        desired.validate()?;
        let key = desired.email.as_str();
        let existence = existence::resolve(self.users, key).await?;
        let engine = ConvergenceEngine::new(self.users);

        match (desired.state, existence) {
            (State::Absent, Existence::Present(user)) => {
                let deleted = match desired.transfer_target() {
                    Some(target) => {
                        report.user_delete =
                            TransferWorkflow::new(self.users, self.transfers, self.poll)
                                .run(&user, target)
                                .await?;
                        let deleted = engine.delete(key).await?;
                        Outcome::aggregate([&report.user_delete, &deleted])
                    }
                    None => engine.delete(key).await?,
                };
                report.user_delete = deleted;
            }
            (State::Absent, Existence::Absent) => {
                report.user_delete = Outcome::unchanged(format!("User does not exist: {key}"));
            }
            (State::Present, existence) => {
                let converged = engine
                    .converge(existence, key, &desired.insert_payload(), &desired.patch_payload())
                    .await?;
                match converged.step {
                    Step::Inserted => report.user_insert = converged.outcome,
                    Step::Patched => report.user_patch = converged.outcome,
                }

                reconcile_memberships(self.members, key, &desired.groups, &mut report.manage_groups)
                    .await?;
                report.aliases_upsert =
                    reconcile_aliases(self.users, ResourceKind::User, key, &desired.alias_set())
                        .await?;
            }
        }
        Ok(())
    }
}
