//! SCIM account reconciliation run.
//!
//! Accounts are found by a caller-supplied filter and addressed by their
//! provider id afterwards. Presence is converged first, then the `active`
//! flag, then (for active accounts only) the full account body.

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::desired::{DesiredScimUser, State};
use crate::diff;
use crate::error::{ConvergeError, ConvergeResult, Operation, ProviderError};
use crate::existence::ensure_canonical;
use crate::lookup::Lookup;
use crate::provider::{Resource, ResourceKind, ScimAccounts};

const KIND: ResourceKind = ResourceKind::ScimUser;

/// Result document of a SCIM account run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScimReport {
    pub success: bool,
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// The account exists and is active.
    pub exists: bool,
    pub created: bool,
    pub activated: bool,
    pub deactivated: bool,
    pub updated: bool,
    pub deleted: bool,
}

impl ScimReport {
    #[must_use]
    pub fn seeded() -> Self {
        Self::default()
    }

    fn finish(&mut self, result: ConvergeResult<()>) {
        self.changed =
            self.created || self.activated || self.deactivated || self.updated || self.deleted;
        match result {
            Ok(()) => self.success = true,
            Err(e) => {
                self.failed = true;
                self.msg = Some(e.to_string());
            }
        }
    }
}

pub struct ScimConverger<'a, A: ?Sized> {
    accounts: &'a A,
}

impl<'a, A> ScimConverger<'a, A>
where
    A: ScimAccounts + ?Sized,
{
    pub fn new(accounts: &'a A) -> Self {
        Self { accounts }
    }

    /// Run one reconciliation. Fatal errors are reported, not returned.
    #[instrument(skip(self, desired), fields(user_name = %desired.user_name))]
    pub async fn run(&self, desired: &DesiredScimUser) -> ScimReport {
        let mut report = ScimReport::seeded();
        let result = self.converge(desired, &mut report).await;
        if let Err(e) = &result {
            error!(user_name = %desired.user_name, error = %e, "SCIM reconciliation failed");
        }
        report.finish(result);
        info!(user_name = %desired.user_name, changed = report.changed, failed = report.failed, "SCIM reconciliation finished");
        report
    }

    async fn converge(&self, desired: &DesiredScimUser, report: &mut ScimReport) -> ConvergeResult<()> {
        desired.validate()?;
        let key = desired.user_name.as_str();

        let found = match Lookup::from_result(self.accounts.find(&desired.search_query).await) {
            Lookup::Found(account) => Some(account),
            Lookup::NotFound => None,
            Lookup::TransportError(source) => {
                return Err(ConvergeError::Lookup {
                    kind: KIND,
                    key: key.to_string(),
                    source,
                })
            }
        };

        match (found, desired.state) {
            (None, State::Absent) => {
                debug!(user_name = %key, "Account does not exist");
            }
            (None, State::Present) => {
                let account = self
                    .accounts
                    .create(&desired.create_payload())
                    .await
                    .map_err(|e| ConvergeError::provider(Operation::Create, KIND, key, e))?;
                let id = account_id(&account, key, Operation::Create)?;
                info!(user_name = %key, id = %id, "Account created");
                report.user_id = Some(id.to_string());
                report.created = true;
                report.exists = true;

                if !desired.active {
                    self.set_active(desired, id, false).await?;
                    report.deactivated = true;
                    report.exists = false;
                }
            }
            (Some(account), state) => {
                if !account.canonical_key.is_empty() {
                    ensure_canonical(KIND, key, &account)?;
                }
                let id = account_id(&account, key, Operation::Modify)?;
                report.user_id = Some(id.to_string());
                report.exists = true;

                if state == State::Absent {
                    self.accounts
                        .delete(id)
                        .await
                        .map_err(|e| ConvergeError::provider(Operation::Delete, KIND, key, e))?;
                    info!(user_name = %key, id = %id, "Account deleted");
                    report.deleted = true;
                    report.exists = false;
                    return Ok(());
                }

                let mut active = account.flag("active");
                if desired.active && !active {
                    self.set_active(desired, id, true).await?;
                    report.activated = true;
                    active = true;
                } else if !desired.active && active {
                    self.set_active(desired, id, false).await?;
                    report.deactivated = true;
                    active = false;
                }
                report.exists = active;

                if active && desired.update {
                    report.updated = self.replace(desired, &account, id).await?;
                }
            }
        }
        Ok(())
    }

    async fn set_active(&self, desired: &DesiredScimUser, id: &str, active: bool) -> ConvergeResult<()> {
        let operation = if active {
            Operation::Activate
        } else {
            Operation::Deactivate
        };
        self.accounts
            .patch(id, &desired.active_payload(active))
            .await
            .map_err(|e| ConvergeError::provider(operation, KIND, &desired.user_name, e))?;
        info!(user_name = %desired.user_name, id = %id, active, "Account active flag set");
        Ok(())
    }

    /// Replace the account body unless the observed account already matches.
    async fn replace(
        &self,
        desired: &DesiredScimUser,
        observed: &Resource,
        id: &str,
    ) -> ConvergeResult<bool> {
        let body = desired.replace_payload(id);
        let fields = diff::changed_fields(&observed.attributes, &body);
        if fields.is_empty() {
            debug!(user_name = %desired.user_name, "Account is up to date");
            return Ok(false);
        }
        self.accounts
            .replace(id, &body)
            .await
            .map_err(|e| ConvergeError::provider(Operation::Modify, KIND, &desired.user_name, e))?;
        info!(user_name = %desired.user_name, id = %id, fields = ?fields, "Account updated");
        Ok(true)
    }
}

fn account_id<'r>(account: &'r Resource, key: &str, operation: Operation) -> ConvergeResult<&'r str> {
    account.id.as_deref().ok_or_else(|| {
        ConvergeError::provider(
            operation,
            KIND,
            key,
            ProviderError::InvalidResponse("account has no id".to_string()),
        )
    })
}
