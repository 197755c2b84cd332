//! Group reconciliation run.

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::convergence::{ConvergenceEngine, Step};
use crate::desired::{DesiredGroup, State};
use crate::error::ConvergeResult;
use crate::existence::{self, Existence};
use crate::outcome::Outcome;
use crate::provider::{AliasOps, DirectoryResources, ResourceKind, SettingsOps};
use crate::set_reconciler::reconcile_aliases;
use crate::settings::update_settings;

/// Result document of a group run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub success: bool,
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub group_insert: Outcome,
    pub group_patch: Outcome,
    pub group_delete: Outcome,
    pub aliases_upsert: Outcome,
    pub groups_settings_update: Outcome,
}

impl GroupReport {
    /// Report with every step marked as not executed.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            success: false,
            changed: false,
            failed: false,
            msg: None,
            group_insert: Outcome::not_executed(),
            group_patch: Outcome::not_executed(),
            group_delete: Outcome::not_executed(),
            aliases_upsert: Outcome::not_executed(),
            groups_settings_update: Outcome::not_executed(),
        }
    }

    fn finish(&mut self, result: ConvergeResult<()>) {
        self.changed = [
            &self.group_insert,
            &self.group_patch,
            &self.group_delete,
            &self.aliases_upsert,
            &self.groups_settings_update,
        ]
        .iter()
        .any(|outcome| outcome.changed);
        match result {
            Ok(()) => self.success = true,
            Err(e) => {
                self.failed = true;
                self.msg = Some(e.to_string());
            }
        }
    }
}

/// Converges one group, its aliases and its settings.
pub struct GroupConverger<'a, G: ?Sized, S: ?Sized> {
    groups: &'a G,
    settings: &'a S,
}

impl<'a, G, S> GroupConverger<'a, G, S>
where
    G: DirectoryResources + AliasOps + ?Sized,
    S: SettingsOps + ?Sized,
{
    pub fn new(groups: &'a G, settings: &'a S) -> Self {
        Self { groups, settings }
    }

    /// Run one reconciliation. Fatal errors are reported, not returned.
    #[instrument(skip(self, desired), fields(group = %desired.email))]
    pub async fn run(&self, desired: &DesiredGroup) -> GroupReport {
        let mut report = GroupReport::seeded();
        let result = self.converge(desired, &mut report).await;
        if let Err(e) = &result {
            error!(group = %desired.email, error = %e, "Group reconciliation failed");
        }
        report.finish(result);
        info!(group = %desired.email, changed = report.changed, failed = report.failed, "Group reconciliation finished");
        report
    }

    async fn converge(&self, desired: &DesiredGroup, report: &mut GroupReport) -> ConvergeResult<()> {
        desired.validate()?;
        let key = desired.email.as_str();
        let existence = existence::resolve(self.groups, key).await?;
        let engine = ConvergenceEngine::new(self.groups);

        match (desired.state, existence) {
            (State::Absent, Existence::Present(_)) => {
                report.group_delete = engine.delete(key).await?;
            }
            (State::Absent, Existence::Absent) => {
                report.group_delete = Outcome::unchanged(format!("Group does not exist: {key}"));
            }
            (State::Present, existence) => {
                let payload = desired.payload();
                let converged = engine.converge(existence, key, &payload, &payload).await?;
                match converged.step {
                    Step::Inserted => report.group_insert = converged.outcome,
                    Step::Patched => report.group_patch = converged.outcome,
                }

                report.aliases_upsert =
                    reconcile_aliases(self.groups, ResourceKind::Group, key, &desired.alias_set())
                        .await?;
                report.groups_settings_update =
                    update_settings(self.settings, key, &desired.group_settings).await?;
            }
        }
        Ok(())
    }
}
