//! Create-or-update convergence of a single directory resource.

use serde_json::Value;
use tracing::{debug, info};

use crate::diff;
use crate::error::{ConvergeError, ConvergeResult, Operation};
use crate::existence::Existence;
use crate::outcome::Outcome;
use crate::provider::{DirectoryResources, Resource};

/// Which branch a convergence took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Inserted,
    Patched,
}

/// Result of [`ConvergenceEngine::converge`].
#[derive(Debug, Clone)]
pub struct Converged {
    pub step: Step,
    pub outcome: Outcome,
    /// The resource after convergence, as last reported by the provider.
    pub resource: Resource,
}

/// Drives insert, patch and delete calls against one resource port.
pub struct ConvergenceEngine<'a, R: ?Sized> {
    resources: &'a R,
}

impl<'a, R> ConvergenceEngine<'a, R>
where
    R: DirectoryResources + ?Sized,
{
    pub fn new(resources: &'a R) -> Self {
        Self { resources }
    }

    /// Insert when absent, patch when present.
    ///
    /// `insert_payload` may carry create-only fields that `patch_payload` omits.
    pub async fn converge(
        &self,
        existence: Existence,
        key: &str,
        insert_payload: &Value,
        patch_payload: &Value,
    ) -> ConvergeResult<Converged> {
        match existence {
            Existence::Absent => {
                let (outcome, resource) = self.insert(key, insert_payload).await?;
                Ok(Converged {
                    step: Step::Inserted,
                    outcome,
                    resource,
                })
            }
            Existence::Present(observed) => {
                let (outcome, resource) = self.patch(key, observed, patch_payload).await?;
                Ok(Converged {
                    step: Step::Patched,
                    outcome,
                    resource,
                })
            }
        }
    }

    pub async fn insert(&self, key: &str, payload: &Value) -> ConvergeResult<(Outcome, Resource)> {
        let kind = self.resources.kind();
        let resource = self
            .resources
            .insert(payload)
            .await
            .map_err(|e| ConvergeError::provider(Operation::Create, kind, key, e))?;
        info!(kind = %kind, key = %key, id = ?resource.id, "Resource created");
        Ok((Outcome::changed(format!("{kind} created: {key}")), resource))
    }

    /// Patch only when the observed attributes do not already satisfy `payload`.
    ///
    /// When a patch is needed the full payload is sent, not just the differing
    /// fields.
    pub async fn patch(
        &self,
        key: &str,
        observed: Resource,
        payload: &Value,
    ) -> ConvergeResult<(Outcome, Resource)> {
        let kind = self.resources.kind();
        let fields = diff::changed_fields(&observed.attributes, payload);
        if fields.is_empty() {
            debug!(kind = %kind, key = %key, "Resource is up to date");
            return Ok((Outcome::unchanged(format!("{kind} is up to date: {key}")), observed));
        }

        let resource = self
            .resources
            .patch(key, payload)
            .await
            .map_err(|e| ConvergeError::provider(Operation::Modify, kind, key, e))?;
        info!(kind = %kind, key = %key, fields = ?fields, "Resource modified");
        Ok((
            Outcome::changed(format!("{kind} modified: {key} ({})", fields.join(", "))),
            resource,
        ))
    }

    pub async fn delete(&self, key: &str) -> ConvergeResult<Outcome> {
        let kind = self.resources.kind();
        self.resources
            .delete(key)
            .await
            .map_err(|e| ConvergeError::provider(Operation::Delete, kind, key, e))?;
        info!(kind = %kind, key = %key, "Resource deleted");
        Ok(Outcome::changed(format!("{kind} deleted: {key}")))
    }
}
