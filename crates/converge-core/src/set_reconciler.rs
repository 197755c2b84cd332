//! Set reconciliation for list-valued sub-resources.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::{ConvergeError, ConvergeResult, Operation};
use crate::outcome::Outcome;
use crate::provider::{AliasOps, ResourceKind};

/// Add/remove delta between a desired and an observed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDelta<T: Ord> {
    /// `desired - observed`
    pub to_add: BTreeSet<T>,
    /// `observed - desired`
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord> SetDelta<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the delta that turns `observed` into `desired`.
#[must_use]
pub fn reconcile<T: Ord + Clone>(desired: &BTreeSet<T>, observed: &BTreeSet<T>) -> SetDelta<T> {
    SetDelta {
        to_add: desired.difference(observed).cloned().collect(),
        to_remove: observed.difference(desired).cloned().collect(),
    }
}

fn render(set: &BTreeSet<String>) -> String {
    let items: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("[{}]", items.join(", "))
}

/// Converge the alias set of `key` to exactly `desired`.
///
/// A failing alias listing is read as "no aliases yet". Any failing insert or
/// delete aborts the run.
pub async fn reconcile_aliases<A>(
    aliases: &A,
    kind: ResourceKind,
    key: &str,
    desired: &BTreeSet<String>,
) -> ConvergeResult<Outcome>
where
    A: AliasOps + ?Sized,
{
    let observed = match aliases.list_aliases(key).await {
        Ok(observed) => observed,
        Err(e) => {
            warn!(key = %key, error = %e, "Alias listing failed, assuming no aliases");
            BTreeSet::new()
        }
    };

    let delta = reconcile(desired, &observed);
    if delta.is_empty() {
        debug!(key = %key, count = desired.len(), "Aliases are up to date");
        return Ok(Outcome::unchanged("Aliases are up to date."));
    }

    for alias in &delta.to_add {
        aliases
            .insert_alias(key, alias)
            .await
            .map_err(|e| ConvergeError::provider(Operation::AddAlias, kind, key, e))?;
        info!(key = %key, alias = %alias, "Alias added");
    }

    for alias in &delta.to_remove {
        aliases
            .delete_alias(key, alias)
            .await
            .map_err(|e| ConvergeError::provider(Operation::RemoveAlias, kind, key, e))?;
        info!(key = %key, alias = %alias, "Alias removed");
    }

    Ok(Outcome::changed(format!(
        "Aliases updated (added: {}, removed: {})",
        render(&delta.to_add),
        render(&delta.to_remove)
    )))
}
