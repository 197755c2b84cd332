//! Role-aware group membership reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::{ConvergeError, ConvergeResult, Operation};
use crate::outcome::Outcome;
use crate::provider::{MembershipOps, ResourceKind, Role};
use crate::set_reconciler::reconcile;

fn scoped(member: &str, group: &str) -> String {
    format!("{member} in group {group}")
}

/// Converge the group memberships of `member` to exactly `desired`.
///
/// One outcome per processed group is written into `results` as soon as the
/// group is done, so a fatal error leaves the completed ones in place.
pub async fn reconcile_memberships<M>(
    members: &M,
    member: &str,
    desired: &BTreeMap<String, Role>,
    results: &mut BTreeMap<String, Outcome>,
) -> ConvergeResult<()>
where
    M: MembershipOps + ?Sized,
{
    let kind = ResourceKind::User;
    let current = members
        .list_groups_for_member(member)
        .await
        .map_err(|e| ConvergeError::provider(Operation::ListMemberships, kind, member, e))?;

    // Group addresses are case-insensitive.
    let observed_roles: BTreeMap<String, Option<Role>> = current
        .into_iter()
        .map(|membership| (membership.group.to_lowercase(), membership.role))
        .collect();
    let desired: BTreeMap<String, Role> = desired
        .iter()
        .map(|(group, role)| (group.to_lowercase(), *role))
        .collect();

    let desired_groups: BTreeSet<String> = desired.keys().cloned().collect();
    let observed_groups: BTreeSet<String> = observed_roles.keys().cloned().collect();
    let delta = reconcile(&desired_groups, &observed_groups);

    for group in &delta.to_remove {
        members
            .delete_member(group, member)
            .await
            .map_err(|e| ConvergeError::provider(Operation::RemoveMember, kind, &scoped(member, group), e))?;
        info!(member = %member, group = %group, "Removed from group");
        results.insert(
            group.clone(),
            Outcome::changed(format!("User {member} removed from group {group}")),
        );
    }

    for (group, role) in &desired {
        let is_member = match members.has_member(group, member).await {
            Ok(is_member) => is_member,
            Err(e) => {
                debug!(member = %member, group = %group, error = %e, "Membership check failed, assuming not a member");
                false
            }
        };

        let outcome = if is_member {
            members
                .update_member(group, member, *role)
                .await
                .map_err(|e| ConvergeError::provider(Operation::UpdateMember, kind, &scoped(member, group), e))?;
            match observed_roles.get(group) {
                Some(Some(observed)) if observed == role => {
                    debug!(member = %member, group = %group, role = %role, "Membership is up to date");
                    Outcome::unchanged(format!("User {member} is already a {role} of {group}"))
                }
                _ => {
                    info!(member = %member, group = %group, role = %role, "Membership role updated");
                    Outcome::changed(format!(
                        "Updated membership of {member} in group {group} to {role}"
                    ))
                }
            }
        } else {
            members
                .insert_member(group, member, *role)
                .await
                .map_err(|e| ConvergeError::provider(Operation::AddMember, kind, &scoped(member, group), e))?;
            info!(member = %member, group = %group, role = %role, "Added to group");
            Outcome::changed(format!("User {member} added to group {group} as {role}"))
        };
        results.insert(group.clone(), outcome);
    }

    Ok(())
}
