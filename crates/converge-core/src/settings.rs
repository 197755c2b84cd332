//! Settings patch filter.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ConvergeError, ConvergeResult, Operation};
use crate::outcome::Outcome;
use crate::provider::{ResourceKind, SettingsOps};

/// Identity-bearing keys that are never written through the settings path.
pub const EXCLUDED_SETTINGS: [&str; 4] = ["email", "description", "kind", "name"];

/// Drop excluded keys from a desired settings map.
#[must_use]
pub fn filter_settings(desired: &Map<String, Value>) -> Map<String, Value> {
    desired
        .iter()
        .filter(|(key, _)| !EXCLUDED_SETTINGS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Patch the filtered settings of `key`, skipping the call when nothing is left.
pub async fn update_settings<S>(
    settings: &S,
    key: &str,
    desired: &Map<String, Value>,
) -> ConvergeResult<Outcome>
where
    S: SettingsOps + ?Sized,
{
    let body = filter_settings(desired);
    if body.is_empty() {
        debug!(key = %key, "No settings to update");
        return Ok(Outcome::unchanged("Didn't touch the group settings."));
    }

    settings.patch_settings(key, &body).await.map_err(|e| {
        ConvergeError::provider(Operation::UpdateSettings, ResourceKind::Group, key, e)
    })?;
    info!(key = %key, count = body.len(), "Group settings updated");
    Ok(Outcome::changed(format!("Group settings updated: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_strips_identity_keys() {
        let desired = json!({
            "email": "team@example.com",
            "name": "Team",
            "kind": "groupsSettings#groups",
            "description": "x",
            "whoCanJoin": "INVITED_CAN_JOIN",
            "allowExternalMembers": "false",
        });
        let filtered = filter_settings(desired.as_object().unwrap());
        assert_eq!(
            Value::Object(filtered),
            json!({"whoCanJoin": "INVITED_CAN_JOIN", "allowExternalMembers": "false"})
        );
    }

    #[test]
    fn test_filter_of_only_excluded_keys_is_empty() {
        let desired = json!({"email": "a@example.com", "name": "A"});
        assert!(filter_settings(desired.as_object().unwrap()).is_empty());
    }
}
