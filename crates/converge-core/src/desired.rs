//! Declarative desired-state documents and the provider payloads built from them.
//!
//! Each document has a typed base payload. Where a document carries an
//! `extra_attributes` map, its top-level keys override the base payload.

use std::collections::{BTreeMap, BTreeSet};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ConvergeError, ConvergeResult};
use crate::provider::Role;

/// Initial password of users created without one.
pub const DEFAULT_PASSWORD: &str = "change.this.password.now!";

pub const SCIM_V1_CORE_SCHEMA: &str = "urn:scim:schemas:core:1.0";
pub const SCIM_V2_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCIM_V2_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Whether the resource should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

/// SCIM protocol version spoken by the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScimVersion {
    #[default]
    V1,
    V2,
}

/// Desired state of a directory group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredGroup {
    pub email: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub group_settings: Map<String, Value>,
    #[serde(default)]
    pub state: State,
}

impl DesiredGroup {
    pub fn validate(&self) -> ConvergeResult<()> {
        require("email", &self.email)?;
        if self.state == State::Present {
            require("name", &self.name)?;
        }
        require_entries("aliases", &self.aliases)
    }

    /// Body for both insert and patch.
    #[must_use]
    pub fn payload(&self) -> Value {
        json!({
            "email": self.email,
            "name": self.name,
            "description": self.description,
        })
    }

    #[must_use]
    pub fn alias_set(&self) -> BTreeSet<String> {
        self.aliases.iter().cloned().collect()
    }
}

/// Desired state of a directory user.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredUser {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub employee_id: String,
    /// Only sent when the user is created.
    #[serde(default = "default_password", deserialize_with = "deserialize_secret")]
    pub password: SecretString,
    /// Only sent when the user is created.
    #[serde(default = "default_true")]
    pub change_password_at_next_login: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Group key to role.
    #[serde(default)]
    pub groups: BTreeMap<String, Role>,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default = "default_org_unit_path")]
    pub org_unit_path: String,
    /// User that receives Drive and Calendar data before deletion.
    #[serde(default)]
    pub transfer_user_email: Option<String>,
    #[serde(default)]
    pub extra_attributes: Map<String, Value>,
    #[serde(default)]
    pub state: State,
}

impl DesiredUser {
    pub fn validate(&self) -> ConvergeResult<()> {
        require("email", &self.email)?;
        if self.state == State::Present {
            require("given_name", &self.given_name)?;
            require("family_name", &self.family_name)?;
            require("employee_id", &self.employee_id)?;
            require("org_unit_path", &self.org_unit_path)?;
        }
        require_entries("aliases", &self.aliases)?;
        if self.groups.keys().any(|group| group.trim().is_empty()) {
            return Err(invalid("groups must not contain an empty group key"));
        }
        if let Some(target) = self.transfer_target() {
            if target.to_lowercase() == self.email.to_lowercase() {
                return Err(invalid(
                    "transfer_user_email must differ from the user being deleted",
                ));
            }
        }
        Ok(())
    }

    /// The transfer target, treating an empty string as none.
    #[must_use]
    pub fn transfer_target(&self) -> Option<&str> {
        self.transfer_user_email
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
    }

    /// Attributes shared by insert and patch.
    fn base_payload(&self) -> Map<String, Value> {
        let body = json!({
            "primaryEmail": self.email,
            "externalIds": [
                {"value": self.employee_id, "type": "organization"}
            ],
            "name": {
                "givenName": self.given_name,
                "familyName": self.family_name,
            },
            "orgUnitPath": self.org_unit_path,
            "suspended": self.suspended,
        });
        match body {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Insert body, including the create-only password fields.
    #[must_use]
    pub fn insert_payload(&self) -> Value {
        let mut body = self.base_payload();
        body.insert(
            "password".to_string(),
            Value::String(self.password.expose_secret().to_string()),
        );
        body.insert(
            "changePasswordAtNextLogin".to_string(),
            Value::Bool(self.change_password_at_next_login),
        );
        merge_extensions(&mut body, &self.extra_attributes);
        Value::Object(body)
    }

    /// Patch body; never touches the password.
    #[must_use]
    pub fn patch_payload(&self) -> Value {
        let mut body = self.base_payload();
        merge_extensions(&mut body, &self.extra_attributes);
        Value::Object(body)
    }

    #[must_use]
    pub fn alias_set(&self) -> BTreeSet<String> {
        self.aliases.iter().cloned().collect()
    }
}

/// Desired state of a SCIM user account.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredScimUser {
    /// SCIM endpoint root, without the trailing `/Users`.
    pub base_url: String,
    /// Complete `Authorization` header value.
    #[serde(deserialize_with = "deserialize_secret")]
    pub authorization: SecretString,
    pub given_name: String,
    pub family_name: String,
    pub user_name: String,
    pub email: String,
    /// SCIM filter used to find the account, e.g. `userName eq "jdoe"`.
    pub search_query: String,
    /// Replace the account body on every run while it is active.
    #[serde(default = "default_true")]
    pub update: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub scim_version: ScimVersion,
    #[serde(default)]
    pub extra_attributes: Map<String, Value>,
    #[serde(default)]
    pub state: State,
}

impl DesiredScimUser {
    pub fn validate(&self) -> ConvergeResult<()> {
        require("base_url", &self.base_url)?;
        require("authorization", self.authorization.expose_secret())?;
        require("user_name", &self.user_name)?;
        require("search_query", &self.search_query)?;
        if self.state == State::Present {
            require("given_name", &self.given_name)?;
            require("family_name", &self.family_name)?;
            require("email", &self.email)?;
        }
        Ok(())
    }

    fn user_body(&self) -> Map<String, Value> {
        let body = json!({
            "userName": self.user_name,
            "name": {
                "familyName": self.family_name,
                "givenName": self.given_name,
            },
            "displayName": format!("{} {}", self.given_name, self.family_name),
            "emails": [
                {"value": self.email, "type": "work", "primary": true}
            ],
            "active": true,
        });
        let mut body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge_extensions(&mut body, &self.extra_attributes);
        body
    }

    #[must_use]
    pub fn create_payload(&self) -> Value {
        let mut body = self.user_body();
        let schema = match self.scim_version {
            ScimVersion::V1 => SCIM_V1_CORE_SCHEMA,
            ScimVersion::V2 => SCIM_V2_USER_SCHEMA,
        };
        body.insert("schemas".to_string(), json!([schema]));
        Value::Object(body)
    }

    /// Full replacement body for the account `id`.
    #[must_use]
    pub fn replace_payload(&self, id: &str) -> Value {
        let mut body = self.user_body();
        body.insert("id".to_string(), Value::String(id.to_string()));
        Value::Object(body)
    }

    /// Patch body that sets the `active` flag.
    #[must_use]
    pub fn active_payload(&self, active: bool) -> Value {
        match self.scim_version {
            ScimVersion::V1 => json!({
                "schemas": [SCIM_V1_CORE_SCHEMA],
                "active": active,
            }),
            ScimVersion::V2 => json!({
                "schemas": [SCIM_V2_PATCH_OP],
                "Operations": [
                    {"op": "Replace", "path": "active", "value": active}
                ],
            }),
        }
    }
}

/// Overlay `extensions` onto `base`; extension keys win.
pub fn merge_extensions(base: &mut Map<String, Value>, extensions: &Map<String, Value>) {
    for (key, value) in extensions {
        base.insert(key.clone(), value.clone());
    }
}

fn require(field: &str, value: &str) -> ConvergeResult<()> {
    if value.trim().is_empty() {
        Err(invalid(&format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn require_entries(field: &str, values: &[String]) -> ConvergeResult<()> {
    if values.iter().any(|value| value.trim().is_empty()) {
        Err(invalid(&format!("{field} must not contain empty entries")))
    } else {
        Ok(())
    }
}

fn invalid(message: &str) -> ConvergeError {
    ConvergeError::InvalidDesiredState(message.to_string())
}

fn default_true() -> bool {
    true
}

fn default_org_unit_path() -> String {
    "/".to_string()
}

fn default_password() -> SecretString {
    SecretString::from(DEFAULT_PASSWORD.to_string())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
