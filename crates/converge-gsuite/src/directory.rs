//! Directory API: groups, users, their aliases and group members.

use std::collections::BTreeSet;

use async_trait::async_trait;
use converge_core::{
    AliasOps, DirectoryResources, Membership, MembershipOps, ProviderResult, Resource,
    ResourceKind, Role,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::client::{segment, GoogleClient};
use crate::error::{GsuiteError, GsuiteResult};

/// Default Directory API root.
pub const DEFAULT_DIRECTORY_URL: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Handle on the Directory API.
///
/// [`groups`](Self::groups) and [`users`](Self::users) give the two resource
/// collections; group membership is served by the handle itself.
#[derive(Debug, Clone)]
pub struct DirectoryApi {
    client: GoogleClient,
    base_url: String,
}

impl DirectoryApi {
    #[must_use]
    pub fn new(client: GoogleClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn groups(&self) -> Collection<'_> {
        Collection {
            api: self,
            kind: ResourceKind::Group,
        }
    }

    #[must_use]
    pub fn users(&self) -> Collection<'_> {
        Collection {
            api: self,
            kind: ResourceKind::User,
        }
    }

    fn member_url(&self, group: &str, member: &str) -> String {
        format!(
            "{}/groups/{}/members/{}",
            self.base_url,
            segment(group),
            segment(member)
        )
    }

    /// Every group the member belongs to, following `nextPageToken`.
    async fn groups_of(&self, member: &str) -> GsuiteResult<Vec<String>> {
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/groups?userKey={}",
                self.base_url,
                urlencoding::encode(member)
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(&urlencoding::encode(token));
            }
            let page: GroupPage = self.client.get(&url).await?;
            groups.extend(page.groups.into_iter().map(|g| g.email));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(groups)
    }

    /// `None` when the role string is not one we know.
    async fn role_in(&self, group: &str, member: &str) -> GsuiteResult<Option<Role>> {
        let entry: MemberEntry = self.client.get(&self.member_url(group, member)).await?;
        Ok(entry.role.as_deref().and_then(Role::parse))
    }
}

/// One resource collection (`groups` or `users`) of the Directory API.
#[derive(Debug, Clone, Copy)]
pub struct Collection<'a> {
    api: &'a DirectoryApi,
    kind: ResourceKind,
}

impl Collection<'_> {
    fn collection_url(&self) -> String {
        let name = match self.kind {
            ResourceKind::User => "users",
            _ => "groups",
        };
        format!("{}/{}", self.api.base_url, name)
    }

    fn resource_url(&self, key: &str) -> String {
        format!("{}/{}", self.collection_url(), segment(key))
    }

    fn aliases_url(&self, key: &str) -> String {
        format!("{}/aliases", self.resource_url(key))
    }

    fn to_resource(&self, attributes: Value) -> GsuiteResult<Resource> {
        let canonical = match self.kind {
            ResourceKind::User => user_identity(&attributes),
            _ => attributes
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let canonical_key = canonical.ok_or_else(|| {
            GsuiteError::ParseError(format!("{} without a primary email", self.kind))
        })?;
        Ok(Resource {
            id: attributes
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            canonical_key,
            attributes,
        })
    }
}

/// The `emails` entry flagged `primary`, else `primaryEmail`.
fn user_identity(user: &Value) -> Option<String> {
    user.get("emails")
        .and_then(Value::as_array)
        .and_then(|emails| {
            emails
                .iter()
                .find(|e| e.get("primary").and_then(Value::as_bool).unwrap_or(false))
        })
        .and_then(|e| e.get("address"))
        .and_then(Value::as_str)
        .or_else(|| user.get("primaryEmail").and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl DirectoryResources for Collection<'_> {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn get(&self, key: &str) -> ProviderResult<Option<Resource>> {
        let found: Option<Value> = self.api.client.get_optional(&self.resource_url(key)).await?;
        match found {
            Some(value) => Ok(Some(self.to_resource(value)?)),
            None => {
                debug!(key = %key, "resource not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(kind = %self.kind))]
    async fn insert(&self, payload: &Value) -> ProviderResult<Resource> {
        let created: Value = self.api.client.post(&self.collection_url(), payload).await?;
        Ok(self.to_resource(created)?)
    }

    #[instrument(skip(self, payload), fields(kind = %self.kind))]
    async fn patch(&self, key: &str, payload: &Value) -> ProviderResult<Resource> {
        let patched: Value = self.api.client.patch(&self.resource_url(key), payload).await?;
        Ok(self.to_resource(patched)?)
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn delete(&self, key: &str) -> ProviderResult<()> {
        Ok(self.api.client.delete(&self.resource_url(key)).await?)
    }
}

#[async_trait]
impl AliasOps for Collection<'_> {
    async fn list_aliases(&self, key: &str) -> ProviderResult<BTreeSet<String>> {
        let list: AliasList = self.api.client.get(&self.aliases_url(key)).await?;
        Ok(list.aliases.into_iter().map(|a| a.alias).collect())
    }

    async fn insert_alias(&self, key: &str, alias: &str) -> ProviderResult<()> {
        let _: Value = self
            .api
            .client
            .post(&self.aliases_url(key), &json!({ "alias": alias }))
            .await?;
        Ok(())
    }

    async fn delete_alias(&self, key: &str, alias: &str) -> ProviderResult<()> {
        let url = format!("{}/{}", self.aliases_url(key), segment(alias));
        Ok(self.api.client.delete(&url).await?)
    }
}

#[async_trait]
impl MembershipOps for DirectoryApi {
    #[instrument(skip(self))]
    async fn list_groups_for_member(&self, member: &str) -> ProviderResult<Vec<Membership>> {
        let groups = self.groups_of(member).await?;
        let mut memberships = Vec::with_capacity(groups.len());
        for group in groups {
            let role = self.role_in(&group, member).await?;
            if role.is_none() {
                warn!(group = %group, member = %member, "membership role unknown");
            }
            memberships.push(Membership { group, role });
        }
        Ok(memberships)
    }

    async fn has_member(&self, group: &str, member: &str) -> ProviderResult<bool> {
        let url = format!(
            "{}/groups/{}/hasMember/{}",
            self.base_url,
            segment(group),
            segment(member)
        );
        let answer: HasMember = self.client.get(&url).await?;
        Ok(answer.is_member)
    }

    async fn insert_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()> {
        let url = format!("{}/groups/{}/members", self.base_url, segment(group));
        let _: Value = self
            .client
            .post(&url, &json!({ "email": member, "role": role }))
            .await?;
        Ok(())
    }

    async fn update_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()> {
        let _: Value = self
            .client
            .put(&self.member_url(group, member), &json!({ "role": role }))
            .await?;
        Ok(())
    }

    async fn delete_member(&self, group: &str, member: &str) -> ProviderResult<()> {
        Ok(self.client.delete(&self.member_url(group, member)).await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupPage {
    #[serde(default)]
    groups: Vec<GroupEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    email: String,
}

#[derive(Debug, Deserialize)]
struct MemberEntry {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HasMember {
    #[serde(default)]
    is_member: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AliasList {
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    alias: String,
}
