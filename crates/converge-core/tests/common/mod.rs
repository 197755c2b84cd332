//! In-memory provider for convergence tests.
//!
//! Holds groups, users, aliases, memberships, settings and transfer jobs,
//! records every call as `"<op> <args>"`, and can be told to fail any
//! operation or to play back a sequence of transfer statuses.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use converge_core::{
    AliasOps, ApplicationTransfer, DirectoryResources, MembershipOps, Membership, ProviderError,
    ProviderResult, Resource, ResourceKind, Role, ScimAccounts, SettingsOps, TransferCategory,
    TransferJob, TransferOps, TransferStatus,
};

static INIT: Once = Once::new();

/// Install a test subscriber when `RUST_LOG` is set.
pub fn init_tracing() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Operations that change provider state.
const MUTATIONS: [&str; 13] = [
    "groups.insert",
    "groups.patch",
    "groups.delete",
    "users.insert",
    "users.patch",
    "users.delete",
    "aliases.insert",
    "aliases.delete",
    "members.insert",
    "members.update",
    "members.delete",
    "settings.patch",
    "transfers.create",
];

#[derive(Default)]
struct Store {
    groups: BTreeMap<String, Value>,
    users: BTreeMap<String, Value>,
    /// Canonical key to aliases.
    aliases: BTreeMap<String, BTreeSet<String>>,
    /// Group key to member key to role.
    members: BTreeMap<String, BTreeMap<String, Role>>,
    settings: BTreeMap<String, Map<String, Value>>,
    categories: Vec<TransferCategory>,
    jobs: BTreeMap<String, Job>,
    status_script: VecDeque<TransferStatus>,
    failures: BTreeMap<String, ProviderError>,
    calls: Vec<String>,
    next_id: u64,
}

struct Job {
    from: String,
    to: String,
    categories: Vec<ApplicationTransfer>,
    status: TransferStatus,
}

impl Store {
    fn record(&mut self, op: &str, args: &str) -> ProviderResult<()> {
        self.calls.push(format!("{op} {args}"));
        match self.failures.get(op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn id(&mut self) -> String {
        self.next_id += 1;
        format!("1{:05}", self.next_id)
    }

    /// Resolve a key or alias to the canonical key of a stored resource.
    fn canonical(&self, kind: ResourceKind, key: &str) -> Option<String> {
        let key = key.to_lowercase();
        let table = self.table(kind);
        if table.contains_key(&key) {
            return Some(key);
        }
        self.aliases
            .iter()
            .find(|(owner, aliases)| {
                table.contains_key(owner.as_str())
                    && aliases.iter().any(|alias| alias.to_lowercase() == key)
            })
            .map(|(owner, _)| owner.clone())
    }

    fn table(&self, kind: ResourceKind) -> &BTreeMap<String, Value> {
        match kind {
            ResourceKind::Group => &self.groups,
            _ => &self.users,
        }
    }

    fn table_mut(&mut self, kind: ResourceKind) -> &mut BTreeMap<String, Value> {
        match kind {
            ResourceKind::Group => &mut self.groups,
            _ => &mut self.users,
        }
    }
}

fn primary_field(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Group => "email",
        _ => "primaryEmail",
    }
}

fn prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Group => "groups",
        _ => "users",
    }
}

fn to_resource(kind: ResourceKind, attributes: &Value) -> Resource {
    Resource {
        id: attributes["id"].as_str().map(ToString::to_string),
        canonical_key: attributes[primary_field(kind)]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        attributes: attributes.clone(),
    }
}

fn not_found(what: &str) -> ProviderError {
    ProviderError::Api {
        status: 404,
        message: format!("Resource Not Found: {what}"),
    }
}

/// The shared in-memory provider.
#[derive(Default)]
pub struct FakeDirectory {
    store: Mutex<Store>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    pub fn groups(&self) -> Resources<'_> {
        Resources {
            directory: self,
            kind: ResourceKind::Group,
        }
    }

    pub fn users(&self) -> Resources<'_> {
        Resources {
            directory: self,
            kind: ResourceKind::User,
        }
    }

    // ---- seeding -----------------------------------------------------------

    pub fn add_group(&self, email: &str, name: &str, description: &str) -> String {
        let mut store = self.store();
        let id = store.id();
        store.groups.insert(
            email.to_lowercase(),
            json!({"id": id, "email": email, "name": name, "description": description}),
        );
        id
    }

    pub fn add_user(&self, attributes: Value) -> String {
        let mut store = self.store();
        let id = store.id();
        let mut attributes = attributes;
        attributes["id"] = Value::String(id.clone());
        let key = attributes["primaryEmail"]
            .as_str()
            .unwrap_or_default()
            .to_lowercase();
        store.users.insert(key, attributes);
        id
    }

    pub fn add_aliases(&self, key: &str, aliases: &[&str]) {
        self.store()
            .aliases
            .entry(key.to_lowercase())
            .or_default()
            .extend(aliases.iter().map(ToString::to_string));
    }

    pub fn add_member(&self, group: &str, member: &str, role: Role) {
        self.store()
            .members
            .entry(group.to_string())
            .or_default()
            .insert(member.to_string(), role);
    }

    pub fn add_category(&self, id: &str, name: &str, params: Vec<Value>) {
        self.store().categories.push(TransferCategory {
            id: id.to_string(),
            name: name.to_string(),
            transfer_params: params,
        });
    }

    pub fn add_job(&self, from_id: &str, to_id: &str, status: TransferStatus) -> String {
        let mut store = self.store();
        let id = format!("job-{}", store.id());
        store.jobs.insert(
            id.clone(),
            Job {
                from: from_id.to_string(),
                to: to_id.to_string(),
                categories: Vec::new(),
                status,
            },
        );
        id
    }

    /// Statuses returned by successive transfer polls; the last one repeats.
    pub fn script_transfer(&self, statuses: &[TransferStatus]) {
        self.store().status_script = statuses.iter().cloned().collect();
    }

    /// Make every call to `op` fail with `error`.
    pub fn fail(&self, op: &str, error: ProviderError) {
        self.store().failures.insert(op.to_string(), error);
    }

    // ---- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.store().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        let needle = format!("{op} ");
        self.store()
            .calls
            .iter()
            .filter(|call| call.starts_with(&needle))
            .count()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.store()
            .calls
            .iter()
            .filter(|call| MUTATIONS.iter().any(|op| call.starts_with(&format!("{op} "))))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.store().calls.clear();
    }

    pub fn group(&self, email: &str) -> Option<Value> {
        self.store().groups.get(&email.to_lowercase()).cloned()
    }

    pub fn user(&self, email: &str) -> Option<Value> {
        self.store().users.get(&email.to_lowercase()).cloned()
    }

    pub fn aliases_of(&self, key: &str) -> BTreeSet<String> {
        self.store()
            .aliases
            .get(&key.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn roles_of(&self, member: &str) -> BTreeMap<String, Role> {
        self.store()
            .members
            .iter()
            .filter_map(|(group, members)| members.get(member).map(|role| (group.clone(), *role)))
            .collect()
    }

    pub fn settings_of(&self, key: &str) -> Option<Map<String, Value>> {
        self.store().settings.get(key).cloned()
    }

    pub fn job_categories(&self) -> Vec<Vec<ApplicationTransfer>> {
        self.store()
            .jobs
            .values()
            .map(|job| job.categories.clone())
            .collect()
    }
}

/// A view of the groups or users table.
pub struct Resources<'a> {
    directory: &'a FakeDirectory,
    kind: ResourceKind,
}

#[async_trait]
impl DirectoryResources for Resources<'_> {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get(&self, key: &str) -> ProviderResult<Option<Resource>> {
        let mut store = self.directory.store();
        store.record(&format!("{}.get", prefix(self.kind)), key)?;
        match store.canonical(self.kind, key) {
            Some(canonical) => Ok(store
                .table(self.kind)
                .get(&canonical)
                .map(|attributes| to_resource(self.kind, attributes))),
            None => Err(not_found(key)),
        }
    }

    async fn insert(&self, payload: &Value) -> ProviderResult<Resource> {
        let mut store = self.directory.store();
        let key = payload[primary_field(self.kind)]
            .as_str()
            .unwrap_or_default()
            .to_string();
        store.record(&format!("{}.insert", prefix(self.kind)), &key)?;
        if store.table(self.kind).contains_key(&key.to_lowercase()) {
            return Err(ProviderError::Api {
                status: 409,
                message: "Entity already exists.".to_string(),
            });
        }
        let mut attributes = payload.clone();
        if let Some(map) = attributes.as_object_mut() {
            map.remove("password");
            map.remove("changePasswordAtNextLogin");
        }
        attributes["id"] = Value::String(store.id());
        store
            .table_mut(self.kind)
            .insert(key.to_lowercase(), attributes.clone());
        Ok(to_resource(self.kind, &attributes))
    }

    async fn patch(&self, key: &str, payload: &Value) -> ProviderResult<Resource> {
        let mut store = self.directory.store();
        store.record(&format!("{}.patch", prefix(self.kind)), key)?;
        let canonical = store.canonical(self.kind, key).ok_or_else(|| not_found(key))?;
        let entry = store
            .table_mut(self.kind)
            .get_mut(&canonical)
            .ok_or_else(|| not_found(key))?;
        if let (Some(target), Some(changes)) = (entry.as_object_mut(), payload.as_object()) {
            for (field, value) in changes {
                target.insert(field.clone(), value.clone());
            }
        }
        let entry = entry.clone();
        Ok(to_resource(self.kind, &entry))
    }

    async fn delete(&self, key: &str) -> ProviderResult<()> {
        let mut store = self.directory.store();
        store.record(&format!("{}.delete", prefix(self.kind)), key)?;
        let canonical = store.canonical(self.kind, key).ok_or_else(|| not_found(key))?;
        store.table_mut(self.kind).remove(&canonical);
        store.aliases.remove(&canonical);
        Ok(())
    }
}

#[async_trait]
impl AliasOps for Resources<'_> {
    async fn list_aliases(&self, key: &str) -> ProviderResult<BTreeSet<String>> {
        let mut store = self.directory.store();
        store.record("aliases.list", key)?;
        Ok(store
            .aliases
            .get(&key.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_alias(&self, key: &str, alias: &str) -> ProviderResult<()> {
        let mut store = self.directory.store();
        store.record("aliases.insert", &format!("{key} {alias}"))?;
        store
            .aliases
            .entry(key.to_lowercase())
            .or_default()
            .insert(alias.to_string());
        Ok(())
    }

    async fn delete_alias(&self, key: &str, alias: &str) -> ProviderResult<()> {
        let mut store = self.directory.store();
        store.record("aliases.delete", &format!("{key} {alias}"))?;
        if let Some(aliases) = store.aliases.get_mut(&key.to_lowercase()) {
            aliases.remove(alias);
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipOps for FakeDirectory {
    async fn list_groups_for_member(&self, member: &str) -> ProviderResult<Vec<Membership>> {
        let mut store = self.store();
        store.record("members.list", member)?;
        Ok(store
            .members
            .iter()
            .filter_map(|(group, members)| {
                members.get(member).map(|role| Membership {
                    group: group.clone(),
                    role: Some(*role),
                })
            })
            .collect())
    }

    async fn has_member(&self, group: &str, member: &str) -> ProviderResult<bool> {
        let mut store = self.store();
        store.record("members.has", &format!("{group} {member}"))?;
        Ok(store
            .members
            .get(group)
            .is_some_and(|members| members.contains_key(member)))
    }

    async fn insert_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("members.insert", &format!("{group} {member} {role}"))?;
        store
            .members
            .entry(group.to_string())
            .or_default()
            .insert(member.to_string(), role);
        Ok(())
    }

    async fn update_member(&self, group: &str, member: &str, role: Role) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("members.update", &format!("{group} {member} {role}"))?;
        store
            .members
            .get_mut(group)
            .and_then(|members| members.get_mut(member))
            .map(|current| *current = role)
            .ok_or_else(|| not_found(member))
    }

    async fn delete_member(&self, group: &str, member: &str) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("members.delete", &format!("{group} {member}"))?;
        if let Some(members) = store.members.get_mut(group) {
            members.remove(member);
        }
        Ok(())
    }
}

#[async_trait]
impl TransferOps for FakeDirectory {
    async fn list_transferable_categories(&self) -> ProviderResult<Vec<TransferCategory>> {
        let mut store = self.store();
        store.record("transfers.applications", "")?;
        Ok(store.categories.clone())
    }

    async fn create_transfer_job(
        &self,
        from_id: &str,
        to_id: &str,
        categories: &[ApplicationTransfer],
    ) -> ProviderResult<TransferJob> {
        let mut store = self.store();
        store.record("transfers.create", &format!("{from_id} {to_id}"))?;
        let id = format!("job-{}", store.id());
        store.jobs.insert(
            id.clone(),
            Job {
                from: from_id.to_string(),
                to: to_id.to_string(),
                categories: categories.to_vec(),
                status: TransferStatus::InProgress,
            },
        );
        Ok(TransferJob {
            id,
            status: TransferStatus::InProgress,
        })
    }

    async fn get_transfer_job(&self, job_id: &str) -> ProviderResult<TransferJob> {
        let mut store = self.store();
        store.record("transfers.get", job_id)?;
        let next = if store.status_script.len() > 1 {
            store.status_script.pop_front()
        } else {
            store.status_script.front().cloned()
        };
        let job = store.jobs.get_mut(job_id).ok_or_else(|| not_found(job_id))?;
        if let Some(status) = next {
            job.status = status;
        }
        Ok(TransferJob {
            id: job_id.to_string(),
            status: job.status.clone(),
        })
    }

    async fn find_transfer_job(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> ProviderResult<Option<TransferJob>> {
        let mut store = self.store();
        store.record("transfers.find", &format!("{from_id} {to_id}"))?;
        Ok(store
            .jobs
            .iter()
            .rev()
            .find(|(_, job)| job.from == from_id && job.to == to_id)
            .map(|(id, job)| TransferJob {
                id: id.clone(),
                status: job.status.clone(),
            }))
    }
}

#[async_trait]
impl SettingsOps for FakeDirectory {
    async fn patch_settings(&self, key: &str, settings: &Map<String, Value>) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("settings.patch", key)?;
        store
            .settings
            .entry(key.to_string())
            .or_default()
            .extend(settings.clone());
        Ok(())
    }
}

/// In-memory SCIM endpoint.
#[derive(Default)]
pub struct FakeScim {
    store: Mutex<ScimStore>,
}

#[derive(Default)]
struct ScimStore {
    accounts: BTreeMap<String, Value>,
    failures: BTreeMap<String, ProviderError>,
    calls: Vec<String>,
    next_id: u64,
}

impl ScimStore {
    fn record(&mut self, op: &str, args: &str) -> ProviderResult<()> {
        self.calls.push(format!("{op} {args}"));
        match self.failures.get(op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn scim_resource(attributes: &Value) -> Resource {
    Resource {
        id: attributes["id"].as_str().map(ToString::to_string),
        canonical_key: attributes["userName"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        attributes: attributes.clone(),
    }
}

impl FakeScim {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, ScimStore> {
        self.store.lock().unwrap()
    }

    pub fn add_account(&self, attributes: Value) -> String {
        let mut store = self.store();
        store.next_id += 1;
        let id = format!("scim-{}", store.next_id);
        let mut attributes = attributes;
        attributes["id"] = Value::String(id.clone());
        store.accounts.insert(id.clone(), attributes);
        id
    }

    pub fn account(&self, id: &str) -> Option<Value> {
        self.store().accounts.get(id).cloned()
    }

    pub fn fail(&self, op: &str, error: ProviderError) {
        self.store().failures.insert(op.to_string(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.store().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        let needle = format!("{op} ");
        self.store()
            .calls
            .iter()
            .filter(|call| call.starts_with(&needle))
            .count()
    }
}

#[async_trait]
impl ScimAccounts for FakeScim {
    /// Understands `userName eq "<value>"` filters only.
    async fn find(&self, filter: &str) -> ProviderResult<Option<Resource>> {
        let mut store = self.store();
        store.record("scim.find", filter)?;
        let wanted = filter
            .strip_prefix("userName eq ")
            .map(|value| value.trim_matches('"').to_lowercase());
        Ok(store
            .accounts
            .values()
            .find(|account| {
                wanted.as_deref().is_some_and(|wanted| {
                    account["userName"]
                        .as_str()
                        .is_some_and(|name| name.to_lowercase() == wanted)
                        || account["emails"][0]["value"]
                            .as_str()
                            .is_some_and(|email| email.to_lowercase() == wanted)
                })
            })
            .map(scim_resource))
    }

    async fn create(&self, payload: &Value) -> ProviderResult<Resource> {
        let mut store = self.store();
        store.record("scim.create", payload["userName"].as_str().unwrap_or_default())?;
        store.next_id += 1;
        let id = format!("scim-{}", store.next_id);
        let mut attributes = payload.clone();
        attributes["id"] = Value::String(id.clone());
        store.accounts.insert(id, attributes.clone());
        Ok(scim_resource(&attributes))
    }

    async fn patch(&self, id: &str, payload: &Value) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("scim.patch", id)?;
        let account = store.accounts.get_mut(id).ok_or_else(|| not_found(id))?;
        let active = payload["Operations"][0]["value"]
            .as_bool()
            .or_else(|| payload["active"].as_bool());
        if let Some(active) = active {
            account["active"] = Value::Bool(active);
        }
        Ok(())
    }

    async fn replace(&self, id: &str, payload: &Value) -> ProviderResult<Resource> {
        let mut store = self.store();
        store.record("scim.replace", id)?;
        let account = store.accounts.get_mut(id).ok_or_else(|| not_found(id))?;
        *account = payload.clone();
        Ok(scim_resource(payload))
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        let mut store = self.store();
        store.record("scim.delete", id)?;
        store.accounts.remove(id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}
