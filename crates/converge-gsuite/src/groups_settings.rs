//! Groups Settings API.

use async_trait::async_trait;
use converge_core::{ProviderResult, SettingsOps};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::client::{segment, GoogleClient};

/// Default Groups Settings API root.
pub const DEFAULT_GROUPS_SETTINGS_URL: &str = "https://www.googleapis.com/groups/v1/groups";

#[derive(Debug, Clone)]
pub struct GroupsSettingsApi {
    client: GoogleClient,
    base_url: String,
}

impl GroupsSettingsApi {
    #[must_use]
    pub fn new(client: GoogleClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SettingsOps for GroupsSettingsApi {
    #[instrument(skip(self, settings), fields(keys = settings.len()))]
    async fn patch_settings(&self, key: &str, settings: &Map<String, Value>) -> ProviderResult<()> {
        let url = format!("{}/{}?alt=json", self.base_url, segment(key));
        let _: Value = self.client.patch(&url, settings).await?;
        Ok(())
    }
}
