//! Data Transfer API: move a leaver's Drive and Calendar data to another user.

use async_trait::async_trait;
use converge_core::{
    ApplicationTransfer, ProviderResult, TransferCategory, TransferJob, TransferOps,
    TransferStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{segment, GoogleClient};
use crate::error::{GsuiteError, GsuiteResult};

/// Default Data Transfer API root.
pub const DEFAULT_DATATRANSFER_URL: &str = "https://admin.googleapis.com/admin/datatransfer/v1";

#[derive(Debug, Clone)]
pub struct DataTransferApi {
    client: GoogleClient,
    base_url: String,
}

impl DataTransferApi {
    #[must_use]
    pub fn new(client: GoogleClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn list_transfers(&self, from_id: &str, to_id: &str) -> GsuiteResult<Vec<TransferResource>> {
        let mut transfers = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/transfers?oldOwnerUserId={}&newOwnerUserId={}&status=inProgress",
                self.base_url,
                urlencoding::encode(from_id),
                urlencoding::encode(to_id)
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(&urlencoding::encode(token));
            }
            let page: TransferPage = self.client.get(&url).await?;
            transfers.extend(page.data_transfers);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(transfers)
    }
}

#[async_trait]
impl TransferOps for DataTransferApi {
    async fn list_transferable_categories(&self) -> ProviderResult<Vec<TransferCategory>> {
        let url = format!("{}/applications", self.base_url);
        let list: ApplicationList = self.client.get(&url).await?;
        Ok(list
            .applications
            .into_iter()
            .map(|app| TransferCategory {
                id: id_string(app.id),
                name: app.name,
                transfer_params: app.transfer_params,
            })
            .collect())
    }

    #[instrument(skip(self, categories), fields(categories = categories.len()))]
    async fn create_transfer_job(
        &self,
        from_id: &str,
        to_id: &str,
        categories: &[ApplicationTransfer],
    ) -> ProviderResult<TransferJob> {
        let body = TransferRequest {
            old_owner_user_id: from_id,
            new_owner_user_id: to_id,
            application_data_transfers: categories
                .iter()
                .map(|c| ApplicationDataTransfer {
                    application_id: &c.application_id,
                    application_transfer_params: c.params.iter().collect(),
                })
                .collect(),
        };
        let url = format!("{}/transfers", self.base_url);
        let created: TransferResource = self.client.post(&url, &body).await?;
        Ok(created.into_job()?)
    }

    async fn get_transfer_job(&self, job_id: &str) -> ProviderResult<TransferJob> {
        let url = format!("{}/transfers/{}", self.base_url, segment(job_id));
        let transfer: TransferResource = self.client.get(&url).await?;
        let job = transfer.into_job()?;
        debug!(job_id = %job.id, status = %job.status, "transfer status");
        Ok(job)
    }

    async fn find_transfer_job(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> ProviderResult<Option<TransferJob>> {
        for transfer in self.list_transfers(from_id, to_id).await? {
            let job = transfer.into_job()?;
            if job.status == TransferStatus::InProgress {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationList {
    #[serde(default)]
    applications: Vec<Application>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Application {
    /// Serialized as a string of digits by the API; accept either form.
    id: Value,
    name: String,
    #[serde(default)]
    transfer_params: Vec<Value>,
}

fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    old_owner_user_id: &'a str,
    new_owner_user_id: &'a str,
    application_data_transfers: Vec<ApplicationDataTransfer<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationDataTransfer<'a> {
    application_id: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    application_transfer_params: Vec<&'a Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferResource {
    id: Option<String>,
    overall_transfer_status_code: Option<String>,
}

impl TransferResource {
    fn into_job(self) -> GsuiteResult<TransferJob> {
        let id = self
            .id
            .ok_or_else(|| GsuiteError::ParseError("data transfer without id".into()))?;
        let status = TransferStatus::parse(
            self.overall_transfer_status_code
                .as_deref()
                .unwrap_or("inProgress"),
        );
        Ok(TransferJob { id, status })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferPage {
    #[serde(default)]
    data_transfers: Vec<TransferResource>,
    next_page_token: Option<String>,
}
