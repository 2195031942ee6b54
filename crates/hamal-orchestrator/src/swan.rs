//! HTTP adapter for a Swan-compatible orchestrator API.
//!
//! | Operation | Request |
//! |---|---|
//! | get_app | `GET {prefix}/apps/{id}` |
//! | get_versions | `GET {prefix}/apps/{id}/versions` |
//! | submit_version | `PUT {prefix}/apps/{id}` (200 or 201) |
//! | proceed_update | `PATCH {prefix}/apps/{id}/proceed-update` `{"instances": N}` |
//! | rollback | `PATCH {prefix}/apps/{id}/cancel-update` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::client::Orchestrator;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::{AppSnapshot, Version};

const PROCEED_UPDATE: &str = "proceed-update";
const CANCEL_UPDATE: &str = "cancel-update";

/// reqwest-backed [`Orchestrator`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SwanClient {
    base_url: String,
    client: reqwest::Client,
}

impl SwanClient {
    /// Build a client for `address` (scheme optional) with a per-request timeout.
    pub fn new(address: &str, api_prefix: &str, timeout: Duration) -> OrchestratorResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url(address, api_prefix),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn app_url(&self, app_id: &str) -> String {
        format!("{}/apps/{}", self.base_url, app_id)
    }
}

fn base_url(address: &str, api_prefix: &str) -> String {
    let address = address.trim_end_matches('/');
    let address = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let prefix = api_prefix.trim_matches('/');
    if prefix.is_empty() {
        address
    } else {
        format!("{address}/{prefix}")
    }
}

/// Pass the response through if its status is accepted, otherwise turn the
/// raw body into a [`OrchestratorError::Rejected`].
async fn accept(
    resp: reqwest::Response,
    accepted: &[StatusCode],
) -> OrchestratorResult<reqwest::Response> {
    let status = resp.status();
    if accepted.contains(&status) {
        return Ok(resp);
    }
    let body = resp.text().await?;
    Err(OrchestratorError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Orchestrator for SwanClient {
    async fn get_app(&self, app_id: &str) -> OrchestratorResult<AppSnapshot> {
        let resp = self.client.get(self.app_url(app_id)).send().await?;
        let resp = accept(resp, &[StatusCode::OK]).await?;
        Ok(resp.json().await?)
    }

    async fn get_versions(&self, app_id: &str) -> OrchestratorResult<Vec<Version>> {
        let url = format!("{}/versions", self.app_url(app_id));
        let resp = self.client.get(url).send().await?;
        let resp = accept(resp, &[StatusCode::OK]).await?;
        Ok(resp.json().await?)
    }

    async fn submit_version(
        &self,
        app_id: &str,
        version_spec: &serde_json::Value,
    ) -> OrchestratorResult<()> {
        debug!(app = %app_id, "submitting version");
        let resp = self
            .client
            .put(self.app_url(app_id))
            .json(version_spec)
            .send()
            .await?;
        accept(resp, &[StatusCode::OK, StatusCode::CREATED]).await?;
        Ok(())
    }

    async fn proceed_update(&self, app_id: &str, instances: u32) -> OrchestratorResult<()> {
        debug!(app = %app_id, instances, "proceeding update");
        let url = format!("{}/{PROCEED_UPDATE}", self.app_url(app_id));
        let resp = self
            .client
            .patch(url)
            .json(&serde_json::json!({ "instances": instances }))
            .send()
            .await?;
        accept(resp, &[StatusCode::OK]).await?;
        Ok(())
    }

    async fn rollback(&self, app_id: &str) -> OrchestratorResult<()> {
        debug!(app = %app_id, "cancelling update");
        let url = format!("{}/{CANCEL_UPDATE}", self.app_url(app_id));
        let resp = self.client.patch(url).send().await?;
        accept(resp, &[StatusCode::OK]).await?;
        Ok(())
    }
}
