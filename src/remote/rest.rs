//! REST implementation of the guarantee service
//!
//! Speaks JSON (camelCase) against the dashboard backend. Non-success
//! responses surface the server-provided `message`/`detail` body as
//! `RemoteRejected`; transport and timeout failures become
//! `RemoteUnreachable`. The engine treats both identically: lock released,
//! no commit, error surfaced to the caller.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::model::ActiveStatus;
use crate::types::{EngineError, Result};

use super::{
    CreateGuaranteeRequest, GuaranteeFieldsPatch, GuaranteeRef, GuaranteeService,
    GuaranteeSummary, RelationshipQuery, Relationships,
};

/// REST client for the guarantee backend
pub struct RestGuaranteeService {
    client: reqwest::Client,
    base_url: String,
}

impl RestGuaranteeService {
    /// Build a client from engine config (base URL, timeout)
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::RemoteUnreachable(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    /// Build with a preconfigured client (proxies, extra headers)
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn status_url(&self, target: &GuaranteeRef) -> String {
        match target {
            GuaranteeRef::ById(id) => self.url(&format!("/guarantees/{id}/status")),
            GuaranteeRef::ByElector(koc_id) => {
                self.url(&format!("/electors/{koc_id}/guarantee/status"))
            }
        }
    }

    fn delete_url(&self, target: &GuaranteeRef) -> String {
        match target {
            GuaranteeRef::ById(id) => self.url(&format!("/guarantees/{id}")),
            GuaranteeRef::ByElector(koc_id) => self.url(&format!("/electors/{koc_id}/guarantee")),
        }
    }
}

#[async_trait::async_trait]
impl GuaranteeService for RestGuaranteeService {
    async fn create_guarantee(&self, request: &CreateGuaranteeRequest) -> Result<GuaranteeSummary> {
        debug!(koc_id = %request.elector_koc_id, "REST: create guarantee");
        let response = self
            .client
            .post(self.url("/guarantees"))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?.json().await.map_err(transport_error)
    }

    async fn update_guarantee_status(
        &self,
        target: &GuaranteeRef,
        status: ActiveStatus,
    ) -> Result<GuaranteeSummary> {
        debug!(target = ?target, status = ?status, "REST: update guarantee status");
        let response = self
            .client
            .patch(self.status_url(target))
            .json(&json!({ "guaranteeStatus": status }))
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?.json().await.map_err(transport_error)
    }

    async fn update_guarantee(
        &self,
        guarantee_id: i64,
        fields: &GuaranteeFieldsPatch,
    ) -> Result<()> {
        debug!(guarantee_id, "REST: update guarantee fields");
        let response = self
            .client
            .patch(self.url(&format!("/guarantees/{guarantee_id}")))
            .json(fields)
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?;
        Ok(())
    }

    async fn delete_guarantee(&self, target: &GuaranteeRef) -> Result<()> {
        debug!(target = ?target, "REST: delete guarantee");
        let response = self
            .client
            .delete(self.delete_url(target))
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?;
        Ok(())
    }

    async fn fetch_relationships(&self, query: &RelationshipQuery) -> Result<Relationships> {
        debug!(koc_id = %query.elector_koc_id, "REST: fetch relationships");
        let response = self
            .client
            .get(self.url(&format!(
                "/electors/{}/relationships",
                query.elector_koc_id
            )))
            .query(&[
                ("deptPage", query.dept_page),
                ("teamPage", query.team_page),
                ("deptPageSize", query.dept_page_size),
                ("teamPageSize", query.team_page_size),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?.json().await.map_err(transport_error)
    }
}

/// Server error body; dashboards backend sends `message`, DRF-style
/// endpoints send `detail`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

fn transport_error(err: reqwest::Error) -> EngineError {
    EngineError::RemoteUnreachable(err.to_string())
}

/// Map a non-success response to `RemoteRejected` with the server message
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message.or(body.detail))
        .unwrap_or_else(|| format!("request failed with status {status}"));
    warn!(status = %status, message = %message, "REST: guarantee service rejected request");
    Err(EngineError::RemoteRejected(message))
}
