//! Management API access
//!
//! `ResourceProvider` is the seam between the jobs and the cloud: listing
//! resource groups, replacing tag maps, listing resources inside a group,
//! and querying the activity log. `ArmClient` implements it over the ARM
//! REST API with a shared `TokenCredential`.

use crate::auth::TokenCredential;
use crate::config::CloudConfig;
use crate::error::{GovernanceError, Result};
use crate::types::{ActivityRecord, GenericResource, ResourceGroup};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const RESOURCE_API_VERSION: &str = "2021-04-01";
const ACTIVITY_LOG_API_VERSION: &str = "2015-04-01";

/// Capability handle for all management API operations used by the jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// List all resource groups of the subscription, tags included.
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>>;

    /// Replace the full tag map of a resource group.
    async fn replace_tags(&self, group_name: &str, tags: HashMap<String, String>) -> Result<()>;

    /// List the resources contained in a resource group.
    async fn list_resources(&self, group_name: &str) -> Result<Vec<GenericResource>>;

    /// Query succeeded activity-log records for a group within a time range.
    async fn query_activity_log(
        &self,
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;
}

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// `ResourceProvider` implementation over the ARM REST API.
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<TokenCredential>,
    endpoint: String,
    subscription_id: String,
}

impl ArmClient {
    pub fn new(config: &CloudConfig, credential: Arc<TokenCredential>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                GovernanceError::provider(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            credential,
            endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            subscription_id: config.subscription_id.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.credential.bearer_token().await?;
        debug!(url, "GET management API");
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GovernanceError::provider(format!(
                "GET {} returned {}: {}",
                url, status, body
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ResourceProvider for ArmClient {
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>> {
        let url = format!(
            "{}/subscriptions/{}/resourcegroups",
            self.endpoint, self.subscription_id
        );
        let envelope: ListEnvelope<ResourceGroup> = self
            .get_json(&url, &[("api-version", RESOURCE_API_VERSION)])
            .await?;
        Ok(envelope.value)
    }

    async fn replace_tags(&self, group_name: &str, tags: HashMap<String, String>) -> Result<()> {
        let url = format!(
            "{}/subscriptions/{}/resourcegroups/{}/providers/Microsoft.Resources/tags/default",
            self.endpoint, self.subscription_id, group_name
        );
        let body = serde_json::json!({
            "operation": "Replace",
            "properties": { "tags": tags }
        });

        let token = self.credential.bearer_token().await?;
        debug!(group = group_name, "PATCH tags");
        let response = self
            .http
            .patch(&url)
            .query(&[("api-version", RESOURCE_API_VERSION)])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GovernanceError::provider(format!(
                "tag replacement on '{}' returned {}: {}",
                group_name, status, body
            )));
        }
        Ok(())
    }

    async fn list_resources(&self, group_name: &str) -> Result<Vec<GenericResource>> {
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/resources",
            self.endpoint, self.subscription_id, group_name
        );
        let envelope: ListEnvelope<GenericResource> = self
            .get_json(&url, &[("api-version", RESOURCE_API_VERSION)])
            .await?;
        Ok(envelope.value)
    }

    async fn query_activity_log(
        &self,
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        // The status filter is pushed to the provider so only succeeded
        // operations ever reach the owner-inference pipeline.
        let filter = format!(
            "eventTimestamp ge '{}' and eventTimestamp le '{}' and resourceGroupName eq '{}' and status eq 'Succeeded'",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
            group_name
        );
        let url = format!(
            "{}/subscriptions/{}/providers/Microsoft.Insights/eventtypes/management/values",
            self.endpoint, self.subscription_id
        );
        let envelope: ListEnvelope<ActivityRecord> = self
            .get_json(
                &url,
                &[
                    ("api-version", ACTIVITY_LOG_API_VERSION),
                    ("$filter", filter.as_str()),
                ],
            )
            .await?;
        Ok(envelope.value)
    }
}
