//! Shared test doubles for the job integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resource_governance::error::{GovernanceError, Result};
use resource_governance::mailer::{Mailer, OutboundEmail};
use resource_governance::provider::ResourceProvider;
use resource_governance::types::{ActivityRecord, GenericResource, NamedValue, ResourceGroup};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory `ResourceProvider` with mutable group state, so tests can
/// observe tag writes and run jobs repeatedly against the same "cloud".
#[derive(Default)]
pub struct InMemoryProvider {
    groups: Mutex<Vec<ResourceGroup>>,
    activity: HashMap<String, Vec<ActivityRecord>>,
    resources: HashMap<String, Vec<GenericResource>>,
}

impl InMemoryProvider {
    pub fn new(groups: Vec<ResourceGroup>) -> Self {
        Self {
            groups: Mutex::new(groups),
            activity: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    pub fn with_activity(mut self, group: &str, records: Vec<ActivityRecord>) -> Self {
        self.activity.insert(group.to_string(), records);
        self
    }

    pub fn with_resources(mut self, group: &str, names: &[&str]) -> Self {
        self.resources.insert(
            group.to_string(),
            names
                .iter()
                .map(|name| GenericResource {
                    name: name.to_string(),
                    kind: "Microsoft.Compute/virtualMachines".to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn group(&self, name: &str) -> Option<ResourceGroup> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.name == name)
            .cloned()
    }
}

#[async_trait]
impl ResourceProvider for InMemoryProvider {
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>> {
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn replace_tags(&self, group_name: &str, tags: HashMap<String, String>) -> Result<()> {
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .iter_mut()
            .find(|g| g.name == group_name)
            .ok_or_else(|| GovernanceError::provider(format!("no such group: {}", group_name)))?;
        group.tags = tags;
        Ok(())
    }

    async fn list_resources(&self, group_name: &str) -> Result<Vec<GenericResource>> {
        Ok(self.resources.get(group_name).cloned().unwrap_or_default())
    }

    async fn query_activity_log(
        &self,
        group_name: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        Ok(self.activity.get(group_name).cloned().unwrap_or_default())
    }
}

/// `Mailer` that records every outbound email instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// An untagged resource group.
pub fn group(name: &str) -> ResourceGroup {
    group_with_tags(name, &[])
}

pub fn group_with_tags(name: &str, tags: &[(&str, &str)]) -> ResourceGroup {
    ResourceGroup {
        id: format!("/subscriptions/sub/resourceGroups/{}", name),
        name: name.to_string(),
        location: "westeurope".to_string(),
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// A succeeded write operation by the given caller.
pub fn activity(caller: &str) -> ActivityRecord {
    ActivityRecord {
        caller: Some(caller.to_string()),
        operation_name: NamedValue::new("Microsoft.Compute/virtualMachines/write"),
        status: NamedValue::new("Succeeded"),
        properties: serde_json::Value::Null,
    }
}

/// Serve the three templates and the header image from a wiremock server and
/// return a config whose template URLs point at it.
pub async fn config_with_templates(
    server: &wiremock::MockServer,
) -> resource_governance::GovernanceConfig {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    for (route, body) in [
        ("/tagging.html", "<html>{{{table}}}<p>{{delete_after}}</p></html>"),
        ("/expired.html", "<html>{{{table}}}<p>{{count}} expired</p></html>"),
        ("/too_far.html", "<html>{{{table}}}<p>{{count}} too far</p></html>"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/header.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(vec![0x89u8, 0x50, 0x4e, 0x47]),
        )
        .mount(server)
        .await;

    let mut config = resource_governance::GovernanceConfig::default();
    config.cloud.ignore_pattern = "^rg-ignore".to_string();
    config.templates.tagging_template_url = format!("{}/tagging.html", server.uri());
    config.templates.expired_template_url = format!("{}/expired.html", server.uri());
    config.templates.too_far_template_url = format!("{}/too_far.html", server.uri());
    config.templates.header_image_url = format!("{}/header.png", server.uri());
    config
}
