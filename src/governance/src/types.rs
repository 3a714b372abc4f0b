//! Core data types for the governance jobs
//!
//! Provider-facing types (`ResourceGroup`, `ActivityRecord`, `GenericResource`)
//! mirror the management API's camelCase JSON. `TaggingResult` and
//! `ExpiryRecord` are transient projections that live for a single run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag key identifying the owning user of a resource group.
pub const TAG_OWNER: &str = "owner";

/// Tag key carrying the expiry date of a resource group.
pub const TAG_DELETE_AFTER: &str = "deleteAfter";

/// Legacy tag key some teams used instead of `owner`; read as a fallback.
pub const TAG_RESOURCE_OWNER: &str = "resourceowner";

/// A resource group as returned by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ResourceGroup {
    /// The `owner` tag value, if present.
    pub fn owner(&self) -> Option<&str> {
        self.tags.get(TAG_OWNER).map(String::as_str)
    }

    /// The owner email resolved from `owner` with `resourceowner` as fallback.
    pub fn owner_or_fallback(&self) -> Option<&str> {
        self.owner().or_else(|| {
            self.tags.get(TAG_RESOURCE_OWNER).map(String::as_str)
        })
    }

    /// The raw `deleteAfter` tag value, if present.
    pub fn delete_after(&self) -> Option<&str> {
        self.tags.get(TAG_DELETE_AFTER).map(String::as_str)
    }

    /// Whether the group already carries an `owner` tag.
    pub fn has_owner(&self) -> bool {
        self.tags.contains_key(TAG_OWNER)
    }
}

/// A `{value, localizedValue}` pair as used by the activity log API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedValue {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub localized_value: Option<String>,
}

impl NamedValue {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            localized_value: None,
        }
    }
}

/// One activity-log entry for an operation performed against a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Caller identity; free-form, may or may not be an email address.
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub operation_name: NamedValue,
    #[serde(default)]
    pub status: NamedValue,
    /// Free-form request/response content attached to the record.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// A resource inside a resource group, as listed by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResource {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One tagged group produced during a tagging run; consumed by the email step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggingResult {
    pub group_name: String,
    pub owner_email: String,
}

/// Projection of a tagged group used by the cleanup job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryRecord {
    pub group_name: String,
    pub owner_email: Option<String>,
    pub delete_after: NaiveDate,
    pub resource_count: usize,
    pub resources: Vec<String>,
}

impl ExpiryRecord {
    pub fn new(group_name: String, owner_email: Option<String>, delete_after: NaiveDate) -> Self {
        Self {
            group_name,
            owner_email,
            delete_after,
            resource_count: 0,
            resources: Vec::new(),
        }
    }
}
