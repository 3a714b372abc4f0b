//! Cleanup job: report expired and far-future resource groups
//!
//! Pipeline: list resource groups, classify the `deleteAfter`-tagged ones
//! into expired and too-far-future buckets, enrich with live resource
//! counts, and send one summary email per non-empty bucket.

use crate::config::GovernanceConfig;
use crate::error::Result;
use crate::expiry::{self, ExpiryBuckets};
use crate::mailer::{InlineImage, Mailer, OutboundEmail};
use crate::provider::ResourceProvider;
use crate::report;
use crate::templates::{RemoteTemplates, HEADER_IMAGE_CID};
use crate::types::ExpiryRecord;
use chrono::Utc;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

/// Options for a single cleanup run, taken from the CLI.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Grace window in days before an expiry date becomes actionable.
    pub past_days: i64,
    /// Ceiling in days beyond which an expiry date is suspiciously far out.
    pub future_days: i64,
    /// Narrow notifications to the primary recipient(s) only.
    pub dry_run: bool,
    /// Primary notification recipient(s).
    pub recipients: Vec<String>,
}

/// Run the cleanup job end to end. Returns both buckets for inspection.
pub async fn run_cleanup(
    config: &GovernanceConfig,
    provider: &dyn ResourceProvider,
    mailer: &dyn Mailer,
    templates: &RemoteTemplates,
    opts: &CleanupOptions,
) -> Result<ExpiryBuckets> {
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        past_days = opts.past_days,
        future_days = opts.future_days,
        dry_run = opts.dry_run,
        "starting cleanup run"
    );

    let ignore = Regex::new(&config.cloud.ignore_pattern)?;

    let groups = provider.list_resource_groups().await?;
    let today = Utc::now().date_naive();
    let mut buckets = expiry::classify(&groups, today, opts.past_days, opts.future_days, &ignore);
    info!(
        expired = buckets.expired.len(),
        too_far = buckets.too_far.len(),
        "classified tagged resource groups"
    );

    expiry::enrich_with_resources(provider, &mut buckets.expired).await;
    expiry::enrich_with_resources(provider, &mut buckets.too_far).await;

    if !buckets.expired.is_empty() {
        let (html_body, inline_images) = render_bucket(
            config,
            templates,
            &config.templates.expired_template_url,
            &buckets.expired,
        )
        .await?;
        let email = OutboundEmail {
            subject: format!(
                "Resource governance: {} resource group(s) past expiry",
                buckets.expired.len()
            ),
            html_body,
            recipients: expired_recipients(&opts.recipients, &buckets.expired, opts.dry_run),
            inline_images,
            low_priority: true,
        };
        mailer.send(&email).await?;
    } else {
        info!("no expired groups; no expiry notification sent");
    }

    if !buckets.too_far.is_empty() {
        let (html_body, inline_images) = render_bucket(
            config,
            templates,
            &config.templates.too_far_template_url,
            &buckets.too_far,
        )
        .await?;
        let email = OutboundEmail {
            subject: format!(
                "Resource governance: {} resource group(s) expiring beyond {} days",
                buckets.too_far.len(),
                opts.future_days
            ),
            html_body,
            recipients: opts.recipients.clone(),
            inline_images,
            low_priority: true,
        };
        mailer.send(&email).await?;
    } else {
        info!("no far-future groups; no ceiling notification sent");
    }

    info!(%run_id, "cleanup run complete");
    Ok(buckets)
}

/// Primary recipient(s) plus every distinct non-empty owner in the bucket;
/// dry-run narrows to the primary recipient(s) only.
pub(crate) fn expired_recipients(
    primary: &[String],
    records: &[ExpiryRecord],
    dry_run: bool,
) -> Vec<String> {
    let mut recipients: Vec<String> = primary.to_vec();
    if !dry_run {
        let owners: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.owner_email.as_deref())
            .filter(|owner| !owner.is_empty())
            .collect();
        for owner in owners {
            if !recipients.iter().any(|r| r == owner) {
                recipients.push(owner.to_string());
            }
        }
    }
    recipients
}

async fn render_bucket(
    config: &GovernanceConfig,
    templates: &RemoteTemplates,
    template_url: &str,
    records: &[ExpiryRecord],
) -> Result<(String, Vec<InlineImage>)> {
    let template = templates.fetch_template(template_url).await?;
    let image = templates
        .fetch_image(&config.templates.header_image_url)
        .await?;

    let html_body = RemoteTemplates::render(
        &template,
        &serde_json::json!({
            "table": report::expiry_table(records),
            "count": records.len(),
        }),
    )?;

    let inline_images = vec![InlineImage {
        content_id: HEADER_IMAGE_CID.to_string(),
        content_type: "image/png".to_string(),
        bytes: image.to_vec(),
    }];

    Ok((html_body, inline_images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(group: &str, owner: Option<&str>) -> ExpiryRecord {
        ExpiryRecord::new(
            group.to_string(),
            owner.map(String::from),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_expired_recipients_distinct_owners() {
        let primary = vec!["admin@co.com".to_string()];
        let records = vec![
            record("rg-a", Some("bob@co.com")),
            record("rg-b", Some("amy@co.com")),
            record("rg-c", Some("bob@co.com")),
            record("rg-d", None),
        ];
        assert_eq!(
            expired_recipients(&primary, &records, false),
            vec!["admin@co.com", "amy@co.com", "bob@co.com"]
        );
    }

    #[test]
    fn test_expired_recipients_dry_run_narrows() {
        let primary = vec!["admin@co.com".to_string()];
        let records = vec![record("rg-a", Some("bob@co.com"))];
        assert_eq!(
            expired_recipients(&primary, &records, true),
            vec!["admin@co.com"]
        );
    }

    #[test]
    fn test_expired_recipients_multiple_primaries() {
        let primary = vec!["ops@co.com".to_string(), "lead@co.com".to_string()];
        let records = vec![record("rg-a", Some("ops@co.com"))];
        assert_eq!(
            expired_recipients(&primary, &records, false),
            vec!["ops@co.com", "lead@co.com"]
        );
    }
}
