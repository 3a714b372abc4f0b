//! Tagging job: infer owners for untagged resource groups
//!
//! Pipeline: list resource groups, keep the untagged non-ignored ones, infer
//! an owner from recent activity for each, write `owner` and `deleteAfter`
//! tags, and send one low-priority summary email.

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, Result};
use crate::jobs::MAX_CONCURRENT_QUERIES;
use crate::mailer::{InlineImage, Mailer, OutboundEmail};
use crate::owner;
use crate::provider::ResourceProvider;
use crate::report;
use crate::templates::{RemoteTemplates, HEADER_IMAGE_CID};
use crate::types::{ResourceGroup, TaggingResult, TAG_DELETE_AFTER, TAG_OWNER};
use chrono::{Months, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

/// Options for a single tagging run, taken from the CLI.
#[derive(Debug, Clone)]
pub struct TaggingOptions {
    /// Activity-log lookback window in days (1..=14, enforced by the CLI).
    pub lookback_days: i64,
    /// Perform all decisions but skip tag writes and owner notification.
    pub dry_run: bool,
    /// Tag without sending any notification afterwards.
    pub skip_email: bool,
    /// Ask for per-group confirmation on stdin before each tag write.
    pub confirm: bool,
    /// Primary notification recipient(s).
    pub recipients: Vec<String>,
}

/// Run the tagging job end to end. Returns the groups tagged this run.
pub async fn run_tagging(
    config: &GovernanceConfig,
    provider: &dyn ResourceProvider,
    mailer: &dyn Mailer,
    templates: &RemoteTemplates,
    opts: &TaggingOptions,
) -> Result<Vec<TaggingResult>> {
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        lookback_days = opts.lookback_days,
        dry_run = opts.dry_run,
        "starting tagging run"
    );

    let ignore = Regex::new(&config.cloud.ignore_pattern)?;

    let groups = provider.list_resource_groups().await?;
    let candidates: Vec<ResourceGroup> = groups
        .into_iter()
        .filter(|group| !group.has_owner() && !ignore.is_match(&group.name))
        .collect();
    info!(candidates = candidates.len(), "untagged resource groups found");

    let today = Utc::now().date_naive();
    let delete_after = expiry_date(today)?;
    let delete_after_text = delete_after.format("%m/%d/%y").to_string();

    // Independent per-group log queries fan out; the collected results are
    // re-sorted by group name so output ordering stays deterministic.
    let total = candidates.len();
    let processed = AtomicUsize::new(0);
    let mut inferred: Vec<(ResourceGroup, Option<String>)> = stream::iter(candidates)
        .map(|group| {
            let processed = &processed;
            async move {
                let owner = owner::infer_owner(provider, &group.name, opts.lookback_days).await;
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                info!(processed = done, total, group = %group.name, "processed resource group");
                (group, owner)
            }
        })
        .buffer_unordered(MAX_CONCURRENT_QUERIES)
        .collect()
        .await;
    inferred.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let mut results = Vec::new();
    for (group, owner) in inferred {
        let owner = match owner {
            Some(owner) => owner,
            None => {
                info!(group = %group.name, "no owner found");
                continue;
            }
        };

        if opts.confirm && !confirm_apply(&group.name, &owner).await {
            info!(group = %group.name, "skipped by operator");
            continue;
        }

        if opts.dry_run {
            info!(
                group = %group.name,
                owner = %owner,
                delete_after = %delete_after_text,
                "dry-run: tag write skipped"
            );
        } else {
            let mut tags = group.tags.clone();
            tags.insert(TAG_OWNER.to_string(), owner.clone());
            tags.insert(TAG_DELETE_AFTER.to_string(), delete_after_text.clone());
            provider.replace_tags(&group.name, tags).await?;
            info!(group = %group.name, owner = %owner, "tagged resource group");
        }

        results.push(TaggingResult {
            group_name: group.name,
            owner_email: owner,
        });
    }

    if results.is_empty() {
        info!(%run_id, "no groups tagged; no notification sent");
        return Ok(results);
    }

    if opts.skip_email {
        info!(%run_id, tagged = results.len(), "notification skipped by request");
        return Ok(results);
    }

    send_summary(config, mailer, templates, &results, &delete_after_text, opts).await?;
    info!(%run_id, tagged = results.len(), "tagging run complete");
    Ok(results)
}

/// Expiry written at tagging time: one calendar month from today.
pub(crate) fn expiry_date(today: NaiveDate) -> Result<NaiveDate> {
    today
        .checked_add_months(Months::new(1))
        .ok_or_else(|| GovernanceError::date_parse("expiry date out of range"))
}

/// Primary recipient(s) plus one per distinct tagged owner; dry-run narrows
/// to the primary recipient(s) only.
pub(crate) fn summary_recipients(
    primary: &[String],
    results: &[TaggingResult],
    dry_run: bool,
) -> Vec<String> {
    let mut recipients: Vec<String> = primary.to_vec();
    if !dry_run {
        let owners: BTreeSet<&str> = results.iter().map(|r| r.owner_email.as_str()).collect();
        for owner in owners {
            if !recipients.iter().any(|r| r == owner) {
                recipients.push(owner.to_string());
            }
        }
    }
    recipients
}

async fn send_summary(
    config: &GovernanceConfig,
    mailer: &dyn Mailer,
    templates: &RemoteTemplates,
    results: &[TaggingResult],
    delete_after_text: &str,
    opts: &TaggingOptions,
) -> Result<()> {
    let template = templates
        .fetch_template(&config.templates.tagging_template_url)
        .await?;
    let image = templates
        .fetch_image(&config.templates.header_image_url)
        .await?;

    let html_body = RemoteTemplates::render(
        &template,
        &serde_json::json!({
            "table": report::tagging_table(results),
            "delete_after": delete_after_text,
        }),
    )?;

    let email = OutboundEmail {
        subject: format!("Resource governance: tagged {} resource group(s)", results.len()),
        html_body,
        recipients: summary_recipients(&opts.recipients, results, opts.dry_run),
        inline_images: vec![InlineImage {
            content_id: HEADER_IMAGE_CID.to_string(),
            content_type: "image/png".to_string(),
            bytes: image.to_vec(),
        }],
        low_priority: true,
    };

    mailer.send(&email).await
}

/// Interactive per-group gate; anything but an explicit `y` skips the group.
async fn confirm_apply(group_name: &str, owner: &str) -> bool {
    let prompt = format!(
        "Tag resource group '{}' with owner '{}'? [y/N]: ",
        group_name, owner
    );
    // Terminal I/O is blocking; keep it off the async workers.
    let answer = tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok::<_, std::io::Error>(line)
    })
    .await;

    match answer {
        Ok(Ok(line)) => is_affirmative(&line),
        Ok(Err(err)) => {
            warn!(error = %err, "failed to read confirmation; skipping group");
            false
        }
        Err(err) => {
            warn!(error = %err, "confirmation task failed; skipping group");
            false
        }
    }
}

fn is_affirmative(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("y")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use crate::provider::MockResourceProvider;
    use crate::types::{ActivityRecord, NamedValue};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn test_config() -> GovernanceConfig {
        let mut config = GovernanceConfig::default();
        config.cloud.ignore_pattern = "^rg-ignore".to_string();
        config
    }

    fn group(name: &str, tags: &[(&str, &str)]) -> ResourceGroup {
        ResourceGroup {
            id: format!("/subscriptions/sub/resourceGroups/{}", name),
            name: name.to_string(),
            location: "westeurope".to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn activity(caller: &str) -> ActivityRecord {
        ActivityRecord {
            caller: Some(caller.to_string()),
            operation_name: NamedValue::new("Microsoft.Compute/virtualMachines/write"),
            status: NamedValue::new("Succeeded"),
            properties: serde_json::Value::Null,
        }
    }

    fn opts() -> TaggingOptions {
        TaggingOptions {
            lookback_days: 7,
            dry_run: false,
            skip_email: true,
            confirm: false,
            recipients: vec!["admin@co.com".to_string()],
        }
    }

    #[test]
    fn test_expiry_date_is_one_calendar_month() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        assert_eq!(
            expiry_date(today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 15).unwrap()
        );

        // Month-end clamping
        let today = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(
            expiry_date(today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  Y  \n"));
        assert!(!is_affirmative("yes\n"));
        assert!(!is_affirmative("n\n"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_summary_recipients() {
        let primary = vec!["admin@co.com".to_string()];
        let results = vec![
            TaggingResult {
                group_name: "rg-a".to_string(),
                owner_email: "alice@co.com".to_string(),
            },
            TaggingResult {
                group_name: "rg-b".to_string(),
                owner_email: "alice@co.com".to_string(),
            },
        ];

        let recipients = summary_recipients(&primary, &results, false);
        assert_eq!(recipients, vec!["admin@co.com", "alice@co.com"]);

        // Dry-run narrows to the primary recipient only
        let recipients = summary_recipients(&primary, &results, true);
        assert_eq!(recipients, vec!["admin@co.com"]);
    }

    #[test]
    fn test_summary_recipients_no_duplicate_primary() {
        let primary = vec!["alice@co.com".to_string()];
        let results = vec![TaggingResult {
            group_name: "rg-a".to_string(),
            owner_email: "alice@co.com".to_string(),
        }];
        assert_eq!(
            summary_recipients(&primary, &results, false),
            vec!["alice@co.com"]
        );
    }

    #[tokio::test]
    async fn test_owned_and_ignored_groups_never_touched() {
        let mut provider = MockResourceProvider::new();
        provider.expect_list_resource_groups().returning(|| {
            Ok(vec![
                group("rg-owned", &[("owner", "alice@co.com")]),
                group("rg-ignore-platform", &[]),
            ])
        });
        provider.expect_query_activity_log().times(0);
        provider.expect_replace_tags().times(0);

        let mailer = MockMailer::new();
        let templates = RemoteTemplates::new().unwrap();
        let results = run_tagging(&test_config(), &provider, &mailer, &templates, &opts())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_tags_group_with_inferred_owner() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_list_resource_groups()
            .returning(|| Ok(vec![group("rg-a", &[("env", "dev")])]));
        provider
            .expect_query_activity_log()
            .returning(|_, _, _| Ok(vec![activity("alice@co.com")]));
        provider
            .expect_replace_tags()
            .withf(|name, tags| {
                name == "rg-a"
                    && tags.get("owner").map(String::as_str) == Some("alice@co.com")
                    && tags.contains_key("deleteAfter")
                    && tags.get("env").map(String::as_str) == Some("dev")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mailer = MockMailer::new();
        let templates = RemoteTemplates::new().unwrap();
        let results = run_tagging(&test_config(), &provider, &mailer, &templates, &opts())
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![TaggingResult {
                group_name: "rg-a".to_string(),
                owner_email: "alice@co.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_dry_run_produces_no_writes() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_list_resource_groups()
            .returning(|| Ok(vec![group("rg-a", &[])]));
        provider
            .expect_query_activity_log()
            .returning(|_, _, _| Ok(vec![activity("alice@co.com")]));
        provider.expect_replace_tags().times(0);

        let mailer = MockMailer::new();
        let templates = RemoteTemplates::new().unwrap();
        let mut dry_opts = opts();
        dry_opts.dry_run = true;
        let results = run_tagging(&test_config(), &provider, &mailer, &templates, &dry_opts)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_owner_found_means_no_write() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_list_resource_groups()
            .returning(|| Ok(vec![group("rg-b", &[])]));
        provider
            .expect_query_activity_log()
            .returning(|_, _, _| Ok(vec![]));
        provider.expect_replace_tags().times(0);

        let mailer = MockMailer::new();
        let templates = RemoteTemplates::new().unwrap();
        let results = run_tagging(&test_config(), &provider, &mailer, &templates, &opts())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_aborts_run() {
        let mut provider = MockResourceProvider::new();
        provider
            .expect_list_resource_groups()
            .returning(|| Err(GovernanceError::auth("connection failed")));

        let mailer = MockMailer::new();
        let templates = RemoteTemplates::new().unwrap();
        let err = run_tagging(&test_config(), &provider, &mailer, &templates, &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Auth { .. }));
    }
}
