//! Expiry classification for tagged resource groups
//!
//! Partitions groups carrying a `deleteAfter` tag into an "expired" bucket
//! (past a grace window) and a "too-far-future" bucket (expiry beyond a
//! ceiling), then enriches each record with a live resource count.
//!
//! The ignore pattern is applied to the expired bucket only. The too-far
//! bucket intentionally mirrors the long-standing behavior of the production
//! jobs and is left unfiltered; a regression test pins this asymmetry.

use crate::provider::ResourceProvider;
use crate::types::{ExpiryRecord, ResourceGroup};
use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::warn;

/// Bounded fan-out for per-group resource listings.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// Accepted `deleteAfter` formats, tried in order.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// The two buckets produced by a cleanup run.
#[derive(Debug, Default)]
pub struct ExpiryBuckets {
    /// Groups whose expiry is past the grace window, sorted by owner email.
    pub expired: Vec<ExpiryRecord>,
    /// Groups whose expiry is beyond the ceiling, sorted by expiry date.
    pub too_far: Vec<ExpiryRecord>,
}

/// Parse a `deleteAfter` tag value.
pub fn parse_delete_after(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Partition tagged groups into expired and too-far-future buckets.
pub fn classify(
    groups: &[ResourceGroup],
    today: NaiveDate,
    past_days: i64,
    future_days: i64,
    ignore: &Regex,
) -> ExpiryBuckets {
    let grace_cutoff = today - Duration::days(past_days);
    let future_cutoff = today + Duration::days(future_days);

    let mut buckets = ExpiryBuckets::default();

    for group in groups {
        let raw = match group.delete_after() {
            Some(raw) => raw,
            None => continue,
        };
        let delete_after = match parse_delete_after(raw) {
            Some(date) => date,
            None => {
                warn!(
                    group = %group.name,
                    value = raw,
                    "unparseable deleteAfter tag; skipping group"
                );
                continue;
            }
        };

        let owner = group.owner_or_fallback().map(String::from);

        if delete_after < grace_cutoff && !ignore.is_match(&group.name) {
            buckets.expired.push(ExpiryRecord::new(
                group.name.clone(),
                owner,
                delete_after,
            ));
        } else if delete_after > future_cutoff {
            buckets.too_far.push(ExpiryRecord::new(
                group.name.clone(),
                owner,
                delete_after,
            ));
        }
    }

    buckets
        .expired
        .sort_by(|a, b| a.owner_email.cmp(&b.owner_email).then(a.group_name.cmp(&b.group_name)));
    buckets
        .too_far
        .sort_by(|a, b| a.delete_after.cmp(&b.delete_after).then(a.group_name.cmp(&b.group_name)));

    buckets
}

/// Attach live resource counts and names to each record.
///
/// Fetches run with bounded concurrency; a per-group failure is logged as a
/// warning and leaves that record's count at zero. Record order is untouched
/// because results are written back by index.
pub async fn enrich_with_resources(provider: &dyn ResourceProvider, records: &mut [ExpiryRecord]) {
    let names: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (idx, record.group_name.clone()))
        .collect();

    let fetched: Vec<(usize, Option<Vec<String>>)> = stream::iter(names)
        .map(|(idx, name)| async move {
            match provider.list_resources(&name).await {
                Ok(resources) => {
                    let names = resources.into_iter().map(|r| r.name).collect();
                    (idx, Some(names))
                }
                Err(err) => {
                    warn!(
                        group = %name,
                        error = %err,
                        "resource listing failed; leaving count at zero"
                    );
                    (idx, None)
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    for (idx, resources) in fetched {
        if let Some(resources) = resources {
            records[idx].resource_count = resources.len();
            records[idx].resources = resources;
        }
    }
}
