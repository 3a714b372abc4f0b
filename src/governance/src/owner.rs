//! Owner inference from activity-log records
//!
//! Given the recent succeeded operations against a resource group, pick a
//! single best-guess owner email, or decide that none can be found. The
//! selection is "first candidate after filtering, in query order"; the
//! underlying log order is not documented as meaningful, and this behavior
//! is preserved deliberately.

use crate::provider::ResourceProvider;
use crate::types::ActivityRecord;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Key-listing operation whose callers must never be attributed ownership.
const STORAGE_LIST_KEYS_OPERATION: &str = "MICROSOFT.STORAGE/STORAGEACCOUNTS/LISTKEYS/ACTION";

/// Payload markers identifying prior tagging/aliasing operations; records
/// containing both are the automation's own writes, not user activity.
const TAG_MARKER: &str = "tags";
const ALIAS_MARKER: &str = "alias";

/// Apply the candidate filter pipeline: email-looking callers only, noise
/// operations and automation payloads dropped, one representative per
/// distinct caller in query order.
pub fn candidate_callers(records: &[ActivityRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates = Vec::new();

    for record in records {
        let caller = match record.caller.as_deref() {
            Some(caller) if caller.contains('@') => caller,
            _ => continue,
        };

        if record
            .operation_name
            .value
            .eq_ignore_ascii_case(STORAGE_LIST_KEYS_OPERATION)
        {
            continue;
        }

        let payload = record.properties.to_string();
        if payload.contains(TAG_MARKER) && payload.contains(ALIAS_MARKER) {
            continue;
        }

        if seen.insert(caller) {
            candidates.push(caller.to_string());
        }
    }

    candidates
}

/// Select the first remaining candidate after filtering.
pub fn select_owner(records: &[ActivityRecord]) -> Option<String> {
    candidate_callers(records).into_iter().next()
}

/// Query the activity log for a group and infer its owner.
///
/// A failed log query is a per-group condition, not a batch failure: it is
/// logged as a warning and reported as "no owner found".
pub async fn infer_owner(
    provider: &dyn ResourceProvider,
    group_name: &str,
    lookback_days: i64,
) -> Option<String> {
    let end = Utc::now();
    let start = end - Duration::days(lookback_days);

    let records = match provider.query_activity_log(group_name, start, end).await {
        Ok(records) => records,
        Err(err) => {
            warn!(
                group = group_name,
                error = %err,
                "activity log query failed; treating group as unowned"
            );
            return None;
        }
    };

    debug!(
        group = group_name,
        records = records.len(),
        "evaluating activity records"
    );
    select_owner(&records)
}
