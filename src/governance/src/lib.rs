//! # Resource Governance
//!
//! Scheduled automation jobs for cloud resource governance:
//! - **tag-owners**: discovers unlabeled resource groups, infers an owning
//!   user from recent activity-log records, tags each group with `owner` and
//!   `deleteAfter` (one calendar month out), and emails a summary.
//! - **cleanup-expired**: partitions tagged groups into expired and
//!   too-far-future buckets and emails owners/administrators per bucket.
//!
//! Both jobs are linear pipelines run by fresh process invocations. Provider
//! access goes through the [`provider::ResourceProvider`] trait and email
//! delivery through [`mailer::Mailer`], so the decision logic is testable
//! without the network.

pub mod auth;
pub mod config;
pub mod error;
pub mod expiry;
pub mod jobs;
pub mod mailer;
pub mod owner;
pub mod provider;
pub mod report;
pub mod templates;
pub mod types;

pub use config::GovernanceConfig;
pub use error::{GovernanceError, Result};
pub use jobs::{run_cleanup, run_tagging, CleanupOptions, TaggingOptions};
