//! The two governance job pipelines
//!
//! Each job is a linear pipeline run by a fresh process: list groups, decide,
//! act, notify. Per-group provider calls fan out with bounded concurrency and
//! results are re-sorted deterministically before anything user-visible is
//! produced.

pub mod cleanup;
pub mod tagging;

pub use cleanup::{run_cleanup, CleanupOptions};
pub use tagging::{run_tagging, TaggingOptions};

/// Bounded fan-out for per-group activity-log queries.
pub(crate) const MAX_CONCURRENT_QUERIES: usize = 8;
