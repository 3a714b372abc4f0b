//! Cleanup job entry point
//!
//! Scans tagged resource groups for expired or far-future `deleteAfter`
//! dates and emails owners/administrators one summary per non-empty bucket.

use clap::Parser;
use resource_governance::auth::TokenCredential;
use resource_governance::mailer::{split_recipients, SmtpMailer};
use resource_governance::provider::ArmClient;
use resource_governance::templates::RemoteTemplates;
use resource_governance::{run_cleanup, CleanupOptions, GovernanceConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cleanup-expired",
    about = "Report resource groups whose expiry date is past or suspiciously far out",
    version
)]
struct Args {
    /// Primary notification recipient(s), semicolon separated
    #[arg(long, env = "GOVERNANCE_RECIPIENT")]
    recipient: String,

    /// Grace window in days before an expiry date is actionable
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..=180))]
    past_days: i64,

    /// Ceiling in days beyond which an expiry date is flagged as too far out
    #[arg(long, default_value_t = 365, value_parser = clap::value_parser!(i64).range(180..=365))]
    future_days: i64,

    /// Notify the primary recipient only
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let recipients = split_recipients(&args.recipient);
    if recipients.is_empty() {
        anyhow::bail!("at least one primary recipient is required");
    }

    let config = GovernanceConfig::from_env()?;
    config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        anyhow::anyhow!(e)
    })?;

    let credential = Arc::new(TokenCredential::new(&config.cloud)?);
    let provider = ArmClient::new(&config.cloud, credential)?;
    let mailer = SmtpMailer::new(&config.smtp)?;
    let templates = RemoteTemplates::new()?;

    let opts = CleanupOptions {
        past_days: args.past_days,
        future_days: args.future_days,
        dry_run: args.dry_run,
        recipients,
    };

    let buckets = run_cleanup(&config, &provider, &mailer, &templates, &opts).await?;
    info!(
        expired = buckets.expired.len(),
        too_far = buckets.too_far.len(),
        "cleanup job finished"
    );
    Ok(())
}
