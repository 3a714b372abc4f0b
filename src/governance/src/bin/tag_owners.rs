//! Tagging job entry point
//!
//! Discovers untagged resource groups, infers owners from recent activity,
//! writes `owner`/`deleteAfter` tags, and emails a summary.

use clap::Parser;
use resource_governance::auth::TokenCredential;
use resource_governance::mailer::{split_recipients, SmtpMailer};
use resource_governance::provider::ArmClient;
use resource_governance::templates::RemoteTemplates;
use resource_governance::{run_tagging, GovernanceConfig, TaggingOptions};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tag-owners",
    about = "Tag untagged resource groups with an inferred owner and an expiry date",
    version
)]
struct Args {
    /// Primary notification recipient(s), semicolon separated
    #[arg(long, env = "GOVERNANCE_RECIPIENT")]
    recipient: String,

    /// Activity-log lookback window in days
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(i64).range(1..=14))]
    lookback_days: i64,

    /// Decide and report but skip tag writes; notify the primary recipient only
    #[arg(long)]
    dry_run: bool,

    /// Tag without sending any notification
    #[arg(long)]
    skip_email: bool,

    /// Ask for confirmation before each tag write
    #[arg(long)]
    confirm: bool,
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

    let opts = TaggingOptions {
        lookback_days: args.lookback_days,
        dry_run: args.dry_run,
        skip_email: args.skip_email,
        confirm: args.confirm,
        recipients,
    };

    let results = run_tagging(&config, &provider, &mailer, &templates, &opts).await?;
    info!(tagged = results.len(), "tagging job finished");
    Ok(())
}
