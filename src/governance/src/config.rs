//! Configuration for the governance jobs
//!
//! Settings are resolved once at startup (defaults, then `GOVERNANCE__*`
//! environment variables, then an optional config file) and passed into the
//! job entry points as an immutable structure.

use serde::{Deserialize, Serialize};

/// Main configuration structure shared by both governance jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Management API and identity settings
    pub cloud: CloudConfig,

    /// SMTP relay settings
    pub smtp: SmtpConfig,

    /// Remote email template and header image locations
    pub templates: TemplateConfig,
}

/// Management API and identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub management_endpoint: String,
    pub login_endpoint: String,
    /// Regex excluding platform-managed group names from tagging/expiry actions
    pub ignore_pattern: String,
    pub timeout_seconds: u64,
}

/// SMTP relay configuration; STARTTLS on port 587 is required by the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub timeout_seconds: u64,
}

/// Remote template configuration, one template per email variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub tagging_template_url: String,
    pub expired_template_url: String,
    pub too_far_template_url: String,
    pub header_image_url: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            cloud: CloudConfig::default(),
            smtp: SmtpConfig::default(),
            templates: TemplateConfig::default(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            subscription_id: std::env::var("SUBSCRIPTION_ID").unwrap_or_default(),
            tenant_id: std::env::var("TENANT_ID").unwrap_or_default(),
            client_id: std::env::var("CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("CLIENT_SECRET").unwrap_or_default(),
            management_endpoint: "https://management.azure.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            ignore_pattern: "^(MC_|AzureBackupRG_|NetworkWatcherRG|cloud-shell-storage-)"
                .to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@governance.local".to_string()),
            from_name: std::env::var("FROM_NAME")
                .unwrap_or_else(|_| "Resource Governance".to_string()),
            timeout_seconds: 30,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            tagging_template_url: std::env::var("TAGGING_TEMPLATE_URL").unwrap_or_default(),
            expired_template_url: std::env::var("EXPIRED_TEMPLATE_URL").unwrap_or_default(),
            too_far_template_url: std::env::var("TOO_FAR_TEMPLATE_URL").unwrap_or_default(),
            header_image_url: std::env::var("HEADER_IMAGE_URL").unwrap_or_default(),
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from environment variables and an optional file
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut cfg = config::Config::builder();

        // Start with default configuration
        cfg = cfg.add_source(config::Config::try_from(&GovernanceConfig::default())?);

        // Add environment variables with prefix
        cfg = cfg.add_source(
            config::Environment::with_prefix("GOVERNANCE")
                .separator("__")
                .try_parsing(true),
        );

        // Add config file if one is named
        if let Ok(config_file) = std::env::var("GOVERNANCE_CONFIG_FILE") {
            cfg = cfg.add_source(config::File::with_name(&config_file).required(false));
        }

        cfg.build()?.try_deserialize()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cloud.subscription_id.is_empty() {
            return Err("Subscription id is required".to_string());
        }
        if self.cloud.tenant_id.is_empty() {
            return Err("Tenant id is required".to_string());
        }
        if self.cloud.client_id.is_empty() || self.cloud.client_secret.is_empty() {
            return Err("Client credentials are required".to_string());
        }
        if regex::Regex::new(&self.cloud.ignore_pattern).is_err() {
            return Err(format!(
                "Ignore pattern is not a valid regex: {}",
                self.cloud.ignore_pattern
            ));
        }
        if self.smtp.host.is_empty() {
            return Err("SMTP host is required".to_string());
        }
        if self.smtp.from_email.is_empty() {
            return Err("From email is required".to_string());
        }
        if self.templates.tagging_template_url.is_empty()
            || self.templates.expired_template_url.is_empty()
            || self.templates.too_far_template_url.is_empty()
        {
            return Err("All three email template URLs are required".to_string());
        }
        if self.templates.header_image_url.is_empty() {
            return Err("Header image URL is required".to_string());
        }
        Ok(())
    }
}
