//! Service identity for management API calls
//!
//! `TokenCredential` performs the OAuth2 client-credentials flow against the
//! configured login endpoint and caches the bearer token until shortly
//! before it expires. It is constructed once per run and shared by `Arc`.

use crate::config::CloudConfig;
use crate::error::{GovernanceError, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Refresh the token this long before its reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// OAuth2 client-credentials token source for the management API.
pub struct TokenCredential {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    login_endpoint: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCredential {
    pub fn new(config: &CloudConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GovernanceError::auth(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            tenant_id: config.tenant_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            login_endpoint: config.login_endpoint.trim_end_matches('/').to_string(),
            scope: format!("{}/.default", config.management_endpoint.trim_end_matches('/')),
            cached: Mutex::new(None),
        })
    }

    /// Return a bearer token, fetching a fresh one if the cache is stale.
    pub async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                debug!("Using cached bearer token");
                return Ok(token.token.clone());
            }
        }

        info!("Acquiring bearer token for subscription access");
        let url = format!("{}/{}/oauth2/v2.0/token", self.login_endpoint, self.tenant_id);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GovernanceError::auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GovernanceError::auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GovernanceError::auth(format!("malformed token response: {}", e)))?;

        let bearer = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloudConfig;

    fn test_cloud_config(login_endpoint: &str) -> CloudConfig {
        CloudConfig {
            subscription_id: "sub".to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            management_endpoint: "https://management.local".to_string(),
            login_endpoint: login_endpoint.to_string(),
            ignore_pattern: "^rg-ignore".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_token_acquisition_and_caching() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/tenant/oauth2/v2.0/token"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "tok-1", "expires_in": 3600}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let credential = TokenCredential::new(&test_cloud_config(&server.uri())).unwrap();
        assert_eq!(credential.bearer_token().await.unwrap(), "tok-1");
        // Second call must be served from cache (mock expects exactly one hit)
        assert_eq!(credential.bearer_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_token_failure_is_auth_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string("denied"))
            .mount(&server)
            .await;

        let credential = TokenCredential::new(&test_cloud_config(&server.uri())).unwrap();
        let err = credential.bearer_token().await.unwrap_err();
        assert!(matches!(err, GovernanceError::Auth { .. }));
    }
}
