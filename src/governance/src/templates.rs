//! Remote email templates
//!
//! Templates and the header graphic are fetched by URL at send time and the
//! template body is rendered with Handlebars. Fetch failures are fatal to
//! the email send that needed them; they never abort tagging already done.

use crate::error::{GovernanceError, Result};
use bytes::Bytes;
use handlebars::Handlebars;
use std::time::Duration;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Content id under which the header graphic is embedded inline.
pub const HEADER_IMAGE_CID: &str = "header";

/// Fetcher/renderer for the remote HTML templates.
pub struct RemoteTemplates {
    http: reqwest::Client,
}

impl RemoteTemplates {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| GovernanceError::template(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Fetch an HTML template body.
    pub async fn fetch_template(&self, url: &str) -> Result<String> {
        debug!(url, "fetching email template");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GovernanceError::template(format!(
                "template fetch from {} returned {}",
                url, status
            )));
        }
        Ok(response.text().await?)
    }

    /// Fetch the header graphic.
    pub async fn fetch_image(&self, url: &str) -> Result<Bytes> {
        debug!(url, "fetching header image");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GovernanceError::template(format!(
                "image fetch from {} returned {}",
                url, status
            )));
        }
        Ok(response.bytes().await?)
    }

    /// Render a fetched template with the given placeholder data.
    pub fn render(template_source: &str, data: &serde_json::Value) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_template_string("email", template_source)?;
        Ok(handlebars.render("email", data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_render_replaces_placeholders() {
        let source = "<html><body>{{{table}}}<p>Deleted after {{delete_after}}</p></body></html>";
        let data = serde_json::json!({
            "table": "<table><tr><td>rg-a</td></tr></table>",
            "delete_after": "07/15/26",
        });
        let html = RemoteTemplates::render(source, &data).unwrap();
        assert!(html.contains("<table><tr><td>rg-a</td></tr></table>"));
        assert!(html.contains("Deleted after 07/15/26"));
    }

    #[test]
    fn test_render_missing_placeholder_is_empty() {
        let html = RemoteTemplates::render("<p>{{missing}}</p>", &serde_json::json!({})).unwrap();
        assert_eq!(html, "<p></p>");
    }

    #[tokio::test]
    async fn test_fetch_template() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tagging.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>{{{table}}}</html>"))
            .mount(&server)
            .await;

        let templates = RemoteTemplates::new().unwrap();
        let body = templates
            .fetch_template(&format!("{}/tagging.html", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>{{{table}}}</html>");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let templates = RemoteTemplates::new().unwrap();
        let err = templates
            .fetch_template(&format!("{}/missing.html", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Template { .. }));

        let err = templates
            .fetch_image(&format!("{}/missing.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Template { .. }));
    }
}
