//! Email delivery over SMTP
//!
//! `Mailer` is the seam the jobs send through; `SmtpMailer` implements it
//! with a STARTTLS relay via lettre. Summary emails are HTML with the header
//! graphic embedded inline by content id, and are flagged low priority.

use crate::config::SmtpConfig;
use crate::error::{GovernanceError, Result};
use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::info;

/// An email ready for delivery.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<String>,
    pub inline_images: Vec<InlineImage>,
    pub low_priority: bool,
}

/// Binary content embedded inline and referenced by content id.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub content_id: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Delivery seam used by both jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// `X-Priority` header; "5 (Lowest)" marks the governance summaries as
/// low-priority mail.
#[derive(Debug, Clone, PartialEq)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// SMTP implementation of [`Mailer`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| GovernanceError::email(format!("invalid from address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message> {
        if email.recipients.is_empty() {
            return Err(GovernanceError::validation(
                "recipients",
                "at least one recipient is required",
            ));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&email.subject);

        for recipient in &email.recipients {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|e| GovernanceError::email(format!("invalid recipient '{}': {}", recipient, e)))?;
            builder = builder.to(mailbox);
        }

        if email.low_priority {
            builder = builder.header(XPriority("5 (Lowest)".to_string()));
        }

        let mut body = MultiPart::related().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        );

        for image in &email.inline_images {
            let content_type = ContentType::parse(&image.content_type).map_err(|e| {
                GovernanceError::email(format!(
                    "invalid content type '{}': {}",
                    image.content_type, e
                ))
            })?;
            body = body.singlepart(
                Attachment::new_inline(image.content_id.clone())
                    .body(image.bytes.clone(), content_type),
            );
        }

        Ok(builder.multipart(body)?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let message = self.build_message(email)?;
        self.transport.send(message).await?;
        info!(
            subject = %email.subject,
            recipients = email.recipients.len(),
            "summary email sent"
        );
        Ok(())
    }
}

/// Split a semicolon-delimited recipient list, dropping empty entries.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}
