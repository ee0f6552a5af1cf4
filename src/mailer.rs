// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mail for contact messages.

use crate::config::MailConfig;
use crate::pages::html_escape;
use crate::protocol::ContactForm;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mailbox {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A contact message ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub text: String,
    pub html: String,
    pub reply_to: String,
}

impl OutgoingMail {
    /// Render a contact form. User input is escaped in the HTML part.
    pub fn from_contact(form: &ContactForm) -> Self {
        Self {
            subject: format!("Portfolio Contact from {}", form.name),
            text: format!(
                "Name: {}\nEmail: {}\nMessage: {}",
                form.name, form.email, form.message
            ),
            html: format!(
                "<h3>New Contact Message</h3>\n\
                 <p><strong>Name:</strong> {}</p>\n\
                 <p><strong>Email:</strong> {}</p>\n\
                 <p><strong>Message:</strong> {}</p>",
                html_escape(&form.name),
                html_escape(&form.email),
                html_escape(&form.message),
            ),
            reply_to: form.email.clone(),
        }
    }
}

/// Mail delivery capability.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;

    /// Check the transport is reachable.
    async fn verify(&self) -> Result<bool, MailError> {
        Ok(true)
    }
}

/// SMTP relay over implicit TLS.
pub struct SmtpMailer {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&format!("{} <{}>", config.from_name, config.username))?;
        let to = parse_mailbox(config.recipient())?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, to, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(mail.subject.as_str());
        // An unparsable reply address is dropped rather than failing the send
        if let Ok(reply_to) = mail.reply_to.parse::<Mailbox>() {
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                mail.html.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(subject = %mail.subject, "Contact mail relayed");
        Ok(())
    }

    async fn verify(&self) -> Result<bool, MailError> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Stand-in used when the SMTP settings cannot be parsed at startup.
///
/// The service still serves pages; every send fails with the recorded reason.
pub struct UnconfiguredMailer {
    reason: String,
}

impl UnconfiguredMailer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Mailer for UnconfiguredMailer {
    async fn send(&self, _mail: &OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Transport(format!("mail is not configured: {}", self.reason)))
    }

    async fn verify(&self) -> Result<bool, MailError> {
        Err(MailError::Transport(format!("mail is not configured: {}", self.reason)))
    }
}

/// Mailer that records messages instead of sending them.
///
/// Can be told to fail, or to take a while, for exercising error paths and
/// concurrent submissions.
#[derive(Default)]
pub struct MockMailer {
    should_fail: bool,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            tracing::warn!(subject = %mail.subject, "MockMailer: simulating send failure");
            return Err(MailError::Transport("mock transport failure".to_string()));
        }
        tracing::info!(subject = %mail.subject, "MockMailer: mail recorded (not sent)");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_mail_escapes_html_part() {
        let form = ContactForm::new("<b>Eve</b>", "eve@example.com", "<script>x()</script>");
        let mail = OutgoingMail::from_contact(&form);
        assert_eq!(mail.subject, "Portfolio Contact from <b>Eve</b>");
        assert!(mail.text.contains("Message: <script>x()</script>"));
        assert!(mail.html.contains("&lt;script&gt;x()&lt;/script&gt;"));
        assert!(!mail.html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_mock_mailer_records() {
        let mailer = MockMailer::new();
        let mail = OutgoingMail::from_contact(&ContactForm::new("A", "a@x.com", "hi"));
        tokio_test::assert_ok!(mailer.send(&mail).await);
        assert_eq!(mailer.attempts(), 1);
        assert_eq!(mailer.sent(), vec![mail]);
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_always_fails() {
        let mailer = UnconfiguredMailer::new("missing username");
        let mail = OutgoingMail::from_contact(&ContactForm::new("A", "a@x.com", "hi"));
        tokio_test::assert_err!(mailer.send(&mail).await);
        tokio_test::assert_err!(mailer.verify().await);
    }

    #[test]
    fn test_smtp_mailer_requires_sender() {
        let config = MailConfig::default();
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_mailer_failure() {
        let mailer = MockMailer::new_failing();
        let mail = OutgoingMail::from_contact(&ContactForm::new("A", "a@x.com", "hi"));
        tokio_test::assert_err!(mailer.send(&mail).await);
        assert_eq!(mailer.attempts(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_recipient() {
        let config = MailConfig {
            username: "owner@example.com".to_string(),
            recipient: Some("not an address".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailError::InvalidAddress { .. })
        ));
    }
}
