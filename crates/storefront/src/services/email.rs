//! Outbound mail over SMTP.
//!
//! Uses SMTP via lettre. The mailer is constructed once at startup; when the
//! SMTP block is not configured it is [`Mailer::Unconfigured`] and every send
//! reports [`EmailError::NotConfigured`].

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// No SMTP transport configured.
    #[error("mail transport is not configured")]
    NotConfigured,

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid attachment content type.
    #[error("Invalid attachment content type: {0}")]
    InvalidContentType(String),
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A message ready to send.
#[derive(Debug, Clone)]
pub struct OutgoingMail<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub html: &'a str,
    pub text: &'a str,
    pub attachments: Vec<MailAttachment>,
}

/// SMTP-backed sender.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    async fn send(&self, mail: OutgoingMail<'_>) -> Result<(), EmailError> {
        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(mail.text.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(mail.html.to_string()),
            );

        let mut message = MultiPart::mixed().multipart(body);
        for attachment in mail.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|_| EmailError::InvalidContentType(attachment.content_type.clone()))?;
            message = message
                .singlepart(Attachment::new(attachment.filename).body(attachment.bytes, content_type));
        }

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(mail.to.to_string()))?)
            .subject(mail.subject)
            .multipart(message)?;

        self.transport.send(email).await?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent successfully");
        Ok(())
    }
}

/// Mail collaborator injected through application state.
#[derive(Clone)]
pub enum Mailer {
    Smtp(SmtpMailer),
    Unconfigured,
}

impl Mailer {
    /// Build the mailer described by configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        config.map_or(Ok(Self::Unconfigured), |c| SmtpMailer::new(c).map(Self::Smtp))
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Smtp(_))
    }

    /// Send a multipart message with plain text and HTML bodies.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::NotConfigured`] for an unconfigured mailer, or
    /// the transport failure.
    pub async fn send(&self, mail: OutgoingMail<'_>) -> Result<(), EmailError> {
        match self {
            Self::Smtp(mailer) => mailer.send(mail).await,
            Self::Unconfigured => Err(EmailError::NotConfigured),
        }
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smtp(mailer) => f
                .debug_struct("Mailer::Smtp")
                .field("from_address", &mailer.from_address)
                .finish_non_exhaustive(),
            Self::Unconfigured => f.write_str("Mailer::Unconfigured"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use secrecy::SecretString;

    use super::*;

    /// SMTP mailer pointed at a loopback port.
    pub(crate) fn local_mailer(port: u16) -> Mailer {
        Mailer::from_config(Some(&EmailConfig {
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: port,
            smtp_username: "orders".to_string(),
            smtp_password: SecretString::from("k3J#9vQ!x2Lm@8Pz"),
            from_address: "orders@sillage.shop".to_string(),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_reports_not_configured() {
        let mailer = Mailer::from_config(None).unwrap();
        assert!(!mailer.is_configured());

        let err = mailer
            .send(OutgoingMail {
                to: "buyer@example.com",
                subject: "Receipt",
                html: "<p>hi</p>",
                text: "hi",
                attachments: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::NotConfigured));
    }

    #[tokio::test]
    async fn test_configured_mailer() {
        assert!(local_mailer(2525).is_configured());
    }
}
