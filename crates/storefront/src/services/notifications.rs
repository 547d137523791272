//! Best-effort customer notifications for transaction status changes.
//!
//! A notification renders the receipt, builds the status email and hands it
//! to the mailer, all under a single timeout. The outcome is reported back to
//! the caller as data; a failed notification never fails the status change
//! that triggered it.

use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use serde::Serialize;
use tracing::instrument;

use sillage_core::{TransactionStatus, format_usd};

use super::email::{MailAttachment, Mailer, OutgoingMail};
use super::receipt::{ReceiptLineView, ReceiptRenderer};
use crate::models::Transaction;

/// HTML template for the status update email.
#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusUpdateEmailHtml<'a> {
    headline: &'a str,
    order_number: &'a str,
    status: &'a str,
    line_items: &'a [ReceiptLineView],
    total: &'a str,
}

/// Plain text template for the status update email.
#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusUpdateEmailText<'a> {
    headline: &'a str,
    order_number: &'a str,
    status: &'a str,
    line_items: &'a [ReceiptLineView],
    total: &'a str,
}

/// What happened to the notification for a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// The email was accepted by the mail transport.
    Sent,
    /// No mail transport is configured.
    NotConfigured,
    /// Rendering or delivery failed, or timed out.
    Failed { reason: String },
    /// The status did not change, so nothing was sent.
    Skipped,
}

/// Sends status-change emails with the receipt attached.
#[derive(Clone)]
pub struct Notifier {
    mailer: Mailer,
    renderer: Arc<dyn ReceiptRenderer>,
    timeout: Duration,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Mailer, renderer: Arc<dyn ReceiptRenderer>, timeout: Duration) -> Self {
        Self {
            mailer,
            renderer,
            timeout,
        }
    }

    /// Notify the buyer that their transaction changed status.
    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id, status = %transaction.status))]
    pub async fn status_changed(&self, transaction: &Transaction) -> NotificationOutcome {
        if !self.mailer.is_configured() {
            tracing::info!("Mail transport not configured, skipping status notification");
            return NotificationOutcome::NotConfigured;
        }

        let outcome = match tokio::time::timeout(self.timeout, self.deliver(transaction)).await {
            Ok(Ok(())) => NotificationOutcome::Sent,
            Ok(Err(reason)) => NotificationOutcome::Failed { reason },
            Err(_) => NotificationOutcome::Failed {
                reason: format!("timed out after {}ms", self.timeout.as_millis()),
            },
        };

        if let NotificationOutcome::Failed { reason } = &outcome {
            tracing::warn!(reason = %reason, "Status notification failed");
        }
        outcome
    }

    async fn deliver(&self, transaction: &Transaction) -> Result<(), String> {
        let receipt = self
            .renderer
            .render(transaction)
            .map_err(|e| format!("receipt rendering failed: {e}"))?;

        let order_number = transaction.order_number();
        let headline = headline(transaction.status);
        let line_items = ReceiptLineView::lines(transaction);
        let total = format_usd(transaction.totals.total);

        let html = StatusUpdateEmailHtml {
            headline,
            order_number: &order_number,
            status: transaction.status.as_str(),
            line_items: &line_items,
            total: &total,
        }
        .render()
        .map_err(|e| format!("email rendering failed: {e}"))?;
        let text = StatusUpdateEmailText {
            headline,
            order_number: &order_number,
            status: transaction.status.as_str(),
            line_items: &line_items,
            total: &total,
        }
        .render()
        .map_err(|e| format!("email rendering failed: {e}"))?;

        let subject = format!("Sillage order #{order_number}: {}", transaction.status);

        self.mailer
            .send(OutgoingMail {
                to: transaction.email.as_str(),
                subject: &subject,
                html: &html,
                text: &text,
                attachments: vec![MailAttachment {
                    filename: receipt.filename,
                    content_type: receipt.content_type.to_owned(),
                    bytes: receipt.bytes,
                }],
            })
            .await
            .map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("mailer", &self.mailer)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

const fn headline(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "We have received your order",
        TransactionStatus::Completed => "Thank you for your purchase",
        TransactionStatus::Cancelled => "Your order has been cancelled",
        TransactionStatus::Failed => "There was a problem with your order",
    }
}
