//! Receipt documents for transactions.
//!
//! Receipts are printable HTML rendered with askama; the buyer's mail client
//! or browser handles printing and saving.

use askama::Template;
use thiserror::Error;

use sillage_core::format_usd;

use crate::models::Transaction;

/// Errors from receipt rendering.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered receipt ready to attach to a message.
#[derive(Debug, Clone)]
pub struct ReceiptDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Produces a receipt document for a transaction.
pub trait ReceiptRenderer: Send + Sync {
    /// Render the receipt.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError`] if rendering fails.
    fn render(&self, transaction: &Transaction) -> Result<ReceiptDocument, ReceiptError>;
}

/// Receipt line view.
#[derive(Debug, Clone)]
pub struct ReceiptLineView {
    pub name: String,
    pub collection: String,
    pub quantity: u32,
    pub price: String,
    pub total: String,
}

impl ReceiptLineView {
    pub(crate) fn lines(transaction: &Transaction) -> Vec<Self> {
        transaction
            .items
            .iter()
            .map(|item| Self {
                name: item.name().to_owned(),
                collection: item.collection().unwrap_or_default().to_owned(),
                quantity: item.quantity(),
                price: format_usd(item.price()),
                total: format_usd(item.line_total()),
            })
            .collect()
    }
}

/// Receipt print template.
#[derive(Template)]
#[template(path = "receipt/receipt.html")]
struct ReceiptTemplate<'a> {
    order_number: &'a str,
    email: &'a str,
    status: &'a str,
    created_at: String,
    completed_at: Option<String>,
    line_items: Vec<ReceiptLineView>,
    subtotal: String,
    tax: String,
    shipping: String,
    total: String,
    printed_at: String,
}

/// Renders printable HTML receipts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReceiptRenderer;

impl ReceiptRenderer for HtmlReceiptRenderer {
    fn render(&self, transaction: &Transaction) -> Result<ReceiptDocument, ReceiptError> {
        let order_number = transaction.order_number();
        let totals = transaction.totals;

        let html = ReceiptTemplate {
            order_number: &order_number,
            email: transaction.email.as_str(),
            status: transaction.status.as_str(),
            created_at: transaction.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            completed_at: transaction
                .completed_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string()),
            line_items: ReceiptLineView::lines(transaction),
            subtotal: format_usd(totals.subtotal),
            tax: format_usd(totals.tax),
            shipping: shipping_label(totals.shipping),
            total: format_usd(totals.total),
            printed_at: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        }
        .render()?;

        Ok(ReceiptDocument {
            filename: format!("receipt-{order_number}.html"),
            content_type: "text/html; charset=utf-8",
            bytes: html.into_bytes(),
        })
    }
}

/// "Free" for zero shipping, otherwise the formatted amount.
#[must_use]
pub fn shipping_label(shipping: rust_decimal::Decimal) -> String {
    if shipping.is_zero() {
        "Free".to_string()
    } else {
        format_usd(shipping)
    }
}
