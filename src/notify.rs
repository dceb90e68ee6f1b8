//! Customer notifications for placed and failed orders.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};
use uuid::Uuid;

use crate::{
    entity::email_outbox::ActiveModel as OutboxActive,
    error::AppResult,
    models::SelectedVariant,
};

#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub selected_variant: Option<SelectedVariant>,
}

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub to: String,
    pub order_number: String,
    pub customer_name: String,
    pub items: Vec<ConfirmationLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct OrderFailure {
    pub to: String,
    pub order_number: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    OrderConfirmation,
    OrderFailure,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::OrderConfirmation => "order_confirmation",
            EmailKind::OrderFailure => "order_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub kind: EmailKind,
    pub order_number: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> AppResult<()>;

    async fn send_order_failure(&self, failure: &OrderFailure) -> AppResult<()>;
}

/// Queues rendered mail in the `email_outbox` table for a relay to deliver.
pub struct OutboxNotifier {
    orm: DatabaseConnection,
    from: String,
}

impl OutboxNotifier {
    pub fn new(orm: DatabaseConnection, from: impl Into<String>) -> Self {
        Self {
            orm,
            from: from.into(),
        }
    }

    async fn enqueue(&self, message: EmailMessage) -> AppResult<()> {
        OutboxActive {
            id: Set(Uuid::new_v4()),
            kind: Set(message.kind.as_str().into()),
            order_number: Set(message.order_number),
            sender: Set(message.from),
            recipient: Set(message.to),
            subject: Set(message.subject),
            html: Set(message.html),
            sent_at: Set(None),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> AppResult<()> {
        self.enqueue(render_confirmation(&self.from, confirmation))
            .await
    }

    async fn send_order_failure(&self, failure: &OrderFailure) -> AppResult<()> {
        self.enqueue(render_failure(&self.from, failure)).await
    }
}

/// Writes rendered mail to the log instead of sending it. Meant for local runs.
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    fn emit(&self, message: &EmailMessage) {
        tracing::info!(
            kind = message.kind.as_str(),
            to = %message.to,
            subject = %message.subject,
            "email rendered"
        );
        tracing::debug!(html = %message.html, "email body");
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> AppResult<()> {
        self.emit(&render_confirmation(&self.from, confirmation));
        Ok(())
    }

    async fn send_order_failure(&self, failure: &OrderFailure) -> AppResult<()> {
        self.emit(&render_failure(&self.from, failure));
        Ok(())
    }
}

const CELL_STYLE: &str = "padding: 10px; border-bottom: 1px solid #eee;";

fn cell(align: &str, content: &str) -> String {
    format!(r#"<td style="{CELL_STYLE} text-align: {align};">{content}</td>"#)
}

pub fn render_confirmation(from: &str, confirmation: &OrderConfirmation) -> EmailMessage {
    let rows: String = confirmation
        .items
        .iter()
        .map(|item| {
            let variant = item.selected_variant.clone().unwrap_or_default();
            let color = variant
                .color
                .map(|c| format!(" - Color: {}", escape_html(&c)))
                .unwrap_or_default();
            let size = variant
                .size
                .map(|s| format!(" - Size: {}", escape_html(&s)))
                .unwrap_or_default();
            let label = format!("{}{}{}", escape_html(&item.name), color, size);
            let line_total = money(item.unit_price * Decimal::from(item.quantity));
            format!(
                "<tr>{}{}{}</tr>",
                cell("left", &label),
                cell("center", &item.quantity.to_string()),
                cell("right", &line_total),
            )
        })
        .collect();

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h1 style="color: #2563eb;">Order Confirmation</h1>
<p>Dear {name},</p>
<p>Thank you for your order! We're pleased to confirm that we've received your order and it's being processed.</p>
<div style="background-color: #f9fafb; padding: 20px; border-radius: 8px;">
<h2>Order Details</h2>
<p><strong>Order Number:</strong> {number}</p>
<p><strong>Order Date:</strong> {date}</p>
</div>
<h2>Order Summary</h2>
<table style="width: 100%; border-collapse: collapse;">
<thead><tr><th style="text-align: left;">Item</th><th style="text-align: center;">Quantity</th><th style="text-align: right;">Price</th></tr></thead>
<tbody>{rows}</tbody>
<tfoot><tr><td colspan="2" style="text-align: right;"><strong>Total:</strong></td><td style="text-align: right;"><strong>{total}</strong></td></tr></tfoot>
</table>
<h3>What's Next?</h3>
<ol>
<li>We'll process your order and prepare it for shipping.</li>
<li>You'll receive another email with tracking information once your order ships.</li>
<li>If you have any questions, please don't hesitate to contact our customer service team.</li>
</ol>
<p style="text-align: center; color: #6b7280;">Thank you for shopping with us!<br>eSalesOne Team</p>
</div>"#,
        name = escape_html(&confirmation.customer_name),
        number = escape_html(&confirmation.order_number),
        date = Utc::now().format("%Y-%m-%d"),
        rows = rows,
        total = money(confirmation.total),
    );

    EmailMessage {
        kind: EmailKind::OrderConfirmation,
        order_number: confirmation.order_number.clone(),
        from: from.to_string(),
        to: confirmation.to.clone(),
        subject: format!("Order Confirmation - {}", confirmation.order_number),
        html,
    }
}

pub fn render_failure(from: &str, failure: &OrderFailure) -> EmailMessage {
    let html = format!(
        "<h1>We're sorry, your order could not be processed</h1>\n\
         <p>Order Number: {}</p>\n\
         <p>Reason: {}</p>\n\
         <p>Please try again or contact our support team for assistance.</p>",
        escape_html(&failure.order_number),
        escape_html(&failure.reason),
    );

    EmailMessage {
        kind: EmailKind::OrderFailure,
        order_number: failure.order_number.clone(),
        from: from.to_string(),
        to: failure.to.clone(),
        subject: format!("Order Failed - {}", failure.order_number),
        html,
    }
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
