use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::{
    email::{EmailMessage, EmailSender},
    entities::{order, order_item},
};

/// Per-recipient send outcome. One recipient may fail while the other
/// succeeds; both are reported.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SendReport {
    pub recipient: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DispatchReport {
    pub customer: SendReport,
    pub admin: SendReport,
}

impl DispatchReport {
    pub fn all_accepted(&self) -> bool {
        self.customer.accepted && self.admin.accepted
    }
}

/// Formats and sends the customer confirmation and the admin alert for an
/// order. Failures are logged and reported, never propagated: a confirmed
/// order must not be undone by a notification failure.
#[derive(Clone)]
pub struct NotificationService {
    email: Arc<dyn EmailSender>,
    from_address: String,
    admin_address: String,
}

impl NotificationService {
    pub fn new(email: Arc<dyn EmailSender>, from_address: String, admin_address: String) -> Self {
        Self {
            email,
            from_address,
            admin_address,
        }
    }

    #[instrument(skip(self, order, items), fields(order_id = %order.id))]
    pub async fn send_order_emails(
        &self,
        customer_email: &str,
        order: &order::Model,
        items: &[order_item::Model],
    ) -> DispatchReport {
        let customer_message = EmailMessage {
            to: customer_email.to_string(),
            from: self.from_address.clone(),
            subject: format!("Order confirmation #{}", short_id(order)),
            html_body: render_customer_body(order, items),
        };
        let admin_message = EmailMessage {
            to: self.admin_address.clone(),
            from: self.from_address.clone(),
            subject: format!("New order #{}", short_id(order)),
            html_body: render_admin_body(order, items),
        };

        DispatchReport {
            customer: self.try_send(customer_message).await,
            admin: self.try_send(admin_message).await,
        }
    }

    async fn try_send(&self, message: EmailMessage) -> SendReport {
        let recipient = message.to.clone();
        match self.email.send(&message).await {
            Ok(()) => {
                info!(%recipient, "notification sent");
                SendReport {
                    recipient,
                    accepted: true,
                    error: None,
                }
            }
            Err(e) => {
                error!(%recipient, error = %e, "notification failed");
                SendReport {
                    recipient,
                    accepted: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn short_id(order: &order::Model) -> String {
    order.id.to_string()[..8].to_uppercase()
}

fn render_items(items: &[order_item::Model]) -> String {
    items
        .iter()
        .map(|i| format!("<li>{} × {} — {} each</li>", i.quantity, i.name, i.unit_price))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_customer_body(order: &order::Model, items: &[order_item::Model]) -> String {
    format!(
        "<h1>Thanks for your order!</h1>\
         <p>Order <strong>#{}</strong> — total {} {}.</p>\
         <ul>{}</ul>\
         <p>Shipping via {}.</p>",
        short_id(order),
        order.amount,
        order.currency,
        render_items(items),
        order.shipping_method,
    )
}

fn render_admin_body(order: &order::Model, items: &[order_item::Model]) -> String {
    format!(
        "<h1>New order received</h1>\
         <p>Order {} from user {} — total {} {} ({} line items).</p>\
         <ul>{}</ul>",
        order.id,
        order.user_id,
        order.amount,
        order.currency,
        items.len(),
        render_items(items),
    )
}
