use std::sync::Arc;

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{GatewayEvent, EVENT_PAYMENT_FAILED, EVENT_SESSION_COMPLETED, EVENT_SESSION_EXPIRED},
    services::{
        notifications::NotificationService,
        orders::OrderService,
        payments::{CompletionOutcome, PaymentService},
        stock::{StockRequest, StockService},
    },
};

/// Applies gateway webhook events to local state. Deliveries are
/// at-least-once, so every path here must tolerate replays.
#[derive(Clone)]
pub struct WebhookReconciler {
    db: Arc<DatabaseConnection>,
    orders: Arc<OrderService>,
    payments: Arc<PaymentService>,
    stock: StockService,
    notifications: Arc<NotificationService>,
    event_sender: EventSender,
}

impl WebhookReconciler {
    pub fn new(
        db: Arc<DatabaseConnection>,
        orders: Arc<OrderService>,
        payments: Arc<PaymentService>,
        stock: StockService,
        notifications: Arc<NotificationService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            orders,
            payments,
            stock,
            notifications,
            event_sender,
        }
    }

    /// Dispatch a verified event. Unknown event types are acknowledged and
    /// dropped so the gateway stops retrying them.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle(&self, event: GatewayEvent) -> Result<(), ServiceError> {
        match event.event_type.as_str() {
            EVENT_SESSION_COMPLETED => self.handle_completed(event).await,
            EVENT_SESSION_EXPIRED | EVENT_PAYMENT_FAILED => self.handle_failed(event).await,
            other => {
                info!(event_type = other, "ignoring unhandled gateway event");
                Ok(())
            }
        }
    }

    /// Successful payment: record the completed payment, decrement stock,
    /// and mark the order completed, all in one transaction. The unique
    /// index on the transaction id turns a replay into a no-op before any
    /// state is touched.
    async fn handle_completed(&self, event: GatewayEvent) -> Result<(), ServiceError> {
        let order_id = event.data.order_id;
        let order = self.orders.get_order(order_id).await?;
        let amount = event.data.amount.unwrap_or(order.amount);

        let txn = self.db.begin().await?;

        let outcome = self
            .payments
            .record_completion(
                &txn,
                order.id,
                order.user_id,
                amount,
                &order.currency,
                &event.data.session_id,
            )
            .await?;
        if outcome == CompletionOutcome::AlreadyRecorded {
            txn.rollback().await?;
            return Ok(());
        }

        // The money has moved; a stock shortfall at this point is a
        // discrepancy to flag, not a reason to reject the payment.
        let items = self.orders.get_order_items(order.id).await?;
        let mut discrepancies = Vec::new();
        for item in &items {
            let request = StockRequest {
                product_id: item.product_id,
                quantity: item.quantity,
            };
            if let Err(e) = self
                .stock
                .subtract_stock(&txn, request.product_id, request.quantity)
                .await
            {
                warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "paid order exceeds available stock"
                );
                discrepancies.push(request);
            }
        }

        self.orders.mark_completed(&txn, order.id).await?;
        txn.commit().await?;

        for d in discrepancies {
            self.event_sender
                .send(Event::InventoryDiscrepancy {
                    order_id: order.id,
                    product_id: d.product_id,
                    quantity: d.quantity,
                })
                .await;
        }
        self.event_sender
            .send(Event::PaymentRecorded {
                order_id: order.id,
                transaction_id: Some(event.data.session_id.clone()),
                amount,
            })
            .await;
        self.event_sender.send(Event::OrderCompleted(order.id)).await;

        if let Some(email) = event.data.customer_email.as_deref() {
            let report = self
                .notifications
                .send_order_emails(email, &order, &items)
                .await;
            if !report.all_accepted() {
                warn!(order_id = %order.id, "order notifications partially failed");
            }
        } else {
            warn!(order_id = %order.id, "no customer email on event, confirmation skipped");
        }

        info!(order_id = %order.id, transaction_id = %event.data.session_id, "payment reconciled");
        Ok(())
    }

    /// Expired session or declined payment: cancel the order and fail its
    /// non-terminal payments. Both updates are idempotent.
    async fn handle_failed(&self, event: GatewayEvent) -> Result<(), ServiceError> {
        let order_id = event.data.order_id;

        let txn = self.db.begin().await?;
        self.orders.mark_cancelled(&txn, order_id).await?;
        self.payments.mark_failed_for_order(&txn, order_id).await?;
        txn.commit().await?;

        self.event_sender.send(Event::PaymentFailed { order_id }).await;
        self.event_sender.send(Event::OrderCancelled(order_id)).await;

        info!(%order_id, event_type = %event.event_type, "order cancelled after gateway failure");
        Ok(())
    }
}
