use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the order/payment workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderCompleted(Uuid),
    OrderCancelled(Uuid),
    CheckoutSessionCreated {
        order_id: Uuid,
        session_id: String,
    },
    PaymentRecorded {
        order_id: Uuid,
        transaction_id: Option<String>,
        amount: Decimal,
    },
    PaymentFailed {
        order_id: Uuid,
    },
    /// A paid order could not have its stock decremented; needs operator
    /// reconciliation.
    InventoryDiscrepancy {
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; a full or closed channel is logged, never fatal.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("failed to publish event: {}", e);
        }
    }
}

/// Background loop that drains the event channel into the log.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::InventoryDiscrepancy {
                order_id,
                product_id,
                quantity,
            } => {
                warn!(
                    %order_id,
                    %product_id,
                    quantity,
                    "inventory discrepancy recorded for completed order"
                );
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }
}
