use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::GatewayConfig,
    entities::{order, payment::PaymentMethod},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{HostedSessionRequest, PaymentGateway},
    services::{
        notifications::NotificationService,
        orders::{Address, CartLine, CreateOrderInput, OrderService},
        payments::PaymentService,
        stock::{StockRequest, StockService},
    },
};

/// Input for checkout-session initiation. The order was created immediately
/// before this call and is referenced by id.
#[derive(Debug, Clone)]
pub struct InitiateSessionInput {
    pub user_id: Uuid,
    pub customer_email: Option<String>,
    pub cart: Vec<CartLine>,
    pub order_id: Uuid,
}

/// Input for the synchronous cash-on-delivery path.
#[derive(Debug, Clone)]
pub struct CodOrderInput {
    pub user_id: Uuid,
    pub customer_email: String,
    pub cart: Vec<CartLine>,
    pub total: Decimal,
    pub currency: String,
    pub shipping_method: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}

/// Checkout workflows: hosted-session initiation for card payments and the
/// collapsed synchronous cash-on-delivery variant.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    orders: Arc<OrderService>,
    payments: Arc<PaymentService>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationService>,
    event_sender: EventSender,
    gateway_cfg: GatewayConfig,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        stock: StockService,
        orders: Arc<OrderService>,
        payments: Arc<PaymentService>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
        event_sender: EventSender,
        gateway_cfg: GatewayConfig,
    ) -> Self {
        Self {
            db,
            stock,
            orders,
            payments,
            gateway,
            notifications,
            event_sender,
            gateway_cfg,
        }
    }

    /// Card checkout: validate stock, record a pending payment against the
    /// pre-created order, and request a hosted payment session. Stock is not
    /// decremented here; that happens when the gateway confirms payment.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn initiate_session(
        &self,
        input: InitiateSessionInput,
    ) -> Result<String, ServiceError> {
        let requests: Vec<StockRequest> = input
            .cart
            .iter()
            .map(|l| StockRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();

        let validation = self.stock.validate_order_stock(&*self.db, &requests).await?;
        if validation.insufficient {
            return Err(ServiceError::InsufficientStock(validation.shortages));
        }

        let order = self.orders.get_order(input.order_id).await?;
        if order.user_id != input.user_id {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                input.order_id
            )));
        }

        self.payments
            .create_pending(
                &*self.db,
                order.id,
                input.user_id,
                order.amount,
                &order.currency,
                PaymentMethod::Card,
            )
            .await?;

        let session = self
            .gateway
            .create_hosted_session(HostedSessionRequest {
                order_id: order.id,
                amount: order.amount,
                currency: order.currency.clone(),
                customer_email: input.customer_email,
                success_url: self.gateway_cfg.success_url.clone(),
                cancel_url: self.gateway_cfg.cancel_url.clone(),
            })
            .await?;

        self.event_sender
            .send(Event::CheckoutSessionCreated {
                order_id: order.id,
                session_id: session.session_id.clone(),
            })
            .await;

        info!(order_id = %order.id, session_id = %session.session_id, "hosted session created");
        Ok(session.url)
    }

    /// Cash on delivery: one transaction creates the order, decrements stock
    /// immediately (there is no gateway confirmation to defer to), and
    /// records the pending payment. Emails go out after commit; their
    /// failures are logged, not returned.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn place_cod_order(&self, input: CodOrderInput) -> Result<order::Model, ServiceError> {
        let requests: Vec<StockRequest> = input
            .cart
            .iter()
            .map(|l| StockRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();

        let txn = self.db.begin().await?;

        // Full itemized report first; the conditional decrements below remain
        // the authoritative guard under concurrency.
        let validation = self.stock.validate_order_stock(&txn, &requests).await?;
        if validation.insufficient {
            return Err(ServiceError::InsufficientStock(validation.shortages));
        }

        let order = self
            .orders
            .create_order_in(
                &txn,
                CreateOrderInput {
                    user_id: input.user_id,
                    items: input.cart.clone(),
                    amount: input.total,
                    currency: input.currency.clone(),
                    shipping_method: input.shipping_method.clone(),
                    shipping_address: input.shipping_address.clone(),
                    billing_address: input.billing_address.clone(),
                },
            )
            .await?;

        self.stock.subtract_for_items(&txn, &requests).await?;

        self.payments
            .create_pending(
                &txn,
                order.id,
                input.user_id,
                input.total,
                &input.currency,
                PaymentMethod::CashOnDelivery,
            )
            .await?;

        txn.commit().await?;

        self.event_sender.send(Event::OrderCreated(order.id)).await;

        let items = self.orders.get_order_items(order.id).await?;
        let report = self
            .notifications
            .send_order_emails(&input.customer_email, &order, &items)
            .await;
        if !report.all_accepted() {
            warn!(order_id = %order.id, "order notifications partially failed");
        }

        info!(order_id = %order.id, "cash-on-delivery order placed");
        Ok(order)
    }
}
