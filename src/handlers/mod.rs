pub mod checkout;
pub mod common;
pub mod emails;
pub mod health;
pub mod newsletter;
pub mod orders;
pub mod payment_webhooks;
pub mod products;

use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

use crate::{
    config::AppConfig,
    db::DbPool,
    email::{EmailSender, NewsletterClient},
    events::EventSender,
    gateway::PaymentGateway,
    services::{
        catalog::CatalogService, checkout::CheckoutService, notifications::NotificationService,
        orders::OrderService, payments::PaymentService, reconciler::WebhookReconciler,
        stock::StockService,
    },
};

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub stock: StockService,
    pub checkout: Arc<CheckoutService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub notifications: Arc<NotificationService>,
    pub newsletter: Arc<dyn NewsletterClient>,
}

impl AppServices {
    /// Wire up the service graph around the shared pool and the injected
    /// external clients.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        gateway: Arc<dyn PaymentGateway>,
        email: Arc<dyn EmailSender>,
        newsletter: Arc<dyn NewsletterClient>,
        config: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let payments = Arc::new(PaymentService::new(db.clone()));
        let stock = StockService;
        let notifications = Arc::new(NotificationService::new(
            email,
            config.email.from_address.clone(),
            config.email.admin_address.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            stock.clone(),
            orders.clone(),
            payments.clone(),
            gateway,
            notifications.clone(),
            event_sender.clone(),
            config.gateway.clone(),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            db,
            orders.clone(),
            payments.clone(),
            stock.clone(),
            notifications.clone(),
            event_sender,
        ));

        Self {
            catalog,
            orders,
            payments,
            stock,
            checkout,
            reconciler,
            notifications,
            newsletter,
        }
    }
}
