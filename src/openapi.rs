use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
Minimalist e-commerce storefront backend: product catalog, checkout against a
hosted payment gateway, cash on delivery, webhook reconciliation, order
dashboards, transactional emails and newsletter subscription.

## Authentication

Customer and admin endpoints take a JWT bearer token issued by the external
auth platform:

```
Authorization: Bearer <your-jwt-token>
```

The payment webhook is authenticated by HMAC signature instead
(`Stripe-Signature` or `x-timestamp`/`x-signature` headers).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Catalog", description = "Products, categories and countries"),
        (name = "Orders", description = "Order creation and dashboards"),
        (name = "Checkout", description = "Hosted payment sessions and cash on delivery"),
        (name = "Payments", description = "Gateway webhook"),
        (name = "Notifications", description = "Transactional email"),
        (name = "Newsletter", description = "Newsletter subscriptions"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::create_review,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::list_categories,
        crate::handlers::products::create_category,
        crate::handlers::products::delete_category,
        crate::handlers::products::list_countries,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_items,

        // Checkout
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::checkout::create_cod_order,

        // Webhooks
        crate::handlers::payment_webhooks::payment_webhook,

        // Notifications & newsletter
        crate::handlers::emails::send_order_notifications,
        crate::handlers::newsletter::subscribe,

        // Health
        crate::handlers::health::health_check,
        crate::handlers::health::status_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::errors::StockShortage,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::checkout::CheckoutSessionRequest,
            crate::handlers::checkout::CheckoutSessionResponse,
            crate::handlers::checkout::CodCheckoutRequest,
            crate::handlers::emails::OrderNotificationRequest,
            crate::handlers::newsletter::SubscribeRequest,
            crate::handlers::products::StockAdjustmentRequest,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,
            crate::services::catalog::CreateCategoryInput,
            crate::services::catalog::CreateReviewInput,
            crate::services::catalog::CartQuote,
            crate::services::orders::Address,
            crate::services::orders::CartLine,
            crate::services::notifications::SendReport,
            crate::services::notifications::DispatchReport,
        )
    )
)]
pub struct ApiDoc;

/// Swagger UI router, mounted at `/docs`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
