use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{created_response, validate_input, PaginatedResponse, PaginationParams},
    services::orders::{Address, CartLine, CreateOrderInput},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub items: Vec<CartLine>,
    #[validate(length(min = 1))]
    pub shipping_method: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}

/// Order with its line items and address rows, as shown on the dashboard.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: crate::entities::order::Model,
    pub items: Vec<crate::entities::order_item::Model>,
    pub addresses: Vec<crate::entities::shipping_address::Model>,
    pub payments: Vec<crate::entities::payment::Model>,
}

pub(crate) fn cart_subtotal(items: &[CartLine]) -> Decimal {
    items
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum()
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Pending order created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&request)?;
    for line in &request.items {
        validate_input(line)?;
    }
    validate_input(&request.shipping_address)?;
    if let Some(billing) = &request.billing_address {
        validate_input(billing)?;
    }

    let quote = state
        .services
        .catalog
        .price_cart(
            cart_subtotal(&request.items),
            &request.shipping_address.country_code,
        )
        .await?;

    let order = state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: user.user_id,
            items: request.items,
            amount: quote.total,
            currency: quote.currency,
            shipping_method: request.shipping_method,
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
        })
        .await?;

    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "The caller's orders, newest first"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders_for_user(user.user_id, pagination.page, pagination.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_for_user(id, user.user_id, user.is_admin())
        .await?;
    let items = state.services.orders.get_order_items(id).await?;
    let addresses = state.services.orders.get_shipping_addresses(id).await?;
    let payments = state.services.payments.list_for_order(id).await?;
    Ok(Json(OrderDetail {
        order,
        items,
        addresses,
        payments,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order line items"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    // Ownership check first; items are only visible with the order itself.
    state
        .services
        .orders
        .get_order_for_user(id, user.user_id, user.is_admin())
        .await?;
    let items = state.services.orders.get_order_items(id).await?;
    Ok(Json(items))
}
