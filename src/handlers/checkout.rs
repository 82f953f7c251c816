use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{
        common::{created_response, validate_input},
        orders::cart_subtotal,
    },
    services::{
        checkout::{CodOrderInput, InitiateSessionInput},
        orders::{Address, CartLine},
    },
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutSessionRequest {
    /// Pending order the session pays for
    pub order_id: Uuid,
    #[validate(length(min = 1))]
    pub items: Vec<CartLine>,
    #[validate(email)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    /// Hosted payment page the client redirects to
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CodCheckoutRequest {
    #[validate(length(min = 1))]
    pub items: Vec<CartLine>,
    #[validate(length(min = 1))]
    pub shipping_method: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    #[validate(email)]
    pub customer_email: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Hosted session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid input or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CheckoutSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&request)?;
    for line in &request.items {
        validate_input(line)?;
    }

    let customer_email = request.customer_email.or_else(|| user.email.clone());
    let url = state
        .services
        .checkout
        .initiate_session(InitiateSessionInput {
            user_id: user.user_id,
            customer_email,
            cart: request.items,
            order_id: request.order_id,
        })
        .await?;

    Ok(Json(CheckoutSessionResponse { url }))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/cod",
    request_body = CodCheckoutRequest,
    responses(
        (status = 201, description = "Order placed, payment due on delivery"),
        (status = 400, description = "Invalid input or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_cod_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CodCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&request)?;
    for line in &request.items {
        validate_input(line)?;
    }
    validate_input(&request.shipping_address)?;
    if let Some(billing) = &request.billing_address {
        validate_input(billing)?;
    }

    let customer_email = request
        .customer_email
        .or_else(|| user.email.clone())
        .ok_or_else(|| {
            ServiceError::ValidationError("customer_email is required".to_string())
        })?;

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
        .checkout
        .place_cod_order(CodOrderInput {
            user_id: user.user_id,
            customer_email,
            cart: request.items,
            total: quote.total,
            currency: quote.currency,
            shipping_method: request.shipping_method,
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
        })
        .await?;

    Ok(created_response(order))
}
