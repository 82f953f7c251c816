use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser, errors::ServiceError, handlers::common::validate_input, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OrderNotificationRequest {
    pub order_id: Uuid,
    #[validate(email)]
    pub customer_email: String,
}

/// Re-send the confirmation and admin alert for an existing order. The
/// response reports each recipient separately; a failed send is a 200 with
/// `accepted: false`, not an error.
#[utoipa::path(
    post,
    path = "/api/v1/emails/order-notifications",
    request_body = OrderNotificationRequest,
    responses(
        (status = 200, description = "Per-recipient send outcome", body = crate::services::notifications::DispatchReport),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_order_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<OrderNotificationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&request)?;

    let order = state
        .services
        .orders
        .get_order_for_user(request.order_id, user.user_id, user.is_admin())
        .await?;
    let items = state.services.orders.get_order_items(order.id).await?;

    let report = state
        .services
        .notifications
        .send_order_emails(&request.customer_email, &order, &items)
        .await;

    Ok(Json(report))
}
