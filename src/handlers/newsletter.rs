use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    email::NewsletterError, errors::ServiceError, handlers::common::validate_input, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubscribeRequest {
    #[validate(email)]
    pub email: String,
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/newsletter/subscriptions",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscribed"),
        (status = 400, description = "Invalid email address", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already subscribed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Newsletter API unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Newsletter"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&request)?;

    state
        .services
        .newsletter
        .subscribe(&request.email, request.name.as_deref())
        .await
        .map_err(|e| match e {
            NewsletterError::InvalidEmail => {
                ServiceError::ValidationError("invalid email address".to_string())
            }
            NewsletterError::AlreadySubscribed => {
                ServiceError::Conflict("email is already subscribed".to_string())
            }
            NewsletterError::Api(msg) => {
                ServiceError::ExternalServiceError(format!("newsletter: {msg}"))
            }
        })?;

    Ok(Json(json!({ "subscribed": true })))
}
