use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, RequireAdmin},
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::catalog::{
        CreateCategoryInput, CreateProductInput, CreateReviewInput, UpdateProductInput,
    },
    AppState,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StockAdjustmentRequest {
    /// Positive releases units back into stock, negative removes them.
    pub adjustment: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// ISO country code; restricts the list to products sellable there
    pub country: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Paged product list")
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let defaults = PaginationParams::default();
    let page = query.page.unwrap_or(defaults.page);
    let per_page = query.per_page.unwrap_or(defaults.per_page);
    let (products, total) = state
        .services
        .catalog
        .list_products(query.country.as_deref(), query.category_id, page, per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(products, page, per_page, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with images and reviews"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.catalog.get_product_detail(id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&input)?;
    let product = state.services.catalog.create_product(input).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&input)?;
    let product = state.services.catalog.update_product(id, input).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}

/// Operator reconciliation of the stock ledger, e.g. returning units from a
/// voided paid order or writing off damaged goods.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Adjusted product"),
        (status = 400, description = "Zero adjustment or more units removed than on hand", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(input): Json<StockAdjustmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if input.adjustment == 0 {
        return Err(ServiceError::ValidationError(
            "adjustment must not be zero".to_string(),
        ));
    }
    if input.adjustment > 0 {
        state
            .services
            .stock
            .release_stock(&*state.db, id, input.adjustment)
            .await?;
    } else {
        state
            .services
            .stock
            .subtract_stock(&*state.db, id, -input.adjustment)
            .await?;
    }

    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateReviewInput,
    responses(
        (status = 201, description = "Review recorded"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateReviewInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&input)?;
    let review = state
        .services
        .catalog
        .add_review(id, user.user_id, input)
        .await?;
    Ok(created_response(review))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "All categories")),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created"),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&input)?;
    let category = state.services.catalog.create_category(input).await?;
    Ok(created_response(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/countries",
    responses((status = 200, description = "Supported countries with pricing parameters")),
    tag = "Catalog"
)]
pub async fn list_countries(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let countries = state.services.catalog.list_countries().await?;
    Ok(Json(countries))
}
