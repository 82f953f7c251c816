use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        category, country, product,
        product::CountrySet,
        product_image, product_review, Category, Country, Product, ProductImage, ProductReview,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    /// Empty or omitted means available in every country.
    #[serde(default)]
    pub country_availability: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub country_availability: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comment: Option<String>,
}

/// Priced cart for a destination country.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CartQuote {
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    #[schema(value_type = f64)]
    pub tax: Decimal,
    #[schema(value_type = f64)]
    pub shipping: Decimal,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub currency: String,
}

/// Product detail with its gallery and reviews.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub reviews: Vec<product_review::Model>,
}

/// Catalog reads and the admin-side product/category manager.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paged product listing, optionally restricted to a category and to
    /// products sellable into a given country.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        country: Option<&str>,
        category_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = Product::find().order_by_asc(product::Column::Name);
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        // Availability lives in a JSON column, so the country filter is
        // applied after the page read rather than pushed into SQL.
        match country {
            None => {
                let paginator = query.paginate(&*self.db, per_page.max(1));
                let total = paginator.num_items().await?;
                let products = paginator.fetch_page(page.saturating_sub(1)).await?;
                Ok((products, total))
            }
            Some(code) => {
                let all = query.all(&*self.db).await?;
                let available: Vec<product::Model> = all
                    .into_iter()
                    .filter(|p| p.country_availability.allows(code))
                    .collect();
                let total = available.len() as u64;
                let per_page = per_page.max(1) as usize;
                let start = (page.saturating_sub(1) as usize) * per_page;
                let products = available.into_iter().skip(start).take(per_page).collect();
                Ok((products, total))
            }
        }
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))
    }

    pub async fn get_product_detail(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = self.get_product(id).await?;
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(id))
            .order_by_asc(product_image::Column::Position)
            .all(&*self.db)
            .await?;
        let reviews = ProductReview::find()
            .filter(product_review::Column::ProductId.eq(id))
            .order_by_desc(product_review::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(ProductDetail {
            product,
            images,
            reviews,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            currency: Set(input.currency.to_uppercase()),
            stock: Set(input.stock),
            category_id: Set(input.category_id),
            image_url: Set(input.image_url),
            country_availability: Set(CountrySet(normalize_codes(input.country_availability))),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %model.id, "product created");
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let mut model = self.get_product(id).await?.into_active_model();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price must not be negative".to_string(),
                ));
            }
            model.price = Set(price);
        }
        if let Some(currency) = input.currency {
            model.currency = Set(currency.to_uppercase());
        }
        if let Some(stock) = input.stock {
            model.stock = Set(stock);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(Some(category_id));
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(Some(image_url));
        }
        if let Some(codes) = input.country_availability {
            model.country_availability = Set(CountrySet(normalize_codes(codes)));
        }
        model.updated_at = Set(Some(Utc::now()));

        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {id} not found")));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {id} not found")))
    }

    #[instrument(skip(self, input))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        let existing = Category::find()
            .filter(category::Column::Slug.eq(input.slug.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category slug '{}' already exists",
                input.slug
            )));
        }

        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        use sea_orm::sea_query::Expr;

        // Detach products first so they do not point at a dead category.
        Product::update_many()
            .col_expr(product::Column::CategoryId, Expr::value(None::<Uuid>))
            .filter(product::Column::CategoryId.eq(id))
            .exec(&*self.db)
            .await?;

        let result = Category::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Category {id} not found")));
        }
        Ok(())
    }

    pub async fn list_countries(&self) -> Result<Vec<country::Model>, ServiceError> {
        Ok(Country::find()
            .order_by_asc(country::Column::Code)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_country(&self, code: &str) -> Result<country::Model, ServiceError> {
        Country::find()
            .filter(country::Column::Code.eq(code.to_uppercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Country {code} not found")))
    }

    /// Price a cart for a destination country: subtotal plus the country's
    /// tax and flat shipping rate.
    ///
    /// Catalog prices are maintained per storefront country, so the line
    /// prices summed into `subtotal` are already denominated in that
    /// country's currency. The quote carries the country's currency label;
    /// no conversion happens here.
    pub async fn price_cart(
        &self,
        subtotal: Decimal,
        country_code: &str,
    ) -> Result<CartQuote, ServiceError> {
        let country = match self.get_country(country_code).await {
            Ok(country) => country,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::ValidationError(format!(
                    "shipping to '{country_code}' is not supported"
                )))
            }
            Err(e) => return Err(e),
        };

        let tax = (subtotal * country.tax_rate).round_dp(2);
        Ok(CartQuote {
            subtotal,
            tax,
            shipping: country.shipping_flat_rate,
            total: subtotal + tax + country.shipping_flat_rate,
            currency: country.currency,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn add_review(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<product_review::Model, ServiceError> {
        self.get_product(product_id).await?;

        Ok(product_review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(user_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }
}

fn normalize_codes(codes: Vec<String>) -> Vec<String> {
    let mut codes: Vec<String> = codes.into_iter().map(|c| c.to_uppercase()).collect();
    codes.sort();
    codes.dedup();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_country_codes() {
        let codes = normalize_codes(vec!["us".into(), "DE".into(), "US".into()]);
        assert_eq!(codes, vec!["DE".to_string(), "US".to_string()]);
    }

    #[test]
    fn empty_set_allows_everywhere() {
        let set = CountrySet(vec![]);
        assert!(set.allows("US"));
        assert!(set.allows("jp"));
    }

    #[test]
    fn restricted_set_filters() {
        let set = CountrySet(vec!["US".into(), "DE".into()]);
        assert!(set.allows("us"));
        assert!(!set.allows("FR"));
    }
}
