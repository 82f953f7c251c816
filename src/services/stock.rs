use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{product, Product},
    errors::{ServiceError, StockShortage},
};

/// One requested line of stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Result of validating a multi-item order against current stock.
#[derive(Debug, Clone, Serialize)]
pub struct StockValidation {
    pub insufficient: bool,
    pub shortages: Vec<StockShortage>,
}

/// The stock ledger: the per-product count of purchasable units.
///
/// Validation is an advisory batched read; the authoritative guard against
/// overselling is the conditional decrement, a single UPDATE whose
/// affected-row count signals success.
#[derive(Clone)]
pub struct StockService;

impl StockService {
    /// Batched read of the referenced products; reports every line whose
    /// requested quantity exceeds what is stored. A product id with no row
    /// reports `available = 0`.
    #[instrument(skip(self, conn, items))]
    pub async fn validate_order_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[StockRequest],
    ) -> Result<StockValidation, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order has no items".to_string(),
            ));
        }

        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .all(conn)
            .await?;

        let mut shortages = Vec::new();
        for item in items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            let available = products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| p.stock)
                .unwrap_or(0);
            if available < item.quantity {
                shortages.push(StockShortage {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available,
                });
            }
        }

        Ok(StockValidation {
            insufficient: !shortages.is_empty(),
            shortages,
        })
    }

    /// Atomic conditional decrement:
    /// `UPDATE products SET stock = stock - q WHERE id = ? AND stock >= q`.
    /// Zero affected rows means the stock was insufficient (or the product is
    /// gone); the row is never driven negative.
    #[instrument(skip(self, conn))]
    pub async fn subtract_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let result = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).sub(quantity),
            )
            .col_expr(
                product::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Stock.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let available = Product::find_by_id(product_id)
                .one(conn)
                .await?
                .map(|p| p.stock)
                .unwrap_or(0);
            return Err(ServiceError::InsufficientStock(vec![StockShortage {
                product_id,
                requested: quantity,
                available,
            }]));
        }

        Ok(())
    }

    /// Decrement every line of an order. Any insufficiency aborts, so the
    /// caller's transaction rolls back the lines already applied.
    pub async fn subtract_for_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[StockRequest],
    ) -> Result<(), ServiceError> {
        for item in items {
            self.subtract_stock(conn, item.product_id, item.quantity)
                .await?;
        }
        Ok(())
    }

    /// Inverse adjustment, used when reconciling a discrepancy on a paid
    /// order that was later voided by an operator.
    #[instrument(skip(self, conn))]
    pub async fn release_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let result = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(quantity),
            )
            .filter(product::Column::Id.eq(product_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {product_id} not found"
            )));
        }

        Ok(())
    }
}
