use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item, shipping_address,
        shipping_address::AddressType,
        Order, OrderItem, ShippingAddress,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Address DTO used for order snapshots and shipping rows.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct Address {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 1))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(equal = 2))]
    pub country_code: String,
    pub phone: Option<String>,
}

/// One cart line with its point-of-sale snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    #[validate(length(min = 1))]
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub amount: Decimal,
    pub currency: String,
    pub shipping_method: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}

/// Order persistence: transactional creation and terminal status
/// transitions.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates the order, its line items, and its address rows in one
    /// transaction. Partial failure leaves nothing behind.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.create_order_in(&txn, input).await?;
        txn.commit().await?;

        self.event_sender.send(Event::OrderCreated(order.id)).await;
        info!(order_id = %order.id, "order created");
        Ok(order)
    }

    /// Transaction-scoped variant for callers that fold the order insert
    /// into a larger unit of work (the COD path).
    pub async fn create_order_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: CreateOrderInput,
    ) -> Result<order::Model, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order has no items".to_string(),
            ));
        }

        let order_id = Uuid::new_v4();
        let snapshot = serde_json::to_string(&input.shipping_address)
            .map_err(|e| ServiceError::InternalError(format!("address snapshot: {e}")))?;

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(input.user_id),
            amount: Set(input.amount),
            currency: Set(input.currency.clone()),
            status: Set(OrderStatus::Pending.to_string()),
            shipping_method: Set(input.shipping_method.clone()),
            shipping_address: Set(Some(snapshot)),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let order = order.insert(conn).await?;

        for line in &input.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                name: Set(line.name.clone()),
                image_url: Set(line.image_url.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;
        }

        let billing = input.billing_address.as_ref();
        let shipping_type = if billing.is_none() {
            AddressType::Both
        } else {
            AddressType::Shipping
        };
        insert_address(
            conn,
            order_id,
            input.user_id,
            &input.shipping_address,
            shipping_type,
        )
        .await?;
        if let Some(billing) = billing {
            insert_address(conn, order_id, input.user_id, billing, AddressType::Billing)
                .await?;
        }

        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))
    }

    /// Fetch an order, enforcing that non-admin callers only see their own.
    pub async fn get_order_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<order::Model, ServiceError> {
        let order = self.get_order(id).await?;
        if !is_admin && order.user_id != user_id {
            // Hidden rather than forbidden: do not reveal that the order exists.
            return Err(ServiceError::NotFound(format!("Order {id} not found")));
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn get_shipping_addresses(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<shipping_address::Model>, ServiceError> {
        Ok(ShippingAddress::find()
            .filter(shipping_address::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }

    /// Idempotent terminal transition to `completed`.
    pub async fn mark_completed<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        set_status(conn, order_id, OrderStatus::Completed).await
    }

    /// Idempotent terminal transition to `cancelled`, applied regardless of
    /// the current status.
    pub async fn mark_cancelled<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        set_status(conn, order_id, OrderStatus::Cancelled).await
    }
}

async fn insert_address<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    user_id: Uuid,
    address: &Address,
    address_type: AddressType,
) -> Result<(), ServiceError> {
    shipping_address::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        user_id: Set(user_id),
        full_name: Set(address.full_name.clone()),
        line1: Set(address.line1.clone()),
        line2: Set(address.line2.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        postal_code: Set(address.postal_code.clone()),
        country_code: Set(address.country_code.clone()),
        phone: Set(address.phone.clone()),
        address_type: Set(address_type.to_string()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<(), ServiceError> {
    use sea_orm::sea_query::Expr;

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(status.to_string()))
        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order::Column::Id.eq(order_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!(
            "Order {order_id} not found"
        )));
    }
    Ok(())
}
