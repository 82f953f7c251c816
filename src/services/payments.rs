use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, SqlErr,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        payment::{self, PaymentMethod, PaymentStatus},
        Payment,
    },
    errors::ServiceError,
};

/// Outcome of recording a gateway completion.
#[derive(Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// First delivery: the completed payment row was inserted.
    Recorded,
    /// Duplicate delivery: a payment with this transaction id already exists.
    AlreadyRecorded,
}

/// Payment rows. Idempotence for webhook completions rests on the unique
/// index over `transaction_id`: the conflict on a duplicate insert is the
/// no-op signal, there is no separate existence pre-check.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a pending payment row. `transaction_id` stays empty; the
    /// completed row written at reconciliation time carries the session id.
    #[instrument(skip(self, conn))]
    pub async fn create_pending<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        currency: &str,
        method: PaymentMethod,
    ) -> Result<payment::Model, ServiceError> {
        let model = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            user_id: Set(user_id),
            amount: Set(amount),
            currency: Set(currency.to_string()),
            method: Set(method.to_string()),
            status: Set(PaymentStatus::Pending.to_string()),
            transaction_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(conn)
        .await?;

        info!(%order_id, method = %method, "pending payment recorded");
        Ok(model)
    }

    /// Inserts the completed payment for a gateway transaction. A unique
    /// violation on `transaction_id` means the event was already applied.
    #[instrument(skip(self, conn))]
    pub async fn record_completion<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        currency: &str,
        transaction_id: &str,
    ) -> Result<CompletionOutcome, ServiceError> {
        let insert = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            user_id: Set(user_id),
            amount: Set(amount),
            currency: Set(currency.to_string()),
            method: Set(PaymentMethod::Card.to_string()),
            status: Set(PaymentStatus::Completed.to_string()),
            transaction_id: Set(Some(transaction_id.to_string())),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(conn)
        .await;

        match insert {
            Ok(_) => Ok(CompletionOutcome::Recorded),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    info!(transaction_id, "duplicate completion ignored");
                    Ok(CompletionOutcome::AlreadyRecorded)
                }
                _ => Err(err.into()),
            },
        }
    }

    /// Flips every non-terminal payment of an order to `failed`.
    #[instrument(skip(self, conn))]
    pub async fn mark_failed_for_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        use sea_orm::sea_query::Expr;

        Payment::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Failed.to_string()),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::OrderId.eq(order_id))
            .filter(payment::Column::Status.ne(PaymentStatus::Completed.to_string()))
            .exec(conn)
            .await?;
        Ok(())
    }

    pub async fn list_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<payment::Model>, ServiceError> {
        Ok(Payment::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }
}
