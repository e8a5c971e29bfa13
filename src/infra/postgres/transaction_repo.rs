use {
    crate::domain::error::PipelineError,
    crate::domain::id::{Email, OrderId},
    crate::domain::purchase::{OrderStatus, PurchaseEvent, TransactionRecord},
    uuid::Uuid,
};

pub async fn find_by_order_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: &OrderId,
) -> Result<Option<TransactionRecord>, PipelineError> {
    let row = sqlx::query_as::<_, (Uuid, String, String, Option<Uuid>)>(
        "SELECT id, status, customer_email, account_id FROM transactions WHERE order_id = $1",
    )
    .bind(order_id.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|(id, status, customer_email, account_id)| {
        Ok(TransactionRecord {
            id,
            order_id: order_id.clone(),
            status: OrderStatus::try_from(status.as_str())?,
            customer_email: Email::new(customer_email)?,
            account_id,
        })
    })
    .transpose()
}

pub async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    event: &PurchaseEvent,
    account_id: Option<Uuid>,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, order_id, order_ref, product_id, product_name, amount_cents,
             status, customer_email, account_id, provider_created_at,
             provider_updated_at, raw_event)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(id)
    .bind(event.order_id.as_str())
    .bind(event.order_ref.as_deref())
    .bind(event.product.id.as_deref())
    .bind(event.product.name.as_deref())
    .bind(event.amount.map(|a| a.cents()))
    .bind(event.status.as_str())
    .bind(event.customer.email.as_str())
    .bind(account_id)
    .bind(event.provider_created_at)
    .bind(event.provider_updated_at)
    .bind(&event.raw_event)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Move an existing record to the event's status. Amount and product data
/// only fill gaps; the first observation is authoritative for them.
pub async fn update_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    event: &PurchaseEvent,
    account_id: Option<Uuid>,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET status = $1,
            account_id = COALESCE(account_id, $2),
            amount_cents = COALESCE(amount_cents, $3),
            order_ref = COALESCE(order_ref, $4),
            product_id = COALESCE(product_id, $5),
            product_name = COALESCE(product_name, $6),
            provider_updated_at = COALESCE($7, provider_updated_at),
            raw_event = $8,
            updated_at = now()
        WHERE id = $9
        "#,
    )
    .bind(event.status.as_str())
    .bind(account_id)
    .bind(event.amount.map(|a| a.cents()))
    .bind(event.order_ref.as_deref())
    .bind(event.product.id.as_deref())
    .bind(event.product.name.as_deref())
    .bind(event.provider_updated_at)
    .bind(&event.raw_event)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
