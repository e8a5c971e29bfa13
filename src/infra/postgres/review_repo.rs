use {
    crate::domain::error::PipelineError, crate::domain::purchase::RejectedEvent, uuid::Uuid,
};

/// Append to the review log. Runs on whatever executor the caller holds so
/// anomalies can share the reconciliation transaction.
pub async fn insert_rejected<'e, E>(executor: E, rejected: &RejectedEvent) -> Result<Uuid, PipelineError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO rejected_events (id, reason, order_id, detail, raw_body)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(rejected.reason.as_str())
    .bind(rejected.order_id.as_deref())
    .bind(&rejected.detail)
    .bind(&rejected.raw_body)
    .execute(executor)
    .await?;

    Ok(id)
}
