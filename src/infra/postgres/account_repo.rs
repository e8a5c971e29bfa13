use {
    crate::domain::account::SubscriberStats,
    crate::domain::error::PipelineError,
    crate::domain::id::Email,
    crate::domain::money::MoneyAmount,
    crate::domain::purchase::Customer,
    sqlx::PgPool,
    uuid::Uuid,
};

pub struct UpsertedAccount {
    pub id: Uuid,
    pub created: bool,
}

/// Create the account as `active`, or reactivate it and refresh the profile.
/// A missing phone never clears a stored one.
pub async fn upsert_active(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &Email,
    customer: &Customer,
) -> Result<UpsertedAccount, PipelineError> {
    let (id, created) = sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        INSERT INTO accounts (id, email, name, phone, subscription_status)
        VALUES ($1, $2, $3, $4, 'active')
        ON CONFLICT (email) DO UPDATE
        SET name = COALESCE(EXCLUDED.name, accounts.name),
            phone = COALESCE(EXCLUDED.phone, accounts.phone),
            subscription_status = 'active',
            updated_at = now()
        RETURNING id, (xmax = 0) AS created
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(email.as_str())
    .bind(customer.name.as_deref())
    .bind(customer.phone.as_deref())
    .fetch_one(&mut **tx)
    .await?;

    Ok(UpsertedAccount { id, created })
}

/// Returns the cancelled account's id, or `None` if no account has this email.
pub async fn cancel_by_email(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &Email,
) -> Result<Option<Uuid>, PipelineError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE accounts
        SET subscription_status = 'cancelled', updated_at = now()
        WHERE email = $1
        RETURNING id
        "#,
    )
    .bind(email.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(id)
}

pub async fn find_id_by_email(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &Email,
) -> Result<Option<Uuid>, PipelineError> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&mut **tx)
        .await?;

    Ok(id)
}

pub async fn subscriber_stats(pool: &PgPool) -> Result<SubscriberStats, PipelineError> {
    let (total_accounts, active, cancelled, without_subscription) =
        sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE subscription_status = 'active'),
                   COUNT(*) FILTER (WHERE subscription_status = 'cancelled'),
                   COUNT(*) FILTER (WHERE subscription_status = 'none')
            FROM accounts
            "#,
        )
        .fetch_one(pool)
        .await?;

    let (paid_orders, refused_orders, refunded_orders, chargeback_orders, revenue_cents) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'paid'),
                   COUNT(*) FILTER (WHERE status = 'refused'),
                   COUNT(*) FILTER (WHERE status = 'refunded'),
                   COUNT(*) FILTER (WHERE status = 'chargeback'),
                   COALESCE(SUM(amount_cents) FILTER (WHERE status = 'paid'), 0)::BIGINT
            FROM transactions
            "#,
        )
        .fetch_one(pool)
        .await?;

    Ok(SubscriberStats {
        total_accounts,
        active,
        cancelled,
        without_subscription,
        paid_orders,
        refused_orders,
        refunded_orders,
        chargeback_orders,
        gross_revenue: MoneyAmount::new(revenue_cents)?,
    })
}
