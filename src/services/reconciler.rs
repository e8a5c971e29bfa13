use {
    crate::domain::account::SubscriberStats,
    crate::domain::error::PipelineError,
    crate::domain::ledger::{LedgerFuture, PurchaseLedger},
    crate::domain::purchase::{
        self, AccountEffect, PurchaseEvent, ReconcileAction, ReconcileOutcome,
        RejectedEvent, RejectionReason, TransitionPolicy,
    },
    crate::infra::postgres::audit_repo::insert_audit_entry,
    crate::infra::postgres::{account_repo, review_repo, transaction_repo},
    sqlx::PgPool,
    uuid::Uuid,
};

pub const WEBHOOK_ACTOR: &str = "webhook:kiwify";

/// Apply one purchase event: advisory lock on the order id, read the stored
/// record, then insert/update the transaction and the account in a single
/// storage transaction. Nothing is written for a replay.
pub async fn process_purchase_event(
    pool: &PgPool,
    event: &PurchaseEvent,
    policy: TransitionPolicy,
    actor: &str,
) -> Result<ReconcileOutcome, PipelineError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Serialize all processing for this order id, including the first insert.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(event.order_id.as_str())
        .execute(&mut *tx)
        .await?;

    let existing = transaction_repo::find_by_order_id(&mut tx, &event.order_id).await?;
    let plan = purchase::plan(existing, event, policy);

    match plan.action {
        ReconcileAction::Anomaly { current } => {
            let rejected = RejectedEvent {
                reason: RejectionReason::InvalidTransition,
                order_id: Some(event.order_id.as_str().to_string()),
                detail: format!(
                    "{} -> {} is not a valid transition",
                    current.map(|s| s.as_str()).unwrap_or("none"),
                    event.status
                ),
                raw_body: event.raw_event.to_string(),
            };
            review_repo::insert_rejected(&mut *tx, &rejected).await?;
            tx.commit().await?;

            tracing::warn!(
                order_id = %event.order_id,
                from = current.map(|s| s.as_str()).unwrap_or("none"),
                to = %event.status,
                "invalid status transition, parked for review"
            );
            Ok(ReconcileOutcome::Anomaly {
                current,
                incoming: event.status,
            })
        }
        ReconcileAction::AlreadyApplied(record) => {
            tx.commit().await?;
            Ok(ReconcileOutcome::AlreadyApplied {
                transaction_id: record.id,
                account_id: record.account_id,
                status: record.status,
            })
        }
        ReconcileAction::Transition { record, from } => {
            let account_id = apply_account_effect(&mut tx, &plan.account, event, actor)
                .await?
                .or(record.account_id);

            transaction_repo::update_status(&mut tx, record.id, event, account_id).await?;

            let mut audit = event.audit_entry(actor, "transaction", record.id, "status_changed");
            audit.detail = serde_json::json!({
                "old_status": from.as_str(),
                "new_status": event.status.as_str(),
            });
            insert_audit_entry(&mut tx, &audit).await?;
            tx.commit().await?;

            Ok(ReconcileOutcome::Updated {
                transaction_id: record.id,
                account_id,
                status: event.status,
            })
        }
        ReconcileAction::Open => {
            let account_id = apply_account_effect(&mut tx, &plan.account, event, actor).await?;

            let id = Uuid::now_v7();
            transaction_repo::insert_transaction(&mut tx, id, event, account_id).await?;
            let audit = event.audit_entry(actor, "transaction", id, "created");
            insert_audit_entry(&mut tx, &audit).await?;
            tx.commit().await?;

            Ok(ReconcileOutcome::Created {
                transaction_id: id,
                account_id,
                status: event.status,
            })
        }
    }
}

/// Returns the id of the account the transaction should link to.
async fn apply_account_effect(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    effect: &AccountEffect,
    event: &PurchaseEvent,
    actor: &str,
) -> Result<Option<Uuid>, PipelineError> {
    match effect {
        AccountEffect::Untouched => Ok(None),
        AccountEffect::Link(email) => account_repo::find_id_by_email(tx, email).await,
        AccountEffect::Activate(email) => {
            let account = account_repo::upsert_active(tx, email, &event.customer).await?;
            let action = if account.created {
                "account_created"
            } else {
                "account_activated"
            };
            let audit = event.audit_entry(actor, "account", account.id, action);
            insert_audit_entry(tx, &audit).await?;
            Ok(Some(account.id))
        }
        AccountEffect::Cancel(email) => {
            let cancelled = account_repo::cancel_by_email(tx, email).await?;
            match cancelled {
                Some(id) => {
                    let audit = event.audit_entry(actor, "account", id, "account_cancelled");
                    insert_audit_entry(tx, &audit).await?;
                }
                None => tracing::warn!(
                    order_id = %event.order_id,
                    email = %email,
                    "no account to cancel"
                ),
            }
            Ok(cancelled)
        }
    }
}

/// Postgres-backed ledger used by the running service.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
    policy: TransitionPolicy,
}

impl PgLedger {
    pub fn new(pool: PgPool, policy: TransitionPolicy) -> Self {
        Self { pool, policy }
    }
}

impl PurchaseLedger for PgLedger {
    fn reconcile<'a>(&'a self, event: &'a PurchaseEvent) -> LedgerFuture<'a, ReconcileOutcome> {
        Box::pin(process_purchase_event(
            &self.pool,
            event,
            self.policy,
            WEBHOOK_ACTOR,
        ))
    }

    fn record_rejected<'a>(&'a self, rejected: &'a RejectedEvent) -> LedgerFuture<'a, ()> {
        Box::pin(async move {
            review_repo::insert_rejected(&self.pool, rejected).await?;
            Ok(())
        })
    }

    fn subscriber_stats(&self) -> LedgerFuture<'_, SubscriberStats> {
        Box::pin(account_repo::subscriber_stats(&self.pool))
    }
}
