use {
    super::audit::NewAuditEntry,
    super::error::PipelineError,
    super::id::{Email, OrderId},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Paid,
    Refused,
    Refunded,
    Chargeback,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Refused => "refused",
            Self::Refunded => "refunded",
            Self::Chargeback => "chargeback",
        }
    }

    /// Statuses that may open a transaction record.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Paid | Self::Refused)
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Paid, Self::Refunded) | (Self::Paid, Self::Chargeback)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "paid" => Ok(Self::Paid),
            "refused" => Ok(Self::Refused),
            "refunded" => Ok(Self::Refunded),
            "chargeback" => Ok(Self::Chargeback),
            other => Err(PipelineError::malformed(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// How to treat transitions outside `(none) -> paid -> {refunded, chargeback}`
/// and `(none) -> refused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Leave state untouched and park the event in the review log.
    #[default]
    Strict,
    /// Apply whatever arrived last.
    LastWriteWins,
}

impl TransitionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::LastWriteWins => "last_write_wins",
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub email: Email,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Product {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Canonical purchase notification. Built only by the webhook normalizer;
/// everything downstream trusts its fields.
#[derive(Debug, Clone)]
pub struct PurchaseEvent {
    pub order_id: OrderId,
    pub order_ref: Option<String>,
    pub product: Product,
    pub customer: Customer,
    pub amount: Option<MoneyAmount>,
    pub status: OrderStatus,
    pub provider_created_at: Option<DateTime<Utc>>,
    pub provider_updated_at: Option<DateTime<Utc>>,
    pub raw_event: serde_json::Value,
}

impl PurchaseEvent {
    pub fn audit_entry(
        &self,
        actor: &str,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
    ) -> NewAuditEntry {
        NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id),
            order_id: Some(self.order_id.as_str().to_string()),
            action: action.to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({
                "order_status": self.status.as_str(),
                "amount": self.amount.map(|a| a.to_string()),
                "customer_email": self.customer.email.as_str(),
            }),
        }
    }
}

/// Stored transaction, as read back inside the reconciliation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub customer_email: Email,
    pub account_id: Option<Uuid>,
}

impl TransactionRecord {
    pub fn decide(self, incoming: OrderStatus, policy: TransitionPolicy) -> ReconcileAction {
        if self.status == incoming {
            return ReconcileAction::AlreadyApplied(self);
        }
        if self.status.can_transition_to(&incoming) || policy == TransitionPolicy::LastWriteWins {
            ReconcileAction::Transition {
                from: self.status,
                record: self,
            }
        } else {
            ReconcileAction::Anomaly {
                current: Some(self.status),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Stored status already equals the incoming one.
    AlreadyApplied(TransactionRecord),
    /// First observation of this order id.
    Open,
    /// Status change on an existing record.
    Transition {
        record: TransactionRecord,
        from: OrderStatus,
    },
    /// Transition outside the state machine under the strict policy.
    Anomaly { current: Option<OrderStatus> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEffect {
    Untouched,
    /// Link the transaction to an existing account without mutating it.
    Link(Email),
    /// Upsert the account with status `active`.
    Activate(Email),
    /// Flip an existing account to `cancelled`. Never creates one.
    Cancel(Email),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub action: ReconcileAction,
    pub account: AccountEffect,
}

/// Decide what applying `event` on top of `existing` means. Pure; the
/// storage layer executes the plan atomically.
pub fn plan(
    existing: Option<TransactionRecord>,
    event: &PurchaseEvent,
    policy: TransitionPolicy,
) -> ReconcilePlan {
    // Refunds and chargebacks follow the email stored with the order, not
    // whatever the provider sends now.
    let email = existing
        .as_ref()
        .map(|r| r.customer_email.clone())
        .unwrap_or_else(|| event.customer.email.clone());

    let action = match existing {
        Some(record) => record.decide(event.status, policy),
        None if event.status.is_initial() || policy == TransitionPolicy::LastWriteWins => {
            ReconcileAction::Open
        }
        None => ReconcileAction::Anomaly { current: None },
    };

    let account = match (&action, event.status) {
        (ReconcileAction::AlreadyApplied(_) | ReconcileAction::Anomaly { .. }, _) => {
            AccountEffect::Untouched
        }
        (_, OrderStatus::Paid) => AccountEffect::Activate(email),
        (_, OrderStatus::Refunded | OrderStatus::Chargeback) => AccountEffect::Cancel(email),
        (ReconcileAction::Open, OrderStatus::Refused) => AccountEffect::Link(email),
        (ReconcileAction::Transition { .. }, OrderStatus::Refused) => AccountEffect::Untouched,
    };

    ReconcilePlan { action, account }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// New transaction row inserted.
    Created {
        transaction_id: Uuid,
        account_id: Option<Uuid>,
        status: OrderStatus,
    },
    /// Existing transaction moved to a new status.
    Updated {
        transaction_id: Uuid,
        account_id: Option<Uuid>,
        status: OrderStatus,
    },
    /// Replay of an event that is already reflected in storage.
    AlreadyApplied {
        transaction_id: Uuid,
        account_id: Option<Uuid>,
        status: OrderStatus,
    },
    /// Not applied; parked in the review log.
    Anomaly {
        current: Option<OrderStatus>,
        incoming: OrderStatus,
    },
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::AlreadyApplied { .. } => "already_applied",
            Self::Anomaly { .. } => "anomaly",
        }
    }

    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Self::Created { account_id, .. }
            | Self::Updated { account_id, .. }
            | Self::AlreadyApplied { account_id, .. } => *account_id,
            Self::Anomaly { .. } => None,
        }
    }

    /// Status the transaction record holds after this event.
    pub fn final_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Created { status, .. }
            | Self::Updated { status, .. }
            | Self::AlreadyApplied { status, .. } => Some(*status),
            Self::Anomaly { current, .. } => *current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Malformed,
    InvalidTransition,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidTransition => "invalid_transition",
        }
    }
}

/// Row for the append-only review log.
#[derive(Debug, Clone)]
pub struct RejectedEvent {
    pub reason: RejectionReason,
    pub order_id: Option<String>,
    pub detail: String,
    pub raw_body: String,
}
