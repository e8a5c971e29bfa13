use {
    super::account::SubscriberStats,
    super::error::PipelineError,
    super::purchase::{PurchaseEvent, ReconcileOutcome, RejectedEvent},
    std::{future::Future, pin::Pin},
};

pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// Write path for accounts and transactions, plus the review log and the
/// admin read model. The webhook handler only talks to storage through this.
pub trait PurchaseLedger: Send + Sync {
    /// Apply one canonical event atomically. Safe to call again with the
    /// same event.
    fn reconcile<'a>(&'a self, event: &'a PurchaseEvent) -> LedgerFuture<'a, ReconcileOutcome>;

    /// Append to the review log.
    fn record_rejected<'a>(&'a self, rejected: &'a RejectedEvent) -> LedgerFuture<'a, ()>;

    fn subscriber_stats(&self) -> LedgerFuture<'_, SubscriberStats>;
}
