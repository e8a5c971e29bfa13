pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod transport;

use {crate::domain::ledger::PurchaseLedger, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn PurchaseLedger>,
    pub webhook_token: Arc<str>,
    pub admin_token: Option<Arc<str>>,
}
