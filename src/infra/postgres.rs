pub mod account_repo;
pub mod audit_repo;
pub mod review_repo;
pub mod transaction_repo;
