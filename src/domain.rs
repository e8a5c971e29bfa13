pub mod account;
pub mod audit;
pub mod error;
pub mod id;
pub mod ledger;
pub mod money;
pub mod purchase;
