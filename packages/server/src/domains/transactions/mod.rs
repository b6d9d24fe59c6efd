pub mod activities;
pub mod models;

pub use models::{Transaction, TransactionStatus};
