pub mod queries;

pub use queries::{get_transaction, list_user_transactions, TransactionDetail};
