pub mod transaction;

pub use transaction::{
    settlement_amount, NewTransaction, Transaction, TransactionStatus, DEFAULT_PAYMENT_METHOD,
    SETTLEMENT_PAYMENT_METHOD, WAITLIST_PAYMENT_METHOD,
};
