use serde::Serialize;

use crate::common::{TicketingError, TicketingResult, TransactionId, UserId};
use crate::domains::tickets::models::Ticket;
use crate::domains::transactions::models::Transaction;
use crate::kernel::ServerDeps;

/// A transaction with the tickets issued under it
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub tickets: Vec<Ticket>,
}

pub async fn get_transaction(
    transaction_id: TransactionId,
    deps: &ServerDeps,
) -> TicketingResult<TransactionDetail> {
    let transaction = Transaction::find_by_id(transaction_id, &deps.db_pool)
        .await?
        .ok_or_else(|| TicketingError::not_found("Transaction", transaction_id))?;
    let tickets = Ticket::find_by_transaction(transaction_id, &deps.db_pool).await?;

    Ok(TransactionDetail {
        transaction,
        tickets,
    })
}

/// A user's purchases, offers and settlements, newest first.
pub async fn list_user_transactions(
    user_id: UserId,
    deps: &ServerDeps,
) -> TicketingResult<Vec<Transaction>> {
    Ok(Transaction::find_by_user(user_id, &deps.db_pool).await?)
}
