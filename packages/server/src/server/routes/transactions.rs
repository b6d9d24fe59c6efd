use axum::{
    extract::{Extension, Path},
    Json,
};

use crate::common::{TicketingError, TransactionId, UserId};
use crate::domains::transactions::activities::{
    get_transaction, list_user_transactions, TransactionDetail,
};
use crate::domains::transactions::Transaction;
use crate::domains::waitlist::activities::{
    accept_offer, decline_offer, AcceptedOffer, DeclinedOffer,
};
use crate::kernel::ServerDeps;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;

/// Offers are only visible to their recipient.
async fn ensure_recipient(
    transaction_id: TransactionId,
    user_id: UserId,
    deps: &ServerDeps,
) -> Result<(), TicketingError> {
    match Transaction::find_by_id(transaction_id, &deps.db_pool).await? {
        Some(transaction) if transaction.user_id == user_id => Ok(()),
        _ => Err(TicketingError::not_found("Offer", transaction_id)),
    }
}

/// POST /transactions/:id/accept
pub async fn accept_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResult<Json<AcceptedOffer>> {
    ensure_recipient(transaction_id, caller.user_id, &state.deps).await?;
    Ok(Json(accept_offer(transaction_id, &state.deps).await?))
}

/// POST /transactions/:id/decline
pub async fn decline_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResult<Json<DeclinedOffer>> {
    ensure_recipient(transaction_id, caller.user_id, &state.deps).await?;
    Ok(Json(decline_offer(transaction_id, &state.deps).await?))
}

/// GET /transactions/:id
pub async fn get_transaction_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResult<Json<TransactionDetail>> {
    let detail = get_transaction(transaction_id, &state.deps).await?;
    if detail.transaction.user_id != caller.user_id {
        return Err(TicketingError::not_found("Transaction", transaction_id).into());
    }
    Ok(Json(detail))
}

/// GET /users/me/transactions
pub async fn my_transactions_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(
        list_user_transactions(caller.user_id, &state.deps).await?,
    ))
}
