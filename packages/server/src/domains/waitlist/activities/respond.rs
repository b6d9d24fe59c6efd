//! Accepting or declining a reserved-ticket offer.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::assign_next::cascade_offers;
use super::offers::{LockedOffer, Offer};
use crate::common::{TicketingError, TicketingResult, TransactionId};
use crate::domains::catalog::models::TicketType;
use crate::domains::tickets::models::{Ticket, TicketStatus};
use crate::domains::transactions::models::{
    settlement_amount, NewTransaction, Transaction, TransactionStatus, SETTLEMENT_PAYMENT_METHOD,
};
use crate::domains::waitlist::models::WaitlistEntry;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedOffer {
    pub transaction: Transaction,
    pub ticket: Ticket,
    pub returned_ticket: Ticket,
    pub settlement: Transaction,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclinedOffer {
    pub transaction: Transaction,
    pub next_offers: Vec<Offer>,
}

/// Confirm an offer: the reserved ticket becomes active, the returned seat is
/// refunded and its holder receives a settlement net of the platform fee.
///
/// An offer past its deadline is torn down (and the seat re-offered) before
/// `OfferExpired` is returned; that teardown is committed.
pub async fn accept_offer(
    transaction_id: TransactionId,
    deps: &ServerDeps,
) -> TicketingResult<AcceptedOffer> {
    let mut tx = deps.db_pool.begin().await?;

    let offer = LockedOffer::lock_by_transaction(transaction_id, &mut tx).await?;

    if offer.entry.is_expired_at(Utc::now()) {
        let event_id = offer.event_id();
        let ticket_type_id = offer.ticket_type_id();
        offer.withdraw(TransactionStatus::Expired, &mut tx).await?;
        let next_offers =
            cascade_offers(event_id, Some(ticket_type_id), &deps.policy, &mut tx).await?;
        tx.commit().await?;

        warn!(
            transaction_id = %transaction_id,
            reoffered = next_offers.len(),
            "Offer accepted after its deadline"
        );
        return Err(TicketingError::OfferExpired(transaction_id));
    }

    let seat = offer
        .seat
        .ok_or_else(|| TicketingError::not_found("Returned ticket", offer.reserved.id))?;

    let transaction = Transaction::transition(
        offer.transaction.id,
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        &mut tx,
    )
    .await?;

    let ticket = Ticket::transition(
        offer.reserved.id,
        TicketStatus::Reserved,
        TicketStatus::Active,
        &mut tx,
    )
    .await?;

    let returned_ticket = Ticket::transition(
        seat.id,
        TicketStatus::PendingReturn,
        TicketStatus::Refunded,
        &mut tx,
    )
    .await?;

    let ticket_type = TicketType::find_by_id(seat.ticket_type_id, &mut *tx)
        .await?
        .ok_or_else(|| TicketingError::not_found("TicketType", seat.ticket_type_id))?;

    let settlement = NewTransaction::builder()
        .user_id(seat.user_id)
        .total_price(settlement_amount(ticket_type.price, deps.policy.fee_rate))
        .status(TransactionStatus::Refunded)
        .payment_method(SETTLEMENT_PAYMENT_METHOD)
        .build()
        .insert(&mut tx)
        .await?;

    WaitlistEntry::delete(offer.entry.id, &mut tx).await?;

    tx.commit().await?;

    info!(
        transaction_id = %transaction.id,
        ticket_id = %ticket.id,
        returned_ticket_id = %returned_ticket.id,
        settlement = %settlement.total_price,
        "Waitlist offer accepted"
    );

    Ok(AcceptedOffer {
        transaction,
        ticket,
        returned_ticket,
        settlement,
    })
}

/// Decline an offer and pass the seat to the next person in line.
///
/// A decline arriving after the deadline is still recorded as a decline.
pub async fn decline_offer(
    transaction_id: TransactionId,
    deps: &ServerDeps,
) -> TicketingResult<DeclinedOffer> {
    let mut tx = deps.db_pool.begin().await?;

    let offer = LockedOffer::lock_by_transaction(transaction_id, &mut tx).await?;
    let event_id = offer.event_id();
    let ticket_type_id = offer.ticket_type_id();

    let transaction = offer.withdraw(TransactionStatus::Cancelled, &mut tx).await?;
    let next_offers =
        cascade_offers(event_id, Some(ticket_type_id), &deps.policy, &mut tx).await?;

    tx.commit().await?;

    info!(
        transaction_id = %transaction_id,
        reoffered = next_offers.len(),
        "Waitlist offer declined"
    );

    Ok(DeclinedOffer {
        transaction,
        next_offers,
    })
}
