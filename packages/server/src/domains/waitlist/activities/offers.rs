//! Extending and withdrawing reserved-ticket offers.
//!
//! Every path that mutates an outstanding offer locks its rows in the same
//! order: waitlist entry, offer transaction, reserved ticket, returned seat.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::debug;

use crate::common::{
    EventId, TicketId, TicketTypeId, TicketingError, TicketingResult, TransactionId, UserId,
    WaitlistEntryId,
};
use crate::domains::catalog::models::TicketType;
use crate::domains::tickets::models::{NewTickets, Ticket, TicketStatus};
use crate::domains::transactions::models::{
    NewTransaction, Transaction, TransactionStatus, WAITLIST_PAYMENT_METHOD,
};
use crate::domains::waitlist::models::WaitlistEntry;
use crate::kernel::WaitlistPolicy;

/// A reserved ticket held for a waitlisted user until `reservation_expires_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub entry_id: WaitlistEntryId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub transaction_id: TransactionId,
    pub reserved_ticket_id: TicketId,
    pub returned_ticket_id: TicketId,
    pub price: Decimal,
    pub reservation_expires_at: DateTime<Utc>,
}

/// Who receives a freshly extended offer.
pub(crate) enum Recipient {
    /// A waiting entry claimed from the queue.
    Queued(WaitlistEntry),
    /// A user joining while a returned seat sits unassigned.
    Joining(UserId),
}

/// Offer `seat` (a locked, unassigned `pending_return` ticket) to `recipient`.
///
/// Creates the pending transaction and the reserved ticket, pins the seat to
/// that ticket and stamps the entry. Sold counters are left alone.
pub(crate) async fn extend_offer(
    seat: &Ticket,
    recipient: Recipient,
    policy: &WaitlistPolicy,
    conn: &mut PgConnection,
) -> TicketingResult<(WaitlistEntry, Offer)> {
    let ticket_type = TicketType::find_by_id(seat.ticket_type_id, &mut *conn)
        .await?
        .ok_or_else(|| TicketingError::not_found("TicketType", seat.ticket_type_id))?;

    let user_id = match &recipient {
        Recipient::Queued(entry) => entry.user_id,
        Recipient::Joining(user_id) => *user_id,
    };

    let offered_at = Utc::now();
    let expires_at = offered_at + policy.offer_window;

    let transaction = NewTransaction::builder()
        .user_id(user_id)
        .total_price(ticket_type.price)
        .status(TransactionStatus::Pending)
        .payment_method(WAITLIST_PAYMENT_METHOD)
        .build()
        .insert(&mut *conn)
        .await?;

    let reserved = NewTickets {
        event_id: seat.event_id,
        ticket_type_id: seat.ticket_type_id,
        transaction_id: transaction.id,
        user_id,
        status: TicketStatus::Reserved,
    }
    .insert(1, &mut *conn)
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| TicketingError::not_found("Ticket", transaction.id))?;

    Ticket::link_offer(seat.id, reserved.id, &mut *conn).await?;

    let entry = match recipient {
        Recipient::Queued(entry) => {
            WaitlistEntry::mark_offered(entry.id, transaction.id, offered_at, expires_at, conn)
                .await?
        }
        Recipient::Joining(user_id) => WaitlistEntry::insert_offered(
            user_id,
            seat.event_id,
            transaction.id,
            offered_at,
            expires_at,
            conn,
        )
        .await
        .map_err(|e| {
            TicketingError::conflict_on_unique(e, "User is already on the waitlist for this event")
        })?,
    };

    debug!(
        user_id = %user_id,
        transaction_id = %transaction.id,
        returned_ticket_id = %seat.id,
        "Extended waitlist offer"
    );

    let offer = Offer {
        entry_id: entry.id,
        user_id,
        event_id: seat.event_id,
        ticket_type_id: seat.ticket_type_id,
        transaction_id: transaction.id,
        reserved_ticket_id: reserved.id,
        returned_ticket_id: seat.id,
        price: ticket_type.price,
        reservation_expires_at: expires_at,
    };

    Ok((entry, offer))
}

/// The locked rows behind one outstanding offer.
pub(crate) struct LockedOffer {
    pub entry: WaitlistEntry,
    pub transaction: Transaction,
    pub reserved: Ticket,
    /// The returned seat the offer replaces.
    pub seat: Option<Ticket>,
}

impl LockedOffer {
    /// Lock an offer by its pending transaction.
    pub async fn lock_by_transaction(
        transaction_id: TransactionId,
        conn: &mut PgConnection,
    ) -> TicketingResult<Self> {
        let entry = WaitlistEntry::lock_by_offer_transaction(transaction_id, &mut *conn)
            .await?
            .ok_or_else(|| TicketingError::not_found("Offer", transaction_id))?;

        Self::lock_for_entry(entry, conn).await
    }

    /// Lock the rest of an offer whose entry the caller already holds.
    pub async fn lock_for_entry(
        entry: WaitlistEntry,
        conn: &mut PgConnection,
    ) -> TicketingResult<Self> {
        let transaction_id = entry
            .offer_transaction_id
            .ok_or_else(|| TicketingError::not_found("Offer", entry.id))?;

        let transaction = Transaction::lock(transaction_id, &mut *conn)
            .await?
            .filter(|t| t.status == TransactionStatus::Pending && t.is_waitlist_offer())
            .ok_or_else(|| TicketingError::not_found("Offer", transaction_id))?;

        let reserved = Ticket::lock_reserved_for_transaction(transaction_id, &mut *conn)
            .await?
            .ok_or_else(|| TicketingError::not_found("Offer", transaction_id))?;

        let seat = Ticket::lock_offered_seat(reserved.id, conn).await?;

        Ok(Self {
            entry,
            transaction,
            reserved,
            seat,
        })
    }

    pub fn event_id(&self) -> EventId {
        self.entry.event_id
    }

    pub fn ticket_type_id(&self) -> TicketTypeId {
        self.reserved.ticket_type_id
    }

    /// Close the offer without a sale: finalize the transaction as `outcome`,
    /// free the seat, delete the reserved ticket and the entry.
    pub async fn withdraw(
        self,
        outcome: TransactionStatus,
        conn: &mut PgConnection,
    ) -> TicketingResult<Transaction> {
        if !self.reserved.status.can_be_withdrawn() {
            return Err(TicketingError::invalid_transition(
                "ticket",
                self.reserved.status,
                "withdrawn",
            ));
        }

        let transaction = Transaction::transition(
            self.transaction.id,
            TransactionStatus::Pending,
            outcome,
            &mut *conn,
        )
        .await?;

        if let Some(seat) = &self.seat {
            Ticket::clear_offer(seat.id, &mut *conn).await?;
        }
        Ticket::withdraw(self.reserved.id, &mut *conn).await?;
        WaitlistEntry::delete(self.entry.id, conn).await?;

        Ok(transaction)
    }
}
