//! Direct ticket purchases.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::common::{
    EventId, TicketId, TicketTypeId, TicketingError, TicketingResult, TransactionId, UserId,
};
use crate::domains::catalog::models::{Event, TicketType};
use crate::domains::tickets::models::{NewTickets, TicketStatus};
use crate::domains::transactions::models::{
    NewTransaction, TransactionStatus, DEFAULT_PAYMENT_METHOD,
};
use crate::domains::users::User;
use crate::kernel::ServerDeps;

pub const MAX_TICKETS_PER_PURCHASE: i32 = 50;

#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub user_id: UserId,
    pub quantity: i32,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub transaction_id: TransactionId,
    pub total_price: Decimal,
    pub quantity: i32,
    pub payment_method: String,
    pub ticket_ids: Vec<TicketId>,
}

impl PurchaseRequest {
    fn validate(&self) -> TicketingResult<()> {
        if self.quantity < 1 {
            return Err(TicketingError::Validation(
                "Quantity must be at least 1".into(),
            ));
        }
        if self.quantity > MAX_TICKETS_PER_PURCHASE {
            return Err(TicketingError::Validation(format!(
                "Quantity must be at most {}",
                MAX_TICKETS_PER_PURCHASE
            )));
        }
        Ok(())
    }

    fn payment_method(&self) -> String {
        self.payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
            .to_string()
    }
}

/// Sell `quantity` tickets of one type, all or nothing.
///
/// The event row and then the ticket type row are locked before availability
/// is checked, so the counter can never pass `total` under concurrent buyers
/// and the event rollup always reflects every committed sale.
pub async fn purchase_tickets(
    request: PurchaseRequest,
    deps: &ServerDeps,
) -> TicketingResult<PurchaseReceipt> {
    request.validate()?;
    let payment_method = request.payment_method();

    let mut tx = deps.db_pool.begin().await?;

    Event::lock(request.event_id, &mut tx)
        .await?
        .ok_or_else(|| TicketingError::not_found("Event", request.event_id))?;

    if !User::exists(request.user_id, &mut *tx).await? {
        return Err(TicketingError::not_found("User", request.user_id));
    }

    let ticket_type = TicketType::lock(request.ticket_type_id, &mut tx)
        .await?
        .filter(|tt| tt.event_id == request.event_id)
        .ok_or_else(|| TicketingError::not_found("TicketType", request.ticket_type_id))?;

    let available = ticket_type.available();
    if available < request.quantity {
        return Err(TicketingError::InsufficientInventory {
            requested: request.quantity,
            available,
        });
    }

    let total_price = ticket_type.price * Decimal::from(request.quantity);

    let transaction = NewTransaction::builder()
        .user_id(request.user_id)
        .total_price(total_price)
        .status(TransactionStatus::Completed)
        .payment_method(payment_method.clone())
        .build()
        .insert(&mut tx)
        .await?;

    let tickets = NewTickets {
        event_id: request.event_id,
        ticket_type_id: ticket_type.id,
        transaction_id: transaction.id,
        user_id: request.user_id,
        status: TicketStatus::Active,
    }
    .insert(request.quantity, &mut tx)
    .await?;

    TicketType::record_sale(ticket_type.id, request.quantity, &mut tx)
        .await?
        .ok_or(TicketingError::InsufficientInventory {
            requested: request.quantity,
            available,
        })?;

    Event::recompute_totals(request.event_id, &mut tx).await?;

    tx.commit().await?;

    info!(
        transaction_id = %transaction.id,
        event_id = %request.event_id,
        ticket_type_id = %ticket_type.id,
        quantity = request.quantity,
        total_price = %total_price,
        "Tickets purchased"
    );

    Ok(PurchaseReceipt {
        transaction_id: transaction.id,
        total_price,
        quantity: request.quantity,
        payment_method,
        ticket_ids: tickets.into_iter().map(|t| t.id).collect(),
    })
}
