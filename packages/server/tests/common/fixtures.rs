//! Test fixtures for creating test data.
//!
//! Users, events and ticket types belong to outside collaborators, so they are
//! inserted with plain SQL. Tickets are bought through the purchase activity.

use std::str::FromStr;

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use ticketing_core::common::{EventId, TicketId, TicketTypeId, TransactionId, UserId};
use ticketing_core::domains::tickets::activities::{purchase_tickets, PurchaseRequest};
use ticketing_core::kernel::ServerDeps;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

/// Create a user with a unique email
pub async fn create_user(pool: &PgPool, name: &str) -> Result<UserId> {
    let id = UserId::new();
    sqlx::query("INSERT INTO users (id, email, name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{}-{}@example.com", name.to_lowercase(), id))
        .bind(name)
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn create_event(pool: &PgPool, title: &str) -> Result<EventId> {
    let id = EventId::new();
    sqlx::query("INSERT INTO events (id, title, starts_at) VALUES ($1, $2, NOW() + INTERVAL '7 days')")
        .bind(id)
        .bind(title)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Create a ticket type and refresh the event rollup
pub async fn create_ticket_type(
    pool: &PgPool,
    event_id: EventId,
    name: &str,
    price: &str,
    total: i32,
) -> Result<TicketTypeId> {
    let id = TicketTypeId::new();
    sqlx::query(
        "INSERT INTO ticket_types (id, event_id, name, price, total) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(event_id)
    .bind(name)
    .bind(dec(price))
    .bind(total)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        UPDATE events
        SET total_tickets = (SELECT COALESCE(SUM(total), 0) FROM ticket_types WHERE event_id = $1)
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Buy one ticket for `user_id`, returning the ticket id
pub async fn buy_one(
    deps: &ServerDeps,
    event_id: EventId,
    ticket_type_id: TicketTypeId,
    user_id: UserId,
) -> Result<TicketId> {
    let receipt = purchase_tickets(
        PurchaseRequest {
            event_id,
            ticket_type_id,
            user_id,
            quantity: 1,
            payment_method: None,
        },
        deps,
    )
    .await?;
    Ok(receipt.ticket_ids[0])
}

/// A sold-out event where each holder owns exactly one ticket
pub struct SoldOutEvent {
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub holders: Vec<UserId>,
    pub tickets: Vec<TicketId>,
}

pub async fn create_sold_out_event(
    deps: &ServerDeps,
    capacity: i32,
    price: &str,
) -> Result<SoldOutEvent> {
    let pool = &deps.db_pool;
    let event_id = create_event(pool, "Sold Out Show").await?;
    let ticket_type_id = create_ticket_type(pool, event_id, "General", price, capacity).await?;

    let mut holders = Vec::new();
    let mut tickets = Vec::new();
    for i in 0..capacity {
        let holder = create_user(pool, &format!("Holder{}", i)).await?;
        tickets.push(buy_one(deps, event_id, ticket_type_id, holder).await?);
        holders.push(holder);
    }

    Ok(SoldOutEvent {
        event_id,
        ticket_type_id,
        holders,
        tickets,
    })
}

/// Move an offer's deadline into the past
pub async fn backdate_offer(pool: &PgPool, transaction_id: TransactionId) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE waitlist_entries
        SET offered_at = NOW() - INTERVAL '31 minutes',
            reservation_expires_at = NOW() - INTERVAL '1 minute'
        WHERE offer_transaction_id = $1
        "#,
    )
    .bind(transaction_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn ticket_type_counters(pool: &PgPool, id: TicketTypeId) -> Result<(i32, i32)> {
    let row: (i32, i32) = sqlx::query_as("SELECT total, sold FROM ticket_types WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row)
}
