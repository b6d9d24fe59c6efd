//! Integration tests for direct purchases and inventory counters.

mod common;

use crate::common::*;
use futures::future::join_all;
use test_context::test_context;
use ticketing_core::common::{ErrorKind, TicketTypeId, TicketingError};
use ticketing_core::domains::catalog::activities::{get_availability, recount_inventory};
use ticketing_core::domains::catalog::Event;
use ticketing_core::domains::tickets::activities::{purchase_tickets, PurchaseRequest};
use ticketing_core::domains::tickets::{Ticket, TicketStatus};
use ticketing_core::domains::transactions::{Transaction, TransactionStatus};

#[test_context(TestHarness)]
#[tokio::test]
async fn purchase_creates_transaction_tickets_and_counts(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Jazz Night").await.unwrap();
    let vip = create_ticket_type(&ctx.db_pool, event_id, "VIP", "50.00", 10)
        .await
        .unwrap();
    let buyer = create_user(&ctx.db_pool, "Ana").await.unwrap();

    let receipt = purchase_tickets(
        PurchaseRequest {
            event_id,
            ticket_type_id: vip,
            user_id: buyer,
            quantity: 3,
            payment_method: Some("paypal".into()),
        },
        &ctx.deps,
    )
    .await
    .unwrap();

    assert_eq!(receipt.total_price, dec("150.00"));
    assert_eq!(receipt.quantity, 3);
    assert_eq!(receipt.payment_method, "paypal");
    assert_eq!(receipt.ticket_ids.len(), 3);

    let transaction = Transaction::find_by_id(receipt.transaction_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Completed);
    assert_eq!(transaction.user_id, buyer);

    let tickets = Ticket::find_by_transaction(receipt.transaction_id, &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().all(|t| t.status == TicketStatus::Active));

    assert_eq!(
        ticket_type_counters(&ctx.db_pool, vip).await.unwrap(),
        (10, 3)
    );

    let event = Event::find_by_id(event_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((event.total_tickets, event.tickets_sold), (10, 3));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn purchase_rejects_more_than_available(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Small Room").await.unwrap();
    let general = create_ticket_type(&ctx.db_pool, event_id, "General", "20.00", 2)
        .await
        .unwrap();
    let buyer = create_user(&ctx.db_pool, "Bor").await.unwrap();

    let err = purchase_tickets(
        PurchaseRequest {
            event_id,
            ticket_type_id: general,
            user_id: buyer,
            quantity: 3,
            payment_method: None,
        },
        &ctx.deps,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TicketingError::InsufficientInventory {
            requested: 3,
            available: 2
        }
    ));

    // Nothing persisted
    assert_eq!(
        ticket_type_counters(&ctx.db_pool, general).await.unwrap(),
        (2, 0)
    );
    assert!(Transaction::find_by_user(buyer, &ctx.db_pool)
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn purchase_validates_references_and_quantity(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Validation").await.unwrap();
    let other_event = create_event(&ctx.db_pool, "Other").await.unwrap();
    let general = create_ticket_type(&ctx.db_pool, event_id, "General", "20.00", 5)
        .await
        .unwrap();
    let buyer = create_user(&ctx.db_pool, "Cene").await.unwrap();

    let request = |quantity, ticket_type_id, event_id| PurchaseRequest {
        event_id,
        ticket_type_id,
        user_id: buyer,
        quantity,
        payment_method: None,
    };

    let err = purchase_tickets(request(0, general, event_id), &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = purchase_tickets(request(1, TicketTypeId::new(), event_id), &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Ticket type of a different event
    let err = purchase_tickets(request(1, general, other_event), &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_buyers_cannot_oversell_the_last_unit(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Last Seat").await.unwrap();
    let general = create_ticket_type(&ctx.db_pool, event_id, "General", "30.00", 1)
        .await
        .unwrap();

    let mut buyers = Vec::new();
    for i in 0..8 {
        buyers.push(
            create_user(&ctx.db_pool, &format!("Racer{}", i))
                .await
                .unwrap(),
        );
    }

    let attempts = buyers.iter().map(|&user_id| {
        purchase_tickets(
            PurchaseRequest {
                event_id,
                ticket_type_id: general,
                user_id,
                quantity: 1,
                payment_method: None,
            },
            &ctx.deps,
        )
    });
    let results = join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|r| matches!(r, Err(TicketingError::InsufficientInventory { .. })))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(sold_out, 7);
    assert_eq!(
        ticket_type_counters(&ctx.db_pool, general).await.unwrap(),
        (1, 1)
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn availability_and_recount_reflect_ticket_rows(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Recount").await.unwrap();
    let general = create_ticket_type(&ctx.db_pool, event_id, "General", "10.00", 4)
        .await
        .unwrap();
    let buyer = create_user(&ctx.db_pool, "Dora").await.unwrap();
    buy_one(&ctx.deps, event_id, general, buyer).await.unwrap();
    buy_one(&ctx.deps, event_id, general, buyer).await.unwrap();

    let availability = get_availability(event_id, &ctx.deps).await.unwrap();
    assert!(!availability.sold_out);
    assert_eq!(availability.ticket_types.len(), 1);
    assert_eq!(availability.ticket_types[0].available, 2);

    // Drift the counter, then repair it
    sqlx::query("UPDATE ticket_types SET sold = 4 WHERE id = $1")
        .bind(general)
        .execute(&ctx.db_pool)
        .await
        .unwrap();

    let repaired = recount_inventory(event_id, &ctx.deps).await.unwrap();
    assert_eq!(repaired.ticket_types[0].ticket_type.sold, 2);
    assert_eq!(repaired.event.tickets_sold, 2);
    assert_eq!(repaired.event.total_tickets, 4);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_sales_of_different_types_keep_the_event_rollup(ctx: &TestHarness) {
    let event_id = create_event(&ctx.db_pool, "Two Tiers").await.unwrap();
    let vip = create_ticket_type(&ctx.db_pool, event_id, "VIP", "90.00", 6)
        .await
        .unwrap();
    let general = create_ticket_type(&ctx.db_pool, event_id, "General", "30.00", 6)
        .await
        .unwrap();

    let mut orders = Vec::new();
    for i in 0..12 {
        let user_id = create_user(&ctx.db_pool, &format!("Tier{}", i))
            .await
            .unwrap();
        let ticket_type_id = if i % 2 == 0 { vip } else { general };
        orders.push((user_id, ticket_type_id));
    }

    let attempts = orders.iter().map(|&(user_id, ticket_type_id)| {
        purchase_tickets(
            PurchaseRequest {
                event_id,
                ticket_type_id,
                user_id,
                quantity: 1,
                payment_method: None,
            },
            &ctx.deps,
        )
    });
    let results = join_all(attempts).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let summed: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(sold), 0)::BIGINT FROM ticket_types WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&ctx.db_pool)
            .await
            .unwrap();
    let event = Event::find_by_id(event_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summed, 12);
    assert_eq!(event.tickets_sold as i64, summed);
    assert_eq!(event.total_tickets, 12);
    assert!(event.is_sold_out());
}
