//! Integration tests for accepting and declining waitlist offers.

mod common;

use crate::common::*;
use test_context::test_context;
use ticketing_core::common::{ErrorKind, TicketingError, TransactionId};
use ticketing_core::domains::catalog::Event;
use ticketing_core::domains::tickets::activities::return_ticket;
use ticketing_core::domains::tickets::{Ticket, TicketStatus};
use ticketing_core::domains::transactions::{Transaction, TransactionStatus};
use ticketing_core::domains::waitlist::activities::{
    accept_offer, decline_offer, join_waitlist, Offer,
};
use ticketing_core::domains::waitlist::{EntryState, WaitlistEntry};

/// Sold-out event of `capacity`, `waiting` users queued, first ticket returned.
async fn offer_setup(
    ctx: &TestHarness,
    price: &str,
    waiting: usize,
) -> (SoldOutEvent, Vec<ticketing_core::common::UserId>, Option<Offer>) {
    let show = create_sold_out_event(&ctx.deps, 1, price).await.unwrap();
    let mut queue = Vec::new();
    for i in 0..waiting {
        let user = create_user(&ctx.db_pool, &format!("Fan{}", i)).await.unwrap();
        join_waitlist(show.event_id, user, &ctx.deps).await.unwrap();
        queue.push(user);
    }
    let offer = return_ticket(show.tickets[0], &ctx.deps)
        .await
        .unwrap()
        .offer;
    (show, queue, offer)
}

#[test_context(TestHarness)]
#[tokio::test]
async fn accepting_settles_the_returned_ticket(ctx: &TestHarness) {
    let (show, queue, offer) = offer_setup(ctx, "100.00", 1).await;
    let offer = offer.unwrap();

    let accepted = accept_offer(offer.transaction_id, &ctx.deps).await.unwrap();

    assert_eq!(accepted.transaction.status, TransactionStatus::Completed);
    assert_eq!(accepted.ticket.status, TicketStatus::Active);
    assert_eq!(accepted.ticket.user_id, queue[0]);
    assert_eq!(accepted.returned_ticket.id, show.tickets[0]);
    assert_eq!(accepted.returned_ticket.status, TicketStatus::Refunded);

    assert_eq!(accepted.settlement.user_id, show.holders[0]);
    assert_eq!(accepted.settlement.total_price, dec("-98.00"));
    assert_eq!(accepted.settlement.status, TransactionStatus::Refunded);
    assert_eq!(accepted.settlement.payment_method, "refund");

    // Exactly one settlement for the original holder
    let settlements: Vec<_> = Transaction::find_by_user(show.holders[0], &ctx.db_pool)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.status == TransactionStatus::Refunded)
        .collect();
    assert_eq!(settlements.len(), 1);

    // Entry consumed, counters unchanged
    assert!(WaitlistEntry::list_by_user(queue[0], &ctx.db_pool)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        ticket_type_counters(&ctx.db_pool, show.ticket_type_id)
            .await
            .unwrap(),
        (1, 1)
    );
    let event = Event::find_by_id(show.event_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.tickets_sold, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn accepting_twice_finds_no_offer(ctx: &TestHarness) {
    let (_, _, offer) = offer_setup(ctx, "80.00", 1).await;
    let offer = offer.unwrap();

    accept_offer(offer.transaction_id, &ctx.deps).await.unwrap();

    let err = accept_offer(offer.transaction_id, &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = decline_offer(offer.transaction_id, &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_transactions_are_not_offers(ctx: &TestHarness) {
    let err = accept_offer(TransactionId::new(), &ctx.deps)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn declining_offers_the_seat_to_the_next_user(ctx: &TestHarness) {
    let (show, queue, offer) = offer_setup(ctx, "40.00", 2).await;
    let offer = offer.unwrap();
    assert_eq!(offer.user_id, queue[0]);

    let declined = decline_offer(offer.transaction_id, &ctx.deps).await.unwrap();

    assert_eq!(declined.transaction.status, TransactionStatus::Cancelled);
    assert!(Ticket::find_by_id(offer.reserved_ticket_id, &ctx.db_pool)
        .await
        .unwrap()
        .is_none());

    assert_eq!(declined.next_offers.len(), 1);
    let next = &declined.next_offers[0];
    assert_eq!(next.user_id, queue[1]);
    assert_eq!(next.returned_ticket_id, show.tickets[0]);

    // The decliner's entry is gone
    assert!(WaitlistEntry::list_by_user(queue[0], &ctx.db_pool)
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn declining_with_an_empty_queue_leaves_the_seat_returned(ctx: &TestHarness) {
    let (show, _, offer) = offer_setup(ctx, "40.00", 1).await;
    let offer = offer.unwrap();

    let declined = decline_offer(offer.transaction_id, &ctx.deps).await.unwrap();
    assert!(declined.next_offers.is_empty());

    let seat = Ticket::find_by_id(show.tickets[0], &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seat.status, TicketStatus::PendingReturn);
    assert_eq!(seat.offer_ticket_id, None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn accepting_after_the_deadline_is_gone_and_cascades(ctx: &TestHarness) {
    let (show, queue, offer) = offer_setup(ctx, "40.00", 2).await;
    let offer = offer.unwrap();
    backdate_offer(&ctx.db_pool, offer.transaction_id)
        .await
        .unwrap();

    let err = accept_offer(offer.transaction_id, &ctx.deps)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::OfferExpired(id) if id == offer.transaction_id));
    assert_eq!(err.kind(), ErrorKind::Expired);

    // The teardown was committed
    let expired = Transaction::find_by_id(offer.transaction_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(expired.status, TransactionStatus::Expired);
    assert!(Ticket::find_by_id(offer.reserved_ticket_id, &ctx.db_pool)
        .await
        .unwrap()
        .is_none());

    // ... and the seat moved on to the second user
    let next = WaitlistEntry::list_by_user(queue[1], &ctx.db_pool)
        .await
        .unwrap();
    assert!(matches!(next[0].entry.state(), EntryState::Offered { .. }));

    let seat = Ticket::find_by_id(show.tickets[0], &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seat.status, TicketStatus::PendingReturn);
    assert!(seat.offer_ticket_id.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn declining_after_the_deadline_is_still_a_decline(ctx: &TestHarness) {
    let (_, _, offer) = offer_setup(ctx, "40.00", 1).await;
    let offer = offer.unwrap();
    backdate_offer(&ctx.db_pool, offer.transaction_id)
        .await
        .unwrap();

    let declined = decline_offer(offer.transaction_id, &ctx.deps).await.unwrap();
    assert_eq!(declined.transaction.status, TransactionStatus::Cancelled);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn a_declined_seat_skips_its_own_holder_in_the_queue(ctx: &TestHarness) {
    let show = create_sold_out_event(&ctx.deps, 2, "55.00").await.unwrap();
    let holder = show.holders[0];

    let first_fan = create_user(&ctx.db_pool, "Quinn").await.unwrap();
    join_waitlist(show.event_id, first_fan, &ctx.deps).await.unwrap();

    let offer = return_ticket(show.tickets[0], &ctx.deps)
        .await
        .unwrap()
        .offer
        .unwrap();
    assert_eq!(offer.user_id, first_fan);

    // The holder queues ahead of another fan
    join_waitlist(show.event_id, holder, &ctx.deps).await.unwrap();
    let second_fan = create_user(&ctx.db_pool, "Yara").await.unwrap();
    join_waitlist(show.event_id, second_fan, &ctx.deps).await.unwrap();

    let declined = decline_offer(offer.transaction_id, &ctx.deps).await.unwrap();

    assert_eq!(declined.next_offers.len(), 1);
    assert_eq!(declined.next_offers[0].user_id, second_fan);
    assert_eq!(declined.next_offers[0].returned_ticket_id, show.tickets[0]);

    // The holder keeps their place for the next return
    let entries = WaitlistEntry::list_by_user(holder, &ctx.db_pool).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry.state(), EntryState::Waiting);
}
