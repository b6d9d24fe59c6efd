//! Waitlist activities - queueing, offers and their expiry

pub mod assign_next;
pub mod expire;
pub mod join;
pub mod leave;
pub(crate) mod offers;
pub mod queries;
pub mod respond;

pub use assign_next::{assign_next, cascade_offers};
pub use expire::{expire_offer, expire_reservations, ExpiredOffer, SweepReport};
pub use join::{join_waitlist, JoinOutcome};
pub use leave::{leave_waitlist, LeftWaitlist};
pub use offers::Offer;
pub use queries::{list_waitlist, WaitlistFilter};
pub use respond::{accept_offer, decline_offer, AcceptedOffer, DeclinedOffer};
