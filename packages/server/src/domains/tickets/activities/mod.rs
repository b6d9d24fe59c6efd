//! Ticket activities - purchases, returns and lookups

pub mod purchase;
pub mod queries;
pub mod refund;

pub use purchase::{purchase_tickets, PurchaseReceipt, PurchaseRequest, MAX_TICKETS_PER_PURCHASE};
pub use queries::{get_ticket, list_event_tickets, list_user_tickets};
pub use refund::{return_ticket, RefundOutcome};
