//! Events and ticket types: the inventory ledger.

pub mod activities;
pub mod models;

pub use models::{Event, InventoryTotals, TicketType};
