pub mod event;
pub mod ticket_type;

pub use event::Event;
pub use ticket_type::{InventoryTotals, TicketType};
