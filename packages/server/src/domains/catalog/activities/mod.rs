pub mod inventory;

pub use inventory::{get_availability, recount_inventory, Availability, TicketTypeAvailability};
