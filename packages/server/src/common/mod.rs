// Common types and utilities shared across the application

pub mod entity_ids;
pub mod errors;
pub mod id;

pub use entity_ids::*;
pub use errors::{ErrorKind, TicketingError, TicketingResult};
pub use id::{Id, V7};
