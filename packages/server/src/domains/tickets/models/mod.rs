pub mod ticket;

pub use ticket::{NewTickets, Ticket, TicketStatus};
