// Business domains
pub mod catalog;
pub mod tickets;
pub mod transactions;
pub mod users;
pub mod waitlist;
