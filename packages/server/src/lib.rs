// Ticketing Engine - API Core
//
// Ticket inventory, resale returns and the waitlist that absorbs them.
// Business logic lives in domains/*/activities; models own their SQL.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
