// HTTP routes
pub mod health;
pub mod inventory;
pub mod tickets;
pub mod transactions;
pub mod waitlist;

pub use health::*;
pub use inventory::*;
pub use tickets::*;
pub use transactions::*;
pub use waitlist::*;
