pub mod waitlist_entry;

pub use waitlist_entry::{EntryState, RankedEntry, WaitlistEntry};
