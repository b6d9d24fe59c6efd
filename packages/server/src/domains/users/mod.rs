//! Identity lookups used to validate callers and waitlist joins.

pub mod models;

pub use models::User;
