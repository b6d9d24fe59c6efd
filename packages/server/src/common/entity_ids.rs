//! Typed ID definitions for every entity the engine touches.

pub use super::id::{Id, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for users (identity collaborator).
pub struct User;

/// Marker type for events.
pub struct Event;

/// Marker type for ticket types (priced inventory tiers).
pub struct TicketType;

/// Marker type for individual tickets.
pub struct Ticket;

/// Marker type for payment and settlement records.
pub struct Transaction;

/// Marker type for waitlist entries.
pub struct WaitlistEntry;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;

pub type EventId = Id<Event>;

pub type TicketTypeId = Id<TicketType>;

pub type TicketId = Id<Ticket>;

pub type TransactionId = Id<Transaction>;

pub type WaitlistEntryId = Id<WaitlistEntry>;
