use std::fmt::Display;

use thiserror::Error;

use super::{EventId, TicketId, TransactionId};

/// Errors raised by the inventory and waitlist coordinators.
///
/// Every coordinator runs inside one database transaction, so returning any of
/// these drops the transaction uncommitted and nothing is persisted.
#[derive(Error, Debug)]
pub enum TicketingError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Only {available} tickets available, {requested} requested")]
    InsufficientInventory { requested: i32, available: i32 },

    #[error("Event {0} is not sold out")]
    NotSoldOut(EventId),

    #[error("Ticket {ticket_id} cannot be returned: {reason}")]
    NotEligible { ticket_id: TicketId, reason: String },

    #[error("Illegal {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Offer {0} has expired")]
    OfferExpired(TransactionId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type TicketingResult<T> = std::result::Result<T, TicketingError>;

/// Stable error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    State,
    Expired,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::State => "STATE_ERROR",
            ErrorKind::Expired => "EXPIRED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl TicketingError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        TicketingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(entity: &'static str, from: impl Display, to: impl Display) -> Self {
        TicketingError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketingError::Validation(_)
            | TicketingError::NotSoldOut(_)
            | TicketingError::NotEligible { .. } => ErrorKind::Validation,
            TicketingError::NotFound { .. } => ErrorKind::NotFound,
            TicketingError::Conflict(_) | TicketingError::InsufficientInventory { .. } => {
                ErrorKind::Conflict
            }
            TicketingError::InvalidTransition { .. } => ErrorKind::State,
            TicketingError::OfferExpired(_) => ErrorKind::Expired,
            TicketingError::Database(_) => ErrorKind::Internal,
        }
    }

    /// Turns a unique-constraint violation into a `Conflict`, passing other
    /// database errors through.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                TicketingError::Conflict(message.into())
            }
            _ => TicketingError::Database(err),
        }
    }
}
