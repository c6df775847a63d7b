use std::fmt;

use thiserror::Error;

use crate::model::{BookingId, BookingStatus, RoomId, Span};

/// The four failure kinds callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InvalidStateTransition,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidStateTransition => "invalid_state_transition",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),
    #[error("room {0} is not active")]
    RoomInactive(RoomId),
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),
    #[error("room {room_id}: slot {requested} conflicts with booking {existing} at {existing_span}")]
    Conflict {
        room_id: RoomId,
        requested: Span,
        existing: BookingId,
        existing_span: Span,
    },
    #[error("booking {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl BookingError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        BookingError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation { .. } | BookingError::LimitExceeded(_) => ErrorKind::Validation,
            BookingError::RoomNotFound(_)
            | BookingError::RoomInactive(_)
            | BookingError::BookingNotFound(_) => ErrorKind::NotFound,
            BookingError::Conflict { .. } => ErrorKind::Conflict,
            BookingError::InvalidTransition { .. } => ErrorKind::InvalidStateTransition,
        }
    }
}
