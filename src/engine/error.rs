use std::fmt;

use ulid::Ulid;

use crate::ledger::LedgerError;
use crate::repo::RepoError;

#[derive(Debug)]
pub enum BookingError {
    RestaurantNotFound(String),
    SectorNotFound(String),
    BookingNotFound(Ulid),
    /// Requested window falls outside every service window.
    OutsideServiceWindow,
    /// Requested duration is zero.
    InvalidDuration,
    /// Same booking request seen within the idempotency TTL.
    DuplicateRequest,
    /// No table set can seat the party in the requested window.
    NoCapacity,
    IntegrityViolation(String),
    Ledger(LedgerError),
    Repository(RepoError),
}

impl BookingError {
    /// HTTP-shaped status a caller-facing layer would map this to.
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::RestaurantNotFound(_)
            | BookingError::SectorNotFound(_)
            | BookingError::BookingNotFound(_) => 404,
            BookingError::OutsideServiceWindow
            | BookingError::InvalidDuration
            | BookingError::NoCapacity => 422,
            BookingError::DuplicateRequest => 409,
            BookingError::IntegrityViolation(_)
            | BookingError::Ledger(_)
            | BookingError::Repository(_) => 500,
        }
    }
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingError::RestaurantNotFound(id) => write!(f, "restaurant not found: {id}"),
            BookingError::SectorNotFound(id) => write!(f, "sector not found: {id}"),
            BookingError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            BookingError::OutsideServiceWindow => {
                write!(f, "requested time is outside the restaurant's service windows")
            }
            BookingError::InvalidDuration => write!(f, "duration must be positive"),
            BookingError::DuplicateRequest => write!(f, "duplicate booking request"),
            BookingError::NoCapacity => write!(f, "no tables available for the requested slot"),
            BookingError::IntegrityViolation(key) => {
                write!(f, "idempotency ledger integrity violation for key: {key}")
            }
            BookingError::Ledger(e) => write!(f, "ledger failure: {e}"),
            BookingError::Repository(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BookingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingError::Ledger(e) => Some(e),
            BookingError::Repository(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for BookingError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateKey(_) => BookingError::DuplicateRequest,
            LedgerError::IntegrityViolation(key) => BookingError::IntegrityViolation(key),
            other => BookingError::Ledger(other),
        }
    }
}

impl From<RepoError> for BookingError {
    fn from(e: RepoError) -> Self {
        BookingError::Repository(e)
    }
}
