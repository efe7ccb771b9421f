//! Error kinds shared by the stores, the slot registry and the reservation engine.

use diesel::result::DatabaseErrorKind;
use thiserror::Error;

/// Errors surfaced by booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or missing request fields.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The slot was claimed by someone else. A normal outcome of a lost race.
    #[error("slot {0} is not available")]
    SlotUnavailable(i32),

    /// The operation would break a reference held by another record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying store failed or timed out.
    #[error("storage fault: {0}")]
    Storage(String),

    /// A slot's availability flag disagrees with reservation existence.
    /// The slot is queued for the repair pass.
    #[error("slot {slot_id} is inconsistent: {detail}")]
    Inconsistency { slot_id: i32, detail: String },
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<diesel::result::Error> for BookingError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation | DatabaseErrorKind::UniqueViolation,
                info,
            ) => Self::Conflict(info.message().to_string()),
            err => Self::Storage(err.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for BookingError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Storage(format!("no database connection available: {err}"))
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
