//! Database error types.

use derive_more::{Display, Error};
use diesel::result::DatabaseErrorKind;
use tracing::instrument;

/// Classification of a database failure.
///
/// SQLite surfaces constraint violations as distinct result codes; diesel
/// maps them to [`DatabaseErrorKind`], and this enum carries that
/// classification so callers can branch without matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DbErrorKind {
    /// Unique constraint violation (e.g. duplicate username).
    #[display("unique constraint violation")]
    UniqueViolation,
    /// Foreign-key constraint violation (e.g. play referencing a missing game).
    #[display("foreign key constraint violation")]
    ForeignKeyViolation,
    /// Not-null constraint violation.
    #[display("not-null constraint violation")]
    NotNullViolation,
    /// Failed to open or talk to the database.
    #[display("connection failure")]
    Connection,
    /// Any other database failure.
    #[display("database failure")]
    Other,
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error ({}): {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// What kind of failure this is.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new database error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The failure classification.
    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        let kind = match &err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                DbErrorKind::UniqueViolation
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                DbErrorKind::ForeignKeyViolation
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::NotNullViolation, _) => {
                DbErrorKind::NotNullViolation
            }
            _ => DbErrorKind::Other,
        };
        Self::new(kind, format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(DbErrorKind::Connection, format!("Connection error: {}", err))
    }
}
