use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A managed table exists with a shape this tool cannot work with.
    #[error("schema conflict on table {table}: {message}")]
    Schema { table: String, message: String },

    /// A guard hook rejected a mutation (missing parent row).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// The store rejected a mutation through a CHECK, NOT NULL, foreign key
    /// or age constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot parse error: {0}")]
    Snapshot(#[from] toml::de::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Prefix shared by every guard hook's rejection message.
pub const GUARD_MESSAGE_PREFIX: &str = "Invalid ";

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_TRIGGER
                    && message.starts_with(GUARD_MESSAGE_PREFIX)
                {
                    return Self::IntegrityViolation(message.clone());
                }
                return Self::ConstraintViolation(message.clone());
            }
        }
        Self::Database(err)
    }
}

impl Error {
    /// Returns `true` for errors that reject a single row rather than
    /// signalling a broken store.
    pub fn is_row_rejection(&self) -> bool {
        matches!(
            self,
            Self::IntegrityViolation(_) | Self::ConstraintViolation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
