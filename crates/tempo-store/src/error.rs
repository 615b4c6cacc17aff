use tempo_core::RecordId;
use thiserror::Error;

use crate::schema::AttrType;

/// Errors that can occur within the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The schema itself is malformed (empty, duplicate or reserved names).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An insert's key set does not exactly match the schema.
    #[error("invalid record keys; missing: [{}], extra: [{}]", .missing.join(", "), .extra.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// The attribute is not declared in the schema.
    #[error("unknown attribute: {attr}")]
    UnknownAttribute { attr: String },

    /// A value's runtime type disagrees with the declared column type.
    #[error("attribute '{attr}' expects {expected}, got {actual}")]
    TypeMismatch {
        attr: String,
        expected: AttrType,
        actual: AttrType,
    },

    /// No record with the given id exists.
    #[error("no record with id {id}")]
    NotFound { id: RecordId },

    /// Sorting by this attribute's type is not meaningful (booleans).
    #[error("cannot sort by attribute '{attr}': unsupported type")]
    UnsupportedSortType { attr: String },

    /// The retry budget was exhausted on a busy/locked condition.
    #[error("storage contention: gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    /// A stored value could not be decoded back to its declared type.
    #[error("stored value for attribute '{attr}' is corrupt: {reason}")]
    Corrupt { attr: String, reason: String },

    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error (init lock, directory creation).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
