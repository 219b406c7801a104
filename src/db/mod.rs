//! SQLite persistence for documents and the case participant mirror.

pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document {0} does not exist")]
    DocumentMissing(Uuid),

    #[error("Unknown {field} value in store: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("Schema migration v{version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}
