//! Storage module for persisting harvested content
//!
//! This module is the persistence gateway of the harvester:
//! - SQLite database initialization and schema management
//! - Append-only post and comment storage
//! - Fingerprint snapshots for deduplication
//! - Attachment bundles with a document size limit
//! - Profile cards

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{FingerprintFilter, Storage, StorageError, StorageResult};

use std::path::Path;

/// Largest attachment document accepted unless configured otherwise
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16_793_600;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `max_document_bytes` - Largest attachment document the archive accepts
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path, max_document_bytes: usize) -> StorageResult<SqliteStorage> {
    Ok(SqliteStorage::new(path)?.with_document_limit(max_document_bytes))
}
