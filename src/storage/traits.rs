//! Storage traits and error types
//!
//! This module defines the persistence gateway the harvester writes through
//! and its error types.

use crate::model::{AttachmentRecord, ProfileRecord, Record};
use crate::state::Scope;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Document of {size} bytes exceeds the {limit} byte limit")]
    Oversize { size: usize, limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Which stored fingerprints form a deduplication snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintFilter {
    /// Every fingerprint stored for the scope
    All,

    /// Only records harvested from this user's timeline
    Timeline(String),
}

/// Persistence gateway used by the harvester
///
/// Writes are independent and non-transactional from the harvester's point
/// of view: each accepted record is written on its own as soon as it is
/// accepted.
pub trait Storage {
    // ===== Records =====

    /// Stores one post (profile scope) or comment (thread scope)
    fn insert_record(&mut self, scope: Scope, record: &Record) -> StorageResult<()>;

    /// Stores several records at once, returning how many were written
    fn insert_records(&mut self, scope: Scope, records: &[Record]) -> StorageResult<usize>;

    /// Loads every stored record of a scope in insertion order
    fn load_records(&self, scope: Scope) -> StorageResult<Vec<Record>>;

    // ===== Deduplication =====

    /// Returns the fingerprints already stored for a scope
    fn find_fingerprints(
        &self,
        scope: Scope,
        filter: &FingerprintFilter,
    ) -> StorageResult<HashSet<String>>;

    // ===== Attachments =====

    /// Stores a media bundle
    ///
    /// Fails with [`StorageError::Oversize`] when the document is larger than
    /// the store accepts.
    fn insert_attachment(&mut self, attachment: &AttachmentRecord) -> StorageResult<()>;

    /// Loads every stored media bundle in insertion order
    fn load_attachments(&self) -> StorageResult<Vec<AttachmentRecord>>;

    /// Largest document the store accepts, if it is known up front
    fn document_size_limit(&self) -> Option<usize> {
        None
    }

    // ===== Profiles =====

    /// Looks up a stored profile card
    fn find_profile(&self, username: &str) -> StorageResult<Option<ProfileRecord>>;

    /// Stores a profile card
    fn insert_profile(&mut self, profile: &ProfileRecord) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts stored records of a scope
    fn count_records(&self, scope: Scope) -> StorageResult<u64>;

    /// Counts stored media bundles
    fn count_attachments(&self) -> StorageResult<u64>;

    /// Counts media files stored as a placeholder instead of bytes
    fn count_placeholder_media(&self) -> StorageResult<u64>;

    /// Counts stored profile cards
    fn count_profiles(&self) -> StorageResult<u64>;

    /// Deepest comment level stored so far
    fn max_stored_depth(&self) -> StorageResult<Option<u32>>;
}
