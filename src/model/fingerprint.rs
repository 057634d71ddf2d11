//! Content fingerprints
//!
//! A fingerprint is the SHA-256 of a record's normalized text, its UTC
//! timestamp and its author. It is the only key used for deduplication.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Unit separator between hashed fields so "ab"+"c" never equals "a"+"bc"
const FIELD_SEPARATOR: char = '\u{1f}';

/// Formats a timestamp the way it is stored and hashed (ISO-8601, UTC)
pub fn timestamp_iso(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Collapses whitespace runs and trims, so rendering noise does not change the hash
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Computes the hex-encoded fingerprint of a record's content
pub fn fingerprint(text: &str, timestamp: &DateTime<Utc>, author: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(timestamp_iso(timestamp).as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(author.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}
