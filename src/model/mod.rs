//! Archived data model
//!
//! Records are append-only: they are created when a fragment is normalized
//! and accepted, written once, and never updated by the harvester.

mod fingerprint;
mod record;

pub use fingerprint::{fingerprint, normalize_text, timestamp_iso};
pub use record::{
    parse_count, Ancestry, AttachmentRecord, MediaItem, MediaPayload, ProfileCounts,
    ProfileRecord, QuotedRecord, Record, Stats, OVERSIZE_PLACEHOLDER,
};
