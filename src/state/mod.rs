//! State module for tracking harvest progress
//!
//! This module provides the transient state a traversal call works with.
//!
//! # Components
//!
//! - `PageOutcome`: Classification of each page load (rate limited, not found, has items, ...)
//! - `Pagination`: What a page offers after its items are exhausted
//! - `FrontierCursor`: Per-call pagination state (page, accepted count, attempt)
//! - `Scope` / `RescrapeMode`: Which feed a call targets and which feeds ignore the archive

mod cursor;
mod page_outcome;
mod scope;

// Re-export main types
pub use cursor::FrontierCursor;
pub use page_outcome::{PageOutcome, Pagination};
pub use scope::{RescrapeMode, Scope};
