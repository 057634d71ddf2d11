//! Harvester module for traversing feeds and archiving their content
//!
//! This module contains the harvesting engine, including:
//! - Page navigation over the front-end (browser seam + HTTP implementation)
//! - Content normalization of timeline and reply markup
//! - Deduplication against the archive and the rescrape policy
//! - Attachment capture with oversize fallback
//! - The traversal controller and the recursive thread walker
//! - Overall run coordination

mod attachments;
mod controller;
mod coordinator;
mod dedup;
mod navigator;
mod normalizer;
mod pacing;
mod rescrape;
mod walker;

pub use attachments::{
    capture_attachments, persist_with_fallback, CaptureReport, HttpMediaFetcher, MediaError,
    MediaFetcher,
};
pub use controller::{
    classify_page, read_pagination, status_url, FeedTarget, HarvestedItem, ScrapeOutcome,
    UnreachableReason,
};
pub use coordinator::{run_harvest, HarvestRequest, HarvestSummary, Harvester};
pub use dedup::{DedupIndex, DedupVerdict};
pub use navigator::{
    build_http_client, compile_xpath, Browser, HttpNavigator, NavigationError, PageElement,
};
pub use normalizer::{HtmlNormalizer, Normalizer};
pub use pacing::Pacer;
pub use rescrape::should_bypass_dedup;
pub use walker::{Leaf, WalkReport};
