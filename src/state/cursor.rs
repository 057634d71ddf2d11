use crate::state::PageOutcome;
use std::collections::HashSet;

/// Transient pagination state for one traversal call
///
/// Created when the call starts and dropped when it returns; nothing in
/// here survives across runs.
#[derive(Debug, Clone)]
pub struct FrontierCursor {
    /// URL the call started from; every new attempt restarts here
    pub start_url: String,

    /// URL of the page currently rendered
    pub page_url: String,

    /// Number of records accepted so far in this call
    pub accepted: usize,

    /// Outer pass currently running (1-based once started)
    pub attempt: u32,

    /// Pages loaded in this call, across all attempts
    pub pages_loaded: u32,

    /// Classification of the current page
    pub outcome: PageOutcome,

    /// Ids whose record write failed in this call; their media is already stored
    failed_writes: HashSet<String>,
}

impl FrontierCursor {
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            page_url: start_url.to_string(),
            accepted: 0,
            attempt: 0,
            pages_loaded: 0,
            outcome: PageOutcome::Loading,
            failed_writes: HashSet::new(),
        }
    }

    /// Starts a new outer pass from the start URL
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.page_url = self.start_url.clone();
        self.outcome = PageOutcome::Loading;
    }

    /// Moves to the next page of the same pass
    pub fn advance(&mut self, next_url: String) {
        self.page_url = next_url;
        self.outcome = PageOutcome::Loading;
    }

    /// Records that a page finished loading with the given classification
    pub fn page_loaded(&mut self, outcome: PageOutcome) {
        self.pages_loaded += 1;
        self.outcome = outcome;
    }

    pub fn record_accept(&mut self) {
        self.accepted += 1;
    }

    /// Remembers an id whose record could not be stored
    pub fn record_failed_write(&mut self, id: &str) {
        self.failed_writes.insert(id.to_string());
    }

    /// Returns true if storing `id` already failed in this call
    pub fn write_failed(&self, id: &str) -> bool {
        self.failed_writes.contains(id)
    }

    /// Returns true once `max_items` records were accepted
    pub fn limit_reached(&self, max_items: usize) -> bool {
        self.accepted >= max_items
    }

    /// Returns true if another outer pass is allowed
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.attempt < max_attempts
    }
}
