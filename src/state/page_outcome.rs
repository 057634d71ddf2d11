/// Page outcome definitions for one load attempt
///
/// Every navigation starts in `Loading` and is classified into exactly one
/// of the remaining states once the page is available.
use std::fmt;

/// Classification of a loaded feed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Navigation issued, page not yet inspected
    Loading,

    // ===== Retryable States =====
    /// The front-end refused service for now; cool down and retry
    RateLimited,

    /// Expected elements missing or navigation failed; retry
    TransientError,

    // ===== Terminal States =====
    /// Target does not exist or an error banner is shown
    NotFound,

    /// The feed is legitimately empty
    NoItems,

    // ===== Success =====
    /// Items are rendered and can be extracted
    HasItems,
}

impl PageOutcome {
    /// Returns true if the attempt should be repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientError)
    }

    /// Returns true if the call ends without touching any item
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound | Self::NoItems)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::RateLimited => "rate_limited",
            Self::TransientError => "transient_error",
            Self::NotFound => "not_found",
            Self::NoItems => "no_items",
            Self::HasItems => "has_items",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the page offers once its rendered items are exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    /// A "load more" control pointing at the next page
    LoadMore(String),

    /// The end-of-feed marker is shown
    EndOfFeed,

    /// Neither is present: the layout is not what we expect
    Missing,
}
