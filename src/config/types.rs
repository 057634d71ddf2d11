use crate::state::RescrapeMode;
use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    pub output: OutputConfig,
}

/// Harvest behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Outer passes per feed before giving up on transient failures
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deepest reply level the thread walker will store
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of new posts stored from a profile timeline
    #[serde(rename = "max-posts", default = "default_max_items")]
    pub max_posts: usize,

    /// Maximum number of new comments stored per thread, at every level
    #[serde(rename = "max-comments", default = "default_max_items")]
    pub max_comments: usize,

    /// Profile posts younger than this are skipped until their counts settle
    #[serde(rename = "min-age-days", default = "default_min_age_days")]
    pub min_age_days: u32,

    /// Whether media attachments are fetched and stored
    #[serde(default = "default_true")]
    pub attachments: bool,

    /// Recurse into replies of replies up to `max-depth`
    #[serde(default)]
    pub deep: bool,

    /// Which scopes bypass the deduplication index
    #[serde(default)]
    pub force: RescrapeMode,
}

/// Delays applied around page loads (milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Fixed wait before every navigation
    #[serde(rename = "navigation-delay-ms", default = "default_navigation_delay")]
    pub navigation_delay_ms: u64,

    /// Upper bound of the random wait added to every navigation
    #[serde(rename = "navigation-jitter-ms", default = "default_navigation_jitter")]
    pub navigation_jitter_ms: u64,

    /// Fixed cooldown after a rate-limited page
    #[serde(rename = "rate-limit-cooldown-ms", default = "default_cooldown")]
    pub rate_limit_cooldown_ms: u64,

    /// Upper bound of the random wait added to the cooldown
    #[serde(rename = "rate-limit-jitter-ms", default = "default_cooldown_jitter")]
    pub rate_limit_jitter_ms: u64,
}

/// Front-end instance configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Root URL of the front-end, e.g. `https://xcancel.com`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with page and media requests
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Markup markers used to classify pages and locate items
///
/// The front-end markup is volatile, so every class name and text the
/// harvester relies on lives here instead of in code.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    /// Class of one post on a profile timeline
    #[serde(rename = "timeline-item-class", default = "default_timeline_item")]
    pub timeline_item_class: String,

    /// Class of one reply on a thread page
    #[serde(rename = "reply-class", default = "default_reply")]
    pub reply_class: String,

    /// Class of the focused post on a thread page
    #[serde(rename = "thread-root-class", default = "default_thread_root")]
    pub thread_root_class: String,

    /// Class of the error banner (not found, suspended, ...)
    #[serde(rename = "error-panel-class", default = "default_error_panel")]
    pub error_panel_class: String,

    /// Class of the empty-timeline banner
    #[serde(rename = "empty-class", default = "default_empty")]
    pub empty_class: String,

    /// Link text of the pagination control
    #[serde(rename = "load-more-text", default = "default_load_more")]
    pub load_more_text: String,

    /// XPath of the end-of-feed marker
    #[serde(rename = "end-of-feed-xpath", default = "default_end_of_feed")]
    pub end_of_feed_xpath: String,

    /// Case-insensitive text that marks a rate-limited page
    #[serde(rename = "rate-limit-text", default = "default_rate_limit_text")]
    pub rate_limit_text: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving page snapshots when the layout is unexpected
    #[serde(rename = "diagnostics-dir", default = "default_diagnostics_dir")]
    pub diagnostics_dir: String,

    /// Largest attachment document the store accepts, in bytes
    #[serde(rename = "max-document-bytes", default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    /// Substitute placeholders before writing when a document is known to be too large
    #[serde(rename = "probe-document-size", default)]
    pub probe_document_size: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_items() -> usize {
    10
}

fn default_min_age_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

fn default_navigation_delay() -> u64 {
    12_000
}

fn default_navigation_jitter() -> u64 {
    2_000
}

fn default_cooldown() -> u64 {
    300_000
}

fn default_cooldown_jitter() -> u64 {
    60_000
}

fn default_base_url() -> String {
    "https://xcancel.com".to_string()
}

fn default_user_agent() -> String {
    format!("sumi-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_timeline_item() -> String {
    "timeline-item".to_string()
}

fn default_reply() -> String {
    "reply".to_string()
}

fn default_thread_root() -> String {
    "main-tweet".to_string()
}

fn default_error_panel() -> String {
    "error-panel".to_string()
}

fn default_empty() -> String {
    "timeline-none".to_string()
}

fn default_load_more() -> String {
    "Load more".to_string()
}

fn default_end_of_feed() -> String {
    "//h2[contains(.,'No more items')]".to_string()
}

fn default_rate_limit_text() -> String {
    "rate limited".to_string()
}

fn default_diagnostics_dir() -> String {
    "./diagnostics".to_string()
}

/// MongoDB's maximum BSON document size
fn default_max_document_bytes() -> usize {
    16_793_600
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_depth: default_max_depth(),
            max_posts: default_max_items(),
            max_comments: default_max_items(),
            min_age_days: default_min_age_days(),
            attachments: true,
            deep: false,
            force: RescrapeMode::None,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            navigation_delay_ms: default_navigation_delay(),
            navigation_jitter_ms: default_navigation_jitter(),
            rate_limit_cooldown_ms: default_cooldown(),
            rate_limit_jitter_ms: default_cooldown_jitter(),
        }
    }
}

impl PacingConfig {
    /// Pacing with every delay set to zero, for fixtures and dry runs
    pub fn immediate() -> Self {
        Self {
            navigation_delay_ms: 0,
            navigation_jitter_ms: 0,
            rate_limit_cooldown_ms: 0,
            rate_limit_jitter_ms: 0,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            timeline_item_class: default_timeline_item(),
            reply_class: default_reply(),
            thread_root_class: default_thread_root(),
            error_panel_class: default_error_panel(),
            empty_class: default_empty(),
            load_more_text: default_load_more(),
            end_of_feed_xpath: default_end_of_feed(),
            rate_limit_text: default_rate_limit_text(),
        }
    }
}

impl OutputConfig {
    /// Output settings rooted at the given database path
    pub fn with_database(database_path: &str) -> Self {
        Self {
            database_path: database_path.to_string(),
            diagnostics_dir: default_diagnostics_dir(),
            max_document_bytes: default_max_document_bytes(),
            probe_document_size: false,
        }
    }
}
