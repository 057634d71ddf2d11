//! Traversal controller
//!
//! Drives pagination over one feed (a profile timeline or a thread page):
//! - Classifies every page load (rate limited, not found, empty, has items, transient)
//! - Retries whole passes on transient failures, cooling down after rate limits
//! - Normalizes, deduplicates and persists items one at a time
//! - Stops at the item limit, at the end of the feed, or at archived content
//!
//! The feed is required to be ordered newest-first: the first fingerprint
//! found in the archive snapshot ends the call, on the assumption that
//! everything below it was harvested by an earlier run.

use crate::config::MarkerConfig;
use crate::harvester::attachments::capture_attachments;
use crate::harvester::coordinator::Harvester;
use crate::harvester::dedup::{DedupIndex, DedupVerdict};
use crate::harvester::navigator::{Browser, NavigationError};
use crate::harvester::rescrape::should_bypass_dedup;
use crate::model::{Ancestry, Record};
use crate::state::{FrontierCursor, PageOutcome, Pagination, RescrapeMode, Scope};
use crate::storage::{FingerprintFilter, Storage};
use chrono::Utc;
use std::path::PathBuf;

/// One feed to traverse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget {
    /// First page of the feed
    pub url: String,

    pub scope: Scope,

    /// Timeline owner, set on posts and used to narrow the dedup snapshot
    pub timeline: Option<String>,

    /// Placement copied onto every comment stored from this feed
    pub ancestry: Option<Ancestry>,

    /// Depth of the records stored from this feed
    pub depth: u32,

    /// Items younger than this many days are skipped (0 disables)
    pub min_age_days: u32,
}

impl FeedTarget {
    /// A profile timeline, or a single post page harvested as a post
    pub fn profile(url: String, username: &str, min_age_days: u32) -> Self {
        Self {
            url,
            scope: Scope::Profile,
            timeline: Some(username.to_string()),
            ancestry: None,
            depth: 0,
            min_age_days,
        }
    }

    /// The replies of one thread page, stored at `depth`
    pub fn thread(ancestry: Ancestry, depth: u32) -> Self {
        Self {
            url: ancestry.parent_url.clone(),
            scope: Scope::Thread,
            timeline: None,
            ancestry: Some(ancestry),
            depth,
            min_age_days: 0,
        }
    }

    /// Which stored fingerprints this feed is deduplicated against
    pub fn dedup_filter(&self) -> FingerprintFilter {
        match (&self.scope, &self.timeline) {
            (Scope::Profile, Some(username)) => FingerprintFilter::Timeline(username.clone()),
            _ => FingerprintFilter::All,
        }
    }
}

/// A record stored by a traversal call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedItem {
    pub id: String,

    /// Thread page of the record
    pub url: String,

    /// Reply count shown when the record was harvested
    pub replies: u64,

    pub depth: u32,
}

impl HarvestedItem {
    pub fn has_replies(&self) -> bool {
        self.replies > 0
    }
}

/// Why a traversal call produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableReason {
    /// Missing target or an explicit error banner
    NotFound,

    /// Every pass failed before anything was stored
    AttemptsExhausted,

    /// Cancelled before anything was stored
    Cancelled,
}

/// Result of one traversal call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// New records were stored, in feed order
    Harvested {
        items: Vec<HarvestedItem>,

        /// Set when retries ran out or the run was cancelled mid-feed
        partial: bool,
    },

    /// The feed was reachable but held nothing new
    NothingNew,

    /// The feed could not be harvested
    Unreachable(UnreachableReason),
}

impl ScrapeOutcome {
    /// Stored records, empty unless something was harvested
    pub fn items(&self) -> &[HarvestedItem] {
        match self {
            Self::Harvested { items, .. } => items,
            _ => &[],
        }
    }

    /// Ids of the stored records, or `None` for nothing new and unreachable alike
    pub fn into_ids(self) -> Option<Vec<String>> {
        match self {
            Self::Harvested { items, .. } => Some(items.into_iter().map(|i| i.id).collect()),
            _ => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// How one outer pass ended
enum PassEnd {
    /// End of feed, item limit, or archived content reached
    Complete,

    /// Not found or empty; no retry
    Terminal(PageOutcome),

    /// Rate limited or unexpected layout; retry from the start
    Retry,

    Cancelled,
}

/// Classifies the page currently loaded in the browser
///
/// An error banner mentioning the rate-limit text is a rate limit, any
/// other error banner is permanent. A page without items is a legitimate
/// empty feed when the empty marker (or, on a thread page, the focused
/// post) is present, whatever text the page carries. Only a page with none
/// of these markers is searched for the rate-limit text; otherwise the
/// layout is unexpected.
pub fn classify_page(browser: &dyn Browser, scope: Scope, markers: &MarkerConfig) -> PageOutcome {
    let rate_text = markers.rate_limit_text.to_lowercase();

    let banners = match browser.find_elements_by_class(&markers.error_panel_class) {
        Ok(banners) => banners,
        Err(e) => {
            tracing::debug!("Page lookup failed: {}", e);
            return PageOutcome::TransientError;
        }
    };
    if let Some(banner) = banners.first() {
        return if banner.text.to_lowercase().contains(&rate_text) {
            PageOutcome::RateLimited
        } else {
            tracing::info!("Error banner: {}", banner.text.trim());
            PageOutcome::NotFound
        };
    }

    let has_class = |class: &str| {
        browser
            .find_elements_by_class(class)
            .map(|found| !found.is_empty())
            .unwrap_or(false)
    };

    if has_class(item_class(scope, markers)) {
        return PageOutcome::HasItems;
    }

    if has_class(&markers.empty_class) {
        return PageOutcome::NoItems;
    }

    if scope == Scope::Thread && has_class(&markers.thread_root_class) {
        return PageOutcome::NoItems;
    }

    let rate_limited = browser
        .page_source()
        .map(|source| source.to_lowercase().contains(&rate_text))
        .unwrap_or(false);
    if rate_limited {
        return PageOutcome::RateLimited;
    }

    PageOutcome::TransientError
}

/// Reads the pagination affordance of the loaded page
pub fn read_pagination(browser: &dyn Browser, markers: &MarkerConfig) -> Pagination {
    if let Ok(links) = browser.find_elements_by_link_text(&markers.load_more_text) {
        if let Some(href) = links.into_iter().find_map(|link| link.href) {
            return Pagination::LoadMore(href);
        }
    }

    match browser.find_elements_by_xpath(&markers.end_of_feed_xpath) {
        Ok(found) if !found.is_empty() => Pagination::EndOfFeed,
        Ok(_) => Pagination::Missing,
        Err(e) => {
            tracing::warn!("Cannot evaluate end-of-feed marker: {}", e);
            Pagination::Missing
        }
    }
}

/// Class of one item in a feed of the given scope
fn item_class(scope: Scope, markers: &MarkerConfig) -> &str {
    match scope {
        Scope::Profile => &markers.timeline_item_class,
        Scope::Thread => &markers.reply_class,
    }
}

/// Thread page of a post
pub fn status_url(base_url: &str, username: &str, id: &str) -> String {
    format!("{}/{}/status/{}", base_url.trim_end_matches('/'), username, id)
}

impl<S: Storage> Harvester<S> {
    /// Harvests new items from one feed
    ///
    /// Never fails: every fault resolves to nothing new, unreachable, or a
    /// (possibly partial) list of stored items.
    ///
    /// # Arguments
    ///
    /// * `target` - The feed to traverse
    /// * `max_items` - Stop after storing this many new records
    /// * `mode` - Rescrape mode deciding whether the archive snapshot is used
    pub async fn scrape_feed(
        &mut self,
        target: &FeedTarget,
        max_items: usize,
        mode: RescrapeMode,
    ) -> ScrapeOutcome {
        let noun = target.scope.item_noun();

        if max_items == 0 {
            return ScrapeOutcome::NothingNew;
        }

        tracing::info!("Harvesting {} from {}...", noun, target.url);

        let mut index = if should_bypass_dedup(target.scope, mode) {
            DedupIndex::bypassed()
        } else {
            DedupIndex::build(&self.storage, target.scope, &target.dedup_filter())
        };
        if index.is_bypassed() {
            tracing::debug!("Rescrape mode {} bypasses the {} archive", mode, noun);
        } else {
            tracing::debug!("Deduplicating against {} archived {}", index.known_len(), noun);
        }

        let mut cursor = FrontierCursor::new(&target.url);
        let mut items: Vec<HarvestedItem> = Vec::new();
        let mut profile_checked = target.scope != Scope::Profile || target.timeline.is_none();
        let max_attempts = self.config.harvester.max_attempts;

        while cursor.can_retry(max_attempts) {
            cursor.begin_attempt();
            tracing::debug!(
                url = %target.url,
                attempt = cursor.attempt,
                "Starting pass"
            );

            let end = self
                .run_pass(
                    target,
                    max_items,
                    &mut cursor,
                    &mut index,
                    &mut items,
                    &mut profile_checked,
                )
                .await;

            match end {
                PassEnd::Complete => {
                    tracing::info!(
                        "Harvested {} new {} from {} page(s).",
                        items.len(),
                        noun,
                        cursor.pages_loaded
                    );
                    return finish(items, false);
                }
                PassEnd::Terminal(outcome) => {
                    tracing::info!(
                        "Stopping at {} ({}); harvested {} new {}.",
                        cursor.page_url,
                        outcome,
                        items.len(),
                        noun
                    );
                    return match outcome {
                        PageOutcome::NotFound if items.is_empty() => {
                            ScrapeOutcome::Unreachable(UnreachableReason::NotFound)
                        }
                        _ => finish(items, false),
                    };
                }
                PassEnd::Cancelled => {
                    tracing::warn!("Cancelled; harvested {} new {}.", items.len(), noun);
                    if items.is_empty() {
                        return ScrapeOutcome::Unreachable(UnreachableReason::Cancelled);
                    }
                    return finish(items, true);
                }
                PassEnd::Retry => {
                    tracing::warn!(
                        url = %target.url,
                        attempt = cursor.attempt,
                        max_attempts,
                        outcome = %cursor.outcome,
                        "Pass failed"
                    );
                }
            }
        }

        tracing::warn!(
            "Giving up on {} after {} attempts; harvested {} new {}.",
            target.url,
            max_attempts,
            items.len(),
            noun
        );
        if items.is_empty() {
            ScrapeOutcome::Unreachable(UnreachableReason::AttemptsExhausted)
        } else {
            finish(items, true)
        }
    }

    /// Runs one outer pass from the start URL
    async fn run_pass(
        &mut self,
        target: &FeedTarget,
        max_items: usize,
        cursor: &mut FrontierCursor,
        index: &mut DedupIndex,
        items: &mut Vec<HarvestedItem>,
        profile_checked: &mut bool,
    ) -> PassEnd {
        loop {
            if self.is_cancelled() {
                return PassEnd::Cancelled;
            }

            self.pacer.before_navigation().await;
            let outcome = self.load_page(&cursor.page_url, target.scope).await;
            cursor.page_loaded(outcome);

            match outcome {
                PageOutcome::HasItems => {}
                PageOutcome::RateLimited => {
                    tracing::warn!(url = %cursor.page_url, "Rate limited");
                    self.pacer.cool_down().await;
                    return PassEnd::Retry;
                }
                PageOutcome::NotFound | PageOutcome::NoItems => {
                    return PassEnd::Terminal(outcome);
                }
                PageOutcome::Loading | PageOutcome::TransientError => {
                    self.save_diagnostics(target.scope);
                    return PassEnd::Retry;
                }
            }

            if !*profile_checked {
                *profile_checked = true;
                if let Some(username) = &target.timeline {
                    self.capture_profile(username);
                }
            }

            let fragments = match self
                .browser
                .find_elements_by_class(item_class(target.scope, &self.config.markers))
            {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Cannot read items of {}: {}", cursor.page_url, e);
                    return PassEnd::Retry;
                }
            };

            for fragment in fragments {
                let Some(record) = self.normalizer.parse(&fragment.outer_html, target.scope)
                else {
                    tracing::debug!("Skipping fragment without required fields");
                    continue;
                };

                match index.check(&record.fingerprint) {
                    DedupVerdict::New => {}
                    DedupVerdict::Known if record.pinned => {
                        tracing::debug!("Skipping archived pinned post {}", record.id);
                        continue;
                    }
                    DedupVerdict::Known => {
                        tracing::info!("Reached archived content at {}", record.id);
                        return PassEnd::Complete;
                    }
                    DedupVerdict::SeenThisCall => {
                        tracing::trace!("Already stored {} in this call", record.id);
                        continue;
                    }
                }

                if is_too_recent(&record, target.min_age_days) {
                    tracing::debug!(
                        "Skipping {}: younger than {} days",
                        record.id,
                        target.min_age_days
                    );
                    continue;
                }

                let id = record.id.clone();
                let capture_media = !cursor.write_failed(&id);
                match self.accept(target, record, capture_media).await {
                    Some((item, fingerprint)) => {
                        index.accept(&fingerprint);
                        cursor.record_accept();
                        items.push(item);
                    }
                    None => cursor.record_failed_write(&id),
                }

                if cursor.limit_reached(max_items) {
                    return PassEnd::Complete;
                }
            }

            match read_pagination(self.browser.as_ref(), &self.config.markers) {
                Pagination::LoadMore(next) if next != cursor.page_url => {
                    tracing::debug!("Loading more from {}", next);
                    cursor.advance(next);
                }
                Pagination::LoadMore(_) | Pagination::EndOfFeed => return PassEnd::Complete,
                Pagination::Missing => {
                    tracing::warn!("No pagination marker on {}", cursor.page_url);
                    cursor.outcome = PageOutcome::TransientError;
                    self.save_diagnostics(target.scope);
                    return PassEnd::Retry;
                }
            }
        }
    }

    /// Navigates and classifies the resulting page
    async fn load_page(&mut self, url: &str, scope: Scope) -> PageOutcome {
        match self.browser.navigate(url).await {
            Ok(()) => classify_page(self.browser.as_ref(), scope, &self.config.markers),
            Err(NavigationError::RateLimited { .. }) => PageOutcome::RateLimited,
            Err(NavigationError::NotFound { .. }) => PageOutcome::NotFound,
            Err(e @ NavigationError::Status { .. }) => {
                match classify_page(self.browser.as_ref(), scope, &self.config.markers) {
                    PageOutcome::RateLimited => PageOutcome::RateLimited,
                    _ => {
                        tracing::warn!("{}", e);
                        PageOutcome::TransientError
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                PageOutcome::TransientError
            }
        }
    }

    /// Captures media and persists an accepted record
    ///
    /// Media is skipped when `capture_media` is false, i.e. when an earlier
    /// write of the same record in this call already stored it. Returns the
    /// stored item and its fingerprint, or `None` if the write failed.
    async fn accept(
        &mut self,
        target: &FeedTarget,
        mut record: Record,
        capture_media: bool,
    ) -> Option<(HarvestedItem, String)> {
        record.timeline = target.timeline.clone();
        record.ancestry = target.ancestry.clone();
        record.depth = target.depth;

        let mut media_stored = false;
        if self.config.harvester.attachments && capture_media {
            let report = capture_attachments(
                &mut self.storage,
                self.media.as_ref(),
                &record,
                self.config.output.probe_document_size,
            )
            .await;
            media_stored = report.stored + report.downgraded > 0;
            if report.downgraded > 0 {
                tracing::info!(
                    "Stored {} media bundle(s) of {} as placeholders",
                    report.downgraded,
                    record.id
                );
            }
        }

        if let Err(e) = self.storage.insert_record(target.scope, &record) {
            tracing::error!("Failed to store {}: {}", record.id, e);
            if media_stored {
                tracing::error!(
                    owner = %record.id,
                    "Media bundles stored without their record"
                );
            }
            return None;
        }

        tracing::debug!("Stored {} {} at depth {}", target.scope, record.id, record.depth);

        let item = HarvestedItem {
            url: status_url(
                &self.config.source.base_url,
                &record.author_username,
                &record.id,
            ),
            id: record.id,
            replies: record.stats.replies,
            depth: record.depth,
        };
        Some((item, record.fingerprint))
    }

    /// Stores the profile card of the loaded timeline unless it is already archived
    fn capture_profile(&mut self, username: &str) {
        match self.storage.find_profile(username) {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Cannot look up profile {}: {}", username, e);
                return;
            }
        }

        let Ok(source) = self.browser.page_source() else {
            return;
        };

        match self.normalizer.parse_profile(&source) {
            Some(profile) => match self.storage.insert_profile(&profile) {
                Ok(()) => tracing::info!("Stored profile of {}", profile.username),
                Err(e) => tracing::error!("Failed to store profile of {}: {}", username, e),
            },
            None => tracing::debug!("No profile card on the page of {}", username),
        }
    }

    /// Saves the loaded page for diagnosing layout drift
    fn save_diagnostics(&self, scope: Scope) {
        let path = PathBuf::from(&self.config.output.diagnostics_dir).join(format!(
            "{}-{}.html",
            scope.to_db_string(),
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));

        match self.browser.screenshot(&path) {
            Ok(()) => tracing::warn!("Unexpected page layout, saved {}", path.display()),
            Err(NavigationError::NoPage) => {}
            Err(e) => tracing::warn!("Could not save {}: {}", path.display(), e),
        }
    }
}

fn finish(items: Vec<HarvestedItem>, partial: bool) -> ScrapeOutcome {
    if items.is_empty() {
        ScrapeOutcome::NothingNew
    } else {
        ScrapeOutcome::Harvested { items, partial }
    }
}

/// True if the record is too young to be harvested yet
fn is_too_recent(record: &Record, min_age_days: u32) -> bool {
    min_age_days > 0
        && Utc::now().signed_duration_since(record.timestamp)
            <= chrono::Duration::days(i64::from(min_age_days))
}
