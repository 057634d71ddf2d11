//! Harvest coordinator - run orchestration
//!
//! This module owns everything a run needs (configuration, persistence
//! gateway, browser, normalizer, media fetcher, pacing and the cancellation
//! flag) and drives the two run flows:
//! - Profile mode: new posts of a timeline, then their reply threads
//! - Single-post mode: one post, then its reply thread

use crate::config::Config;
use crate::harvester::attachments::{HttpMediaFetcher, MediaFetcher};
use crate::harvester::controller::{status_url, FeedTarget, ScrapeOutcome};
use crate::harvester::navigator::{build_http_client, Browser, HttpNavigator};
use crate::harvester::normalizer::{HtmlNormalizer, Normalizer};
use crate::harvester::pacing::Pacer;
use crate::harvester::walker::{Leaf, WalkReport};
use crate::storage::Storage;
use crate::HarvestError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Main harvester structure
pub struct Harvester<S: Storage> {
    pub(crate) config: Config,
    pub(crate) storage: S,
    pub(crate) browser: Box<dyn Browser>,
    pub(crate) normalizer: Box<dyn Normalizer>,
    pub(crate) media: Box<dyn MediaFetcher>,
    pub(crate) pacer: Pacer,
    cancel: Arc<AtomicBool>,
}

impl<S: Storage> Harvester<S> {
    /// Creates a harvester from its collaborators
    pub fn new(
        config: Config,
        storage: S,
        browser: Box<dyn Browser>,
        normalizer: Box<dyn Normalizer>,
        media: Box<dyn MediaFetcher>,
    ) -> Self {
        let pacer = Pacer::new(config.pacing.clone());
        Self {
            config,
            storage,
            browser,
            normalizer,
            media,
            pacer,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a harvester that reads the configured front-end over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `storage` - The persistence gateway
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Successfully created harvester
    /// * `Err(HarvestError)` - Invalid base URL or HTTP client setup failure
    pub fn with_http(config: Config, storage: S) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.source.base_url)?;
        let client = build_http_client(&config.source)?;

        let browser = Box::new(HttpNavigator::new(client.clone()));
        let normalizer = Box::new(HtmlNormalizer::new(base_url, &config.markers));
        let media = Box::new(HttpMediaFetcher::new(client));

        Ok(Self::new(config, storage, browser, normalizer, media))
    }

    /// Flag that stops the run at the next page or branch boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// URL of a profile timeline
    pub fn profile_url(&self, username: &str) -> String {
        format!(
            "{}/{}",
            self.config.source.base_url.trim_end_matches('/'),
            username
        )
    }

    /// Runs one harvest
    pub async fn run(&mut self, request: &HarvestRequest) -> HarvestSummary {
        let username = request.profile.trim_start_matches('@').to_string();

        match &request.post {
            Some(post_id) => self.run_single_post(&username, post_id).await,
            None => self.run_profile(&username).await,
        }
    }

    /// Harvests new posts of a timeline, then the replies of those with replies
    async fn run_profile(&mut self, username: &str) -> HarvestSummary {
        let settings = self.config.harvester.clone();
        let mut summary = HarvestSummary::default();

        tracing::info!("Harvesting profile {}", username);

        let target =
            FeedTarget::profile(self.profile_url(username), username, settings.min_age_days);
        let outcome = self
            .scrape_feed(&target, settings.max_posts, settings.force)
            .await;
        summary.record_posts(&outcome);

        if settings.max_comments > 0 {
            let leaves: Vec<Leaf> = outcome.items().iter().map(Leaf::root).collect();
            let walk = self
                .deep_scrape(leaves, settings.force, settings.max_comments, 0)
                .await;
            summary.record_walk(walk);
        }

        summary.cancelled = self.is_cancelled();
        summary
    }

    /// Harvests one post, then its replies regardless of whether it was new
    async fn run_single_post(&mut self, username: &str, post_id: &str) -> HarvestSummary {
        let settings = self.config.harvester.clone();
        let mut summary = HarvestSummary::default();

        let url = status_url(&self.config.source.base_url, username, post_id);
        tracing::info!("Harvesting post {}", url);

        let target = FeedTarget::profile(url.clone(), username, 0);
        let outcome = self.scrape_feed(&target, 1, settings.force).await;
        summary.record_posts(&outcome);

        if settings.max_comments > 0 && !self.is_cancelled() {
            // An archived post's reply count is not reloaded; assume it has replies
            let replies = outcome.items().first().map_or(1, |item| item.replies);
            let root = Leaf {
                id: post_id.to_string(),
                url: url.clone(),
                replies,
                root_id: post_id.to_string(),
                root_url: url,
            };
            let walk = self
                .deep_scrape(vec![root], settings.force, settings.max_comments, 0)
                .await;
            summary.record_walk(walk);
        }

        summary.cancelled = self.is_cancelled();
        summary
    }
}

/// What to harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    /// Profile username, with or without a leading '@'
    pub profile: String,

    /// Single post id; harvests that post and its thread instead of the timeline
    pub post: Option<String>,
}

/// Totals of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub posts_stored: usize,
    pub comments_stored: usize,
    pub threads_visited: usize,
    pub failed_threads: usize,

    /// Set when the post feed itself could not be harvested
    pub target_unreachable: bool,

    pub cancelled: bool,
}

impl HarvestSummary {
    fn record_posts(&mut self, outcome: &ScrapeOutcome) {
        self.posts_stored += outcome.items().len();
        self.target_unreachable |= outcome.is_unreachable();
    }

    fn record_walk(&mut self, walk: WalkReport) {
        self.comments_stored += walk.comments_stored;
        self.threads_visited += walk.threads_visited;
        self.failed_threads += walk.failed_branches;
    }
}

/// Runs a complete harvest
///
/// # Arguments
///
/// * `harvester` - The harvester holding configuration, storage and browser
/// * `request` - Which profile or post to harvest
///
/// # Returns
///
/// Totals of the run. Mid-run failures degrade to partial results and are
/// reported through the summary and the log, never as an error.
pub async fn run_harvest<S: Storage>(
    harvester: &mut Harvester<S>,
    request: &HarvestRequest,
) -> HarvestSummary {
    let summary = harvester.run(request).await;

    tracing::info!(
        "Harvest completed: {} posts, {} comments from {} threads ({} failed)",
        summary.posts_stored,
        summary.comments_stored,
        summary.threads_visited,
        summary.failed_threads
    );

    summary
}
