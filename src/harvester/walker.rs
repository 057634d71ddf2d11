//! Recursive thread walker
//!
//! Expands reply threads depth-first, one branch at a time, so the whole
//! walk shares the pacing of a single browser session. Every stored comment
//! carries its parent page, its root post and its depth.

use crate::harvester::controller::{FeedTarget, HarvestedItem, ScrapeOutcome};
use crate::harvester::coordinator::Harvester;
use crate::model::Ancestry;
use crate::state::RescrapeMode;
use crate::storage::Storage;
use std::future::Future;
use std::pin::Pin;

/// A stored record whose replies are worth expanding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub id: String,

    /// Thread page of the record
    pub url: String,

    pub replies: u64,

    /// Top-level post the walk started from
    pub root_id: String,
    pub root_url: String,
}

impl Leaf {
    /// A top-level post starting its own tree
    pub fn root(item: &HarvestedItem) -> Self {
        Self {
            id: item.id.clone(),
            url: item.url.clone(),
            replies: item.replies,
            root_id: item.id.clone(),
            root_url: item.url.clone(),
        }
    }

    /// A reply found under `self`, sharing its root
    pub fn child(&self, item: &HarvestedItem) -> Self {
        Self {
            id: item.id.clone(),
            url: item.url.clone(),
            replies: item.replies,
            root_id: self.root_id.clone(),
            root_url: self.root_url.clone(),
        }
    }

    /// Ancestry of the replies listed on this leaf's thread page
    pub fn ancestry(&self) -> Ancestry {
        Ancestry {
            parent_ref_id: self.id.clone(),
            parent_url: self.url.clone(),
            root_ref_id: self.root_id.clone(),
            root_url: self.root_url.clone(),
        }
    }
}

/// Totals of one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// Thread pages traversed
    pub threads_visited: usize,

    /// Comments stored at every level
    pub comments_stored: usize,

    /// Thread pages that could not be harvested
    pub failed_branches: usize,
}

impl WalkReport {
    fn merge(&mut self, other: WalkReport) {
        self.threads_visited += other.threads_visited;
        self.comments_stored += other.comments_stored;
        self.failed_branches += other.failed_branches;
    }
}

impl<S: Storage> Harvester<S> {
    /// Deepest level the walker stores for this run
    ///
    /// Without deep mode only direct replies are harvested.
    pub fn max_walk_depth(&self) -> u32 {
        let max_depth = self.config.harvester.max_depth;
        if self.config.harvester.deep {
            max_depth
        } else {
            max_depth.min(1)
        }
    }

    /// Harvests the replies of every leaf with replies, recursing into replies of replies
    ///
    /// Returns immediately once `depth` reaches the walk depth limit. Replies
    /// of a leaf are stored at `depth + 1`. A branch that fails does not stop
    /// its siblings.
    ///
    /// # Arguments
    ///
    /// * `leaves` - Records whose threads are expanded
    /// * `mode` - Rescrape mode for the thread scope
    /// * `max_per_level` - Maximum new comments stored per thread page
    /// * `depth` - Depth of `leaves`
    pub fn deep_scrape<'a>(
        &'a mut self,
        leaves: Vec<Leaf>,
        mode: RescrapeMode,
        max_per_level: usize,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = WalkReport> + 'a>> {
        Box::pin(async move {
            let mut report = WalkReport::default();

            if depth >= self.max_walk_depth() {
                return report;
            }

            for leaf in leaves.into_iter().filter(|l| l.replies > 0) {
                if self.is_cancelled() {
                    tracing::warn!("Cancelled; skipping remaining threads at depth {}", depth);
                    break;
                }

                let target = FeedTarget::thread(leaf.ancestry(), depth + 1);
                let outcome = self.scrape_feed(&target, max_per_level, mode).await;
                report.threads_visited += 1;

                if outcome.is_unreachable() {
                    tracing::warn!("Could not harvest replies of {}: {:?}", leaf.id, outcome);
                    report.failed_branches += 1;
                    continue;
                }

                let stored = outcome.items();
                report.comments_stored += stored.len();

                let children: Vec<Leaf> = stored
                    .iter()
                    .filter(|item| item.has_replies())
                    .map(|item| leaf.child(item))
                    .collect();

                if !children.is_empty() {
                    tracing::debug!(
                        "Descending into {} replies of {} at depth {}",
                        children.len(),
                        leaf.id,
                        depth + 1
                    );
                    let nested = self
                        .deep_scrape(children, mode, max_per_level, depth + 1)
                        .await;
                    report.merge(nested);
                }
            }

            report
        })
    }
}
