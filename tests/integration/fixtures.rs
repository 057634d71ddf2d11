//! In-memory front-end used by the harvest tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use sumi_harvest::config::{
    Config, HarvesterConfig, MarkerConfig, OutputConfig, PacingConfig, SourceConfig,
};
use sumi_harvest::harvester::{
    Browser, Harvester, HtmlNormalizer, HttpNavigator, MediaError, MediaFetcher,
    NavigationError, PageElement,
};
use sumi_harvest::storage::{
    FingerprintFilter, SqliteStorage, Storage, StorageError, StorageResult,
};
use sumi_harvest::{AttachmentRecord, ProfileRecord, Record, Scope};
use url::Url;

pub const BASE: &str = "https://front.test";

/// What the fixture front-end serves for one load of a URL
#[derive(Debug, Clone)]
pub enum FixturePage {
    Html(String),
    RateLimited,
    NotFound(String),
}

/// Browser serving canned pages
///
/// Each URL holds a queue of responses; the last one repeats once the
/// others have been served.
pub struct FixtureBrowser {
    client: Client,
    pages: HashMap<String, VecDeque<FixturePage>>,
    current: Option<HttpNavigator>,
    visits: Arc<Mutex<Vec<String>>>,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            pages: HashMap::new(),
            current: None,
            visits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn page(mut self, url: &str, html: String) -> Self {
        self.pages
            .entry(url.to_string())
            .or_default()
            .push_back(FixturePage::Html(html));
        self
    }

    pub fn response(mut self, url: &str, page: FixturePage) -> Self {
        self.pages.entry(url.to_string()).or_default().push_back(page);
        self
    }

    /// Shared log of every navigated URL
    pub fn visits(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.visits)
    }

    fn loaded(&self) -> Result<&HttpNavigator, NavigationError> {
        self.current.as_ref().ok_or(NavigationError::NoPage)
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), NavigationError> {
        self.visits.lock().unwrap().push(url.to_string());

        let queue = self
            .pages
            .get_mut(url)
            .ok_or_else(|| NavigationError::Network {
                url: url.to_string(),
                message: "no fixture".to_string(),
            })?;
        let page = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };

        match page {
            FixturePage::Html(html) => {
                self.current = Some(HttpNavigator::with_page(self.client.clone(), url, &html)?);
                Ok(())
            }
            FixturePage::RateLimited => Err(NavigationError::RateLimited {
                url: url.to_string(),
            }),
            FixturePage::NotFound(html) => {
                self.current = Some(HttpNavigator::with_page(self.client.clone(), url, &html)?);
                Err(NavigationError::NotFound {
                    url: url.to_string(),
                })
            }
        }
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().and_then(|c| c.current_url())
    }

    fn find_elements_by_class(&self, class_name: &str) -> Result<Vec<PageElement>, NavigationError> {
        self.loaded()?.find_elements_by_class(class_name)
    }

    fn find_elements_by_link_text(&self, text: &str) -> Result<Vec<PageElement>, NavigationError> {
        self.loaded()?.find_elements_by_link_text(text)
    }

    fn find_elements_by_xpath(&self, expr: &str) -> Result<Vec<PageElement>, NavigationError> {
        self.loaded()?.find_elements_by_xpath(expr)
    }

    fn page_source(&self) -> Result<String, NavigationError> {
        self.loaded()?.page_source()
    }

    fn screenshot(&self, path: &Path) -> Result<(), NavigationError> {
        self.loaded()?.screenshot(path)
    }
}

/// Media fetcher serving canned bytes
#[derive(Default)]
pub struct FixtureMedia {
    files: HashMap<String, usize>,
}

impl FixtureMedia {
    pub fn file(mut self, path: &str, size: usize) -> Self {
        self.files.insert(format!("{}{}", BASE, path), size);
        self
    }
}

#[async_trait]
impl MediaFetcher for FixtureMedia {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        self.files
            .get(url)
            .map(|size| vec![1u8; *size])
            .ok_or_else(|| MediaError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// ===== Storage =====

/// Archive that refuses every post and comment but stores everything else
pub struct RejectingStorage {
    inner: SqliteStorage,
}

impl RejectingStorage {
    pub fn new() -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
        }
    }
}

impl Storage for RejectingStorage {
    fn insert_record(&mut self, _scope: Scope, record: &Record) -> StorageResult<()> {
        Err(StorageError::Serialization(format!("{} rejected", record.id)))
    }

    fn insert_records(&mut self, _scope: Scope, _records: &[Record]) -> StorageResult<usize> {
        Err(StorageError::Serialization("batch rejected".to_string()))
    }

    fn load_records(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        self.inner.load_records(scope)
    }

    fn find_fingerprints(
        &self,
        scope: Scope,
        filter: &FingerprintFilter,
    ) -> StorageResult<HashSet<String>> {
        self.inner.find_fingerprints(scope, filter)
    }

    fn insert_attachment(&mut self, attachment: &AttachmentRecord) -> StorageResult<()> {
        self.inner.insert_attachment(attachment)
    }

    fn load_attachments(&self) -> StorageResult<Vec<AttachmentRecord>> {
        self.inner.load_attachments()
    }

    fn find_profile(&self, username: &str) -> StorageResult<Option<ProfileRecord>> {
        self.inner.find_profile(username)
    }

    fn insert_profile(&mut self, profile: &ProfileRecord) -> StorageResult<()> {
        self.inner.insert_profile(profile)
    }

    fn count_records(&self, scope: Scope) -> StorageResult<u64> {
        self.inner.count_records(scope)
    }

    fn count_attachments(&self) -> StorageResult<u64> {
        self.inner.count_attachments()
    }

    fn count_placeholder_media(&self) -> StorageResult<u64> {
        self.inner.count_placeholder_media()
    }

    fn count_profiles(&self) -> StorageResult<u64> {
        self.inner.count_profiles()
    }

    fn max_stored_depth(&self) -> StorageResult<Option<u32>> {
        self.inner.max_stored_depth()
    }
}

// ===== Configuration =====

pub fn test_config(diagnostics_dir: &Path) -> Config {
    let mut output = OutputConfig::with_database(":memory:");
    output.diagnostics_dir = diagnostics_dir.display().to_string();

    Config {
        harvester: HarvesterConfig {
            max_comments: 0,
            ..HarvesterConfig::default()
        },
        pacing: PacingConfig::immediate(),
        source: SourceConfig {
            base_url: BASE.to_string(),
            ..SourceConfig::default()
        },
        markers: MarkerConfig::default(),
        output,
    }
}

pub fn harvester<S: Storage>(
    config: Config,
    storage: S,
    browser: FixtureBrowser,
    media: FixtureMedia,
) -> Harvester<S> {
    let normalizer = HtmlNormalizer::new(Url::parse(BASE).unwrap(), &config.markers);
    Harvester::new(
        config,
        storage,
        Box::new(browser),
        Box::new(normalizer),
        Box::new(media),
    )
}

// ===== Markup =====

/// A post or reply as the front-end renders it
pub struct Post {
    pub id: &'static str,
    pub user: &'static str,
    pub text: &'static str,
    pub replies: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub media: Vec<&'static str>,
    pub quote: Option<(&'static str, Vec<&'static str>)>,
    pub pinned: bool,
}

impl Post {
    pub fn new(id: &'static str, text: &'static str) -> Self {
        Self {
            id,
            user: "jack",
            text,
            replies: 0,
            timestamp: None,
            media: Vec::new(),
            quote: None,
            pinned: false,
        }
    }

    pub fn by(mut self, user: &'static str) -> Self {
        self.user = user;
        self
    }

    pub fn replies(mut self, replies: u64) -> Self {
        self.replies = replies;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn media(mut self, paths: &[&'static str]) -> Self {
        self.media = paths.to_vec();
        self
    }

    pub fn quoting(mut self, id: &'static str, media: &[&'static str]) -> Self {
        self.quote = Some((id, media.to_vec()));
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn html(&self) -> String {
        let title = match self.timestamp {
            Some(ts) => ts.format("%b %d, %Y · %I:%M %p UTC").to_string(),
            None => "Jan 5, 2024 · 3:04 PM UTC".to_string(),
        };

        let attachments = attachments_html(&self.media);

        let quote = match &self.quote {
            Some((id, media)) => format!(
                r#"<div class="quote"><a class="quote-link" href="/biz/status/{id}#m"></a>
                   <div class="tweet-name-row"><a class="fullname" href="/biz">Biz</a>
                   <span class="tweet-date"><a href="/biz/status/{id}#m" title="Jan 1, 2024 · 9:00 AM UTC">x</a></span></div>
                   <div class="quote-text">quoted {id}</div>
                   <div class="quote-media-container">{media}</div></div>"#,
                id = id,
                media = attachments_html(media)
            ),
            None => String::new(),
        };

        let pinned = if self.pinned {
            r#"<div class="pinned"><span>Pinned Tweet</span></div>"#
        } else {
            ""
        };

        let replies = if self.replies > 0 {
            self.replies.to_string()
        } else {
            String::new()
        };

        format!(
            r#"<div class="timeline-item">
                 {pinned}
                 <div class="tweet-header"><a class="fullname" href="/{user}">{user}</a>
                 <span class="tweet-date"><a href="/{user}/status/{id}#m" title="{title}">x</a></span></div>
                 <div class="tweet-content">{text}</div>
                 {attachments}
                 {quote}
                 <div class="tweet-stats">
                   <span class="tweet-stat"><span class="icon-comment"></span> {replies}</span>
                   <span class="tweet-stat"><span class="icon-retweet"></span> </span>
                   <span class="tweet-stat"><span class="icon-quote"></span> </span>
                   <span class="tweet-stat"><span class="icon-heart"></span> 1</span>
                 </div>
               </div>"#,
            pinned = pinned,
            user = self.user,
            id = self.id,
            title = title,
            text = self.text,
            attachments = attachments,
            quote = quote,
            replies = replies
        )
    }
}

fn attachments_html(paths: &[&str]) -> String {
    if paths.is_empty() {
        return String::new();
    }
    let images: String = paths
        .iter()
        .map(|p| format!(r#"<img src="{}">"#, p))
        .collect();
    format!(r#"<div class="attachments">{}</div>"#, images)
}

/// A timeline page; without `more` it ends with the end-of-feed marker
pub fn timeline_page(posts: &[Post], more: Option<&str>) -> String {
    let items: String = posts.iter().map(Post::html).collect();
    let footer = match more {
        Some(href) => format!(r#"<div class="show-more"><a href="{}">Load more</a></div>"#, href),
        None => r#"<h2 class="timeline-end">No more items</h2>"#.to_string(),
    };
    format!(
        r#"<html><body>
             <div class="profile-card">
               <a class="profile-card-fullname" href="/jack">Jack</a>
               <a class="profile-card-username" href="/jack">@jack</a>
               <ul class="profile-statlist"><li class="posts"><span class="profile-stat-num">1,204</span></li></ul>
             </div>
             <div class="timeline">{}</div>{}
           </body></html>"#,
        items, footer
    )
}

/// A thread page: the focused post followed by its replies
pub fn thread_page(root: &Post, replies: &[Post]) -> String {
    let replies: String = replies
        .iter()
        .map(|r| format!(r#"<div class="reply thread">{}</div>"#, r.html()))
        .collect();
    format!(
        r#"<html><body>
             <div class="main-thread"><div class="main-tweet">{}</div></div>
             <div class="replies">{}</div>
             <h2 class="timeline-end">No more items</h2>
           </body></html>"#,
        root.html(),
        replies
    )
}

pub fn status(user: &str, id: &str) -> String {
    format!("{}/{}/status/{}", BASE, user, id)
}

pub fn profile(user: &str) -> String {
    format!("{}/{}", BASE, user)
}
