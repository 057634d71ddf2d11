//! Content normalizer for server-rendered timeline markup
//!
//! This module turns raw page fragments into typed records:
//! - Post id, author and timestamp (required; the fragment is dropped without them)
//! - Body text split into hashtags, mentions and links
//! - Engagement counters, repost and pinned markers
//! - Media references and the quoted sub-post
//! - The profile card of a timeline page
//!
//! Optional fields never discard a record: a missing or malformed optional
//! field is left at its default.

use crate::config::MarkerConfig;
use crate::model::{ProfileCounts, ProfileRecord, QuotedRecord, Record, Stats};
use crate::state::Scope;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns page fragments into records
pub trait Normalizer: Send + Sync {
    /// Normalizes one timeline item or reply; `None` when a required field is missing
    fn parse(&self, fragment: &str, scope: Scope) -> Option<Record>;

    /// Normalizes the profile card of a timeline page
    fn parse_profile(&self, page: &str) -> Option<ProfileRecord>;
}

/// Normalizer for the front-end's HTML
pub struct HtmlNormalizer {
    base_url: Url,
    item_class: String,
}

impl HtmlNormalizer {
    pub fn new(base_url: Url, markers: &MarkerConfig) -> Self {
        Self {
            base_url,
            item_class: markers.timeline_item_class.clone(),
        }
    }

    fn absolute(&self, href: &str) -> Option<String> {
        self.base_url.join(href.trim()).ok().map(|u| u.to_string())
    }

    /// Media references under `scope_el`, skipping quoted media unless `in_quote`
    fn media_urls(&self, scope_el: &ElementRef<'_>, in_quote: bool) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for css in [".attachments img", ".attachments video source"] {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for element in scope_el.select(&selector) {
                if !in_quote && inside_quote(&element) {
                    continue;
                }
                if let Some(url) = element.value().attr("src").and_then(|s| self.absolute(s)) {
                    if !urls.contains(&url) {
                        urls.push(url);
                    }
                }
            }
        }
        urls
    }

    fn parse_quote(&self, item: &ElementRef<'_>) -> Option<QuotedRecord> {
        let quote = select_first(item, ".quote", |_| true)?;

        let text = select_first(&quote, ".quote-text", |_| true)
            .map(|e| element_text(&e))
            .unwrap_or_default();

        let (author_username, author_fullname) = match select_first(&quote, "a.fullname", |_| true)
        {
            Some(a) => (
                a.value().attr("href").map(username_from_href),
                Some(element_text(&a).trim().to_string()),
            ),
            None => (None, None),
        };

        let date_link = select_first(&quote, ".tweet-date a", |_| true);
        let timestamp = date_link
            .and_then(|a| a.value().attr("title"))
            .and_then(parse_timestamp);
        let id = date_link
            .and_then(|a| a.value().attr("href"))
            .or_else(|| {
                select_first(&quote, "a.quote-link", |_| true).and_then(|a| a.value().attr("href"))
            })
            .and_then(id_from_href);

        Some(QuotedRecord {
            id,
            text,
            author_username,
            author_fullname,
            timestamp,
            media_urls: self.media_urls(&quote, true),
        })
    }
}

impl Normalizer for HtmlNormalizer {
    fn parse(&self, fragment: &str, scope: Scope) -> Option<Record> {
        let document = Html::parse_fragment(fragment);
        let root = document.root_element();
        let item = select_first(&root, &format!(".{}", self.item_class), |_| true).unwrap_or(root);

        // Required: id and timestamp from the permalink, body text
        let date_link = select_first(&item, ".tweet-date a", outside_quote)?;
        let href = date_link.value().attr("href")?;
        let id = id_from_href(href)?;
        let Some(timestamp) = date_link.value().attr("title").and_then(parse_timestamp) else {
            tracing::debug!("Dropping {} item {}: unreadable timestamp", scope, id);
            return None;
        };
        let content = select_first(&item, ".tweet-content", outside_quote)?;
        let text = element_text(&content);

        let (author_username, author_fullname) = match select_first(&item, "a.fullname", outside_quote) {
            Some(a) => (
                a.value()
                    .attr("href")
                    .map(username_from_href)
                    .unwrap_or_else(|| username_from_href(href)),
                element_text(&a).trim().to_string(),
            ),
            None => (username_from_href(href), String::new()),
        };
        if author_username.is_empty() {
            return None;
        }

        let mut record = Record::new(id, author_username, author_fullname, timestamp, text);

        let anchors = Selector::parse("a").ok();
        if let Some(anchors) = anchors {
            for anchor in content.select(&anchors) {
                let label = element_text(&anchor).trim().to_string();
                if has_tag(&label, '#') {
                    record.hashtags.push(label);
                } else if has_tag(&label, '@') {
                    record.mentions.push(label);
                } else {
                    let link = anchor
                        .value()
                        .attr("href")
                        .and_then(|h| self.absolute(h))
                        .unwrap_or(label);
                    record.links.push(link);
                }
            }
        }

        let counters: Vec<String> = select_all(&item, ".tweet-stat", outside_quote)
            .iter()
            .map(element_text)
            .collect();
        record.stats = Stats::from_counters(&counters);

        if let Some(header) = select_first(&item, ".retweet-header", outside_quote) {
            record.is_repost = true;
            let reposter = element_text(&header)
                .trim()
                .trim_end_matches("retweeted")
                .trim()
                .to_string();
            if !reposter.is_empty() {
                record.reposted_by = Some(reposter);
            }
        }

        if scope == Scope::Profile {
            record.pinned = select_first(&item, ".pinned", outside_quote).is_some();
        }

        record.quote = self.parse_quote(&item);
        record.media_urls = self.media_urls(&item, false);

        Some(record)
    }

    fn parse_profile(&self, page: &str) -> Option<ProfileRecord> {
        let document = Html::parse_document(page);
        let root = document.root_element();

        let username = select_first(&root, ".profile-card-username", |_| true)
            .map(|e| element_text(&e).trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty())?;
        let fullname_el = select_first(&root, ".profile-card-fullname", |_| true);
        let fullname = fullname_el
            .map(|e| element_text(&e).trim().to_string())
            .unwrap_or_default();
        let verified = select_first(&root, ".verified-icon", |_| true).is_some();

        let join_date = select_first(&root, ".profile-joindate span", |_| true).map(|e| {
            e.value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| element_text(&e).trim().to_string())
        });

        let count = |class: &str| {
            select_first(
                &root,
                &format!(".profile-statlist .{} .profile-stat-num", class),
                |_| true,
            )
            .map(|e| crate::model::parse_count(&element_text(&e)))
            .unwrap_or(0)
        };
        let counts = ProfileCounts {
            posts: count("posts"),
            following: count("following"),
            followers: count("followers"),
            likes: count("likes"),
        };

        let optional_text = |css: &str| {
            select_first(&root, css, |_| true)
                .map(|e| element_text(&e).trim().to_string())
                .filter(|t| !t.is_empty())
        };

        Some(ProfileRecord {
            username,
            fullname,
            join_date,
            counts,
            verified,
            bio: optional_text(".profile-bio"),
            location: optional_text(".profile-location"),
            website: select_first(&root, ".profile-website a", |_| true)
                .and_then(|a| a.value().attr("href").map(str::to_string)),
        })
    }
}

// ===== Markup helpers =====

fn select_all<'a, F>(scope_el: &ElementRef<'a>, css: &str, keep: F) -> Vec<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    match Selector::parse(css) {
        Ok(selector) => scope_el.select(&selector).filter(|e| keep(e)).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_first<'a, F>(scope_el: &ElementRef<'a>, css: &str, keep: F) -> Option<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    let selector = Selector::parse(css).ok()?;
    let found = scope_el.select(&selector).find(|e| keep(e));
    found
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

fn inside_quote(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().classes().any(|c| c == "quote"))
}

fn outside_quote(element: &ElementRef<'_>) -> bool {
    !inside_quote(element)
}

/// Last path segment of a permalink, without its fragment
fn id_from_href(href: &str) -> Option<String> {
    let path = href.split(['#', '?']).next().unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// First path segment of a profile or permalink href
fn username_from_href(href: &str) -> String {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    path.trim_start_matches('/')
        .split(['/', '#', '?'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parses the permalink title, e.g. "Mar 21, 2006 · 8:50 PM UTC"
fn parse_timestamp(title: &str) -> Option<DateTime<Utc>> {
    let trimmed = title.trim().trim_end_matches("UTC").trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, "%b %d, %Y · %I:%M %p").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// True if `label` holds `sigil` followed by a word character
fn has_tag(label: &str, sigil: char) -> bool {
    let mut chars = label.chars().peekable();
    while let Some(c) = chars.next() {
        if c == sigil {
            if let Some(next) = chars.peek() {
                if next.is_ascii_alphanumeric() || *next == '_' {
                    return true;
                }
            }
        }
    }
    false
}
