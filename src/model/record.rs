use crate::model::fingerprint::{fingerprint, timestamp_iso};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text stored in place of media bytes the archive refused as too large
pub const OVERSIZE_PLACEHOLDER: &str = "Too large to store in database.";

/// Engagement counters shown under a post
///
/// Each counter defaults to zero on its own when missing or unparsable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub replies: u64,
    pub reposts: u64,
    pub quotes: u64,
    pub likes: u64,
    pub views: u64,
}

impl Stats {
    /// Builds stats from the rendered counters, in display order
    ///
    /// Extra counters are ignored; missing ones stay zero.
    pub fn from_counters<S: AsRef<str>>(counters: &[S]) -> Self {
        let mut values = [0u64; 5];
        for (slot, raw) in values.iter_mut().zip(counters) {
            *slot = parse_count(raw.as_ref());
        }
        let [replies, reposts, quotes, likes, views] = values;
        Self {
            replies,
            reposts,
            quotes,
            likes,
            views,
        }
    }
}

/// Parses a US-formatted counter ("1,234"); blanks, "GIF" and garbage read as 0
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().unwrap_or(0)
}

/// Where a comment sits in its reply tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    /// Id of the post whose thread page listed this comment
    pub parent_ref_id: String,

    /// URL of that thread page
    pub parent_url: String,

    /// Id of the top-level post the walk started from
    pub root_ref_id: String,

    /// URL of that top-level post
    pub root_url: String,
}

/// A post embedded inside another post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedRecord {
    pub id: Option<String>,
    pub text: String,
    pub author_username: Option<String>,
    pub author_fullname: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub media_urls: Vec<String>,
}

/// A post or a comment
///
/// For reposts the author fields carry the original author; the account that
/// reposted it is kept in `reposted_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub author_username: String,
    pub author_fullname: String,
    pub reposted_by: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub links: Vec<String>,
    pub stats: Stats,
    pub is_repost: bool,
    pub fingerprint: String,
    pub media_urls: Vec<String>,
    pub quote: Option<QuotedRecord>,

    /// Username whose timeline listed this record (profile scope only)
    pub timeline: Option<String>,

    /// Thread placement (thread scope only)
    pub ancestry: Option<Ancestry>,

    /// 0 for posts, parent depth + 1 for comments
    pub depth: u32,

    /// Pinned above the newest posts; not stored
    pub pinned: bool,
}

impl Record {
    /// Creates a record and computes its fingerprint
    pub fn new(
        id: String,
        author_username: String,
        author_fullname: String,
        timestamp: DateTime<Utc>,
        text: String,
    ) -> Self {
        let fingerprint = fingerprint(&text, &timestamp, &author_username);
        Self {
            id,
            author_username,
            author_fullname,
            reposted_by: None,
            timestamp,
            text,
            hashtags: Vec::new(),
            mentions: Vec::new(),
            links: Vec::new(),
            stats: Stats::default(),
            is_repost: false,
            fingerprint,
            media_urls: Vec::new(),
            quote: None,
            timeline: None,
            ancestry: None,
            depth: 0,
            pinned: false,
        }
    }

    /// ISO-8601 UTC timestamp as stored
    pub fn timestamp_iso(&self) -> String {
        timestamp_iso(&self.timestamp)
    }

    /// Media URLs that belong to this record and not to its quote
    pub fn own_media_urls(&self) -> Vec<String> {
        let quoted: &[String] = self
            .quote
            .as_ref()
            .map(|q| q.media_urls.as_slice())
            .unwrap_or(&[]);

        let mut own: Vec<String> = Vec::new();
        for url in &self.media_urls {
            if !quoted.contains(url) && !own.contains(url) {
                own.push(url.clone());
            }
        }
        own
    }
}

/// Stored form of one media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Bytes(Vec<u8>),
    Placeholder,
}

impl MediaPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Placeholder => OVERSIZE_PLACEHOLDER.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// One fetched media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub url: String,
    pub payload: MediaPayload,

    /// Size of the fetched file, kept even when the payload is a placeholder
    pub size_bytes: usize,
}

impl MediaItem {
    pub fn new(url: String, bytes: Vec<u8>) -> Self {
        let size_bytes = bytes.len();
        Self {
            url,
            payload: MediaPayload::Bytes(bytes),
            size_bytes,
        }
    }
}

/// Media bundled with the id of the record it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub owner_ref_id: String,
    pub media: Vec<MediaItem>,

    /// True when the owner is a quoted post
    pub is_quote: bool,
}

impl AttachmentRecord {
    /// Approximate size of the stored document in bytes
    pub fn document_size(&self) -> usize {
        self.owner_ref_id.len()
            + self
                .media
                .iter()
                .map(|m| m.url.len() + m.payload.len())
                .sum::<usize>()
    }

    /// Returns a copy with every binary payload replaced by the placeholder
    pub fn with_placeholders(&self) -> Self {
        Self {
            owner_ref_id: self.owner_ref_id.clone(),
            media: self
                .media
                .iter()
                .map(|m| MediaItem {
                    url: m.url.clone(),
                    payload: MediaPayload::Placeholder,
                    size_bytes: m.size_bytes,
                })
                .collect(),
            is_quote: self.is_quote,
        }
    }
}

/// Follower and activity counters of a profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub posts: u64,
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
}

/// An author profile card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub username: String,
    pub fullname: String,
    pub join_date: Option<String>,
    pub counts: ProfileCounts,
    pub verified: bool,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}
