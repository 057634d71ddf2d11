//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! SQLite has no per-row size cap of its own, so the document limit of the
//! archive is enforced here on attachment writes.

use crate::model::{
    Ancestry, AttachmentRecord, MediaItem, MediaPayload, ProfileCounts, ProfileRecord,
    QuotedRecord, Record, Stats,
};
use crate::state::Scope;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FingerprintFilter, Storage, StorageError, StorageResult};
use crate::storage::DEFAULT_MAX_DOCUMENT_BYTES;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const RECORD_COLUMNS: &str = "id, fingerprint, author_username, author_fullname, reposted_by,
    timestamp_utc, text, hashtags, mentions, links, replies, reposts, quotes, likes, views,
    is_repost, media_urls, quote, timeline, parent_ref_id, parent_url, root_ref_id, root_url,
    depth";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    max_document_bytes: usize,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        })
    }

    /// Sets the largest attachment document accepted
    pub fn with_document_limit(mut self, max_document_bytes: usize) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Table holding the records of a scope
fn record_table(scope: Scope) -> &'static str {
    match scope {
        Scope::Profile => "posts",
        Scope::Thread => "comments",
    }
}

fn insert_record_into(conn: &Connection, scope: Scope, record: &Record) -> StorageResult<()> {
    let sql = format!(
        "INSERT INTO {} ({}, harvested_at) VALUES
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
          ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
        record_table(scope),
        RECORD_COLUMNS
    );

    let quote = record
        .quote
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let ancestry = record.ancestry.as_ref();

    conn.execute(
        &sql,
        params![
            record.id,
            record.fingerprint,
            record.author_username,
            record.author_fullname,
            record.reposted_by,
            record.timestamp_iso(),
            record.text,
            serde_json::to_string(&record.hashtags)?,
            serde_json::to_string(&record.mentions)?,
            serde_json::to_string(&record.links)?,
            record.stats.replies as i64,
            record.stats.reposts as i64,
            record.stats.quotes as i64,
            record.stats.likes as i64,
            record.stats.views as i64,
            record.is_repost,
            serde_json::to_string(&record.media_urls)?,
            quote,
            record.timeline,
            ancestry.map(|a| a.parent_ref_id.as_str()),
            ancestry.map(|a| a.parent_url.as_str()),
            ancestry.map(|a| a.root_ref_id.as_str()),
            ancestry.map(|a| a.root_url.as_str()),
            record.depth,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Raw column values of a stored record, decoded after the query finishes
struct StoredRecord {
    id: String,
    fingerprint: String,
    author_username: String,
    author_fullname: String,
    reposted_by: Option<String>,
    timestamp_utc: String,
    text: String,
    hashtags: String,
    mentions: String,
    links: String,
    counters: [i64; 5],
    is_repost: bool,
    media_urls: String,
    quote: Option<String>,
    timeline: Option<String>,
    parent_ref_id: Option<String>,
    parent_url: Option<String>,
    root_ref_id: Option<String>,
    root_url: Option<String>,
    depth: u32,
}

impl StoredRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            fingerprint: row.get(1)?,
            author_username: row.get(2)?,
            author_fullname: row.get(3)?,
            reposted_by: row.get(4)?,
            timestamp_utc: row.get(5)?,
            text: row.get(6)?,
            hashtags: row.get(7)?,
            mentions: row.get(8)?,
            links: row.get(9)?,
            counters: [
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
                row.get(13)?,
                row.get(14)?,
            ],
            is_repost: row.get(15)?,
            media_urls: row.get(16)?,
            quote: row.get(17)?,
            timeline: row.get(18)?,
            parent_ref_id: row.get(19)?,
            parent_url: row.get(20)?,
            root_ref_id: row.get(21)?,
            root_url: row.get(22)?,
            depth: row.get(23)?,
        })
    }

    fn into_record(self) -> StorageResult<Record> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp_utc)
            .map_err(|e| StorageError::Serialization(e.to_string()))?
            .with_timezone(&Utc);

        let [replies, reposts, quotes, likes, views] = self.counters.map(|c| c.max(0) as u64);

        let quote: Option<QuotedRecord> = self
            .quote
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        let ancestry = match (
            self.parent_ref_id,
            self.parent_url,
            self.root_ref_id,
            self.root_url,
        ) {
            (Some(parent_ref_id), Some(parent_url), Some(root_ref_id), Some(root_url)) => {
                Some(Ancestry {
                    parent_ref_id,
                    parent_url,
                    root_ref_id,
                    root_url,
                })
            }
            _ => None,
        };

        Ok(Record {
            id: self.id,
            author_username: self.author_username,
            author_fullname: self.author_fullname,
            reposted_by: self.reposted_by,
            timestamp,
            text: self.text,
            hashtags: serde_json::from_str(&self.hashtags)?,
            mentions: serde_json::from_str(&self.mentions)?,
            links: serde_json::from_str(&self.links)?,
            stats: Stats {
                replies,
                reposts,
                quotes,
                likes,
                views,
            },
            is_repost: self.is_repost,
            fingerprint: self.fingerprint,
            media_urls: serde_json::from_str(&self.media_urls)?,
            quote,
            timeline: self.timeline,
            ancestry,
            depth: self.depth,
            pinned: false,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Records =====

    fn insert_record(&mut self, scope: Scope, record: &Record) -> StorageResult<()> {
        insert_record_into(&self.conn, scope, record)
    }

    fn insert_records(&mut self, scope: Scope, records: &[Record]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        for record in records {
            insert_record_into(&tx, scope, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn load_records(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY row_id",
            RECORD_COLUMNS,
            record_table(scope)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], StoredRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredRecord::into_record).collect()
    }

    // ===== Deduplication =====

    fn find_fingerprints(
        &self,
        scope: Scope,
        filter: &FingerprintFilter,
    ) -> StorageResult<HashSet<String>> {
        let table = record_table(scope);
        let fingerprints = match filter {
            FingerprintFilter::All => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT fingerprint FROM {}", table))?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<HashSet<_>, _>>()?
            }
            FingerprintFilter::Timeline(username) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT fingerprint FROM {} WHERE timeline = ?1",
                    table
                ))?;
                let rows = stmt.query_map(params![username], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<HashSet<_>, _>>()?
            }
        };
        Ok(fingerprints)
    }

    // ===== Attachments =====

    fn insert_attachment(&mut self, attachment: &AttachmentRecord) -> StorageResult<()> {
        let size = attachment.document_size();
        if size > self.max_document_bytes {
            return Err(StorageError::Oversize {
                size,
                limit: self.max_document_bytes,
            });
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO attachments (owner_ref_id, is_quote, stored_at) VALUES (?1, ?2, ?3)",
            params![
                attachment.owner_ref_id,
                attachment.is_quote,
                Utc::now().to_rfc3339()
            ],
        )?;
        let attachment_id = tx.last_insert_rowid();

        for item in &attachment.media {
            let (payload, placeholder) = match &item.payload {
                MediaPayload::Bytes(bytes) => (Some(bytes.as_slice()), None),
                MediaPayload::Placeholder => (None, Some(crate::model::OVERSIZE_PLACEHOLDER)),
            };
            tx.execute(
                "INSERT INTO attachment_media (attachment_id, url, payload, placeholder, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attachment_id,
                    item.url,
                    payload,
                    placeholder,
                    item.size_bytes as i64
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_attachments(&self) -> StorageResult<Vec<AttachmentRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, owner_ref_id, is_quote FROM attachments ORDER BY id")?;
        let headers = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut media_stmt = self.conn.prepare(
            "SELECT url, payload, size_bytes FROM attachment_media
             WHERE attachment_id = ?1 ORDER BY id",
        )?;

        let mut attachments = Vec::with_capacity(headers.len());
        for (attachment_id, owner_ref_id, is_quote) in headers {
            let media = media_stmt
                .query_map(params![attachment_id], |row| {
                    let payload: Option<Vec<u8>> = row.get(1)?;
                    let size_bytes: i64 = row.get(2)?;
                    Ok(MediaItem {
                        url: row.get(0)?,
                        payload: payload.map_or(MediaPayload::Placeholder, MediaPayload::Bytes),
                        size_bytes: size_bytes.max(0) as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            attachments.push(AttachmentRecord {
                owner_ref_id,
                media,
                is_quote,
            });
        }
        Ok(attachments)
    }

    fn document_size_limit(&self) -> Option<usize> {
        Some(self.max_document_bytes)
    }

    // ===== Profiles =====

    fn find_profile(&self, username: &str) -> StorageResult<Option<ProfileRecord>> {
        let profile = self
            .conn
            .query_row(
                "SELECT username, fullname, join_date, posts, following, followers, likes,
                 verified, bio, location, website
                 FROM profiles WHERE username = ?1 ORDER BY id DESC LIMIT 1",
                params![username],
                |row| {
                    let counts: [i64; 4] = [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?];
                    let [posts, following, followers, likes] = counts.map(|c| c.max(0) as u64);
                    Ok(ProfileRecord {
                        username: row.get(0)?,
                        fullname: row.get(1)?,
                        join_date: row.get(2)?,
                        counts: ProfileCounts {
                            posts,
                            following,
                            followers,
                            likes,
                        },
                        verified: row.get(7)?,
                        bio: row.get(8)?,
                        location: row.get(9)?,
                        website: row.get(10)?,
                    })
                },
            )
            .optional()?;

        Ok(profile)
    }

    fn insert_profile(&mut self, profile: &ProfileRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO profiles (username, fullname, join_date, posts, following, followers,
             likes, verified, bio, location, website, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                profile.username,
                profile.fullname,
                profile.join_date,
                profile.counts.posts as i64,
                profile.counts.following as i64,
                profile.counts.followers as i64,
                profile.counts.likes as i64,
                profile.verified,
                profile.bio,
                profile.location,
                profile.website,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_records(&self, scope: Scope) -> StorageResult<u64> {
        self.count(&format!("SELECT COUNT(*) FROM {}", record_table(scope)))
    }

    fn count_attachments(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM attachments")
    }

    fn count_placeholder_media(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM attachment_media WHERE placeholder IS NOT NULL")
    }

    fn count_profiles(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT username) FROM profiles")
    }

    fn max_stored_depth(&self) -> StorageResult<Option<u32>> {
        let depth: Option<u32> =
            self.conn
                .query_row("SELECT MAX(depth) FROM comments", [], |row| row.get(0))?;
        Ok(depth)
    }
}
