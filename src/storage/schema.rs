//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Harvest archive.
//! Posts and comments share one column layout; ids are not unique because a
//! forced re-harvest intentionally stores duplicates.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Posts harvested from profile timelines
CREATE TABLE IF NOT EXISTS posts (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    author_username TEXT NOT NULL,
    author_fullname TEXT NOT NULL,
    reposted_by TEXT,
    timestamp_utc TEXT NOT NULL,
    text TEXT NOT NULL,
    hashtags TEXT NOT NULL,
    mentions TEXT NOT NULL,
    links TEXT NOT NULL,
    replies INTEGER NOT NULL DEFAULT 0,
    reposts INTEGER NOT NULL DEFAULT 0,
    quotes INTEGER NOT NULL DEFAULT 0,
    likes INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    is_repost INTEGER NOT NULL DEFAULT 0,
    media_urls TEXT NOT NULL,
    quote TEXT,
    timeline TEXT,
    parent_ref_id TEXT,
    parent_url TEXT,
    root_ref_id TEXT,
    root_url TEXT,
    depth INTEGER NOT NULL DEFAULT 0,
    harvested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_fingerprint ON posts(fingerprint);
CREATE INDEX IF NOT EXISTS idx_posts_timeline ON posts(timeline);

-- Comments harvested from reply threads
CREATE TABLE IF NOT EXISTS comments (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    author_username TEXT NOT NULL,
    author_fullname TEXT NOT NULL,
    reposted_by TEXT,
    timestamp_utc TEXT NOT NULL,
    text TEXT NOT NULL,
    hashtags TEXT NOT NULL,
    mentions TEXT NOT NULL,
    links TEXT NOT NULL,
    replies INTEGER NOT NULL DEFAULT 0,
    reposts INTEGER NOT NULL DEFAULT 0,
    quotes INTEGER NOT NULL DEFAULT 0,
    likes INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    is_repost INTEGER NOT NULL DEFAULT 0,
    media_urls TEXT NOT NULL,
    quote TEXT,
    timeline TEXT,
    parent_ref_id TEXT,
    parent_url TEXT,
    root_ref_id TEXT,
    root_url TEXT,
    depth INTEGER NOT NULL DEFAULT 0,
    harvested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_fingerprint ON comments(fingerprint);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_ref_id);

-- Media bundles, one per owning record
CREATE TABLE IF NOT EXISTS attachments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_ref_id TEXT NOT NULL,
    is_quote INTEGER NOT NULL DEFAULT 0,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attachments_owner ON attachments(owner_ref_id);

-- Individual media files; exactly one of payload / placeholder is set
CREATE TABLE IF NOT EXISTS attachment_media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attachment_id INTEGER NOT NULL REFERENCES attachments(id),
    url TEXT NOT NULL,
    payload BLOB,
    placeholder TEXT,
    size_bytes INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attachment_media_attachment ON attachment_media(attachment_id);

-- Profile cards
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    fullname TEXT NOT NULL,
    join_date TEXT,
    posts INTEGER NOT NULL DEFAULT 0,
    following INTEGER NOT NULL DEFAULT 0,
    followers INTEGER NOT NULL DEFAULT 0,
    likes INTEGER NOT NULL DEFAULT 0,
    verified INTEGER NOT NULL DEFAULT 0,
    bio TEXT,
    location TEXT,
    website TEXT,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_profiles_username ON profiles(username);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
