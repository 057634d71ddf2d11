//! Statistics generation from the archive database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::state::Scope;
use crate::storage::{Storage, StorageResult};

/// Archive statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStatistics {
    /// Posts stored from profile timelines
    pub posts: u64,

    /// Comments stored from reply threads
    pub comments: u64,

    /// Media bundles stored
    pub attachments: u64,

    /// Media files stored as a placeholder instead of their bytes
    pub placeholder_media: u64,

    /// Profile cards stored
    pub profiles: u64,

    /// Deepest comment level stored, if any comment exists
    pub max_depth: Option<u32>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        posts: storage.count_records(Scope::Profile)?,
        comments: storage.count_records(Scope::Thread)?,
        attachments: storage.count_attachments()?,
        placeholder_media: storage.count_placeholder_media()?,
        profiles: storage.count_profiles()?,
        max_depth: storage.max_stored_depth()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Records:");
    println!("  Posts: {}", stats.posts);
    println!("  Comments: {}", stats.comments);
    match stats.max_depth {
        Some(depth) => println!("  Deepest reply level: {}", depth),
        None => println!("  Deepest reply level: -"),
    }
    println!();

    println!("Media:");
    println!("  Attachment bundles: {}", stats.attachments);
    println!("  Stored as placeholder: {}", stats.placeholder_media);
    println!();

    println!("Profiles: {}", stats.profiles);
    println!();

    let total = stats.posts + stats.comments;
    let comments_per_post = if stats.posts > 0 {
        stats.comments as f64 / stats.posts as f64
    } else {
        0.0
    };
    println!(
        "Total: {} records ({:.1} comments per post)",
        total, comments_per_post
    );
}
