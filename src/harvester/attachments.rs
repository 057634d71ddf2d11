//! Attachment capture policy
//!
//! Fetches the media referenced by a record and stores it as attachment
//! bundles. Media of a quoted post is stored under the quote's own id and
//! left out of the outer record's bundle, so a URL shown in both is stored
//! once. When the store refuses a bundle as too large, the write is retried
//! once with every payload replaced by a placeholder.

use crate::model::{AttachmentRecord, MediaItem, Record};
use crate::storage::{Storage, StorageError};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Errors raised while fetching media bytes
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for media {url}")]
    Status { url: String, status: u16 },
}

/// Fetches raw media bytes
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

/// Media fetcher backed by the shared HTTP client
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| MediaError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| MediaError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

/// What happened to the media of one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Bundles written with their bytes
    pub stored: usize,

    /// Bundles written with placeholders after an oversize rejection
    pub downgraded: usize,

    /// Media files that could not be fetched
    pub fetch_failures: usize,

    /// Bundles the store refused outright
    pub write_failures: usize,
}

impl CaptureReport {
    fn merge(&mut self, other: CaptureReport) {
        self.stored += other.stored;
        self.downgraded += other.downgraded;
        self.fetch_failures += other.fetch_failures;
        self.write_failures += other.write_failures;
    }
}

/// Fetches and stores the media of a record and of its quoted post
///
/// # Arguments
///
/// * `storage` - The persistence gateway receiving the bundles
/// * `fetcher` - Source of the media bytes
/// * `record` - The record whose media is captured
/// * `probe_size` - Substitute placeholders up front when the store's limit is known
///
/// # Returns
///
/// A report of what was written; failures never propagate to the caller.
pub async fn capture_attachments<S: Storage + ?Sized>(
    storage: &mut S,
    fetcher: &dyn MediaFetcher,
    record: &Record,
    probe_size: bool,
) -> CaptureReport {
    let mut report = CaptureReport::default();

    if let Some(quote) = &record.quote {
        if !quote.media_urls.is_empty() {
            let owner = quote.id.clone().unwrap_or_else(|| record.id.clone());
            let (media, failures) = fetch_all(fetcher, &quote.media_urls).await;
            report.fetch_failures += failures;
            if !media.is_empty() {
                let bundle = AttachmentRecord {
                    owner_ref_id: owner,
                    media,
                    is_quote: true,
                };
                report.merge(persist_with_fallback(storage, &bundle, probe_size));
            }
        }
    }

    let own_urls = record.own_media_urls();
    if !own_urls.is_empty() {
        let (media, failures) = fetch_all(fetcher, &own_urls).await;
        report.fetch_failures += failures;
        if !media.is_empty() {
            let bundle = AttachmentRecord {
                owner_ref_id: record.id.clone(),
                media,
                is_quote: false,
            };
            report.merge(persist_with_fallback(storage, &bundle, probe_size));
        }
    }

    report
}

async fn fetch_all(fetcher: &dyn MediaFetcher, urls: &[String]) -> (Vec<MediaItem>, usize) {
    let mut media = Vec::with_capacity(urls.len());
    let mut failures = 0;

    for url in urls {
        match fetcher.fetch(url).await {
            Ok(bytes) => media.push(MediaItem::new(url.clone(), bytes)),
            Err(e) => {
                tracing::warn!("Skipping media: {}", e);
                failures += 1;
            }
        }
    }

    (media, failures)
}

/// Writes a bundle, retrying once with placeholders if it is rejected as oversize
///
/// Without `probe_size` the placeholder is only substituted after the store
/// has actually refused the bundle.
pub fn persist_with_fallback<S: Storage + ?Sized>(
    storage: &mut S,
    bundle: &AttachmentRecord,
    probe_size: bool,
) -> CaptureReport {
    let mut report = CaptureReport::default();

    if probe_size {
        if let Some(limit) = storage.document_size_limit() {
            let size = bundle.document_size();
            if size > limit {
                tracing::warn!(
                    "Media of {} is {} bytes, over the {} byte limit; storing placeholder",
                    bundle.owner_ref_id,
                    size,
                    limit
                );
                match storage.insert_attachment(&bundle.with_placeholders()) {
                    Ok(()) => report.downgraded += 1,
                    Err(e) => {
                        tracing::error!("Failed to store media of {}: {}", bundle.owner_ref_id, e);
                        report.write_failures += 1;
                    }
                }
                return report;
            }
        }
    }

    match storage.insert_attachment(bundle) {
        Ok(()) => report.stored += 1,
        Err(StorageError::Oversize { size, limit }) => {
            tracing::warn!(
                "Media of {} rejected as too large ({} > {} bytes); storing placeholder",
                bundle.owner_ref_id,
                size,
                limit
            );
            match storage.insert_attachment(&bundle.with_placeholders()) {
                Ok(()) => report.downgraded += 1,
                Err(e) => {
                    tracing::error!("Failed to store media of {}: {}", bundle.owner_ref_id, e);
                    report.write_failures += 1;
                }
            }
        }
        Err(e) => {
            tracing::error!("Failed to store media of {}: {}", bundle.owner_ref_id, e);
            report.write_failures += 1;
        }
    }

    report
}
