//! Per-bucket purge worker.
//!
//! A `BucketPurger` pages through one bucket, filters keys with the run's
//! predicate, and deletes matches in batches of up to 1000 keys. It owns
//! its storage handle for the lifetime of the task and absorbs every
//! error: a failed bucket reports `(found = 0, deleted = 0)` and never
//! disturbs sibling tasks.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_channel::Sender;
use tracing::{debug, error, info, warn};

use crate::config::ForceRetryConfig;
use crate::filters::KeyPredicate;
use crate::storage::Storage;
use crate::types::{BucketResult, PurgeStatistics};

/// Maximum objects per batch DeleteObjects API call (S3 limit).
///
/// Independent of the configured listing page size: a page with more
/// matches than this still splits into compliant chunks.
pub const MAX_DELETE_BATCH_SIZE: usize = 1000;

/// Purges matching objects from a single bucket.
pub struct BucketPurger {
    storage: Storage,
    predicate: KeyPredicate,
    max_keys: i32,
    dry_run: bool,
    force_retry_config: ForceRetryConfig,
    stats_sender: Sender<PurgeStatistics>,
}

impl BucketPurger {
    pub fn new(
        storage: Storage,
        predicate: KeyPredicate,
        max_keys: i32,
        dry_run: bool,
        force_retry_config: ForceRetryConfig,
        stats_sender: Sender<PurgeStatistics>,
    ) -> Self {
        Self {
            storage,
            predicate,
            max_keys,
            dry_run,
            force_retry_config,
            stats_sender,
        }
    }

    /// Run the purge to completion for this bucket.
    ///
    /// Infallible by contract: listing or deletion failures (after the
    /// configured retries) are logged and collapse the bucket's result
    /// to `(0, 0)`.
    pub async fn purge(self) -> BucketResult {
        let bucket = self.storage.bucket().to_string();
        info!(bucket = bucket.as_str(), "processing bucket.");

        match self.purge_inner().await {
            Ok((found, deleted)) => {
                debug!(
                    bucket = bucket.as_str(),
                    found = found,
                    deleted = deleted,
                    "bucket purge completed."
                );
                BucketResult {
                    bucket,
                    found,
                    deleted,
                }
            }
            Err(e) => {
                error!(
                    bucket = bucket.as_str(),
                    error = %e,
                    "bucket purge failed. counting bucket as (0, 0).",
                );
                self.send_stats(PurgeStatistics::BucketError {
                    bucket: bucket.clone(),
                })
                .await;
                BucketResult::empty(bucket)
            }
        }
    }

    async fn purge_inner(&self) -> Result<(u64, u64)> {
        let bucket = self.storage.bucket();

        let mut found: u64 = 0;
        let mut deleted: u64 = 0;
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .with_retry("list_objects_page", || {
                    self.storage
                        .list_objects_page(self.max_keys, continuation_token.clone())
                })
                .await?;

            let matched: Vec<String> = page
                .keys
                .into_iter()
                .filter(|key| self.predicate.matches(key))
                .collect();

            for key in &matched {
                debug!(
                    bucket = bucket,
                    key = key.as_str(),
                    "found matching object."
                );
                self.send_stats(PurgeStatistics::Found {
                    bucket: bucket.to_string(),
                    key: key.clone(),
                })
                .await;
            }
            found += matched.len() as u64;

            if !matched.is_empty() {
                if self.dry_run {
                    info!(
                        bucket = bucket,
                        count = matched.len(),
                        "[dry-run] would delete objects."
                    );
                } else {
                    deleted += self.delete_matched(&matched).await?;
                }
            }

            // An empty page does not end the listing; only an absent
            // continuation token does.
            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        Ok((found, deleted))
    }

    /// Delete matched keys in chunks of at most `MAX_DELETE_BATCH_SIZE`.
    ///
    /// Returns the number of keys the API confirmed as deleted. Per-key
    /// errors inside a successful batch call are logged and excluded from
    /// the count, never raised.
    async fn delete_matched(&self, keys: &[String]) -> Result<u64> {
        let bucket = self.storage.bucket();
        let mut deleted: u64 = 0;

        for chunk in keys.chunks(MAX_DELETE_BATCH_SIZE) {
            debug!(
                bucket = bucket,
                batch_size = chunk.len(),
                "sending DeleteObjects batch request."
            );

            let outcome = self
                .with_retry("delete_objects", || {
                    self.storage.delete_objects(chunk.to_vec())
                })
                .await?;

            deleted += outcome.deleted.len() as u64;

            for key in &outcome.deleted {
                info!(bucket = bucket, key = key.as_str(), "delete completed.");
                self.send_stats(PurgeStatistics::Deleted {
                    bucket: bucket.to_string(),
                    key: key.clone(),
                })
                .await;
            }

            for failure in &outcome.errors {
                warn!(
                    bucket = bucket,
                    key = failure.key.as_str(),
                    code = failure.code.as_str(),
                    message = failure.message.as_str(),
                    "failed to delete object '{}': {} ({}).",
                    failure.key,
                    failure.code,
                    failure.message,
                );
                self.send_stats(PurgeStatistics::DeleteFailed {
                    bucket: bucket.to_string(),
                    key: failure.key.clone(),
                })
                .await;
            }
        }

        Ok(deleted)
    }

    /// Application-level bounded retry around a storage call, in addition
    /// to the retries the storage client performs internally.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.force_retry_config.force_retry_count + 1;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    warn!(
                        bucket = self.storage.bucket(),
                        operation = operation,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        "storage call failed. retrying.",
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.force_retry_config.force_retry_interval_milliseconds,
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_stats(&self, stats: PurgeStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}
