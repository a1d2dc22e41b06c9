// Progress reporter for the CLI binary.
//
// Reads PurgeStatistics from the stats channel and logs progress while
// the purge runs. Diagnostics only: the run summary is aggregated from
// task results, never from this channel.

use async_channel::Receiver;
use s3purge::types::PurgeStatistics;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Log a progress line every this many deletions.
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Spawn a background task that consumes purge statistics until the
/// channel is closed (all senders dropped).
///
/// Returns a `JoinHandle` to be awaited after the runner finishes.
pub fn spawn_reporter(stats_receiver: Receiver<PurgeStatistics>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut found: u64 = 0;
        let mut deleted: u64 = 0;
        let mut delete_failures: u64 = 0;
        let mut failed_buckets: u64 = 0;

        while let Ok(stats) = stats_receiver.recv().await {
            match stats {
                PurgeStatistics::Found { .. } => {
                    found += 1;
                }
                PurgeStatistics::Deleted { .. } => {
                    deleted += 1;
                    if deleted % PROGRESS_LOG_INTERVAL == 0 {
                        info!(found = found, deleted = deleted, "purge progress.");
                    }
                }
                PurgeStatistics::DeleteFailed { .. } => {
                    delete_failures += 1;
                }
                PurgeStatistics::BucketError { bucket } => {
                    failed_buckets += 1;
                    warn!(
                        bucket = bucket.as_str(),
                        "bucket failed and was counted as (0, 0)."
                    );
                }
            }
        }

        if delete_failures != 0 || failed_buckets != 0 {
            warn!(
                delete_failures = delete_failures,
                failed_buckets = failed_buckets,
                "purge finished with failures."
            );
        }

        info!(
            found = found,
            deleted = deleted,
            delete_failures = delete_failures,
            failed_buckets = failed_buckets,
            "progress reporter finished."
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reporter_drains_channel_until_closed() {
        let (sender, receiver) = async_channel::unbounded();

        let handle = spawn_reporter(receiver);

        sender
            .send(PurgeStatistics::Found {
                bucket: "b".to_string(),
                key: "DPZ/1".to_string(),
            })
            .await
            .unwrap();
        sender
            .send(PurgeStatistics::Deleted {
                bucket: "b".to_string(),
                key: "DPZ/1".to_string(),
            })
            .await
            .unwrap();
        sender
            .send(PurgeStatistics::DeleteFailed {
                bucket: "b".to_string(),
                key: "DPZ/2".to_string(),
            })
            .await
            .unwrap();
        sender
            .send(PurgeStatistics::BucketError {
                bucket: "broken".to_string(),
            })
            .await
            .unwrap();
        sender.close();

        handle.await.unwrap();
    }
}
