//! Run orchestration: fan-out over buckets, fan-in of results.
//!
//! `PurgeRunner` validates the configuration, spawns one `BucketPurger`
//! task per bucket under a bounded worker pool, and folds the per-bucket
//! results into a [`RunSummary`]. Tasks never share mutable state; the
//! summary is an explicit fold over the values the tasks return.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::purger::BucketPurger;
use crate::storage::StorageFactory;
use crate::storage::s3::S3StorageFactory;
use crate::types::error::PurgeError;
use crate::types::{BucketResult, PurgeStatistics, RunSummary};

const MIN_MAX_KEYS: i32 = 1;
const MAX_MAX_KEYS: i32 = 1000;

/// Orchestrates one purge run across all configured buckets.
pub struct PurgeRunner {
    config: Config,
    factory: Arc<dyn StorageFactory>,
    stats_sender: Sender<PurgeStatistics>,
    stats_receiver: Receiver<PurgeStatistics>,
}

impl PurgeRunner {
    /// Create a runner backed by real S3 storage.
    pub fn new(config: Config) -> Self {
        let client_config = config.client_config.clone().unwrap_or_default();
        Self::with_factory(config, Arc::new(S3StorageFactory::new(client_config)))
    }

    /// Create a runner with a custom storage factory.
    pub fn with_factory(config: Config, factory: Arc<dyn StorageFactory>) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        Self {
            config,
            factory,
            stats_sender,
            stats_receiver,
        }
    }

    /// Receiver side of the statistics channel, for progress reporting.
    pub fn get_stats_receiver(&self) -> Receiver<PurgeStatistics> {
        self.stats_receiver.clone()
    }

    /// Execute the run and return the aggregated summary.
    ///
    /// Fails fast on invalid configuration. Individual bucket failures
    /// (including task panics) never fail the run: the affected bucket
    /// contributes `(0, 0)` and the remaining buckets complete.
    pub async fn run(&self) -> Result<RunSummary> {
        self.validate_config()?;

        info!(
            buckets = self.config.buckets.len(),
            worker_size = self.config.worker_size,
            dry_run = self.config.dry_run,
            filter = self.config.predicate.describe().as_str(),
            "starting purge run."
        );

        let semaphore = Arc::new(Semaphore::new(usize::from(self.config.worker_size)));
        let mut join_set: JoinSet<BucketResult> = JoinSet::new();
        let mut bucket_by_task: HashMap<tokio::task::Id, String> = HashMap::new();

        for bucket in &self.config.buckets {
            let bucket = bucket.clone();
            let semaphore = semaphore.clone();
            let factory = self.factory.clone();
            let predicate = self.config.predicate.clone();
            let max_keys = self.config.max_keys;
            let dry_run = self.config.dry_run;
            let force_retry_config = self.config.force_retry_config;
            let stats_sender = self.stats_sender.clone();

            let bucket_for_map = bucket.clone();
            let handle = join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!(
                            bucket = bucket.as_str(),
                            "worker semaphore closed unexpectedly."
                        );
                        return BucketResult::empty(bucket);
                    }
                };

                let storage = match factory.create(&bucket).await {
                    Ok(storage) => storage,
                    Err(e) => {
                        error!(
                            bucket = bucket.as_str(),
                            error = %e,
                            "failed to create storage client. counting bucket as (0, 0).",
                        );
                        let _ = stats_sender
                            .send(PurgeStatistics::BucketError {
                                bucket: bucket.clone(),
                            })
                            .await;
                        return BucketResult::empty(bucket);
                    }
                };

                BucketPurger::new(
                    storage,
                    predicate,
                    max_keys,
                    dry_run,
                    force_retry_config,
                    stats_sender,
                )
                .purge()
                .await
            });
            bucket_by_task.insert(handle.id(), bucket_for_map);
        }

        let mut results: Vec<BucketResult> = Vec::with_capacity(self.config.buckets.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((task_id, result)) => {
                    bucket_by_task.remove(&task_id);
                    results.push(result);
                }
                Err(join_error) => {
                    // A panicking task still accounts for its bucket.
                    let bucket = bucket_by_task
                        .remove(&join_error.id())
                        .unwrap_or_else(|| "unknown".to_string());
                    error!(
                        bucket = bucket.as_str(),
                        error = %join_error,
                        "bucket task aborted. counting bucket as (0, 0).",
                    );
                    let _ = self
                        .stats_sender
                        .send(PurgeStatistics::BucketError {
                            bucket: bucket.clone(),
                        })
                        .await;
                    results.push(BucketResult::empty(bucket));
                }
            }
        }

        self.stats_sender.close();

        // Report buckets in the order they were configured, not the order
        // tasks happened to finish.
        let order: HashMap<&str, usize> = self
            .config
            .buckets
            .iter()
            .enumerate()
            .map(|(index, bucket)| (bucket.as_str(), index))
            .collect();
        results.sort_by_key(|result| order.get(result.bucket.as_str()).copied());

        let summary = RunSummary::from_results(results, self.config.dry_run);

        if summary.dry_run {
            info!(
                total_found = summary.total_found,
                buckets = summary.per_bucket.len(),
                "[dry-run] purge run completed. no objects were deleted."
            );
        } else {
            info!(
                total_found = summary.total_found,
                total_deleted = summary.total_deleted,
                buckets = summary.per_bucket.len(),
                "purge run completed."
            );
        }

        Ok(summary)
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.buckets.is_empty() {
            return Err(anyhow!(PurgeError::InvalidConfig(
                "At least one bucket must be specified.".to_string()
            )));
        }
        if self.config.worker_size == 0 {
            return Err(anyhow!(PurgeError::InvalidConfig(
                "worker_size must be 1 or greater.".to_string()
            )));
        }
        if !(MIN_MAX_KEYS..=MAX_MAX_KEYS).contains(&self.config.max_keys) {
            return Err(anyhow!(PurgeError::InvalidConfig(format!(
                "max_keys must be between {MIN_MAX_KEYS} and {MAX_MAX_KEYS}."
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::KeyPredicate;
    use crate::storage::{Storage, StorageTrait};
    use crate::test_utils::init_dummy_tracing_subscriber;
    use crate::types::error::exit_code_from_error;
    use crate::types::{DeleteOutcome, ObjectPage};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Normal,
        FailListing,
        FailCreate,
        Panic,
    }

    struct MockStorage {
        bucket: String,
        keys: Vec<String>,
        behavior: Behavior,
        deleted_log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl StorageTrait for MockStorage {
        fn bucket(&self) -> &str {
            &self.bucket
        }

        async fn list_objects_page(
            &self,
            _max_keys: i32,
            _continuation_token: Option<String>,
        ) -> Result<ObjectPage> {
            match self.behavior {
                Behavior::FailListing => Err(anyhow!("simulated listing failure")),
                Behavior::Panic => panic!("simulated task panic"),
                _ => Ok(ObjectPage {
                    keys: self.keys.clone(),
                    next_continuation_token: None,
                }),
            }
        }

        async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteOutcome> {
            self.deleted_log.lock().unwrap().extend(keys.clone());
            Ok(DeleteOutcome {
                deleted: keys,
                errors: Vec::new(),
            })
        }
    }

    struct MockFactory {
        objects: HashMap<String, Vec<String>>,
        behaviors: HashMap<String, Behavior>,
        deleted_log: Arc<Mutex<Vec<String>>>,
    }

    impl MockFactory {
        fn new(objects: Vec<(&str, Vec<&str>)>) -> Self {
            Self {
                objects: objects
                    .into_iter()
                    .map(|(bucket, keys)| {
                        (
                            bucket.to_string(),
                            keys.into_iter().map(String::from).collect(),
                        )
                    })
                    .collect(),
                behaviors: HashMap::new(),
                deleted_log: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_behavior(mut self, bucket: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(bucket.to_string(), behavior);
            self
        }
    }

    #[async_trait]
    impl StorageFactory for MockFactory {
        async fn create(&self, bucket: &str) -> Result<Storage> {
            let behavior = self
                .behaviors
                .get(bucket)
                .copied()
                .unwrap_or(Behavior::Normal);
            if behavior == Behavior::FailCreate {
                return Err(anyhow!("simulated client construction failure"));
            }
            Ok(Box::new(MockStorage {
                bucket: bucket.to_string(),
                keys: self.objects.get(bucket).cloned().unwrap_or_default(),
                behavior,
                deleted_log: self.deleted_log.clone(),
            }))
        }
    }

    fn test_config(buckets: &[&str]) -> Config {
        let mut config = Config::for_buckets(buckets.iter().map(|b| b.to_string()).collect());
        config.force_retry_config.force_retry_count = 0;
        config.force_retry_config.force_retry_interval_milliseconds = 0;
        config
    }

    #[tokio::test]
    async fn failed_bucket_does_not_abort_siblings() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![
            ("broken", vec![]),
            ("healthy", vec!["DPZ/1", "DPZ/2", "DPZ/3", "DPZ/4", "DPZ/5"]),
        ])
        .with_behavior("broken", Behavior::FailListing);

        let runner = PurgeRunner::with_factory(test_config(&["broken", "healthy"]), Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.total_found, 5);
        assert_eq!(summary.total_deleted, 5);
        assert_eq!(summary.per_bucket[0], BucketResult::empty("broken".to_string()));
        assert_eq!(summary.per_bucket[1].found, 5);
        assert_eq!(summary.per_bucket[1].deleted, 5);
    }

    #[tokio::test]
    async fn panicking_bucket_task_is_isolated() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![("panicky", vec![]), ("healthy", vec!["DPZ/1"])])
            .with_behavior("panicky", Behavior::Panic);

        let runner =
            PurgeRunner::with_factory(test_config(&["panicky", "healthy"]), Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.per_bucket.len(), 2);
        assert_eq!(summary.per_bucket[0], BucketResult::empty("panicky".to_string()));
        assert_eq!(summary.per_bucket[1].deleted, 1);
        assert_eq!(summary.total_deleted, 1);
    }

    #[tokio::test]
    async fn client_construction_failure_counts_as_zero() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![("no-client", vec![]), ("healthy", vec!["DPZ/1"])])
            .with_behavior("no-client", Behavior::FailCreate);

        let runner =
            PurgeRunner::with_factory(test_config(&["no-client", "healthy"]), Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.per_bucket[0], BucketResult::empty("no-client".to_string()));
        assert_eq!(summary.total_deleted, 1);
    }

    #[tokio::test]
    async fn every_bucket_contributes_exactly_one_result() {
        init_dummy_tracing_subscriber();

        let buckets = ["b1", "b2", "b3", "b4", "b5"];
        let factory = MockFactory::new(
            buckets
                .iter()
                .map(|b| (*b, vec!["DPZ/x"]))
                .collect::<Vec<_>>(),
        );

        let runner = PurgeRunner::with_factory(test_config(&buckets), Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.per_bucket.len(), buckets.len());
        let reported: Vec<&str> = summary
            .per_bucket
            .iter()
            .map(|r| r.bucket.as_str())
            .collect();
        assert_eq!(reported, buckets);
        assert_eq!(summary.total_found, buckets.len() as u64);
    }

    #[tokio::test]
    async fn results_follow_configured_bucket_order() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![
            ("zeta", vec!["DPZ/1"]),
            ("alpha", vec!["DPZ/1", "DPZ/2"]),
            ("mid", vec![]),
        ]);

        let runner =
            PurgeRunner::with_factory(test_config(&["zeta", "alpha", "mid"]), Arc::new(factory));
        let summary = runner.run().await.unwrap();

        let reported: Vec<&str> = summary
            .per_bucket
            .iter()
            .map(|r| r.bucket.as_str())
            .collect();
        assert_eq!(reported, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn totals_are_independent_of_worker_size() {
        init_dummy_tracing_subscriber();

        let buckets: Vec<(&str, Vec<&str>)> = vec![
            ("b1", vec!["DPZ/1", "DPZ/2"]),
            ("b2", vec!["DPZ/3"]),
            ("b3", vec!["DPZ/4", "DPZ/5", "DPZ/6"]),
        ];

        let mut totals = Vec::new();
        for worker_size in [1u16, 4] {
            let mut config = test_config(&["b1", "b2", "b3"]);
            config.worker_size = worker_size;
            let runner =
                PurgeRunner::with_factory(config, Arc::new(MockFactory::new(buckets.clone())));
            let summary = runner.run().await.unwrap();
            totals.push((summary.total_found, summary.total_deleted));
        }

        assert_eq!(totals[0], (6, 6));
        assert_eq!(totals[0], totals[1]);
    }

    #[tokio::test]
    async fn dry_run_is_reflected_in_summary_and_skips_deletion() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![("b1", vec!["DPZ/1", "DPZ/2"])]);
        let deleted_log = factory.deleted_log.clone();

        let mut config = test_config(&["b1"]);
        config.dry_run = true;
        let runner = PurgeRunner::with_factory(config, Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.total_found, 2);
        assert_eq!(summary.total_deleted, 0);
        assert!(deleted_log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn predicate_is_applied_across_all_buckets() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![
            ("b1", vec!["DPZ/1", "AAPL/1"]),
            ("b2", vec!["AAPL/2", "DPZ/2"]),
        ]);

        let mut config = test_config(&["b1", "b2"]);
        config.predicate = KeyPredicate::Contains("DPZ".to_string());
        let runner = PurgeRunner::with_factory(config, Arc::new(factory));
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.total_found, 2);
        assert_eq!(summary.total_deleted, 2);
    }

    #[tokio::test]
    async fn stats_channel_reports_bucket_errors() {
        init_dummy_tracing_subscriber();

        let factory = MockFactory::new(vec![("broken", vec![])])
            .with_behavior("broken", Behavior::FailListing);

        let runner = PurgeRunner::with_factory(test_config(&["broken"]), Arc::new(factory));
        let stats_receiver = runner.get_stats_receiver();
        runner.run().await.unwrap();

        let mut saw_bucket_error = false;
        while let Ok(stat) = stats_receiver.try_recv() {
            if matches!(&stat, PurgeStatistics::BucketError { bucket } if bucket == "broken") {
                saw_bucket_error = true;
            }
        }
        assert!(saw_bucket_error);
    }

    #[tokio::test]
    async fn empty_bucket_list_is_rejected() {
        init_dummy_tracing_subscriber();

        let runner =
            PurgeRunner::with_factory(test_config(&[]), Arc::new(MockFactory::new(vec![])));
        let error = runner.run().await.unwrap_err();

        assert_eq!(exit_code_from_error(&error), 2);
    }

    #[tokio::test]
    async fn zero_worker_size_is_rejected() {
        init_dummy_tracing_subscriber();

        let mut config = test_config(&["b1"]);
        config.worker_size = 0;
        let runner = PurgeRunner::with_factory(config, Arc::new(MockFactory::new(vec![])));
        let error = runner.run().await.unwrap_err();

        assert_eq!(exit_code_from_error(&error), 2);
    }

    #[tokio::test]
    async fn out_of_range_max_keys_is_rejected() {
        init_dummy_tracing_subscriber();

        for max_keys in [0, 1001] {
            let mut config = test_config(&["b1"]);
            config.max_keys = max_keys;
            let runner = PurgeRunner::with_factory(config, Arc::new(MockFactory::new(vec![])));
            let error = runner.run().await.unwrap_err();
            assert_eq!(exit_code_from_error(&error), 2);
        }
    }
}
