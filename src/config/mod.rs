pub mod args;

use crate::filters::KeyPredicate;
use crate::types::S3Credentials;

/// Main configuration for an s3purge run.
///
/// An explicit immutable value passed into [`PurgeRunner`](crate::PurgeRunner)
/// at call time, never ambient/global state, so runs can be driven with
/// synthetic bucket lists and predicates in tests.
///
/// # Quick Start
///
/// Use [`Config::for_buckets`] for a minimal configuration with defaults
/// matching the CLI:
///
/// ```
/// use s3purge::Config;
///
/// let config = Config::for_buckets(vec!["my-bucket".into()]);
/// assert_eq!(config.worker_size, 8);
/// assert_eq!(config.max_keys, 1000);
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use s3purge::{Config, KeyPredicate};
///
/// let mut config = Config::for_buckets(vec!["my-bucket".into()]);
/// config.predicate = KeyPredicate::Contains("DPZ".into());
/// config.dry_run = true;
/// config.worker_size = 16;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Buckets to purge, in reporting order.
    pub buckets: Vec<String>,
    /// Key selection predicate, chosen once per run.
    pub predicate: KeyPredicate,
    /// Maximum number of bucket tasks running concurrently.
    pub worker_size: u16,
    /// Listing page size (ListObjectsV2 MaxKeys), 1..=1000.
    pub max_keys: i32,
    /// Simulation mode: list and count matches, never delete.
    pub dry_run: bool,
    /// Print the final summary as JSON on stdout.
    pub json_summary: bool,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub force_retry_config: ForceRetryConfig,
}

impl Config {
    /// Create a `Config` purging the given buckets with CLI defaults:
    /// match-all predicate, 8 workers, 1000 keys per page, no dry-run.
    pub fn for_buckets(buckets: Vec<String>) -> Self {
        Config {
            buckets,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buckets: Vec::new(),
            predicate: KeyPredicate::MatchAll,
            worker_size: 8,
            max_keys: 1000,
            dry_run: false,
            json_summary: false,
            client_config: None,
            tracing_config: None,
            force_retry_config: ForceRetryConfig::default(),
        }
    }
}

/// AWS S3 client configuration.
///
/// Each bucket task builds its own client from this value; clients are
/// never shared across concurrent tasks. Timeouts are the AWS SDK
/// defaults, passed through unchanged.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            retry_config: RetryConfig::default(),
        }
    }
}

/// Retry configuration for AWS SDK operations (exponential backoff,
/// applied inside the SDK at the storage-call boundary).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: 10,
            initial_backoff_milliseconds: 100,
        }
    }
}

/// Application-level retry configuration, applied around each listing
/// and batch deletion call in addition to the AWS SDK retries.
#[derive(Debug, Clone, Copy)]
pub struct ForceRetryConfig {
    pub force_retry_count: u32,
    pub force_retry_interval_milliseconds: u64,
}

impl Default for ForceRetryConfig {
    fn default() -> Self {
        ForceRetryConfig {
            force_retry_count: 2,
            force_retry_interval_milliseconds: 1000,
        }
    }
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
