use crate::config::{ClientConfig, Config, ForceRetryConfig, RetryConfig, TracingConfig};
use crate::filters::KeyPredicate;
use crate::types::{AccessKeys, S3Credentials};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::collections::HashSet;
use std::ffi::OsString;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_WORKER_SIZE: u16 = 8;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_JSON_SUMMARY: bool = false;
const DEFAULT_ALL_OBJECTS: bool = false;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_FORCE_RETRY_COUNT: u32 = 2;
const DEFAULT_FORCE_RETRY_INTERVAL_MILLISECONDS: u64 = 1000;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;

/// Upper bound on MaxKeys accepted by ListObjectsV2.
pub const MAX_KEYS_LIMIT: i32 = 1000;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_NO_BUCKETS: &str = "At least one bucket must be specified.";
const ERROR_MESSAGE_DUPLICATE_BUCKET: &str = "Duplicate bucket name";
const ERROR_MESSAGE_NO_PREDICATE: &str =
    "Either --symbol <SUBSTRING> or --all-objects must be specified.";
const ERROR_MESSAGE_WORKER_SIZE_ZERO: &str = "Worker size must be at least 1.";
const ERROR_MESSAGE_MAX_KEYS_RANGE: &str = "Max keys must be between 1 and 1000 (S3 API limit).";
const ERROR_MESSAGE_INCOMPLETE_ACCESS_KEYS: &str =
    "--access-key and --secret-access-key must be specified together.";

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3purge - Parallel batch purger for S3 objects.
///
/// Delete every object matching a key filter across a set of buckets,
/// with bounded concurrency and batch deletion.
///
/// Example:
///   s3purge bucket-a bucket-b --symbol DPZ --dry-run
///   s3purge bucket-a --all-objects --worker-size 16
///   s3purge bucket-a bucket-b --symbol DPZ --profile prod-admin -v
#[derive(Parser, Clone, Debug)]
#[command(name = "s3purge", version, about, long_about = None)]
pub struct CLIArgs {
    /// Bucket names to purge.
    #[arg(
        help = "<BUCKET_NAME>...",
        value_parser = NonEmptyStringValueParser::new(),
        num_args = 1..,
        required = true,
    )]
    pub buckets: Vec<String>,

    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// Simulation mode. Lists and filters objects but does not actually delete.
    #[arg(short = 'd', long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    pub dry_run: bool,

    /// Print the final run summary as JSON on stdout.
    #[arg(long, env, default_value_t = DEFAULT_JSON_SUMMARY, help_heading = "General")]
    pub json_summary: bool,

    // -----------------------------------------------------------------------
    // Filter options
    // -----------------------------------------------------------------------
    /// Delete only objects whose key contains this substring.
    #[arg(
        short = 's',
        long,
        env,
        value_parser = NonEmptyStringValueParser::new(),
        conflicts_with = "all_objects",
        help_heading = "Filter"
    )]
    pub symbol: Option<String>,

    /// Delete ALL objects in the selected buckets.
    #[arg(long, env, default_value_t = DEFAULT_ALL_OBJECTS, help_heading = "Filter")]
    pub all_objects: bool,

    // -----------------------------------------------------------------------
    // Performance options
    // -----------------------------------------------------------------------
    /// Number of bucket purge tasks to run concurrently.
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, help_heading = "Performance")]
    pub worker_size: u16,

    /// Keys per listing page (1-1000).
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Performance")]
    pub max_keys: i32,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum attempts per AWS SDK operation (SDK retry policy).
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff for SDK retries, in milliseconds.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    /// Application-level retries around each listing/deletion call.
    #[arg(long, env, default_value_t = DEFAULT_FORCE_RETRY_COUNT, help_heading = "Retry")]
    pub force_retry_count: u32,

    /// Interval between application-level retries, in milliseconds.
    #[arg(long, env, default_value_t = DEFAULT_FORCE_RETRY_INTERVAL_MILLISECONDS, help_heading = "Retry")]
    pub force_retry_interval_milliseconds: u64,

    // -----------------------------------------------------------------------
    // AWS client options
    // -----------------------------------------------------------------------
    /// AWS profile name.
    #[arg(long, env = "AWS_PROFILE", help_heading = "AWS")]
    pub profile: Option<String>,

    /// AWS access key (requires --secret-access-key).
    #[arg(long, env = "AWS_ACCESS_KEY_ID", help_heading = "AWS")]
    pub access_key: Option<String>,

    /// AWS secret access key (requires --access-key).
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", help_heading = "AWS")]
    pub secret_access_key: Option<String>,

    /// AWS session token.
    #[arg(long, env = "AWS_SESSION_TOKEN", help_heading = "AWS")]
    pub session_token: Option<String>,

    /// AWS region.
    #[arg(long, env = "AWS_REGION", help_heading = "AWS")]
    pub region: Option<String>,

    /// Custom S3 endpoint URL (e.g. MinIO, LocalStack).
    #[arg(long, env, help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing (required by some S3-compatible endpoints).
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub force_path_style: bool,

    // -----------------------------------------------------------------------
    // Tracing options
    // -----------------------------------------------------------------------
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Emit log records as JSON.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing")]
    pub json_tracing: bool,

    /// Also emit AWS SDK internal tracing.
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing")]
    pub aws_sdk_tracing: bool,

    /// Emit span open/close events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Tracing")]
    pub span_events_tracing: bool,

    /// Disable ANSI colors in log output.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing")]
    pub disable_color_tracing: bool,
}

/// Parse CLI arguments from an iterator (for library and test usage).
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        if args.buckets.is_empty() {
            return Err(ERROR_MESSAGE_NO_BUCKETS.to_string());
        }

        let mut seen = HashSet::new();
        for bucket in &args.buckets {
            if !seen.insert(bucket.as_str()) {
                return Err(format!("{ERROR_MESSAGE_DUPLICATE_BUCKET}: {bucket}"));
            }
        }

        // Deleting everything requires an explicit opt-in.
        let predicate = match (&args.symbol, args.all_objects) {
            (Some(symbol), false) => KeyPredicate::Contains(symbol.clone()),
            (None, true) => KeyPredicate::MatchAll,
            (None, false) => return Err(ERROR_MESSAGE_NO_PREDICATE.to_string()),
            (Some(_), true) => unreachable!("clap conflicts_with rejects this combination"),
        };

        if args.worker_size == 0 {
            return Err(ERROR_MESSAGE_WORKER_SIZE_ZERO.to_string());
        }

        if args.max_keys < 1 || args.max_keys > MAX_KEYS_LIMIT {
            return Err(ERROR_MESSAGE_MAX_KEYS_RANGE.to_string());
        }

        let credential = match (&args.access_key, &args.secret_access_key) {
            (Some(access_key), Some(secret_access_key)) => S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.clone(),
                    secret_access_key: secret_access_key.clone(),
                    session_token: args.session_token.clone(),
                },
            },
            (None, None) => match &args.profile {
                Some(profile) => S3Credentials::Profile(profile.clone()),
                None => S3Credentials::FromEnvironment,
            },
            _ => return Err(ERROR_MESSAGE_INCOMPLETE_ACCESS_KEYS.to_string()),
        };

        let client_config = ClientConfig {
            credential,
            region: args.region.clone(),
            endpoint_url: args.endpoint_url.clone(),
            force_path_style: args.force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: args.aws_max_attempts,
                initial_backoff_milliseconds: args.initial_backoff_milliseconds,
            },
        };

        let tracing_config = args.verbosity.log_level().map(|level| TracingConfig {
            tracing_level: level,
            json_tracing: args.json_tracing,
            aws_sdk_tracing: args.aws_sdk_tracing,
            span_events_tracing: args.span_events_tracing,
            disable_color_tracing: args.disable_color_tracing,
        });

        Ok(Config {
            buckets: args.buckets,
            predicate,
            worker_size: args.worker_size,
            max_keys: args.max_keys,
            dry_run: args.dry_run,
            json_summary: args.json_summary,
            client_config: Some(client_config),
            tracing_config,
            force_retry_config: ForceRetryConfig {
                force_retry_count: args.force_retry_count,
                force_retry_interval_milliseconds: args.force_retry_interval_milliseconds,
            },
        })
    }
}
