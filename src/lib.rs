/*!
# Overview
s3purge deletes every object matching a key filter across a set of S3
buckets, in parallel, using the S3 batch deletion API (up to 1000 objects
per request).

## Features
- **Parallel fan-out**: one purge task per bucket, bounded by a worker pool
- **Key filtering**: substring match or match-all, chosen once per run
- **Dry-run mode**: report what would be deleted without deleting anything
- **Failure isolation**: one bucket's failure never aborts the others
- **Library-First**: the s3purge CLI is a thin wrapper over this library

## As a Library

```toml
[dependencies]
s3purge = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
// use s3purge::config::Config;
// use s3purge::filters::KeyPredicate;
// use s3purge::runner::PurgeRunner;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let mut config = Config::for_buckets(vec!["bucket-a".into(), "bucket-b".into()]);
//     config.predicate = KeyPredicate::Contains("DPZ".into());
//     config.dry_run = true;
//
//     let runner = PurgeRunner::new(config);
//     let summary = runner.run().await?;
//     println!("found {} deleted {}", summary.total_found, summary.total_deleted);
//     Ok(())
// }
```
*/

pub mod config;
pub mod filters;
pub mod purger;
pub mod runner;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use config::args::CLIArgs;
pub use filters::KeyPredicate;
pub use runner::PurgeRunner;
pub use types::error::PurgeError;
pub use types::{BucketResult, RunSummary};
