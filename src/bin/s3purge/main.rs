use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, trace};

use s3purge::config::Config;
use s3purge::runner::PurgeRunner;
use s3purge::types::RunSummary;
use s3purge::types::error::exit_code_from_error;
use s3purge::CLIArgs;

mod reporter;
mod tracing_init;

/// s3purge - batch deletion of matching objects across S3 buckets.
///
/// This binary is a thin wrapper over the s3purge library.
/// All core functionality is implemented in the library crate.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    run(config).await
}

fn load_config_exit_if_err() -> Config {
    let config = Config::try_from(CLIArgs::parse());
    if let Err(error_message) = config {
        clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit();
    }
    config.unwrap()
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    if config.tracing_config.is_none() {
        return false;
    }

    tracing_init::init_tracing(config.tracing_config.as_ref().unwrap());
    true
}

async fn run(config: Config) -> Result<()> {
    let json_summary = config.json_summary;

    let runner = PurgeRunner::new(config);
    let reporter_join_handle = reporter::spawn_reporter(runner.get_stats_receiver());

    let start_time = tokio::time::Instant::now();
    debug!("purge run start.");

    let summary = match runner.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(exit_code_from_error(&e));
        }
    };

    reporter_join_handle.await?;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    debug!(duration_sec = duration_sec, "s3purge has been completed.");

    print_summary(&summary, json_summary)
}

fn print_summary(summary: &RunSummary, json_summary: bool) -> Result<()> {
    if json_summary {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    for result in &summary.per_bucket {
        println!(
            "{}: found={} deleted={}",
            result.bucket, result.found, result.deleted
        );
    }

    let label = if summary.dry_run { " (dry-run)" } else { "" };
    println!(
        "TOTAL{label}: found={} deleted={}",
        summary.total_found, summary.total_deleted
    );

    Ok(())
}
