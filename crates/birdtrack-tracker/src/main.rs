//! Tracker entry point for birdtrack.
//!
//! Discovers every bird present in the position table, then on each tick
//! reads the latest position of every bird for today's bucket and appends
//! the rows to a result log. Reads for one sampled bird are traced to a
//! separate log. Both logs are named after the process start time.
//!
//! The tracker never creates schema; run the simulator first.

mod error;

use birdtrack_core::sink::{RESULT_PREFIX, TRACK_SELECT_PREFIX};
use birdtrack_core::{ResultLog, RetryingStore, RunStamp, TraceLog, TrackerConfig, run_tracking};
use birdtrack_db::CassandraStore;
use birdtrack_types::TraceSink;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::TrackerError;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects to the cluster, then runs the configured number of tracking
/// ticks.
///
/// # Errors
///
/// Returns an error if configuration, connection, any read or any log write
/// fails.
#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("birdtrack-tracker starting");
    let stamp = RunStamp::now();

    let config = TrackerConfig::from_env()?;
    info!(
        contact_points = ?config.cluster.contact_points,
        keyspace = config.cluster.keyspace,
        table = config.cluster.table,
        cycles = config.cycles,
        period_ms = u64::try_from(config.period.as_millis()).unwrap_or(u64::MAX),
        latest_limit = config.latest_limit,
        discovery_consistency = %config.cluster.consistency.discovery,
        "configuration loaded"
    );

    let store = RetryingStore::new(CassandraStore::connect(&config.cluster).await?, config.retry);
    info!(
        max_attempts = store.policy().max_attempts,
        initial_backoff_ms = u64::try_from(store.policy().initial_backoff.as_millis()).unwrap_or(u64::MAX),
        "storage ready"
    );

    let mut trace_log = TraceLog::create(&stamp.log_path(&config.output_dir, TRACK_SELECT_PREFIX))?;
    let mut results = ResultLog::create(&stamp.log_path(&config.output_dir, RESULT_PREFIX))?;

    let summary = run_tracking(
        &store,
        &config.plan(),
        &mut results,
        Some(&mut trace_log as &mut dyn TraceSink),
    )
    .await?;

    info!(
        ticks = summary.ticks,
        birds = summary.birds_tracked,
        rows_read = summary.rows_read,
        traces_written = summary.traces_written,
        "birdtrack-tracker finished"
    );
    Ok(())
}
