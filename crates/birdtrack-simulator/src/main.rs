//! Simulator entry point for birdtrack.
//!
//! Spawns a flock of GPS-tagged birds, walks each one a small random step
//! every tick and writes the new position into the day-bucketed position
//! table. Inserts for one designated bird are traced to a log file named
//! after the process start time.
//!
//! # Architecture
//!
//! ```text
//! env --> SimulatorConfig --> CassandraStore (ensure_schema) --> RetryingStore
//!                                                                   |
//!         Flock --(random walk per tick)--> write_position <--------+
//!                                               \--> TraceLog (trace bird)
//! ```
//!
//! Storage errors end the run; the trace log is flushed after every append
//! so its contents up to the failure remain readable.

mod error;

use birdtrack_core::sink::TRACE_INSERT_PREFIX;
use birdtrack_core::{Flock, RetryingStore, RunStamp, SimulatorConfig, TraceLog, run_simulation};
use birdtrack_db::{CassandraStore, PositionStore};
use birdtrack_types::TraceSink;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::SimulatorError;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects to the cluster, creates the keyspace and table if needed, then
/// runs the configured number of simulation ticks.
///
/// # Errors
///
/// Returns an error if configuration, connection, schema setup or any write
/// fails.
#[tokio::main]
async fn main() -> Result<(), SimulatorError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("birdtrack-simulator starting");
    let stamp = RunStamp::now();

    let config = SimulatorConfig::from_env()?;
    info!(
        contact_points = ?config.cluster.contact_points,
        keyspace = config.cluster.keyspace,
        table = config.cluster.table,
        birds = config.bird_count,
        cycles = config.cycles,
        period_ms = u64::try_from(config.period.as_millis()).unwrap_or(u64::MAX),
        step_degrees = config.step_degrees,
        "configuration loaded"
    );

    let store = CassandraStore::connect(&config.cluster).await?;
    store.ensure_schema().await?;
    let store = RetryingStore::new(store, config.retry);
    info!(
        max_attempts = store.policy().max_attempts,
        initial_backoff_ms = u64::try_from(store.policy().initial_backoff.as_millis()).unwrap_or(u64::MAX),
        "storage ready"
    );

    let mut rng = config
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let mut flock = Flock::spawn(config.bird_count, &mut rng);
    info!(birds = flock.len(), seeded = config.seed.is_some(), "flock spawned");

    let mut trace_log = TraceLog::create(&stamp.log_path(&config.output_dir, TRACE_INSERT_PREFIX))?;

    let summary = run_simulation(
        &store,
        &mut flock,
        &config.plan(),
        &mut rng,
        Some(&mut trace_log as &mut dyn TraceSink),
    )
    .await?;

    info!(
        ticks = summary.ticks,
        rows_written = summary.rows_written,
        traces_written = summary.traces_written,
        "birdtrack-simulator finished"
    );
    Ok(())
}
