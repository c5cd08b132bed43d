//! The simulator tick loop.
//!
//! [`run_simulation`] drives the flock for a bounded number of ticks. Each
//! tick shuffles the processing order, advances every bird by one random
//! step and writes its new position. Only the designated trace bird's writes
//! are traced. Any storage or trace-sink error ends the run.

use std::time::Duration;

use birdtrack_db::PositionStore;
use birdtrack_types::{BirdId, NewPosition, TraceSink};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::bucket::BucketClock;
use crate::cycle::CycleDriver;
use crate::error::CoreError;
use crate::flock::Flock;
use crate::walk;

/// Parameters of one simulator run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPlan {
    /// Time between ticks.
    pub period: Duration,
    /// Number of ticks.
    pub cycles: u32,
    /// Per-axis random walk bound in degrees.
    pub step_degrees: f64,
    /// The bird whose inserts are traced.
    pub trace_bird: BirdId,
    /// Calendar used for bucket dates.
    pub bucket_clock: BucketClock,
}

/// Result of a completed simulator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationSummary {
    /// Ticks executed.
    pub ticks: u32,
    /// Position rows written.
    pub rows_written: u64,
    /// Traced inserts appended to the sink.
    pub traces_written: u64,
}

/// Run the simulator loop to completion.
///
/// Birds are moved in place, so `flock` holds the final positions when this
/// returns. Pass `None` for `trace` to disable tracing entirely.
///
/// # Errors
///
/// Returns [`CoreError`] on the first failed write or trace append.
pub async fn run_simulation<S, R>(
    store: &S,
    flock: &mut Flock,
    plan: &SimulationPlan,
    rng: &mut R,
    mut trace: Option<&mut dyn TraceSink>,
) -> Result<SimulationSummary, CoreError>
where
    S: PositionStore,
    R: Rng + ?Sized,
{
    info!(
        birds = flock.len(),
        cycles = plan.cycles,
        period_ms = u64::try_from(plan.period.as_millis()).unwrap_or(u64::MAX),
        trace_bird = %plan.trace_bird,
        "Simulation starting"
    );
    if flock.get(&plan.trace_bird).is_none() {
        warn!(trace_bird = %plan.trace_bird, "Trace bird is not in the flock; no inserts will be traced");
    }

    let mut summary = SimulationSummary::default();
    let mut driver = CycleDriver::new(plan.period, plan.cycles);

    while let Some(tick) = driver.next_tick().await {
        flock.shuffle(rng);

        for bird in flock.birds_mut() {
            let bucket_date = plan.bucket_clock.today();
            bird.position = walk::random_step(rng, bird.position, plan.step_degrees);
            let position = NewPosition::of(bird, bucket_date);

            let sink = if bird.id == plan.trace_bird {
                trace.as_mut().map(|s| &mut **s as &mut dyn TraceSink)
            } else {
                None
            };
            let traced = sink.is_some();

            store.write_position(&position, sink).await?;
            debug!(
                bird_id = %bird.id,
                latitude = bird.position.latitude,
                longitude = bird.position.longitude,
                "Position written"
            );

            summary.rows_written = summary.rows_written.saturating_add(1);
            if traced {
                summary.traces_written = summary.traces_written.saturating_add(1);
            }
        }

        summary.ticks = summary.ticks.saturating_add(1);
        info!(tick, rows_written = summary.rows_written, "Tick complete");
    }

    info!(
        ticks = summary.ticks,
        rows_written = summary.rows_written,
        traces_written = summary.traces_written,
        "Simulation ended"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use birdtrack_db::{MemoryStore, QualifiedTable};
    use birdtrack_types::QueryTrace;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn plan(cycles: u32, trace_bird: &str) -> SimulationPlan {
        SimulationPlan {
            period: Duration::from_secs(5),
            cycles,
            step_degrees: 0.01,
            trace_bird: BirdId::from(trace_bird),
            bucket_clock: BucketClock::Fixed(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default()),
        }
    }

    async fn store() -> MemoryStore {
        let table = QualifiedTable::new("birds", "bird_positions").unwrap_or_else(|e| panic!("{e}"));
        let store = MemoryStore::new(table);
        assert!(store.ensure_schema().await.is_ok());
        store
    }

    #[tokio::test(start_paused = true)]
    async fn every_bird_written_every_tick() {
        let store = store().await;
        let mut rng = StdRng::seed_from_u64(1);
        let mut flock = Flock::spawn(4, &mut rng);
        let mut traces: Vec<QueryTrace> = Vec::new();

        let summary = run_simulation(&store, &mut flock, &plan(3, "bird_2"), &mut rng, Some(&mut traces as &mut dyn TraceSink)).await;
        let Ok(summary) = summary else {
            panic!("run failed: {summary:?}");
        };

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.rows_written, 12);
        assert_eq!(summary.traces_written, 3);
        assert_eq!(traces.len(), 3);
        assert_eq!(store.row_count().await, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_trace_bird_traces_nothing() {
        let store = store().await;
        let mut rng = StdRng::seed_from_u64(2);
        let mut flock = Flock::spawn(2, &mut rng);
        let mut traces: Vec<QueryTrace> = Vec::new();

        let summary = run_simulation(&store, &mut flock, &plan(2, "bird_9"), &mut rng, Some(&mut traces as &mut dyn TraceSink)).await;
        assert!(matches!(summary, Ok(SimulationSummary { rows_written: 4, traces_written: 0, .. })));
        assert!(traces.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_ends_run() {
        let store = store().await;
        store.fail_next(1).await;
        let mut rng = StdRng::seed_from_u64(3);
        let mut flock = Flock::spawn(3, &mut rng);

        let result = run_simulation(&store, &mut flock, &plan(2, "bird_1"), &mut rng, None).await;
        assert!(matches!(result, Err(CoreError::Db { .. })));
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cycles_write_nothing() {
        let store = store().await;
        let mut rng = StdRng::seed_from_u64(4);
        let mut flock = Flock::spawn(3, &mut rng);

        let result = run_simulation(&store, &mut flock, &plan(0, "bird_1"), &mut rng, None).await;
        assert!(matches!(result, Ok(SimulationSummary { ticks: 0, rows_written: 0, .. })));
    }
}
