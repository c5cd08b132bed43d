//! The tracker tick loop.
//!
//! [`run_tracking`] discovers the known birds once, then on every tick
//! fetches each bird's latest rows for today's bucket and appends them to the
//! result log. Birds that first appear after discovery are not seen by the
//! run.

use std::io::Write;
use std::time::Duration;

use birdtrack_db::PositionStore;
use birdtrack_types::{BirdId, TraceSink};
use tracing::{debug, info, warn};

use crate::bucket::BucketClock;
use crate::cycle::CycleDriver;
use crate::error::CoreError;
use crate::sink::ResultLog;

/// Position in the discovered list of the bird traced by default.
const DEFAULT_TRACE_INDEX: usize = 3;

/// Parameters of one tracker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingPlan {
    /// Time between ticks.
    pub period: Duration,
    /// Number of ticks.
    pub cycles: u32,
    /// Rows fetched per bird per tick.
    pub latest_limit: u32,
    /// Explicit trace bird, overriding the default pick.
    pub trace_bird: Option<BirdId>,
    /// Calendar used for bucket dates.
    pub bucket_clock: BucketClock,
}

/// Result of a completed tracker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingSummary {
    /// Ticks executed.
    pub ticks: u32,
    /// Birds found by discovery.
    pub birds_tracked: usize,
    /// Position rows read across all ticks.
    pub rows_read: u64,
    /// Traced reads appended to the sink.
    pub traces_written: u64,
}

/// Pick the bird whose reads are traced.
///
/// A configured id wins. Otherwise the fourth discovered bird, falling back
/// to the first; `None` only when nothing is known.
pub fn choose_trace_bird(known: &[BirdId], configured: Option<&BirdId>) -> Option<BirdId> {
    configured
        .or_else(|| known.get(DEFAULT_TRACE_INDEX))
        .or_else(|| known.first())
        .cloned()
}

/// Run the tracker loop to completion.
///
/// # Errors
///
/// Returns [`CoreError`] on the first failed read, result append or trace
/// append.
pub async fn run_tracking<S, W>(
    store: &S,
    plan: &TrackingPlan,
    results: &mut ResultLog<W>,
    mut trace: Option<&mut dyn TraceSink>,
) -> Result<TrackingSummary, CoreError>
where
    S: PositionStore,
    W: Write,
{
    let birds = store.list_known_birds().await?;
    let trace_bird = choose_trace_bird(&birds, plan.trace_bird.as_ref());

    info!(
        birds = birds.len(),
        cycles = plan.cycles,
        latest_limit = plan.latest_limit,
        trace_bird = trace_bird.as_ref().map(BirdId::as_str),
        "Tracking starting"
    );
    if birds.is_empty() {
        warn!("No birds discovered; ticks will fetch nothing");
    }

    let mut summary = TrackingSummary {
        birds_tracked: birds.len(),
        ..TrackingSummary::default()
    };
    let mut driver = CycleDriver::new(plan.period, plan.cycles);

    while let Some(tick) = driver.next_tick().await {
        for bird_id in &birds {
            let bucket_date = plan.bucket_clock.today();
            let sink = if trace_bird.as_ref() == Some(bird_id) {
                trace.as_mut().map(|s| &mut **s as &mut dyn TraceSink)
            } else {
                None
            };
            let traced = sink.is_some();

            let records = store
                .get_latest(bird_id, bucket_date, plan.latest_limit, sink)
                .await?;
            debug!(bird_id = %bird_id, rows = records.len(), "Latest fetched");
            results.append(&records)?;

            summary.rows_read = summary
                .rows_read
                .saturating_add(u64::try_from(records.len()).unwrap_or(u64::MAX));
            if traced {
                summary.traces_written = summary.traces_written.saturating_add(1);
            }
        }

        summary.ticks = summary.ticks.saturating_add(1);
        info!(tick, rows_read = summary.rows_read, "Tick complete");
    }

    info!(
        ticks = summary.ticks,
        birds = summary.birds_tracked,
        rows_read = summary.rows_read,
        traces_written = summary.traces_written,
        "Tracking ended"
    );
    Ok(summary)
}
