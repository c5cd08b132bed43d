//! End-to-end tests of the simulator and tracker loops over the in-memory
//! store.
//!
//! Both loops run on tokio's paused clock, so tick periods elapse instantly.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use std::time::Duration;

use birdtrack_core::sink::{RESULT_PREFIX, TRACE_INSERT_PREFIX, TRACK_SELECT_PREFIX};
use birdtrack_core::{
    BucketClock, Flock, ResultLog, RetryPolicy, RetryingStore, RunStamp, SimulationPlan,
    TraceLog, TrackingPlan, run_simulation, run_tracking,
};
use birdtrack_db::{MemoryStore, PositionStore, QualifiedTable};
use birdtrack_types::{Bird, BirdId, Coordinates, PositionRecord, QueryTrace, Species, TraceSink};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bucket() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

async fn ready_store() -> MemoryStore {
    let store = MemoryStore::new(QualifiedTable::new("birds", "bird_positions").unwrap());
    store.ensure_schema().await.unwrap();
    store
}

fn three_birds() -> Flock {
    Flock::from_birds(vec![
        Bird {
            id: BirdId::numbered(1),
            species: Species::AmericanRobin,
            position: Coordinates::new(10.0, 20.0),
        },
        Bird {
            id: BirdId::numbered(2),
            species: Species::RockPigeon,
            position: Coordinates::new(-45.5, 170.25),
        },
        Bird {
            id: BirdId::numbered(3),
            species: Species::AmericanCrow,
            position: Coordinates::new(89.0, -179.0),
        },
    ])
}

fn simulation_plan(cycles: u32, step_degrees: f64, trace_bird: &str) -> SimulationPlan {
    SimulationPlan {
        period: Duration::from_secs(5),
        cycles,
        step_degrees,
        trace_bird: BirdId::from(trace_bird),
        bucket_clock: BucketClock::Fixed(bucket()),
    }
}

fn tracking_plan(cycles: u32, latest_limit: u32) -> TrackingPlan {
    TrackingPlan {
        period: Duration::from_secs(60),
        cycles,
        latest_limit,
        trace_bird: None,
        bucket_clock: BucketClock::Fixed(bucket()),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_step_run_writes_unchanged_positions() {
    let store = ready_store().await;
    let mut flock = three_birds();
    let original = three_birds();
    let mut rng = StdRng::seed_from_u64(7);

    let summary = run_simulation(&store, &mut flock, &simulation_plan(2, 0.0, "bird_2"), &mut rng, None)
        .await
        .unwrap();
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.rows_written, 6);

    for bird in original.birds() {
        let rows = store.partition(&bird.id, bucket()).await;
        assert_eq!(rows.len(), 2, "two rows for {}", bird.id);

        // Newest first.
        assert!(rows[0].observed_at > rows[1].observed_at);
        for row in &rows {
            assert_eq!(row.coordinates(), bird.position);
            assert_eq!(row.species, bird.species.as_str());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn tracker_reads_latest_positions_written_by_simulator() {
    let store = ready_store().await;
    let mut flock = three_birds();
    let mut rng = StdRng::seed_from_u64(11);
    let mut insert_traces: Vec<QueryTrace> = Vec::new();

    run_simulation(
        &store,
        &mut flock,
        &simulation_plan(3, 0.5, "bird_3"),
        &mut rng,
        Some(&mut insert_traces as &mut dyn TraceSink),
    )
    .await
    .unwrap();
    assert_eq!(insert_traces.len(), 3);

    let mut results = ResultLog::new(Vec::new());
    let mut select_traces: Vec<QueryTrace> = Vec::new();
    let summary = run_tracking(
        &store,
        &tracking_plan(2, 1),
        &mut results,
        Some(&mut select_traces as &mut dyn TraceSink),
    )
    .await
    .unwrap();

    assert_eq!(summary.birds_tracked, 3);
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.rows_read, 6);
    // Fewer than four birds, so the first one is traced.
    assert_eq!(summary.traces_written, 2);
    assert_eq!(select_traces.len(), 2);

    let text = String::from_utf8(results.into_inner()).unwrap();
    let lines: Vec<Vec<PositionRecord>> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 6);
    for line in &lines {
        assert_eq!(line.len(), 1);
        let record = &line[0];
        let bird = flock.get(&record.bird_id).unwrap();
        assert_eq!(record.coordinates(), bird.position);
    }
}

#[tokio::test(start_paused = true)]
async fn tracker_with_empty_table_still_runs_its_cycles() {
    let store = ready_store().await;
    let mut results = ResultLog::new(Vec::new());

    let summary = run_tracking(&store, &tracking_plan(3, 1), &mut results, None)
        .await
        .unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.birds_tracked, 0);
    assert_eq!(results.lines_written(), 0);
}

#[tokio::test(start_paused = true)]
async fn tracker_fails_before_schema_exists() {
    let store = MemoryStore::new(QualifiedTable::new("birds", "bird_positions").unwrap());
    let mut results = ResultLog::new(Vec::new());

    let result = run_tracking(&store, &tracking_plan(1, 1), &mut results, None).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn retrying_store_rides_out_transient_unavailability() {
    let store = RetryingStore::new(
        ready_store().await,
        RetryPolicy::single_attempt().with_max_attempts(3),
    );
    store.inner().fail_next(2).await;
    let mut flock = three_birds();
    let mut rng = StdRng::seed_from_u64(5);

    let summary = run_simulation(&store, &mut flock, &simulation_plan(1, 0.0, "bird_1"), &mut rng, None)
        .await
        .unwrap();
    assert_eq!(summary.rows_written, 3);
    assert_eq!(store.inner().row_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn file_logs_are_named_and_flushed_per_append() {
    let dir = tempfile::tempdir().unwrap();
    let stamp = RunStamp::from_string("2024-05-01_08.30.00");
    let insert_path = stamp.log_path(dir.path(), TRACE_INSERT_PREFIX);
    let select_path = stamp.log_path(dir.path(), TRACK_SELECT_PREFIX);
    let result_path = stamp.log_path(dir.path(), RESULT_PREFIX);

    let store = ready_store().await;
    let mut flock = three_birds();
    let mut rng = StdRng::seed_from_u64(13);

    let mut insert_log = TraceLog::create(&insert_path).unwrap();
    run_simulation(
        &store,
        &mut flock,
        &simulation_plan(2, 0.01, "bird_1"),
        &mut rng,
        Some(&mut insert_log as &mut dyn TraceSink),
    )
    .await
    .unwrap();
    assert_eq!(insert_log.traces_written(), 2);

    let mut select_log = TraceLog::create(&select_path).unwrap();
    let mut results = ResultLog::create(&result_path).unwrap();
    run_tracking(&store, &tracking_plan(1, 2), &mut results, Some(&mut select_log as &mut dyn TraceSink))
        .await
        .unwrap();

    // Logs are still open; every append has already been flushed.
    let inserts = std::fs::read_to_string(&insert_path).unwrap();
    assert!(inserts.contains("Appending to partition (bird_1, 2024-05-01)"));
    assert!(!inserts.contains("bird_2"));

    let selects = std::fs::read_to_string(&select_path).unwrap();
    assert!(selects.contains("Reading partition (bird_1, 2024-05-01)"));

    let lines = std::fs::read_to_string(&result_path).unwrap();
    assert_eq!(lines.lines().count(), 3);
    for line in lines.lines() {
        let records: Vec<PositionRecord> = serde_json::from_str(line).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].observed_at > records[1].observed_at);
    }

    assert!(
        insert_path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == "trace_insert_2024-05-01_08.30.00.txt")
    );
}
