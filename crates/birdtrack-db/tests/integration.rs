//! Integration tests for the `birdtrack-db` driver-backed store.
//!
//! These tests require a live Cassandra-compatible node. Run with:
//!
//! ```bash
//! docker run -d --name cassandra -p 9042:9042 cassandra:5
//! cargo test -p birdtrack-db -- --ignored
//! docker rm -f cassandra
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs. A single local node only satisfies `QUORUM` and `ALL`
//! with replication factor 1, so the tests create their keyspace that way.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use birdtrack_db::{CassandraConfig, CassandraStore, PositionStore};
use birdtrack_types::{BirdId, Coordinates, NewPosition, QueryTrace, Species, TraceSink};
use chrono::Utc;

/// Local node address.
const CONTACT_POINT: &str = "127.0.0.1";

async fn connect(table: &str) -> CassandraStore {
    let config = CassandraConfig::new(vec![CONTACT_POINT.to_owned()], "birdtrack_test", table)
        .with_replication_factor(1);
    let store = CassandraStore::connect(&config)
        .await
        .expect("Failed to connect to Cassandra -- is the container running?");
    store.ensure_schema().await.expect("Failed to ensure schema");
    store
}

fn unique_bird(prefix: &str) -> BirdId {
    BirdId::new(format!("{prefix}_{}", uuid::Uuid::new_v4().simple()))
}

#[tokio::test]
#[ignore = "requires live Cassandra instance (docker run cassandra)"]
async fn schema_creation_twice_is_harmless() {
    let store = connect("positions_schema").await;
    store.ensure_schema().await.expect("second ensure_schema failed");
}

#[tokio::test]
#[ignore = "requires live Cassandra instance (docker run cassandra)"]
async fn server_time_writes_read_back_newest_first() {
    let store = connect("positions_latest").await;
    let bird = unique_bird("latest");
    let today = Utc::now().date_naive();

    for step in 0..3 {
        let row = NewPosition {
            bird_id: bird.clone(),
            bucket_date: today,
            coordinates: Coordinates::new(f64::from(step), 0.0),
            species: Species::AmericanRobin,
            observed_at: None,
        };
        store.write_position(&row, None).await.expect("write failed");
    }

    let latest = store.get_latest(&bird, today, 1, None).await.expect("read failed");
    assert_eq!(latest.len(), 1);
    assert!((latest[0].latitude - 2.0).abs() < f64::EPSILON);

    let all = store.get_latest(&bird, today, 10, None).await.expect("read failed");
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].observed_at > w[1].observed_at));
}

#[tokio::test]
#[ignore = "requires live Cassandra instance (docker run cassandra)"]
async fn traced_operations_report_events() {
    let store = connect("positions_traced").await;
    let bird = unique_bird("traced");
    let today = Utc::now().date_naive();
    let row = NewPosition {
        bird_id: bird.clone(),
        bucket_date: today,
        coordinates: Coordinates::new(0.0, 0.0),
        species: Species::MourningDove,
        observed_at: None,
    };

    let mut traces: Vec<QueryTrace> = Vec::new();
    store
        .write_position(&row, Some(&mut traces as &mut dyn TraceSink))
        .await
        .expect("traced write failed");
    store
        .get_latest(&bird, today, 1, Some(&mut traces as &mut dyn TraceSink))
        .await
        .expect("traced read failed");

    assert_eq!(traces.len(), 2);
    assert!(traces.iter().all(|t| t.session_id.is_some()));
}

#[tokio::test]
#[ignore = "requires live Cassandra instance (docker run cassandra)"]
async fn discovery_includes_written_birds() {
    let store = connect("positions_discovery").await;
    let today = Utc::now().date_naive();
    let birds = [unique_bird("a"), unique_bird("b")];
    for bird in &birds {
        let row = NewPosition {
            bird_id: bird.clone(),
            bucket_date: today,
            coordinates: Coordinates::new(0.0, 0.0),
            species: Species::RockPigeon,
            observed_at: None,
        };
        store.write_position(&row, None).await.expect("write failed");
    }

    let known = store.list_known_birds().await.expect("discovery failed");
    assert!(birds.iter().all(|b| known.contains(b)));
    assert!(known.windows(2).all(|w| w[0] < w[1]));
}
