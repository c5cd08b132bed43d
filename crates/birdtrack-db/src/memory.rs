//! In-process position store.
//!
//! Keeps rows in a map of partitions keyed by `(bird_id, bucket_date)`, each
//! partition ordered by its `TimeUuid` clustering key, and serves reads
//! newest first. It honours the same contract as the driver-backed store:
//! data statements fail until [`PositionStore::ensure_schema`] has run, an
//! insert with an existing clustering key overwrites that row, and
//! store-generated timestamps strictly increase.
//!
//! Tracing produces a synthetic event list describing the partition touched.

use std::collections::{BTreeMap, BTreeSet};

use birdtrack_types::{
    BirdId, NewPosition, PositionRecord, QueryTrace, TimeUuid, TraceEvent, TraceSink,
};
use chrono::{NaiveDate, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::consistency::{ConsistencyLevel, ConsistencyPolicy};
use crate::error::DbError;
use crate::schema::{POSITION_TABLE, QualifiedTable, TableLayout};
use crate::store::PositionStore;

/// Partition key of the position table.
type PartitionKey = (BirdId, NaiveDate);

/// Value columns of one row.
#[derive(Debug, Clone)]
struct StoredRow {
    species: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default)]
struct MemoryState {
    keyspace_created: bool,
    table_created: bool,
    partitions: BTreeMap<PartitionKey, BTreeMap<TimeUuid, StoredRow>>,
    last_generated: Option<TimeUuid>,
    failures_pending: u32,
    schema_statements: u32,
}

/// Position store held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    table: QualifiedTable,
    consistency: ConsistencyPolicy,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store for `table`. No schema exists yet.
    pub fn new(table: QualifiedTable) -> Self {
        Self {
            table,
            consistency: ConsistencyPolicy::default(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// The table layout this store enforces.
    pub const fn layout(&self) -> &'static TableLayout {
        &POSITION_TABLE
    }

    /// Whether both the keyspace and the table exist.
    pub async fn schema_ready(&self) -> bool {
        let state = self.state.lock().await;
        state.keyspace_created && state.table_created
    }

    /// Number of schema statements executed so far.
    pub async fn schema_statements(&self) -> u32 {
        self.state.lock().await.schema_statements
    }

    /// Total number of rows across all partitions.
    pub async fn row_count(&self) -> usize {
        let state = self.state.lock().await;
        state.partitions.values().map(BTreeMap::len).sum()
    }

    /// Every row of one partition, newest first.
    pub async fn partition(&self, bird_id: &BirdId, bucket_date: NaiveDate) -> Vec<PositionRecord> {
        self.read_partition(bird_id, bucket_date, usize::MAX).await
    }

    /// Make the next `count` data statements fail as if too few replicas
    /// were available for their consistency level.
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.failures_pending = count;
    }

    async fn read_partition(&self, bird_id: &BirdId, bucket_date: NaiveDate, limit: usize) -> Vec<PositionRecord> {
        let state = self.state.lock().await;
        let key = (bird_id.clone(), bucket_date);
        state
            .partitions
            .get(&key)
            .map(|rows| {
                rows.iter()
                    .rev()
                    .take(limit)
                    .map(|(ts, row)| PositionRecord {
                        bird_id: bird_id.clone(),
                        bucket_date,
                        observed_at: *ts,
                        species: row.species.clone(),
                        latitude: row.latitude,
                        longitude: row.longitude,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fail if the table is missing or an injected failure is pending.
    fn check_available(
        &self,
        state: &mut MemoryState,
        operation: &str,
        level: ConsistencyLevel,
    ) -> Result<(), DbError> {
        if !(state.keyspace_created && state.table_created) {
            return Err(DbError::SchemaMissing {
                table: self.table.to_string(),
            });
        }
        if state.failures_pending > 0 {
            state.failures_pending = state.failures_pending.saturating_sub(1);
            return Err(DbError::Unavailable {
                operation: operation.to_owned(),
                required: level,
            });
        }
        Ok(())
    }
}

/// Next store-generated clustering value, strictly after `last`.
fn next_time(last: Option<TimeUuid>) -> TimeUuid {
    let now = Utc::now();
    let floor = last
        .and_then(|ts| ts.to_datetime())
        .and_then(|at| at.checked_add_signed(TimeDelta::microseconds(1)));
    match floor {
        Some(floor) if floor > now => TimeUuid::from_datetime(floor),
        _ => TimeUuid::from_datetime(now),
    }
}

fn partition_trace(operation: &str, key: &PartitionKey, action: &str) -> QueryTrace {
    let (bird_id, bucket_date) = key;
    QueryTrace::new(
        operation,
        None,
        vec![
            TraceEvent::new(Some(0), format!("Parsing {operation}")),
            TraceEvent::new(Some(1), format!("{action} partition ({bird_id}, {bucket_date})")),
            TraceEvent::new(Some(2), "Request complete"),
        ],
    )
}

impl PositionStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.keyspace_created = true;
        state.table_created = true;
        state.schema_statements = state.schema_statements.saturating_add(2);
        tracing::info!(table = %self.table, "Schema ensured");
        Ok(())
    }

    async fn write_position(
        &self,
        position: &NewPosition,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), DbError> {
        let key = (position.bird_id.clone(), position.bucket_date);
        {
            let mut state = self.state.lock().await;
            self.check_available(&mut state, "insert", self.consistency.write)?;

            let observed_at = match position.observed_at {
                Some(ts) => ts,
                None => {
                    let ts = next_time(state.last_generated);
                    state.last_generated = Some(ts);
                    ts
                }
            };
            state.partitions.entry(key.clone()).or_default().insert(
                observed_at,
                StoredRow {
                    species: position.species.as_str().to_owned(),
                    latitude: position.coordinates.latitude,
                    longitude: position.coordinates.longitude,
                },
            );
        }

        if let Some(sink) = trace {
            sink.append(&partition_trace("insert", &key, "Appending to"))?;
        }
        Ok(())
    }

    async fn list_known_birds(&self) -> Result<Vec<BirdId>, DbError> {
        let mut state = self.state.lock().await;
        self.check_available(&mut state, "select_distinct", self.consistency.discovery)?;
        let birds: BTreeSet<BirdId> = state.partitions.keys().map(|(id, _)| id.clone()).collect();
        Ok(birds.into_iter().collect())
    }

    async fn get_latest(
        &self,
        bird_id: &BirdId,
        bucket_date: NaiveDate,
        limit: u32,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Vec<PositionRecord>, DbError> {
        {
            let mut state = self.state.lock().await;
            self.check_available(&mut state, "select_latest", self.consistency.latest)?;
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let records = self.read_partition(bird_id, bucket_date, limit).await;

        if let Some(sink) = trace {
            let key = (bird_id.clone(), bucket_date);
            sink.append(&partition_trace("select_latest", &key, "Reading"))?;
        }
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use birdtrack_types::Species;

    use super::*;

    fn store() -> MemoryStore {
        match QualifiedTable::new("birds", "bird_positions") {
            Ok(table) => MemoryStore::new(table),
            Err(e) => panic!("valid names rejected: {e}"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default()
    }

    fn sample(bird: &str) -> NewPosition {
        NewPosition {
            bird_id: BirdId::from(bird),
            bucket_date: today(),
            coordinates: birdtrack_types::Coordinates::new(1.0, 2.0),
            species: Species::AmericanCrow,
            observed_at: None,
        }
    }

    #[tokio::test]
    async fn writes_fail_before_schema() {
        let store = store();
        let result = store.write_position(&sample("bird_1"), None).await;
        assert!(matches!(result, Err(DbError::SchemaMissing { .. })));
    }

    #[tokio::test]
    async fn generated_times_strictly_increase() {
        let store = store();
        assert!(store.ensure_schema().await.is_ok());
        for _ in 0..50 {
            assert!(store.write_position(&sample("bird_1"), None).await.is_ok());
        }
        let rows = store.partition(&BirdId::from("bird_1"), today()).await;
        assert_eq!(rows.len(), 50);
        assert!(rows.windows(2).all(|w| matches!(w, [newer, older] if newer.observed_at > older.observed_at)));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = store();
        assert!(store.ensure_schema().await.is_ok());
        store.fail_next(1).await;
        let first = store.write_position(&sample("bird_1"), None).await;
        assert!(matches!(first, Err(DbError::Unavailable { .. })));
        assert!(store.write_position(&sample("bird_1"), None).await.is_ok());
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn traced_read_reports_partition() {
        let store = store();
        assert!(store.ensure_schema().await.is_ok());
        assert!(store.write_position(&sample("bird_2"), None).await.is_ok());

        let mut traces: Vec<QueryTrace> = Vec::new();
        let rows = store
            .get_latest(&BirdId::from("bird_2"), today(), 1, Some(&mut traces as &mut dyn TraceSink))
            .await;
        assert!(matches!(rows.as_deref(), Ok([_])));
        assert_eq!(traces.len(), 1);
        assert!(traces.iter().all(|t| t.render().contains("(bird_2, 2024-05-01)")));
    }
}
