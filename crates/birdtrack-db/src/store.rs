//! The position store interface.
//!
//! [`PositionStore`] is the seam between the simulation loops and the
//! database. [`CassandraStore`] implements it against a live cluster and
//! [`MemoryStore`] implements it in-process with the same partition and
//! clustering semantics.
//!
//! [`CassandraStore`]: crate::cassandra::CassandraStore
//! [`MemoryStore`]: crate::memory::MemoryStore

use birdtrack_types::{BirdId, NewPosition, PositionRecord, TraceSink};
use chrono::NaiveDate;

use crate::error::DbError;

/// Schema management plus the write and read protocol for position rows.
///
/// Operations that accept a trace sink run with store-side tracing enabled
/// when a sink is supplied, and append the resulting trace to it.
#[allow(async_fn_in_trait)]
pub trait PositionStore {
    /// Create the keyspace and position table if they do not exist.
    ///
    /// Idempotent: safe to call on every process start.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if either statement fails.
    async fn ensure_schema(&self) -> Result<(), DbError>;

    /// Append one position row to its bird-day partition.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write does not reach its consistency level
    /// or the trace cannot be recorded.
    async fn write_position(
        &self,
        position: &NewPosition,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), DbError>;

    /// Every bird id that has at least one row, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the scan fails.
    async fn list_known_birds(&self) -> Result<Vec<BirdId>, DbError>;

    /// Up to `limit` rows of one bird-day partition, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails or the trace cannot be recorded.
    async fn get_latest(
        &self,
        bird_id: &BirdId,
        bucket_date: NaiveDate,
        limit: u32,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Vec<PositionRecord>, DbError>;
}
