//! Storage layer for the birdtrack telemetry simulation.
//!
//! Positions live in a single wide-column table partitioned by
//! `(bird_id, bucket_date)` and clustered by a `timeuuid` in descending
//! order, so every bird-day is one partition whose first row is the latest
//! observation.
//!
//! # Architecture
//!
//! ```text
//! Simulator ---- write_position (QUORUM) ----+
//!                                            +--> bird_positions
//! Tracker ------ list_known_birds (ALL) -----+     PRIMARY KEY ((bird_id, bucket_date), ts)
//!          \---- get_latest (QUORUM) --------+     CLUSTERING ORDER BY (ts DESC)
//! ```
//!
//! # Modules
//!
//! - [`cassandra`] -- Driver-backed store (`scylla` client, any CQL cluster)
//! - [`memory`] -- In-process store with the same partition semantics
//! - [`store`] -- The [`PositionStore`] trait both stores implement
//! - [`schema`] -- Table layout, CQL statements, identifier validation
//! - [`consistency`] -- Per-operation consistency policy
//! - [`error`] -- Shared error types

pub mod cassandra;
pub mod consistency;
pub mod error;
pub mod memory;
pub mod schema;
pub mod store;

// Re-export primary types for convenience.
pub use cassandra::{CassandraConfig, CassandraStore};
pub use consistency::{ConsistencyLevel, ConsistencyPolicy};
pub use error::DbError;
pub use memory::MemoryStore;
pub use schema::{QualifiedTable, TableLayout, POSITION_TABLE};
pub use store::PositionStore;
