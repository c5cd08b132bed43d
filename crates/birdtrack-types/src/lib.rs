//! Shared type definitions for the birdtrack telemetry simulation.
//!
//! This crate is the single source of truth for the types exchanged between
//! the simulator, the tracker, and the storage layer.
//!
//! # Modules
//!
//! - [`ids`] -- Bird identifiers and time-ordered row identifiers
//! - [`structs`] -- Birds, coordinates, species, and persisted position rows
//! - [`trace`] -- Per-operation execution traces and the sink they flow into

pub mod ids;
pub mod structs;
pub mod trace;

// Re-export all public types at crate root for convenience.
pub use ids::{BirdId, TimeUuid};
pub use structs::{Bird, Coordinates, NewPosition, PositionRecord, Species};
pub use trace::{QueryTrace, TraceEvent, TraceSink};
