//! Simulation and tracking loops for the birdtrack telemetry simulation.
//!
//! Two independent processes share nothing but the position table:
//!
//! ```text
//! Simulator:  CycleDriver --> Flock (random walk) --> PositionStore::write_position
//! Tracker:    CycleDriver --> PositionStore::get_latest --> ResultLog
//!                                  \--> TraceLog (one sampled bird)
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Environment-driven configuration for both processes
//! - [`walk`] -- Bounded random walk with latitude reflection and longitude wrap
//! - [`flock`] -- The simulated birds and their spawn distribution
//! - [`cycle`] -- Fixed-period tick driver
//! - [`bucket`] -- Calendar source for day partitions
//! - [`retry`] -- Bounded exponential-backoff retry at the store boundary
//! - [`sink`] -- Append-only trace and result logs
//! - [`simulator`] -- The writer loop
//! - [`tracker`] -- The reader loop
//! - [`error`] -- Shared error types

pub mod bucket;
pub mod config;
pub mod cycle;
pub mod error;
pub mod flock;
pub mod retry;
pub mod simulator;
pub mod sink;
pub mod tracker;
pub mod walk;

pub use bucket::BucketClock;
pub use config::{ConfigError, SimulatorConfig, TrackerConfig};
pub use cycle::CycleDriver;
pub use error::CoreError;
pub use flock::Flock;
pub use retry::{RetryPolicy, RetryingStore};
pub use simulator::{SimulationPlan, SimulationSummary, run_simulation};
pub use sink::{ResultLog, RunStamp, TraceLog};
pub use tracker::{TrackingPlan, TrackingSummary, run_tracking};
