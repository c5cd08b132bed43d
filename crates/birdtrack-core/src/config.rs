//! Configuration for the simulator and tracker processes.
//!
//! All configuration is loaded from environment variables once at process
//! start and passed by value into the components that need it. Each loader
//! has a `from_lookup` variant taking the variable source as a function so it
//! can be exercised without touching the process environment.

use core::fmt::Display;
use core::str::FromStr;
use std::path::PathBuf;
use std::time::Duration;

use birdtrack_db::{CassandraConfig, ConsistencyLevel, ConsistencyPolicy, DbError, QualifiedTable};
use birdtrack_types::BirdId;

use crate::bucket::BucketClock;
use crate::retry::RetryPolicy;
use crate::simulator::SimulationPlan;
use crate::tracker::TrackingPlan;
use crate::walk::DEFAULT_STEP_DEGREES;

/// Default CQL port.
const DEFAULT_PORT: u16 = 9042;
/// Default keyspace replication factor.
const DEFAULT_REPLICATION_FACTOR: u32 = 3;
/// Default seconds between simulator ticks.
const DEFAULT_UPDATE_PERIOD_SECS: f64 = 5.0;
/// Default number of simulator ticks.
const DEFAULT_UPDATE_CYCLES: u32 = 20;
/// Default number of simulated birds.
const DEFAULT_BIRD_COUNT: usize = 10;
/// Default bird traced by the simulator.
const DEFAULT_TRACE_BIRD: &str = "bird_4";
/// Default seconds between tracker ticks.
const DEFAULT_TRACKING_PERIOD_SECS: f64 = 60.0;
/// Default number of tracker ticks.
const DEFAULT_TRACKING_CYCLES: u32 = 5;
/// Default rows fetched per bird per tracker tick.
const DEFAULT_LATEST_LIMIT: u32 = 1;
/// Default total attempts per storage statement.
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 1;
/// Default first retry backoff.
const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 100;
/// Default retry backoff cap.
const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 5_000;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required env var {name}")]
    Missing {
        /// Variable name.
        name: String,
    },

    /// A variable is set but its value is unusable.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// A storage setting was rejected (identifier or consistency level).
    #[error("invalid storage setting: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },
}

/// Simulator (writer) configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Cluster connection and schema settings.
    pub cluster: CassandraConfig,
    /// Time between ticks.
    pub period: Duration,
    /// Number of ticks.
    pub cycles: u32,
    /// Number of simulated birds.
    pub bird_count: usize,
    /// Per-axis random walk bound in degrees.
    pub step_degrees: f64,
    /// Seed for a reproducible run. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// The bird whose inserts are traced.
    pub trace_bird: BirdId,
    /// Directory receiving the trace log.
    pub output_dir: PathBuf,
    /// Calendar used for bucket dates.
    pub bucket_clock: BucketClock,
    /// Retry policy at the store boundary.
    pub retry: RetryPolicy,
}

impl SimulatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `KEYSPACE` -- keyspace name
    /// - `TABLE` -- position table name
    /// - `CONTACT_POINTS` -- comma-separated host list
    ///
    /// Optional variables:
    /// - `PORT` -- CQL port (default 9042)
    /// - `REPLICATION_FACTOR` -- keyspace replication (default 3)
    /// - `PERIOD_FOR_UPDATE_IN_SECONDS` -- tick period (default 5)
    /// - `NUMBER_OF_UPDATE_CYCLES` -- ticks (default 20)
    /// - `NUMBER_OF_BIRDS_TO_SIMULATE` -- flock size (default 10)
    /// - `STEP_DEGREES` -- random walk bound (default 0.01)
    /// - `SIMULATION_SEED` -- RNG seed (default unset)
    /// - `TRACE_BIRD_ID` -- traced bird (default `bird_4`)
    /// - `OUTPUT_DIR` -- log directory (default `.`)
    /// - `BUCKET_CLOCK` -- `local`, `utc` or `YYYY-MM-DD` (default `local`)
    /// - `RETRY_MAX_ATTEMPTS`, `RETRY_INITIAL_BACKOFF_MS`, `RETRY_MAX_BACKOFF_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let step_degrees: f64 = env.parsed_or("STEP_DEGREES", DEFAULT_STEP_DEGREES)?;
        if !step_degrees.is_finite() || step_degrees < 0.0 {
            return Err(ConfigError::Invalid {
                name: String::from("STEP_DEGREES"),
                reason: format!("must be a finite, non-negative number, got {step_degrees}"),
            });
        }

        Ok(Self {
            cluster: cluster_config(&env)?,
            period: env.seconds_or("PERIOD_FOR_UPDATE_IN_SECONDS", DEFAULT_UPDATE_PERIOD_SECS)?,
            cycles: env.parsed_or("NUMBER_OF_UPDATE_CYCLES", DEFAULT_UPDATE_CYCLES)?,
            bird_count: env.parsed_or("NUMBER_OF_BIRDS_TO_SIMULATE", DEFAULT_BIRD_COUNT)?,
            step_degrees,
            seed: env.parsed_optional("SIMULATION_SEED")?,
            trace_bird: env
                .optional("TRACE_BIRD_ID")
                .map_or_else(|| BirdId::from(DEFAULT_TRACE_BIRD), BirdId::from),
            output_dir: output_dir(&env),
            bucket_clock: env.parsed_or("BUCKET_CLOCK", BucketClock::Local)?,
            retry: retry_policy(&env)?,
        })
    }

    /// The parameters of the simulation loop.
    pub fn plan(&self) -> SimulationPlan {
        SimulationPlan {
            period: self.period,
            cycles: self.cycles,
            step_degrees: self.step_degrees,
            trace_bird: self.trace_bird.clone(),
            bucket_clock: self.bucket_clock,
        }
    }
}

/// Tracker (reader) configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Cluster connection settings.
    pub cluster: CassandraConfig,
    /// Time between ticks.
    pub period: Duration,
    /// Number of ticks.
    pub cycles: u32,
    /// Rows fetched per bird per tick.
    pub latest_limit: u32,
    /// The bird whose reads are traced. `None` picks one from the
    /// discovered birds.
    pub trace_bird: Option<BirdId>,
    /// Directory receiving the trace and result logs.
    pub output_dir: PathBuf,
    /// Calendar used for bucket dates.
    pub bucket_clock: BucketClock,
    /// Retry policy at the store boundary.
    pub retry: RetryPolicy,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables are the same as for [`SimulatorConfig::from_env`].
    ///
    /// Optional variables:
    /// - `PORT` -- CQL port (default 9042)
    /// - `PERIOD_FOR_TRACKING_IN_SECONDS` -- tick period (default 60)
    /// - `NUMBER_OF_TRACKING_CYCLES` -- ticks (default 5)
    /// - `LATEST_LIMIT` -- rows per bird per tick (default 1)
    /// - `DISCOVERY_CONSISTENCY` -- `all` or `quorum` (default `all`)
    /// - `TRACE_BIRD_ID` -- traced bird (default: fourth discovered bird)
    /// - `OUTPUT_DIR` -- log directory (default `.`)
    /// - `BUCKET_CLOCK` -- `local`, `utc` or `YYYY-MM-DD` (default `local`)
    /// - `RETRY_MAX_ATTEMPTS`, `RETRY_INITIAL_BACKOFF_MS`, `RETRY_MAX_BACKOFF_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let latest_limit: u32 = env.parsed_or("LATEST_LIMIT", DEFAULT_LATEST_LIMIT)?;
        if latest_limit == 0 {
            return Err(ConfigError::Invalid {
                name: String::from("LATEST_LIMIT"),
                reason: String::from("must be at least 1"),
            });
        }

        let mut cluster = cluster_config(&env)?;
        if let Some(level) = env.optional("DISCOVERY_CONSISTENCY") {
            let level: ConsistencyLevel = level.parse()?;
            let policy = cluster.consistency.with_discovery(level);
            cluster = cluster.with_consistency(policy);
        }

        Ok(Self {
            cluster,
            period: env.seconds_or("PERIOD_FOR_TRACKING_IN_SECONDS", DEFAULT_TRACKING_PERIOD_SECS)?,
            cycles: env.parsed_or("NUMBER_OF_TRACKING_CYCLES", DEFAULT_TRACKING_CYCLES)?,
            latest_limit,
            trace_bird: env.optional("TRACE_BIRD_ID").map(BirdId::from),
            output_dir: output_dir(&env),
            bucket_clock: env.parsed_or("BUCKET_CLOCK", BucketClock::Local)?,
            retry: retry_policy(&env)?,
        })
    }

    /// The parameters of the tracking loop.
    pub fn plan(&self) -> TrackingPlan {
        TrackingPlan {
            period: self.period,
            cycles: self.cycles,
            latest_limit: self.latest_limit,
            trace_bird: self.trace_bird.clone(),
            bucket_clock: self.bucket_clock,
        }
    }
}

/// Typed access to a variable source.
struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// A set, non-blank variable, trimmed.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name).ok_or_else(|| ConfigError::Missing {
            name: name.to_owned(),
        })
    }

    fn parsed_optional<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(name)
            .map(|value| {
                value.parse().map_err(|e| ConfigError::Invalid {
                    name: name.to_owned(),
                    reason: format!("{value:?}: {e}"),
                })
            })
            .transpose()
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.parsed_optional(name)?.unwrap_or(default))
    }

    /// A non-negative number of seconds, fractional values allowed.
    fn seconds_or(&self, name: &str, default: f64) -> Result<Duration, ConfigError> {
        let seconds: f64 = self.parsed_or(name, default)?;
        Duration::try_from_secs_f64(seconds).map_err(|e| ConfigError::Invalid {
            name: name.to_owned(),
            reason: format!("{seconds}: {e}"),
        })
    }
}

fn cluster_config<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<CassandraConfig, ConfigError> {
    let keyspace = env.required("KEYSPACE")?;
    let table = env.required("TABLE")?;
    QualifiedTable::new(&keyspace, &table)?;

    let contact_points: Vec<String> = env
        .required("CONTACT_POINTS")?
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_owned)
        .collect();
    if contact_points.is_empty() {
        return Err(ConfigError::Invalid {
            name: String::from("CONTACT_POINTS"),
            reason: String::from("no host listed"),
        });
    }

    let replication_factor: u32 = env.parsed_or("REPLICATION_FACTOR", DEFAULT_REPLICATION_FACTOR)?;
    if replication_factor == 0 {
        return Err(ConfigError::Invalid {
            name: String::from("REPLICATION_FACTOR"),
            reason: String::from("must be at least 1"),
        });
    }

    Ok(CassandraConfig::new(contact_points, &keyspace, &table)
        .with_port(env.parsed_or("PORT", DEFAULT_PORT)?)
        .with_replication_factor(replication_factor)
        .with_consistency(ConsistencyPolicy::default()))
}

fn retry_policy<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<RetryPolicy, ConfigError> {
    let initial: u64 = env.parsed_or("RETRY_INITIAL_BACKOFF_MS", DEFAULT_RETRY_INITIAL_BACKOFF_MS)?;
    let max: u64 = env.parsed_or("RETRY_MAX_BACKOFF_MS", DEFAULT_RETRY_MAX_BACKOFF_MS)?;
    Ok(RetryPolicy::single_attempt()
        .with_max_attempts(env.parsed_or("RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS)?)
        .with_backoff(Duration::from_millis(initial), Duration::from_millis(max)))
}

fn output_dir<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> PathBuf {
    env.optional("OUTPUT_DIR")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
}
