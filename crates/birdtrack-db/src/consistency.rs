//! Per-operation consistency levels.
//!
//! Every statement the stores issue runs at an explicitly chosen level:
//!
//! | Operation | Default | Reason |
//! |-----------|---------|--------|
//! | Create keyspace | `ALL` | schema must be visible everywhere before writes |
//! | Create table | `QUORUM` | |
//! | Write position | `QUORUM` | balance of latency and durability |
//! | Discover birds | `ALL` | infrequent, freshness-sensitive |
//! | Latest position | `QUORUM` | read-your-writes within a majority |

use core::str::FromStr;

use scylla::statement::Consistency;

use crate::error::DbError;

/// Consistency levels used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsistencyLevel {
    /// A single replica.
    One,
    /// A majority of replicas across the cluster.
    Quorum,
    /// A majority of replicas in the local datacenter.
    LocalQuorum,
    /// Every replica.
    All,
}

impl ConsistencyLevel {
    /// The driver's representation of this level.
    pub const fn to_driver(self) -> Consistency {
        match self {
            Self::One => Consistency::One,
            Self::Quorum => Consistency::Quorum,
            Self::LocalQuorum => Consistency::LocalQuorum,
            Self::All => Consistency::All,
        }
    }

    /// Canonical upper-case CQL name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "ONE",
            Self::Quorum => "QUORUM",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::All => "ALL",
        }
    }
}

impl core::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one" => Ok(Self::One),
            "quorum" => Ok(Self::Quorum),
            "local_quorum" => Ok(Self::LocalQuorum),
            "all" => Ok(Self::All),
            other => Err(DbError::Config(format!(
                "unknown consistency level: {other}"
            ))),
        }
    }
}

/// The consistency level chosen for each kind of statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    /// `CREATE KEYSPACE`.
    pub keyspace_ddl: ConsistencyLevel,
    /// `CREATE TABLE`.
    pub table_ddl: ConsistencyLevel,
    /// Position inserts.
    pub write: ConsistencyLevel,
    /// `SELECT DISTINCT` over the partition key.
    pub discovery: ConsistencyLevel,
    /// Latest-row lookups within one partition.
    pub latest: ConsistencyLevel,
}

impl ConsistencyPolicy {
    /// Override the level used for bird discovery.
    #[must_use]
    pub const fn with_discovery(mut self, level: ConsistencyLevel) -> Self {
        self.discovery = level;
        self
    }
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            keyspace_ddl: ConsistencyLevel::All,
            table_ddl: ConsistencyLevel::Quorum,
            write: ConsistencyLevel::Quorum,
            discovery: ConsistencyLevel::All,
            latest: ConsistencyLevel::Quorum,
        }
    }
}
