//! Identifier types for birds and position rows.
//!
//! Birds are identified by a stable, human-readable string (`bird_1`,
//! `bird_2`, ...) assigned once at simulation start. Position rows are
//! identified within their partition by a version-1 (time-based) UUID, the
//! same representation the store uses for its `timeuuid` clustering column.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::{ContextV1, Timestamp, Uuid};

/// Node identifier embedded in client-generated time UUIDs.
const NODE_ID: [u8; 6] = *b"birds\0";

/// Stable identifier of a simulated bird.
///
/// Compared by value. Two ids built from equal strings are the same bird.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BirdId(String);

impl BirdId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the bird at 1-based position `index` in a simulated
    /// flock (`bird_{index}`).
    pub fn numbered(index: usize) -> Self {
        Self(format!("bird_{index}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BirdId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BirdId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for BirdId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A time-based (version 1) UUID used as the clustering key of a position row.
///
/// Ordering follows the embedded timestamp first and the raw bytes second,
/// which matches how the store orders `timeuuid` values within a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeUuid(Uuid);

impl TimeUuid {
    /// Build a time UUID for the given instant.
    ///
    /// Instants before the Unix epoch are clamped to the epoch.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let seconds = u64::try_from(at.timestamp()).unwrap_or(0);
        let timestamp = Timestamp::from_unix(ContextV1::new(0), seconds, at.timestamp_subsec_nanos());
        Self(Uuid::new_v1(timestamp, &NODE_ID))
    }

    /// Build a time UUID for the current instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap a UUID read from the store.
    ///
    /// Returns `None` if the UUID does not carry a version-1 timestamp.
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        (uuid.get_version_num() == 1).then_some(Self(uuid))
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Seconds and sub-second nanoseconds since the Unix epoch.
    pub fn unix_time(&self) -> (u64, u32) {
        self.0.get_timestamp().map_or((0, 0), |ts| ts.to_unix())
    }

    /// The embedded timestamp as a UTC instant.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let (seconds, nanos) = self.unix_time();
        let seconds = i64::try_from(seconds).ok()?;
        DateTime::from_timestamp(seconds, nanos)
    }
}

impl Ord for TimeUuid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unix_time()
            .cmp(&other.unix_time())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for TimeUuid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl core::fmt::Display for TimeUuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TimeUuid> for Uuid {
    fn from(id: TimeUuid) -> Self {
        id.0
    }
}
