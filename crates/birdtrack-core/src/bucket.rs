//! Calendar source for day partitions.
//!
//! The bucket date is read per row, so a tick that runs across midnight
//! starts writing to the next day's partition without any special handling.

use core::str::FromStr;

use chrono::{Local, NaiveDate, Utc};

use crate::config::ConfigError;

/// Which calendar decides the bucket date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketClock {
    /// The host's local date.
    #[default]
    Local,
    /// The UTC date.
    Utc,
    /// A fixed date, for deterministic runs.
    Fixed(NaiveDate),
}

impl BucketClock {
    /// Today's bucket date.
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::Local => Local::now().date_naive(),
            Self::Utc => Utc::now().date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

impl FromStr for BucketClock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::Fixed)
                .map_err(|e| ConfigError::Invalid {
                    name: String::from("BUCKET_CLOCK"),
                    reason: format!("expected local, utc or YYYY-MM-DD, got {other:?}: {e}"),
                }),
        }
    }
}
