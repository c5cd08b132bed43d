//! Core entity structs: simulated birds and the position rows they produce.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{BirdId, TimeUuid};

/// Species catalog that simulated birds are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    /// *Turdus migratorius*.
    AmericanRobin,
    /// *Corvus brachyrhynchos*.
    AmericanCrow,
    /// *Sturnus vulgaris*.
    EuropeanStarling,
    /// *Zenaida macroura*.
    MourningDove,
    /// *Columba livia*.
    RockPigeon,
}

impl Species {
    /// Every species in the catalog, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::AmericanRobin,
        Self::AmericanCrow,
        Self::EuropeanStarling,
        Self::MourningDove,
        Self::RockPigeon,
    ];

    /// The label persisted in the `species` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AmericanRobin => "American Robin",
            Self::AmericanCrow => "American Crow",
            Self::EuropeanStarling => "European Starling",
            Self::MourningDove => "Mourning Dove",
            Self::RockPigeon => "Rock Pigeon",
        }
    }

    /// Look up a species by its persisted label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl core::fmt::Display for Species {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A simulated bird.
///
/// `id` and `species` are fixed for the lifetime of a run. `position` is
/// owned by the simulator and moves once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bird {
    /// Stable identifier.
    pub id: BirdId,
    /// Species drawn once at spawn.
    pub species: Species,
    /// Current position.
    pub position: Coordinates,
}

/// A position observation to be appended to a bird's day partition.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPosition {
    /// Partition key, first component.
    pub bird_id: BirdId,
    /// Partition key, second component.
    pub bucket_date: NaiveDate,
    /// Observed position.
    pub coordinates: Coordinates,
    /// Species label stored alongside the position.
    pub species: Species,
    /// Clustering key. `None` lets the store generate a time-ordered value.
    pub observed_at: Option<TimeUuid>,
}

impl NewPosition {
    /// Build an observation of `bird` for `bucket_date` with a
    /// store-generated timestamp.
    pub fn of(bird: &Bird, bucket_date: NaiveDate) -> Self {
        Self {
            bird_id: bird.id.clone(),
            bucket_date,
            coordinates: bird.position,
            species: bird.species,
            observed_at: None,
        }
    }

    /// Use an explicit clustering timestamp instead of a store-generated one.
    #[must_use]
    pub const fn at(mut self, observed_at: TimeUuid) -> Self {
        self.observed_at = Some(observed_at);
        self
    }
}

/// One persisted position row, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Partition key, first component.
    pub bird_id: BirdId,
    /// Partition key, second component.
    pub bucket_date: NaiveDate,
    /// Clustering key (descending within the partition).
    pub observed_at: TimeUuid,
    /// Species label.
    pub species: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl PositionRecord {
    /// The row's position.
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
