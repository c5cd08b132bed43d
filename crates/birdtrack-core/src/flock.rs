//! The simulated flock.
//!
//! Birds are named `bird_1..bird_N`, draw a species uniformly from the
//! catalog, and spawn at a uniform position with latitude in `[-180, 180]`
//! and longitude in `[-90, 90]`. The ranges are swapped relative to real
//! geographic bounds; the walk's reflection rule then folds latitudes past
//! 90 back toward the equator on their first step.

use birdtrack_types::{Bird, BirdId, Coordinates, Species};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

/// Absolute bound of spawned latitudes.
const SPAWN_LATITUDE_BOUND: f64 = 180.0;

/// Absolute bound of spawned longitudes.
const SPAWN_LONGITUDE_BOUND: f64 = 90.0;

/// The birds owned by a simulator run.
#[derive(Debug, Clone, PartialEq)]
pub struct Flock {
    birds: Vec<Bird>,
}

impl Flock {
    /// Spawn `count` birds.
    pub fn spawn<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let birds = (1..=count)
            .map(|index| Bird {
                id: BirdId::numbered(index),
                species: Species::ALL.choose(rng).copied().unwrap_or(Species::AmericanRobin),
                position: Coordinates::new(
                    rng.random_range(-SPAWN_LATITUDE_BOUND..=SPAWN_LATITUDE_BOUND),
                    rng.random_range(-SPAWN_LONGITUDE_BOUND..=SPAWN_LONGITUDE_BOUND),
                ),
            })
            .collect();
        Self { birds }
    }

    /// Build a flock from existing birds.
    pub const fn from_birds(birds: Vec<Bird>) -> Self {
        Self { birds }
    }

    /// Birds in current processing order.
    pub fn birds(&self) -> &[Bird] {
        &self.birds
    }

    /// Mutable access for the walk.
    pub fn birds_mut(&mut self) -> &mut [Bird] {
        &mut self.birds
    }

    /// Number of birds.
    pub fn len(&self) -> usize {
        self.birds.len()
    }

    /// Whether the flock is empty.
    pub fn is_empty(&self) -> bool {
        self.birds.is_empty()
    }

    /// Look up a bird by id.
    pub fn get(&self, id: &BirdId) -> Option<&Bird> {
        self.birds.iter().find(|bird| &bird.id == id)
    }

    /// Randomize the processing order for the next tick.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.birds.shuffle(rng);
    }
}
