//! Bounded random walk for bird positions.
//!
//! Each tick a bird moves by independent uniform deltas in `[-s, s]` on both
//! axes. Latitude past a pole is reflected with `180 - lat` (or
//! `-180 - lat`); longitude past the antimeridian wraps by 360 degrees.
//!
//! The latitude reflection does not also rotate longitude by 180 degrees as a
//! true polar crossing would, and a single reflection only lands inside
//! `[-90, 90]` when the pre-step latitude was within `[-270, 270]`.

use birdtrack_types::Coordinates;
use rand::Rng;

/// Default per-axis step bound in degrees.
pub const DEFAULT_STEP_DEGREES: f64 = 0.01;

/// Reflect a latitude that crossed a pole.
pub fn reflect_latitude(latitude: f64) -> f64 {
    if latitude > 90.0 {
        180.0 - latitude
    } else if latitude < -90.0 {
        -180.0 - latitude
    } else {
        latitude
    }
}

/// Wrap a longitude that crossed the antimeridian.
pub fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else if longitude < -180.0 {
        longitude + 360.0
    } else {
        longitude
    }
}

/// Move `position` by the given deltas, then reflect and wrap.
pub fn apply_step(position: Coordinates, delta_latitude: f64, delta_longitude: f64) -> Coordinates {
    Coordinates::new(
        reflect_latitude(position.latitude + delta_latitude),
        wrap_longitude(position.longitude + delta_longitude),
    )
}

/// Draw uniform deltas in `[-step, step]` and apply them to `position`.
pub fn random_step<R: Rng + ?Sized>(rng: &mut R, position: Coordinates, step: f64) -> Coordinates {
    let bound = step.abs();
    let delta_latitude = rng.random_range(-bound..=bound);
    let delta_longitude = rng.random_range(-bound..=bound);
    apply_step(position, delta_latitude, delta_longitude)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn interior_steps_stay_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        for step in [0.001, DEFAULT_STEP_DEGREES, 0.5, 3.0] {
            let mut position = Coordinates::new(10.0, 20.0);
            for _ in 0..500 {
                let next = random_step(&mut rng, position, step);
                assert!((next.latitude - position.latitude).abs() <= step + EPS);
                assert!((next.longitude - position.longitude).abs() <= step + EPS);
                position = next;
            }
        }
    }

    #[test]
    fn zero_step_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Coordinates::new(-45.5, 120.25);
        let next = random_step(&mut rng, start, 0.0);
        assert_eq!(next.latitude, start.latitude);
        assert_eq!(next.longitude, start.longitude);
    }

    #[test]
    fn latitude_reflection_is_literal() {
        assert!((reflect_latitude(90.005) - 89.995).abs() < EPS);
        assert!((reflect_latitude(-90.25) + 89.75).abs() < EPS);
        assert_eq!(reflect_latitude(90.0), 90.0);
        assert_eq!(reflect_latitude(-90.0), -90.0);
        // Spawned latitudes reach 180, where one reflection lands near the
        // equator instead of near the pole.
        assert!((reflect_latitude(179.995) - 0.005).abs() < EPS);
        // Far out of range, one reflection does not reach [-90, 90].
        assert_eq!(reflect_latitude(275.0), -95.0);
        assert_eq!(reflect_latitude(-300.0), 120.0);
    }

    #[test]
    fn reflection_does_not_touch_longitude() {
        let next = apply_step(Coordinates::new(89.999, 45.0), 0.01, 0.0);
        assert!((next.latitude - 89.991).abs() < EPS);
        assert_eq!(next.longitude, 45.0);
    }

    #[test]
    fn one_wrap_brings_longitude_back() {
        for overshoot in [0.001, 0.005, DEFAULT_STEP_DEGREES] {
            let east = wrap_longitude(180.0 + overshoot);
            let west = wrap_longitude(-180.0 - overshoot);
            assert!((-180.0..=180.0).contains(&east));
            assert!((-180.0..=180.0).contains(&west));
            assert!((east - (-180.0 + overshoot)).abs() < EPS);
            assert!((west - (180.0 - overshoot)).abs() < EPS);
        }
    }

    #[test]
    fn wrap_is_idempotent_in_range() {
        for longitude in [-180.0, -179.99, -1.0, 0.0, 33.3, 179.99, 180.0] {
            assert_eq!(wrap_longitude(longitude), longitude);
            assert_eq!(wrap_longitude(wrap_longitude(longitude)), wrap_longitude(longitude));
        }
        let wrapped = wrap_longitude(180.004);
        assert_eq!(wrap_longitude(wrapped), wrapped);
    }

    #[test]
    fn spawned_range_longitudes_never_wrap() {
        // Spawned longitudes are drawn from [-90, 90], far from the antimeridian.
        let next = apply_step(Coordinates::new(0.0, 90.0), 0.0, DEFAULT_STEP_DEGREES);
        assert!((next.longitude - 90.01).abs() < EPS);
    }
}
