//! Great-circle distance and locally synthesized travel estimates.
//!
//! Used when the travel backend is unavailable: straight-line distance
//! ignores the street network but is always computable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::model::{Coordinates, Location, TravelMode, TravelTime};

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Transit estimates derived from driving are this much slower.
pub const TRANSIT_SLOWDOWN: f64 = 1.5;

/// Walking and waiting added on top of a driving-derived transit estimate.
pub const TRANSIT_ALLOWANCE_SECS: u32 = 10 * 60;

/// Range of synthetic hop distances, in meters: a few city blocks up to a
/// cross-town trip.
const SYNTHETIC_DISTANCE_METERS: std::ops::RangeInclusive<u32> = 500..=3000;

/// Waiting time added to synthetic transit hops, in minutes.
const SYNTHETIC_TRANSIT_WAIT_MINUTES: std::ops::RangeInclusive<u32> = 5..=15;

/// Assumed average speed per mode in km/h.
pub fn speed_kmh(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Walking => 4.5,
        TravelMode::Driving => 20.0,
        TravelMode::Transit => 12.0,
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Pairwise straight-line distances; missing coordinates yield `None`.
pub fn distance_matrix_km(points: &[Option<Coordinates>]) -> Vec<Vec<Option<f64>>> {
    let n = points.len();
    let mut matrix = vec![vec![None; n]; n];

    for (i, from) in points.iter().enumerate() {
        for (j, to) in points.iter().enumerate() {
            matrix[i][j] = match (from, to) {
                _ if i == j => Some(0.0),
                (Some(from), Some(to)) => Some(haversine_km(*from, *to)),
                _ => None,
            };
        }
    }

    matrix
}

/// Travel seconds for `meters` at the assumed speed of `mode`.
pub fn seconds_for_distance(meters: u32, mode: TravelMode) -> u32 {
    let hours = f64::from(meters) / 1000.0 / speed_kmh(mode);
    (hours * 3600.0).round() as u32
}

/// Distance covered in `seconds` at the assumed speed of `mode`.
pub fn meters_for_duration(seconds: u32, mode: TravelMode) -> u32 {
    let km = speed_kmh(mode) * f64::from(seconds) / 3600.0;
    (km * 1000.0).round() as u32
}

/// Estimate from the straight-line distance between two known points.
pub fn estimate_between(from: Coordinates, to: Coordinates, mode: TravelMode) -> TravelTime {
    let meters = (haversine_km(from, to) * 1000.0).round() as u32;
    let mut seconds = seconds_for_distance(meters, mode);
    if mode == TravelMode::Transit {
        seconds += TRANSIT_ALLOWANCE_SECS;
    }
    TravelTime::estimated(seconds.max(60), meters)
}

/// Transit estimate derived from a driving answer.
pub fn transit_from_driving(driving: &TravelTime) -> TravelTime {
    let seconds =
        (f64::from(driving.duration_seconds) * TRANSIT_SLOWDOWN).round() as u32 + TRANSIT_ALLOWANCE_SECS;
    TravelTime::estimated(seconds, driving.distance_meters)
}

/// Plausible city hop when nothing is known about either endpoint.
///
/// The distance is drawn from a generator seeded by the endpoints and mode,
/// so the same pair always gets the same estimate.
pub fn synthetic_estimate(origin: &Location, destination: &Location, mode: TravelMode) -> TravelTime {
    if origin == destination {
        return TravelTime {
            estimated: true,
            ..TravelTime::zero()
        };
    }

    let mut hasher = DefaultHasher::new();
    (origin, destination, mode).hash(&mut hasher);
    let mut rng = SmallRng::seed_from_u64(hasher.finish());

    let meters = rng.gen_range(SYNTHETIC_DISTANCE_METERS);
    let mut seconds = seconds_for_distance(meters, mode);
    if mode == TravelMode::Transit {
        seconds += rng.gen_range(SYNTHETIC_TRANSIT_WAIT_MINUTES) * 60;
    }

    TravelTime::estimated(seconds, meters)
}
