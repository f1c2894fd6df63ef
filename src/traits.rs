//! Collaborator seams of the planner.
//!
//! Both traits describe external services. Implementations may fail in any
//! way they like; the planner treats every error as "unavailable" and
//! degrades instead of propagating it.

use crate::error::{BackendError, NarrativeError};
use crate::model::{Coordinates, Location, TravelMode, TravelTime};
use crate::narrative::{Narrative, NarrativeRequest};

/// A stop handed to a travel backend: its label and, when geocoding
/// succeeded, its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub location: Location,
    pub coordinates: Option<Coordinates>,
}

impl Waypoint {
    pub fn new(location: Location, coordinates: Option<Coordinates>) -> Self {
        Self {
            location,
            coordinates,
        }
    }
}

/// Mapping service providing geocoding and point-to-point travel times.
pub trait TravelBackend: Send + Sync {
    fn geocode(&self, address: &str) -> Result<Coordinates, BackendError>;

    /// `departure_time` is minutes since midnight when known.
    fn compute_travel_time(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
        departure_time: Option<u32>,
    ) -> Result<TravelTime, BackendError>;
}

/// Produces descriptive itinerary text (title, per-stop notes and durations).
pub trait NarrativeProvider: Send + Sync {
    fn narrate(&self, request: &NarrativeRequest) -> Result<Narrative, NarrativeError>;
}
