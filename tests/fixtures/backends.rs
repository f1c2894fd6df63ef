//! Mock collaborators.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use itinerary_planner::error::{BackendError, NarrativeError};
use itinerary_planner::haversine;
use itinerary_planner::model::{Coordinates, TravelMode, TravelTime};
use itinerary_planner::narrative::{Narrative, NarrativeRequest, NarrativeStop};
use itinerary_planner::traits::{NarrativeProvider, TravelBackend, Waypoint};

use super::paris_locations;

/// Geocodes the Paris fixtures and answers straight-line travel times.
///
/// Counts every call and can be told to drop transit, fail given hops or
/// answer slowly.
#[derive(Default)]
pub struct LandmarkBackend {
    pub transit: bool,
    pub delay: Duration,
    pub failing_hops: HashSet<(String, String)>,
    pub geocode_calls: AtomicUsize,
    pub route_calls: AtomicUsize,
    pub modes: Mutex<Vec<TravelMode>>,
}

impl LandmarkBackend {
    pub fn new() -> Self {
        Self {
            transit: true,
            ..Self::default()
        }
    }

    pub fn without_transit() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn failing_hop(mut self, from: &str, to: &str) -> Self {
        self.failing_hops.insert((from.to_string(), to.to_string()));
        self
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    /// Travel time this backend reports for a hop.
    pub fn expected(from: Coordinates, to: Coordinates, mode: TravelMode) -> TravelTime {
        let meters = (haversine::haversine_km(from, to) * 1000.0).round() as u32;
        TravelTime::new(haversine::seconds_for_distance(meters, mode).max(60), meters)
    }
}

impl TravelBackend for LandmarkBackend {
    fn geocode(&self, address: &str) -> Result<Coordinates, BackendError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        paris_locations::find(address)
            .map(|landmark| landmark.coordinates())
            .ok_or_else(|| BackendError::NoResults(address.to_string()))
    }

    fn compute_travel_time(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
        _departure_time: Option<u32>,
    ) -> Result<TravelTime, BackendError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let hop = (origin.location.to_string(), destination.location.to_string());
        if self.failing_hops.contains(&hop) {
            return Err(BackendError::Timeout);
        }
        if mode == TravelMode::Transit && !self.transit {
            return Err(BackendError::NoRoute);
        }

        match (origin.coordinates, destination.coordinates) {
            (Some(from), Some(to)) => Ok(Self::expected(from, to, mode)),
            _ => Err(BackendError::NoResults(destination.location.to_string())),
        }
    }
}

/// Every request fails as if the quota were exhausted.
#[derive(Default)]
pub struct ExhaustedBackend {
    pub calls: AtomicUsize,
}

impl TravelBackend for ExhaustedBackend {
    fn geocode(&self, _address: &str) -> Result<Coordinates, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Quota)
    }

    fn compute_travel_time(
        &self,
        _origin: &Waypoint,
        _destination: &Waypoint,
        _mode: TravelMode,
        _departure_time: Option<u32>,
    ) -> Result<TravelTime, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Timeout)
    }
}

/// Answers with a fixed narrative after an optional delay, recording requests.
#[derive(Default)]
pub struct StaticNarrator {
    pub narrative: Narrative,
    pub delay: Duration,
    pub requests: Mutex<Vec<NarrativeRequest>>,
}

impl StaticNarrator {
    pub fn new(narrative: Narrative) -> Self {
        Self {
            narrative,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<NarrativeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl NarrativeProvider for StaticNarrator {
    fn narrate(&self, request: &NarrativeRequest) -> Result<Narrative, NarrativeError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(self.narrative.clone())
    }
}

pub struct FailingNarrator;

impl NarrativeProvider for FailingNarrator {
    fn narrate(&self, _request: &NarrativeRequest) -> Result<Narrative, NarrativeError> {
        Err(NarrativeError::Unavailable("service down".to_string()))
    }
}

pub fn narrative_stop(label: &str, duration: Option<&str>, notes: Option<&str>) -> NarrativeStop {
    NarrativeStop {
        label: label.to_string(),
        duration: duration.map(str::to_string),
        notes: notes.map(str::to_string),
    }
}
