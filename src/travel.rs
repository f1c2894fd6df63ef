//! Travel-time provider.
//!
//! Wraps a [`TravelBackend`] with cache-first geocoding and a degradation
//! chain that always yields a usable [`TravelTime`]:
//!
//! 1. the backend answer for the requested mode;
//! 2. for transit without a route, a driving answer slowed down by
//!    [`haversine::TRANSIT_SLOWDOWN`] plus a walking/waiting allowance;
//! 3. a synthetic city-hop estimate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::cache::GeocodeCache;
use crate::error::BackendError;
use crate::haversine;
use crate::model::{Coordinates, Location, TravelMode, TravelTime};
use crate::traits::{TravelBackend, Waypoint};

pub struct TravelTimeProvider {
    backend: Arc<dyn TravelBackend>,
    cache: GeocodeCache,
    degraded: AtomicUsize,
}

impl TravelTimeProvider {
    pub fn new(backend: Arc<dyn TravelBackend>, cache: GeocodeCache) -> Self {
        Self {
            backend,
            cache,
            degraded: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Number of answers synthesized locally since construction.
    pub fn degraded_count(&self) -> usize {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Cache-first geocoding. Backend failures are logged and yield `None`.
    pub fn geocode(&self, address: &str) -> Option<Coordinates> {
        if let Some(coordinates) = self.cache.get(address) {
            debug!(address, "geocode cache hit");
            return Some(coordinates);
        }

        match self.backend.geocode(address) {
            Ok(coordinates) => {
                self.cache.set(address, coordinates);
                Some(coordinates)
            }
            Err(err) => {
                warn!(address, error = %err, "geocoding failed");
                None
            }
        }
    }

    pub fn waypoint(&self, location: &Location) -> Waypoint {
        Waypoint::new(location.clone(), self.geocode(location.as_str()))
    }

    /// Travel time between two locations. Never fails.
    pub fn travel_time(
        &self,
        origin: &Location,
        destination: &Location,
        mode: TravelMode,
        departure_time: Option<u32>,
    ) -> TravelTime {
        if origin == destination {
            return TravelTime::zero();
        }

        let from = self.waypoint(origin);
        let to = self.waypoint(destination);
        self.between(&from, &to, mode, departure_time)
    }

    /// Like [`Self::travel_time`] for already geocoded waypoints.
    pub fn between(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
        departure_time: Option<u32>,
    ) -> TravelTime {
        match self.try_between(origin, destination, mode, departure_time) {
            Ok(travel_time) => travel_time,
            Err(err) => {
                warn!(
                    origin = %origin.location,
                    destination = %destination.location,
                    mode = mode.as_str(),
                    error = %err,
                    "travel backend unavailable, using synthetic estimate"
                );
                self.record_degraded();
                haversine::synthetic_estimate(&origin.location, &destination.location, mode)
            }
        }
    }

    /// Backend answer for the hop, including the transit-from-driving
    /// substitution. Errors only when no backend-derived value exists.
    pub fn try_between(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
        departure_time: Option<u32>,
    ) -> Result<TravelTime, BackendError> {
        if origin.location == destination.location {
            return Ok(TravelTime::zero());
        }

        let result = self
            .backend
            .compute_travel_time(origin, destination, mode, departure_time);

        match result {
            Err(err) if mode == TravelMode::Transit && err.is_no_route() => {
                debug!(
                    origin = %origin.location,
                    destination = %destination.location,
                    "no transit route, deriving from driving"
                );
                let driving = self.backend.compute_travel_time(
                    origin,
                    destination,
                    TravelMode::Driving,
                    departure_time,
                )?;
                self.record_degraded();
                Ok(haversine::transit_from_driving(&driving))
            }
            Err(err) => Err(err),
            Ok(travel_time) => Ok(with_distinct_duration(travel_time)),
        }
    }

    /// Straight-line estimate when both endpoints are geocoded, synthetic
    /// estimate otherwise.
    pub fn geographic_estimate(&self, origin: &Waypoint, destination: &Waypoint, mode: TravelMode) -> TravelTime {
        self.record_degraded();
        match (origin.coordinates, destination.coordinates) {
            _ if origin.location == destination.location => TravelTime::zero(),
            (Some(from), Some(to)) => haversine::estimate_between(from, to, mode),
            _ => haversine::synthetic_estimate(&origin.location, &destination.location, mode),
        }
    }

    fn record_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }
}

/// Distinct stops never report a zero duration.
fn with_distinct_duration(mut travel_time: TravelTime) -> TravelTime {
    if travel_time.duration_seconds == 0 {
        travel_time.duration_seconds = 60;
        travel_time.duration_text = crate::duration::format_duration_text(60);
    }
    travel_time
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Backend scripted per mode; records every request.
    struct ScriptedBackend {
        walking: Option<TravelTime>,
        driving: Option<TravelTime>,
        transit: Option<TravelTime>,
        geocode_ok: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                walking: None,
                driving: None,
                transit: None,
                geocode_ok: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TravelBackend for ScriptedBackend {
        fn geocode(&self, address: &str) -> Result<Coordinates, BackendError> {
            self.calls.lock().unwrap().push(format!("geocode:{address}"));
            if self.geocode_ok {
                Ok(Coordinates::new(48.85, 2.35))
            } else {
                Err(BackendError::Quota)
            }
        }

        fn compute_travel_time(
            &self,
            _origin: &Waypoint,
            _destination: &Waypoint,
            mode: TravelMode,
            _departure_time: Option<u32>,
        ) -> Result<TravelTime, BackendError> {
            self.calls.lock().unwrap().push(format!("route:{}", mode.as_str()));
            let answer = match mode {
                TravelMode::Walking => &self.walking,
                TravelMode::Driving => &self.driving,
                TravelMode::Transit => &self.transit,
            };
            answer.clone().ok_or(BackendError::NoRoute)
        }
    }

    fn location(label: &str) -> Location {
        Location::new(label).unwrap()
    }

    fn provider(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, TravelTimeProvider) {
        let backend = Arc::new(backend);
        let provider = TravelTimeProvider::new(backend.clone(), GeocodeCache::default());
        (backend, provider)
    }

    #[test]
    fn returns_backend_answer() {
        let (_, provider) = provider(ScriptedBackend {
            walking: Some(TravelTime::new(600, 800)),
            ..ScriptedBackend::new()
        });

        let result = provider.travel_time(&location("A"), &location("B"), TravelMode::Walking, None);
        assert_eq!(result, TravelTime::new(600, 800));
        assert_eq!(provider.degraded_count(), 0);
    }

    #[test]
    fn transit_without_route_is_derived_from_driving() {
        let (backend, provider) = provider(ScriptedBackend {
            driving: Some(TravelTime::new(1000, 5000)),
            ..ScriptedBackend::new()
        });

        let result = provider.travel_time(&location("A"), &location("B"), TravelMode::Transit, None);
        assert_eq!(result.duration_seconds, 1500 + haversine::TRANSIT_ALLOWANCE_SECS);
        assert_eq!(result.distance_meters, 5000);
        assert!(result.estimated);

        let calls = backend.calls.lock().unwrap();
        assert!(calls.contains(&"route:transit".to_string()));
        assert!(calls.contains(&"route:driving".to_string()));
    }

    #[test]
    fn falls_back_to_synthetic_estimate() {
        let (_, provider) = provider(ScriptedBackend::new());

        let result = provider.travel_time(&location("A"), &location("B"), TravelMode::Walking, None);
        assert!(result.estimated);
        assert!(result.duration_seconds > 0);
        assert_eq!(provider.degraded_count(), 1);
    }

    #[test]
    fn same_location_costs_nothing_and_skips_backend() {
        let (backend, provider) = provider(ScriptedBackend::new());

        let result = provider.travel_time(&location("A"), &location("A"), TravelMode::Driving, None);
        assert_eq!(result.duration_seconds, 0);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn geocoding_goes_through_the_cache() {
        let (backend, provider) = provider(ScriptedBackend::new());

        assert!(provider.geocode("Louvre, Paris").is_some());
        assert!(provider.geocode("louvre paris").is_some());

        let geocode_calls = backend
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with("geocode:"))
            .count();
        assert_eq!(geocode_calls, 1);
    }

    #[test]
    fn geocoding_failure_is_absorbed() {
        let (_, provider) = provider(ScriptedBackend {
            geocode_ok: false,
            ..ScriptedBackend::new()
        });

        assert_eq!(provider.geocode("Atlantis"), None);
        assert!(provider.cache().is_empty());
    }

    #[test]
    fn zero_backend_duration_between_distinct_stops_is_raised() {
        let (_, provider) = provider(ScriptedBackend {
            driving: Some(TravelTime::new(0, 0)),
            ..ScriptedBackend::new()
        });

        let result = provider.travel_time(&location("A"), &location("B"), TravelMode::Driving, None);
        assert_eq!(result.duration_seconds, 60);
    }
}
