//! OSRM HTTP adapter for travel times, with Nominatim-style geocoding.
//!
//! OSRM has no public-transport profile, so transit requests always answer
//! [`BackendError::NoRoute`] and the provider derives them from driving.

use serde::Deserialize;

use crate::error::BackendError;
use crate::model::{Coordinates, TravelMode, TravelTime};
use crate::traits::{TravelBackend, Waypoint};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub walking_profile: String,
    pub driving_profile: String,
    /// Base URL of a Nominatim-compatible `/search` endpoint.
    pub geocoder_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            walking_profile: "foot".to_string(),
            driving_profile: "car".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("itinerary-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    fn profile(&self, mode: TravelMode) -> Option<&str> {
        match mode {
            TravelMode::Walking => Some(self.config.walking_profile.as_str()),
            TravelMode::Driving => Some(self.config.driving_profile.as_str()),
            TravelMode::Transit => None,
        }
    }

    fn route_url(&self, profile: &str, from: Coordinates, to: Coordinates) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url, profile, from.lng, from.lat, to.lng, to.lat
        )
    }

    fn get_json<T>(&self, request: reqwest::blocking::RequestBuilder) -> Result<T, BackendError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request.send().map_err(classify)?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::Quota);
        }
        // OSRM reports NoRoute with a 400 and a JSON body, so read it anyway.
        if status.is_server_error() {
            return Err(BackendError::Status(status.to_string()));
        }
        response.json::<T>().map_err(classify)
    }
}

impl TravelBackend for OsrmClient {
    fn geocode(&self, address: &str) -> Result<Coordinates, BackendError> {
        let url = format!("{}/search", self.config.geocoder_url);
        let request = self
            .client
            .get(url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")]);

        let places: Vec<GeocodePlace> = self.get_json(request)?;
        places
            .first()
            .and_then(GeocodePlace::coordinates)
            .ok_or_else(|| BackendError::NoResults(address.to_string()))
    }

    fn compute_travel_time(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TravelMode,
        _departure_time: Option<u32>,
    ) -> Result<TravelTime, BackendError> {
        let profile = self.profile(mode).ok_or(BackendError::NoRoute)?;
        let from = origin
            .coordinates
            .ok_or_else(|| BackendError::NoResults(origin.location.to_string()))?;
        let to = destination
            .coordinates
            .ok_or_else(|| BackendError::NoResults(destination.location.to_string()))?;

        let url = self.route_url(profile, from, to);
        let body: OsrmRouteResponse = self.get_json(self.client.get(url))?;
        body.into_travel_time()
    }
}

fn classify(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Http(err)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodePlace {
    lat: String,
    lon: String,
}

impl GeocodePlace {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat.parse().ok()?, self.lon.parse().ok()?))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
    distance: f64,
}

impl OsrmRouteResponse {
    fn into_travel_time(self) -> Result<TravelTime, BackendError> {
        match self.code.as_str() {
            "Ok" => self
                .routes
                .first()
                .map(|route| TravelTime::new(route.duration.round() as u32, route.distance.round() as u32))
                .ok_or(BackendError::NoRoute),
            "NoRoute" | "NoSegment" => Err(BackendError::NoRoute),
            other => Err(BackendError::Status(other.to_string())),
        }
    }
}
