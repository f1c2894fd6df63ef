//! Error taxonomy for backends, the narrative collaborator and the planner.

use thiserror::Error;

/// Failures reported by a [`crate::traits::TravelBackend`].
///
/// None of these escape the travel-time provider; they select which
/// degradation path is taken.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("travel backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("travel backend timed out")]
    Timeout,
    #[error("travel backend quota exhausted")]
    Quota,
    #[error("travel backend returned status {0}")]
    Status(String),
    #[error("no route found")]
    NoRoute,
    #[error("no geocoding results for {0:?}")]
    NoResults(String),
}

impl BackendError {
    /// The backend answered, but had nothing usable for the request.
    pub fn is_no_route(&self) -> bool {
        matches!(self, BackendError::NoRoute | BackendError::NoResults(_))
    }
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("narrative collaborator timed out")]
    Timeout,
    #[error("narrative payload could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The only failure `build_itinerary` reports to its caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItineraryError {
    #[error("at least one location is required")]
    EmptyInput,
}
