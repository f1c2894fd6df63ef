//! Itinerary data model.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point of interest, identified by its display string.
///
/// The same string is used as the geocoding key, so `"Eiffel Tower, Paris"`
/// is both what the traveller reads and what gets looked up.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("location label must not be blank")]
pub struct BlankLocation;

impl Location {
    /// Returns `None` for blank labels.
    pub fn new(label: impl Into<String>) -> Option<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            None
        } else {
            Some(Self(label))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Location {
    type Error = BlankLocation;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::new(label).ok_or(BlankLocation)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// WGS84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Driving,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
        }
    }
}

/// Travel cost of a single hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTime {
    pub duration_seconds: u32,
    pub distance_meters: u32,
    pub duration_text: String,
    pub distance_text: String,
    /// Synthesized locally instead of reported by the travel backend.
    #[serde(default)]
    pub estimated: bool,
}

impl TravelTime {
    /// Builds a travel time with generated display texts.
    pub fn new(duration_seconds: u32, distance_meters: u32) -> Self {
        Self {
            duration_seconds,
            distance_meters,
            duration_text: crate::duration::format_duration_text(duration_seconds),
            distance_text: crate::duration::format_distance_text(distance_meters),
            estimated: false,
        }
    }

    /// A travel time computed locally because the backend could not answer.
    pub fn estimated(duration_seconds: u32, distance_meters: u32) -> Self {
        Self {
            estimated: true,
            ..Self::new(duration_seconds, distance_meters)
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub from: Location,
    pub to: Location,
    pub travel_time: TravelTime,
    pub mode: TravelMode,
}

/// A visiting order plus the cost of each consecutive hop.
///
/// `ordered_locations` is always a permutation of the optimizer input,
/// `steps.len() == ordered_locations.len() - 1` for non-empty routes and the
/// totals are the sums over `steps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedRoute {
    pub ordered_locations: Vec<Location>,
    pub total_travel_time_seconds: u64,
    pub total_distance_meters: u64,
    pub steps: Vec<RouteStep>,
}

impl OptimizedRoute {
    /// Assembles a route from its order and steps, deriving the totals.
    pub fn from_steps(ordered_locations: Vec<Location>, steps: Vec<RouteStep>) -> Self {
        let total_travel_time_seconds = steps
            .iter()
            .map(|step| u64::from(step.travel_time.duration_seconds))
            .sum();
        let total_distance_meters = steps
            .iter()
            .map(|step| u64::from(step.travel_time.distance_meters))
            .sum();

        Self {
            ordered_locations,
            total_travel_time_seconds,
            total_distance_meters,
            steps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_locations.is_empty()
    }

    /// True when any hop relies on a locally synthesized estimate.
    pub fn has_estimates(&self) -> bool {
        self.steps.iter().any(|step| step.travel_time.estimated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Lunch,
    Dinner,
}

impl Meal {
    /// Fixed clock time of the break, in minutes since midnight.
    pub fn clock_minutes(&self) -> u32 {
        match self {
            Meal::Lunch => 12 * 60,
            Meal::Dinner => 18 * 60,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        match self {
            Meal::Lunch => 60,
            Meal::Dinner => 90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Meal::Lunch => "Lunch break",
            Meal::Dinner => "Dinner break",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "meal")]
pub enum ItemKind {
    Visit,
    Break(Meal),
}

/// A time-stamped entry of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub label: String,
    pub kind: ItemKind,
    pub arrival_time: String,
    pub departure_time: String,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time_to_next: Option<String>,
    pub day_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ScheduleItem {
    pub fn is_break(&self) -> bool {
        matches!(self.kind, ItemKind::Break(_))
    }
}

/// Which stage of the planning pipeline produced an itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanTier {
    /// Matrix or geographic optimization with full narrative enrichment.
    Primary,
    /// Large input: fast geographic optimization and a shortened narrative.
    DegradedLargeInput,
    /// Order taken from the narrative collaborator, synthetic hop times.
    NarrativeOnly,
    /// Input order, fixed visit and transition durations.
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub title: String,
    pub total_duration: String,
    pub total_travel_time: String,
    pub schedule: Vec<ScheduleItem>,
    pub route: OptimizedRoute,
    pub day_count: u32,
    pub tier: PlanTier,
    pub fallback_used: bool,
}
