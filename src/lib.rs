//! itinerary-planner core
//!
//! Orders points of interest to minimize travel, turns the order into a
//! day-bounded clock schedule and degrades gracefully when travel data is
//! unavailable.

pub mod cache;
pub mod config;
pub mod duration;
pub mod error;
pub mod haversine;
pub mod itinerary;
pub mod model;
pub mod narrative;
pub mod optimizer;
pub mod osrm;
pub mod schedule;
pub mod traits;
pub mod travel;

pub use cache::{CacheStats, GeocodeCache};
pub use config::{CacheConfig, ItineraryOptions, PlannerConfig};
pub use error::{BackendError, ItineraryError, NarrativeError};
pub use itinerary::ItineraryPlanner;
pub use model::{Itinerary, Location, OptimizedRoute, PlanTier, ScheduleItem, TravelMode, TravelTime};
pub use travel::TravelTimeProvider;
