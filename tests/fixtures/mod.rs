//! Test fixtures for itinerary-planner.
//!
//! Provides realistic test data including:
//! - Real Paris landmarks (from OpenStreetMap)
//! - Mock travel backends and narrative collaborators

#![allow(dead_code)]

pub mod backends;
pub mod paris_locations;

pub use backends::*;
pub use paris_locations::*;
