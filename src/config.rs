//! Request options and planner configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::duration::parse_clock_time;
use crate::model::{Location, TravelMode};

pub const MIN_VISIT_MINUTES: u32 = 15;
pub const MAX_VISIT_MINUTES: u32 = 480;

/// Per-request options, as received from the surrounding application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItineraryOptions {
    pub travel_mode: TravelMode,
    /// First arrival on day 1, `"HH:MM"`.
    pub start_time: String,
    pub visit_duration_minutes: u32,
    pub include_breaks: bool,
    /// When false, every stop stays on day 1 regardless of the daily window.
    pub multi_day: bool,
    /// Start point for route optimization; never part of the schedule.
    pub hotel_location: Option<Location>,
    pub daily_start: String,
    pub daily_end: String,
    /// Forwarded to the narrative collaborator.
    pub session_id: Option<String>,
}

impl Default for ItineraryOptions {
    fn default() -> Self {
        Self {
            travel_mode: TravelMode::Walking,
            start_time: "09:00".to_string(),
            visit_duration_minutes: 60,
            include_breaks: true,
            multi_day: true,
            hotel_location: None,
            daily_start: "09:00".to_string(),
            daily_end: "20:00".to_string(),
            session_id: None,
        }
    }
}

impl ItineraryOptions {
    /// Returns a copy with out-of-range values replaced or clamped.
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let mut options = self.clone();

        let clamped = options
            .visit_duration_minutes
            .clamp(MIN_VISIT_MINUTES, MAX_VISIT_MINUTES);
        if clamped != options.visit_duration_minutes {
            tracing::warn!(
                requested = options.visit_duration_minutes,
                clamped,
                "visit duration out of range"
            );
            options.visit_duration_minutes = clamped;
        }

        for (name, value, default) in [
            ("startTime", &mut options.start_time, &defaults.start_time),
            ("dailyStart", &mut options.daily_start, &defaults.daily_start),
            ("dailyEnd", &mut options.daily_end, &defaults.daily_end),
        ] {
            if parse_clock_time(value).is_none() {
                tracing::warn!(option = name, value = %value, "invalid clock time, using default");
                *value = default.clone();
            }
        }

        let window = options.daily_window();
        if window.end <= window.start {
            tracing::warn!(
                daily_start = %options.daily_start,
                daily_end = %options.daily_end,
                "daily window is empty, using default window"
            );
            options.daily_start = defaults.daily_start;
            options.daily_end = defaults.daily_end;
        }

        options
    }

    pub fn daily_window(&self) -> DailyWindow {
        let fallback = DailyWindow::default();
        DailyWindow {
            start: parse_clock_time(&self.daily_start).unwrap_or(fallback.start),
            end: parse_clock_time(&self.daily_end).unwrap_or(fallback.end),
        }
    }

    pub fn start_minutes(&self) -> u32 {
        parse_clock_time(&self.start_time).unwrap_or_else(|| self.daily_window().start)
    }
}

/// Daily operating window in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start: u32,
    pub end: u32,
}

impl Default for DailyWindow {
    fn default() -> Self {
        Self {
            start: 9 * 60,
            end: 20 * 60,
        }
    }
}

/// Tuning of the planning pipeline.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Largest input that gets the full pairwise travel-time matrix.
    pub exact_max_stops: usize,
    /// Inputs above this size take the degraded large-input tier.
    pub large_input_threshold: usize,
    /// Stops sent to the narrative collaborator for large inputs.
    pub degraded_narrative_stops: usize,
    pub narrative_timeout: Duration,
    pub degraded_narrative_timeout: Duration,
    pub optimize_timeout: Duration,
    /// Parallel travel-time calls while building a matrix or edge list.
    pub matrix_concurrency: usize,
    /// Delay before each edge request on the fast path.
    pub edge_pacing: Duration,
    pub narrative_hop_minutes: u32,
    pub sequential_visit_minutes: u32,
    pub sequential_transition_minutes: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            exact_max_stops: 8,
            large_input_threshold: 10,
            degraded_narrative_stops: 8,
            narrative_timeout: Duration::from_secs(25),
            degraded_narrative_timeout: Duration::from_secs(12),
            optimize_timeout: Duration::from_secs(90),
            matrix_concurrency: 4,
            edge_pacing: Duration::from_millis(100),
            narrative_hop_minutes: 15,
            sequential_visit_minutes: 90,
            sequential_transition_minutes: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            capacity: 1000,
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}
