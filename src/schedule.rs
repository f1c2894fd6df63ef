//! Clock-time scheduling of an ordered route.
//!
//! Scheduling is a pipeline of pure passes, each returning a new schedule:
//!
//! 1. [`time_stops`]: assigns arrival/departure times and day indices;
//! 2. [`insert_meal_breaks`]: adds lunch and dinner breaks per day;
//! 3. [`attach_notes`]: merges narrative notes into visit items.

use tracing::{debug, warn};

use crate::config::DailyWindow;
use crate::duration::{format_clock_time, parse_clock_time, parse_duration_text, parse_travel_minutes};
use crate::model::{ItemKind, Location, Meal, OptimizedRoute, ScheduleItem};
use crate::narrative::{Narrative, fallback_note};

/// Lunch is placed after the first visit arriving in this window.
pub const LUNCH_WINDOW: (u32, u32) = (11 * 60, 14 * 60);

/// Dinner is placed after the first visit arriving in this window.
pub const DINNER_WINDOW: (u32, u32) = (16 * 60 + 30, 19 * 60);

/// A break closer than this many items to a candidate suppresses insertion.
const BREAK_ADJACENCY: usize = 2;

/// One entry to be timed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStop {
    pub label: String,
    pub kind: ItemKind,
    /// Free-form duration, e.g. `"2-3 hours"`. Falls back to the default.
    pub duration: Option<String>,
    /// Travel to the following stop, e.g. `"15 mins"`.
    pub travel_to_next: Option<String>,
}

impl PlannedStop {
    pub fn visit(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ItemKind::Visit,
            duration: None,
            travel_to_next: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimingOptions {
    /// Clock of the first arrival on day 1.
    pub first_day_start: u32,
    pub window: DailyWindow,
    pub default_visit_minutes: u32,
    /// When false, the daily end never starts a new day.
    pub multi_day: bool,
}

impl Default for TimingOptions {
    fn default() -> Self {
        let window = DailyWindow::default();
        Self {
            first_day_start: window.start,
            window,
            default_visit_minutes: 60,
            multi_day: true,
        }
    }
}

/// Converts a route into stops to be timed, with travel texts taken from
/// the route's hops and durations looked up per location.
pub fn stops_from_route<F>(route: &OptimizedRoute, duration_for: F) -> Vec<PlannedStop>
where
    F: Fn(&Location) -> Option<String>,
{
    route
        .ordered_locations
        .iter()
        .enumerate()
        .map(|(index, location)| PlannedStop {
            label: location.to_string(),
            kind: ItemKind::Visit,
            duration: duration_for(location),
            travel_to_next: route
                .steps
                .get(index)
                .map(|step| step.travel_time.duration_text.clone()),
        })
        .collect()
}

/// Assigns clock times to `stops` in order.
///
/// State is `(day, clock)`. An item that would end after the daily window
/// moves to the start of the next day, unless it is the first item of its
/// day: a single over-long visit stays put rather than rolling forever.
pub fn time_stops(stops: &[PlannedStop], options: &TimingOptions) -> Vec<ScheduleItem> {
    let mut day = 1;
    let mut clock = options.first_day_start;
    let mut items_today = 0usize;
    let mut items = Vec::with_capacity(stops.len());

    for stop in stops {
        let duration = match (stop.kind, &stop.duration) {
            (ItemKind::Break(meal), _) => meal.duration_minutes(),
            (ItemKind::Visit, Some(text)) => parse_duration_text(text),
            (ItemKind::Visit, None) => options.default_visit_minutes,
        };

        if options.multi_day && items_today > 0 && clock.saturating_add(duration) > options.window.end {
            day += 1;
            clock = options.window.start;
            items_today = 0;
            debug!(day, label = %stop.label, "day rollover");
        }

        items.push(ScheduleItem {
            label: stop.label.clone(),
            kind: stop.kind,
            arrival_time: format_clock_time(clock),
            departure_time: format_clock_time(clock.saturating_add(duration)),
            duration_minutes: duration,
            travel_time_to_next: stop.travel_to_next.clone(),
            day_index: day,
            notes: None,
        });
        items_today += 1;

        clock = clock.saturating_add(duration);
        if let Some(travel) = &stop.travel_to_next {
            clock = clock.saturating_add(parse_travel_minutes(travel));
        }
    }

    if !options.multi_day && clock > options.window.end {
        warn!(
            end = %format_clock_time(options.window.end),
            "single-day schedule runs past the daily window"
        );
    }

    items
}

/// Adds at most one lunch and one dinner break per day.
///
/// Each break goes right after the first visit arriving inside its window,
/// unless a break already sits within two items of that visit. Breaks carry
/// fixed clock times and are not re-timed against their neighbors.
pub fn insert_meal_breaks(items: &[ScheduleItem]) -> Vec<ScheduleItem> {
    let mut insert_after: Vec<(usize, Meal)> = Vec::new();

    for (start, end) in day_ranges(items) {
        let day = &items[start..end];
        for (meal, window) in [(Meal::Dinner, DINNER_WINDOW), (Meal::Lunch, LUNCH_WINDOW)] {
            if let Some(offset) = break_slot(day, window) {
                insert_after.push((start + offset, meal));
            }
        }
    }

    let mut result = Vec::with_capacity(items.len() + insert_after.len());
    for (index, item) in items.iter().enumerate() {
        result.push(item.clone());
        if let Some(&(_, meal)) = insert_after.iter().find(|(at, _)| *at == index) {
            result.push(meal_item(meal, item.day_index));
        }
    }
    result
}

/// Fills `notes` on visit items from the narrative, or with a generic note.
pub fn attach_notes(items: &[ScheduleItem], narrative: Option<&Narrative>, city: &str) -> Vec<ScheduleItem> {
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if item.kind == ItemKind::Visit {
                let notes = narrative
                    .and_then(|narrative| narrative.stop_for(&item.label))
                    .and_then(|stop| stop.notes.clone())
                    .filter(|notes| !notes.trim().is_empty());
                item.notes = Some(notes.unwrap_or_else(|| fallback_note(&item.label, city)));
            }
            item
        })
        .collect()
}

/// Highest day index, or 0 for an empty schedule.
pub fn day_count(items: &[ScheduleItem]) -> u32 {
    items.iter().map(|item| item.day_index).max().unwrap_or(0)
}

/// Contiguous `[start, end)` ranges sharing a day index.
fn day_ranges(items: &[ScheduleItem]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for index in 1..=items.len() {
        if index == items.len() || items[index].day_index != items[start].day_index {
            ranges.push((start, index));
            start = index;
        }
    }
    ranges
}

fn break_slot(day: &[ScheduleItem], (open, close): (u32, u32)) -> Option<usize> {
    day.iter().enumerate().position(|(index, item)| {
        let arrival = parse_clock_time(&item.arrival_time);
        !item.is_break()
            && arrival.is_some_and(|minutes| minutes >= open && minutes < close)
            && !break_nearby(day, index)
    })
}

fn break_nearby(day: &[ScheduleItem], index: usize) -> bool {
    let from = index.saturating_sub(BREAK_ADJACENCY);
    let to = (index + BREAK_ADJACENCY + 1).min(day.len());
    day[from..to].iter().any(ScheduleItem::is_break)
}

fn meal_item(meal: Meal, day_index: u32) -> ScheduleItem {
    let start = meal.clock_minutes();
    ScheduleItem {
        label: meal.label().to_string(),
        kind: ItemKind::Break(meal),
        arrival_time: format_clock_time(start),
        departure_time: format_clock_time(start + meal.duration_minutes()),
        duration_minutes: meal.duration_minutes(),
        travel_time_to_next: None,
        day_index,
        notes: None,
    }
}
