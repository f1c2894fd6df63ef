//! Itinerary orchestration.
//!
//! `build_itinerary` walks an ordered list of tiers and returns the first
//! that produces a plan:
//!
//! | tier | order | hop times | durations |
//! |---|---|---|---|
//! | primary | optimizer | provider | narrative or default |
//! | degraded large input | fast optimizer | provider | narrative (first stops) or default |
//! | narrative only | narrative | fixed | narrative or default |
//! | sequential | input | fixed | fixed |
//!
//! The narrative request starts before optimization and is shared by every
//! tier. Each stage runs with its own deadline; a stage that misses it is
//! abandoned, not cancelled.

use std::cell::OnceCell;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ItineraryOptions, MAX_VISIT_MINUTES, MIN_VISIT_MINUTES, PlannerConfig};
use crate::duration::{format_span_text, parse_clock_time, parse_duration_text};
use crate::error::{ItineraryError, NarrativeError};
use crate::haversine;
use crate::model::{Itinerary, Location, OptimizedRoute, PlanTier, RouteStep, ScheduleItem, TravelTime};
use crate::narrative::{Narrative, NarrativeRequest};
use crate::optimizer::{OptimizeOptions, RouteOptimizer, Strategy};
use crate::schedule::{self, TimingOptions};
use crate::traits::NarrativeProvider;
use crate::travel::TravelTimeProvider;

/// Why a tier could not produce a plan.
#[derive(Debug, Error)]
enum TierError {
    #[error("route optimization {0}")]
    Optimization(StageError),
    #[error("narrative unavailable: {0}")]
    Narrative(String),
}

#[derive(Debug, Error)]
enum StageError {
    #[error("timed out")]
    Timeout,
    #[error("worker failed")]
    Failed,
}

pub struct ItineraryPlanner {
    optimizer: RouteOptimizer,
    narrator: Option<Arc<dyn NarrativeProvider>>,
    config: PlannerConfig,
}

impl ItineraryPlanner {
    pub fn new(provider: Arc<TravelTimeProvider>, config: PlannerConfig) -> Self {
        let options = OptimizeOptions {
            exact_max_stops: config.exact_max_stops,
            concurrency: config.matrix_concurrency,
            edge_pacing: config.edge_pacing,
        };

        Self {
            optimizer: RouteOptimizer::new(provider, options),
            narrator: None,
            config,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeProvider>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn provider(&self) -> &TravelTimeProvider {
        self.optimizer.provider()
    }

    /// Plans a visit of `locations` in `city`.
    ///
    /// Fails only for an empty stop list. Every other problem lowers the
    /// quality of the result and sets [`Itinerary::fallback_used`].
    pub fn build_itinerary(
        &self,
        locations: &[Location],
        city: &str,
        options: &ItineraryOptions,
    ) -> Result<Itinerary, ItineraryError> {
        if locations.is_empty() {
            return Err(ItineraryError::EmptyInput);
        }

        let options = options.normalized();
        let large = locations.len() > self.config.large_input_threshold;
        let narrative = self.request_narrative(locations, city, &options, large);

        let tiers: &[PlanTier] = if large {
            &[PlanTier::DegradedLargeInput, PlanTier::NarrativeOnly, PlanTier::Sequential]
        } else {
            &[PlanTier::Primary, PlanTier::NarrativeOnly, PlanTier::Sequential]
        };

        let context = Context {
            locations,
            city,
            options: &options,
            narrative: &narrative,
        };

        for &tier in tiers {
            let attempt = match tier {
                PlanTier::Primary => self.optimized(&context, Strategy::Auto, tier),
                PlanTier::DegradedLargeInput => self.optimized(&context, Strategy::Fast, tier),
                PlanTier::NarrativeOnly => self.narrative_only(&context),
                PlanTier::Sequential => Ok(self.sequential(&context)),
            };

            match attempt {
                Ok(itinerary) => {
                    info!(
                        stops = locations.len(),
                        days = itinerary.day_count,
                        tier = ?itinerary.tier,
                        fallback = itinerary.fallback_used,
                        "itinerary ready"
                    );
                    return Ok(itinerary);
                }
                Err(err) => warn!(tier = ?tier, error = %err, "itinerary tier failed"),
            }
        }

        // Unreachable in practice: the sequential tier always succeeds.
        Ok(self.sequential(&context))
    }

    fn request_narrative(
        &self,
        locations: &[Location],
        city: &str,
        options: &ItineraryOptions,
        large: bool,
    ) -> Deferred<Result<Narrative, NarrativeError>> {
        let Some(narrator) = self.narrator.clone() else {
            return Deferred::ready(Err(NarrativeError::Unavailable(
                "no narrative collaborator configured".to_string(),
            )));
        };

        let (stops, timeout) = if large {
            let count = self.config.degraded_narrative_stops.min(locations.len());
            (locations[..count].to_vec(), self.config.degraded_narrative_timeout)
        } else {
            (locations.to_vec(), self.config.narrative_timeout)
        };

        let request = NarrativeRequest {
            city: city.to_string(),
            stops,
            session_id: options.session_id.clone(),
        };
        debug!(stops = request.stops.len(), ?timeout, "requesting narrative");

        Deferred::spawn("itinerary-narrative", timeout, move || narrator.narrate(&request))
    }

    fn optimized(&self, context: &Context<'_>, strategy: Strategy, tier: PlanTier) -> Result<Itinerary, TierError> {
        let optimizer = self.optimizer.clone();
        let locations = context.locations.to_vec();
        let mode = context.options.travel_mode;
        let anchor = context
            .options
            .hotel_location
            .clone()
            .filter(|_| context.options.multi_day);

        let route = Deferred::spawn("itinerary-optimize", self.config.optimize_timeout, move || {
            optimizer.optimize_with(&locations, mode, strategy, anchor.as_ref())
        })
        .into_value()
        .map_err(TierError::Optimization)?;

        let narrative = context.narrative().ok();
        let narrative_truncated =
            tier == PlanTier::DegradedLargeInput && context.locations.len() > self.config.degraded_narrative_stops;
        let degraded = route.has_estimates() || narrative.is_none() || narrative_truncated;
        let timing = requested_timing(context.options);

        Ok(self.assemble(context, route, narrative, &timing, context.options.include_breaks, tier, degraded))
    }

    fn narrative_only(&self, context: &Context<'_>) -> Result<Itinerary, TierError> {
        let narrative = context
            .narrative()
            .map_err(TierError::Narrative)?;

        let order = narrative.order(context.locations);
        let route = fixed_hop_route(order, context.options, self.config.narrative_hop_minutes);
        let timing = requested_timing(context.options);

        Ok(self.assemble(
            context,
            route,
            Some(narrative),
            &timing,
            context.options.include_breaks,
            PlanTier::NarrativeOnly,
            true,
        ))
    }

    fn sequential(&self, context: &Context<'_>) -> Itinerary {
        let route = fixed_hop_route(
            context.locations.to_vec(),
            context.options,
            self.config.sequential_transition_minutes,
        );
        let window = context.options.daily_window();
        let timing = TimingOptions {
            first_day_start: window.start,
            window,
            default_visit_minutes: self.config.sequential_visit_minutes,
            multi_day: context.options.multi_day,
        };

        // Durations and transitions are fixed here, so only notes are taken
        // from a narrative that did arrive.
        let narrative = context.narrative().ok();
        let mut itinerary = self.assemble(context, route, None, &timing, false, PlanTier::Sequential, true);
        itinerary.schedule = schedule::attach_notes(&itinerary.schedule, narrative, context.city);
        itinerary
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        context: &Context<'_>,
        route: OptimizedRoute,
        narrative: Option<&Narrative>,
        timing: &TimingOptions,
        include_breaks: bool,
        tier: PlanTier,
        degraded: bool,
    ) -> Itinerary {
        let stops = schedule::stops_from_route(&route, |location| {
            narrative
                .and_then(|narrative| narrative.stop_for(location.as_str()))
                .and_then(|stop| stop.duration.as_deref())
                .filter(|duration| !duration.trim().is_empty())
                .map(visit_duration_text)
        });

        let timed = schedule::time_stops(&stops, timing);
        let with_breaks = if include_breaks {
            schedule::insert_meal_breaks(&timed)
        } else {
            timed
        };
        let items = schedule::attach_notes(&with_breaks, narrative, context.city);
        let day_count = schedule::day_count(&items);

        let title = narrative
            .map(|narrative| narrative.title.trim())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(context.city));
        let total_duration = narrative
            .map(|narrative| narrative.total_duration.trim())
            .filter(|duration| !duration.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| total_duration_text(&items, day_count));
        let total_travel_time = format_span_text((route.total_travel_time_seconds + 30) / 60);

        Itinerary {
            title,
            total_duration,
            total_travel_time,
            schedule: items,
            route,
            day_count,
            tier,
            fallback_used: degraded || !matches!(tier, PlanTier::Primary | PlanTier::DegradedLargeInput),
        }
    }
}

/// Narrator durations are clamped to the same range as configured visits.
fn visit_duration_text(text: &str) -> String {
    let minutes = parse_duration_text(text).clamp(MIN_VISIT_MINUTES, MAX_VISIT_MINUTES);
    format!("{minutes} mins")
}

struct Context<'a> {
    locations: &'a [Location],
    city: &'a str,
    options: &'a ItineraryOptions,
    narrative: &'a Deferred<Result<Narrative, NarrativeError>>,
}

impl Context<'_> {
    fn narrative(&self) -> Result<&Narrative, String> {
        match self.narrative.value() {
            Ok(Ok(narrative)) => Ok(narrative),
            Ok(Err(err)) => Err(err.to_string()),
            Err(err) => Err(format!("narrative request {err}")),
        }
    }
}

/// Route in the given order with every hop costing `hop_minutes`.
fn fixed_hop_route(order: Vec<Location>, options: &ItineraryOptions, hop_minutes: u32) -> OptimizedRoute {
    let mode = options.travel_mode;
    let seconds = hop_minutes * 60;
    let steps = order
        .windows(2)
        .map(|pair| RouteStep {
            from: pair[0].clone(),
            to: pair[1].clone(),
            travel_time: TravelTime::estimated(seconds, haversine::meters_for_duration(seconds, mode)),
            mode,
        })
        .collect();
    OptimizedRoute::from_steps(order, steps)
}

fn requested_timing(options: &ItineraryOptions) -> TimingOptions {
    TimingOptions {
        first_day_start: options.start_minutes(),
        window: options.daily_window(),
        default_visit_minutes: options.visit_duration_minutes,
        multi_day: options.multi_day,
    }
}

fn default_title(city: &str) -> String {
    let city = city.trim();
    if city.is_empty() {
        "Your Itinerary".to_string()
    } else {
        format!("Exploring {city}")
    }
}

fn total_duration_text(items: &[ScheduleItem], day_count: u32) -> String {
    if day_count > 1 {
        return format!("{day_count} days");
    }

    let first = items.first().and_then(|item| parse_clock_time(&item.arrival_time));
    let last = items
        .iter()
        .filter(|item| !item.is_break())
        .filter_map(|item| {
            parse_clock_time(&item.departure_time).map(|end| {
                // Departures before the arrival wrapped past midnight.
                let start = parse_clock_time(&item.arrival_time).unwrap_or(end);
                if end < start { end + 24 * 60 } else { end }
            })
        })
        .max();

    match (first, last) {
        (Some(first), Some(last)) if last >= first => format_span_text(u64::from(last - first)),
        _ => format_span_text(0),
    }
}

/// Result of a background stage, resolved at most once.
struct Deferred<T> {
    receiver: Option<mpsc::Receiver<T>>,
    deadline: Instant,
    resolved: OnceCell<Result<T, StageError>>,
}

impl<T: Send + 'static> Deferred<T> {
    fn ready(value: T) -> Self {
        let resolved = OnceCell::new();
        let _ = resolved.set(Ok(value));
        Self {
            receiver: None,
            deadline: Instant::now(),
            resolved,
        }
    }

    /// Runs `job` on its own thread. The result must arrive within `timeout`.
    fn spawn<F>(name: &str, timeout: Duration, job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let _ = sender.send(job());
        });

        if let Err(err) = spawned {
            warn!(stage = name, error = %err, "could not start stage thread");
            let resolved = OnceCell::new();
            let _ = resolved.set(Err(StageError::Failed));
            return Self {
                receiver: None,
                deadline: Instant::now(),
                resolved,
            };
        }

        Self {
            receiver: Some(receiver),
            deadline: Instant::now() + timeout,
            resolved: OnceCell::new(),
        }
    }

    fn value(&self) -> Result<&T, &StageError> {
        self.resolved
            .get_or_init(|| {
                let Some(receiver) = &self.receiver else {
                    return Err(StageError::Failed);
                };
                let remaining = self.deadline.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(remaining) {
                    Ok(value) => Ok(value),
                    Err(RecvTimeoutError::Timeout) => Err(StageError::Timeout),
                    Err(RecvTimeoutError::Disconnected) => Err(StageError::Failed),
                }
            })
            .as_ref()
    }

    fn into_value(self) -> Result<T, StageError> {
        let _ = self.value();
        self.resolved.into_inner().unwrap_or(Err(StageError::Failed))
    }
}
