//! Route ordering.
//!
//! Greedy nearest-neighbor over one of two proximity metrics:
//!
//! - **exact** (small inputs): the full pairwise travel-time matrix,
//!   `n * (n - 1)` provider calls;
//! - **fast** (large inputs): straight-line distance between geocoded
//!   stops, then real travel times for the `n - 1` chosen hops only.
//!
//! Neither path guarantees a globally optimal tour. Both are deterministic
//! for a given provider and never drop or duplicate stops.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::haversine;
use crate::model::{Location, OptimizedRoute, RouteStep, TravelMode, TravelTime};
use crate::travel::TravelTimeProvider;
use crate::traits::Waypoint;

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Largest input solved with the full matrix.
    pub exact_max_stops: usize,
    /// Parallel provider calls.
    pub concurrency: usize,
    /// Delay before each hop request on the fast path.
    pub edge_pacing: Duration,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            exact_max_stops: 8,
            concurrency: 4,
            edge_pacing: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Exact for small inputs, fast otherwise.
    Auto,
    /// Always use the geographic path.
    Fast,
}

#[derive(Clone)]
pub struct RouteOptimizer {
    provider: Arc<TravelTimeProvider>,
    options: OptimizeOptions,
    /// Shared by every clone; `None` runs provider calls inline.
    pool: Option<Arc<ThreadPool>>,
}

impl RouteOptimizer {
    pub fn new(provider: Arc<TravelTimeProvider>, options: OptimizeOptions) -> Self {
        let pool = build_pool(options.concurrency).map(Arc::new);
        Self {
            provider,
            options,
            pool,
        }
    }

    pub fn provider(&self) -> &Arc<TravelTimeProvider> {
        &self.provider
    }

    pub fn optimize(&self, locations: &[Location], mode: TravelMode) -> OptimizedRoute {
        self.optimize_with(locations, mode, Strategy::Auto, None)
    }

    /// Orders `locations`, optionally starting the walk from `anchor`.
    ///
    /// The anchor (a hotel, typically) only seeds the walk: it is removed
    /// from the returned route together with the hop leaving it.
    pub fn optimize_with(
        &self,
        locations: &[Location],
        mode: TravelMode,
        strategy: Strategy,
        anchor: Option<&Location>,
    ) -> OptimizedRoute {
        if locations.is_empty() {
            return OptimizedRoute::default();
        }

        let Some(anchor) = anchor else {
            return self.plan(locations, mode, strategy);
        };

        let mut nodes = Vec::with_capacity(locations.len() + 1);
        nodes.push(anchor.clone());
        nodes.extend_from_slice(locations);

        let mut route = self.plan(&nodes, mode, strategy);
        route.ordered_locations.remove(0);
        if !route.steps.is_empty() {
            route.steps.remove(0);
        }
        OptimizedRoute::from_steps(route.ordered_locations, route.steps)
    }

    fn plan(&self, locations: &[Location], mode: TravelMode, strategy: Strategy) -> OptimizedRoute {
        let n = locations.len();
        if n <= 2 {
            debug!(stops = n, "trivial route, keeping input order");
            return self.trivial_route(locations, mode);
        }

        let pool = self.pool.as_deref();
        if strategy == Strategy::Auto && n <= self.options.exact_max_stops {
            debug!(stops = n, mode = mode.as_str(), "exact matrix optimization");
            self.exact_route(locations, mode, pool)
        } else {
            debug!(stops = n, mode = mode.as_str(), "fast geographic optimization");
            self.fast_route(locations, mode, pool)
        }
    }

    fn trivial_route(&self, locations: &[Location], mode: TravelMode) -> OptimizedRoute {
        let steps = locations
            .windows(2)
            .map(|pair| {
                let travel_time = self.provider.travel_time(&pair[0], &pair[1], mode, None);
                step(&pair[0], &pair[1], travel_time, mode)
            })
            .collect();
        OptimizedRoute::from_steps(locations.to_vec(), steps)
    }

    fn exact_route(&self, locations: &[Location], mode: TravelMode, pool: Option<&ThreadPool>) -> OptimizedRoute {
        let n = locations.len();
        let waypoints: Vec<Waypoint> = run_in(pool, || {
            locations
                .par_iter()
                .map(|location| self.provider.waypoint(location))
                .collect()
        });

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();

        let answers: Vec<((usize, usize), TravelTime)> = run_in(pool, || {
            pairs
                .par_iter()
                .map(|&(i, j)| ((i, j), self.provider.between(&waypoints[i], &waypoints[j], mode, None)))
                .collect()
        });

        let mut matrix = vec![vec![TravelTime::zero(); n]; n];
        for ((i, j), travel_time) in answers {
            matrix[i][j] = travel_time;
        }

        let order = nearest_neighbor(n, |i, j| Some(f64::from(matrix[i][j].duration_seconds)));
        let steps = order
            .windows(2)
            .map(|pair| step(&locations[pair[0]], &locations[pair[1]], matrix[pair[0]][pair[1]].clone(), mode))
            .collect();

        OptimizedRoute::from_steps(order.iter().map(|&i| locations[i].clone()).collect(), steps)
    }

    fn fast_route(&self, locations: &[Location], mode: TravelMode, pool: Option<&ThreadPool>) -> OptimizedRoute {
        let waypoints: Vec<Waypoint> = run_in(pool, || {
            locations
                .par_iter()
                .map(|location| self.provider.waypoint(location))
                .collect()
        });

        let missing = waypoints.iter().filter(|w| w.coordinates.is_none()).count();
        if missing > 0 {
            warn!(missing, "stops without coordinates are ordered last");
        }

        let points: Vec<_> = waypoints.iter().map(|w| w.coordinates).collect();
        let distances = haversine::distance_matrix_km(&points);
        let order = nearest_neighbor(waypoints.len(), |i, j| distances[i][j]);

        let pacing = self.options.edge_pacing;
        let steps: Vec<RouteStep> = run_in(pool, || {
            order
                .par_windows(2)
                .map(|pair| {
                    let (from, to) = (&waypoints[pair[0]], &waypoints[pair[1]]);
                    if !pacing.is_zero() {
                        thread::sleep(pacing);
                    }
                    let travel_time = self
                        .provider
                        .try_between(from, to, mode, None)
                        .unwrap_or_else(|err| {
                            warn!(
                                origin = %from.location,
                                destination = %to.location,
                                error = %err,
                                "hop travel time unavailable, using geographic estimate"
                            );
                            self.provider.geographic_estimate(from, to, mode)
                        });
                    step(&from.location, &to.location, travel_time, mode)
                })
                .collect()
        });

        OptimizedRoute::from_steps(order.iter().map(|&i| locations[i].clone()).collect(), steps)
    }
}

fn build_pool(concurrency: usize) -> Option<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .thread_name(|index| format!("route-optimizer-{index}"))
        .build()
        .map_err(|err| warn!(error = %err, "could not build optimizer pool, running inline"))
        .ok()
}

/// Runs `job` inside `pool` when one is available.
fn run_in<T, F>(pool: Option<&ThreadPool>, job: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match pool {
        Some(pool) => pool.install(job),
        None => job(),
    }
}

fn step(from: &Location, to: &Location, travel_time: TravelTime, mode: TravelMode) -> RouteStep {
    RouteStep {
        from: from.clone(),
        to: to.clone(),
        travel_time,
        mode,
    }
}

/// Greedy walk from node 0, always moving to the closest unvisited node.
///
/// `cost(i, j)` of `None` means unknown and loses against any known cost.
/// Ties go to the lowest index.
pub fn nearest_neighbor<F>(n: usize, cost: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Option<f64>,
{
    if n == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let mut best: Option<(usize, Option<f64>)> = None;

        for candidate in (0..n).filter(|&j| !visited[j]) {
            let candidate_cost = cost(current, candidate);
            let better = match best {
                None => true,
                Some((_, best_cost)) => match (candidate_cost, best_cost) {
                    (Some(c), Some(b)) => c < b,
                    (Some(_), None) => true,
                    (None, _) => false,
                },
            };
            if better {
                best = Some((candidate, candidate_cost));
            }
        }

        let Some((next, _)) = best else {
            break;
        };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}
