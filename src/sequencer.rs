//! Route sequencing heuristic.
//!
//! Visiting order is approximate by design: the stop farthest from the
//! depot is pinned to the end of the route, and the rest are ordered by a
//! nearest-neighbor walk from the depot. Ending near the most distant
//! delivery tends to keep the return leg short for that outlier; this is a
//! heuristic, not an optimal tour.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;

use crate::error::PlannerError;
use crate::geo::Coordinate;
use crate::polyline::Polyline;
use crate::traits::{Geocoder, TravelOracle, Waypoint};

/// A delivery destination within one route computation.
#[derive(Debug, Clone, PartialEq)]
pub struct StopPoint {
    /// Unique within the route-building session.
    pub id: String,
    pub coordinates: Coordinate,
    pub raw_address: String,
}

impl StopPoint {
    pub fn new(
        id: impl Into<String>,
        coordinates: Coordinate,
        raw_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            coordinates,
            raw_address: raw_address.into(),
        }
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.coordinates, self.raw_address.clone())
    }
}

/// One end of a route leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegEndpoint {
    Depot,
    Stop(String),
}

/// A materialized travel segment between consecutive route points.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub from: LegEndpoint,
    pub to: LegEndpoint,
    pub distance_meters: u32,
    pub duration_seconds: u32,
    pub polyline: Polyline,
}

/// The computed route. Ephemeral: rebuilt from scratch on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub depot: Coordinate,
    /// Stop ids in visiting order.
    pub order: Vec<String>,
    /// One leg per consecutive pair, including depot→first and the
    /// synthetic return leg last→depot.
    pub legs: Vec<RouteLeg>,
    pub total_distance_meters: u32,
    pub total_duration_seconds: u32,
    pub estimated_return_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SequenceOptions {
    /// Cap on concurrent collaborator lookups within one phase, to stay
    /// under collaborator rate limits.
    pub max_parallel_lookups: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            max_parallel_lookups: 6,
        }
    }
}

/// A stop entry the geocoder could not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedStop {
    pub id: String,
    pub raw_address: String,
    pub reason: String,
}

/// Outcome of [`resolve_stops`]: resolved stops plus the entries that
/// cannot be sequenced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStops {
    pub stops: Vec<StopPoint>,
    pub unresolved: Vec<UnresolvedStop>,
}

/// Resolves `(id, raw_address)` entries to stops, splitting off failures.
///
/// Unresolved entries must not be passed to [`sequence`]; the caller
/// decides whether to drop them or abort the whole request.
pub fn resolve_stops<G: Geocoder>(geocoder: &G, entries: &[(String, String)]) -> ResolvedStops {
    let mut stops = Vec::with_capacity(entries.len());
    let mut unresolved = Vec::new();

    for (id, raw_address) in entries {
        match geocoder.geocode(raw_address) {
            Ok(resolved) => {
                stops.push(StopPoint::new(
                    id.clone(),
                    resolved.coordinates,
                    raw_address.clone(),
                ));
            }
            Err(err) => {
                tracing::debug!(stop = %id, error = %err, "stop address not resolved");
                unresolved.push(UnresolvedStop {
                    id: id.clone(),
                    raw_address: raw_address.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    ResolvedStops { stops, unresolved }
}

/// Computes a visiting order and materialized legs for one route.
///
/// Fails whole: any exhausted distance lookup aborts the computation and
/// no partial plan is returned.
pub fn sequence<O>(
    oracle: &O,
    depot: &Waypoint,
    stops: &[StopPoint],
    options: &SequenceOptions,
) -> Result<RoutePlan, PlannerError>
where
    O: TravelOracle + Sync,
{
    if stops.is_empty() {
        return Err(PlannerError::NoStops);
    }
    if !depot.coordinates.is_valid() {
        return Err(PlannerError::InvalidStop {
            id: "depot".to_string(),
            reason: "coordinates out of range".to_string(),
        });
    }
    for stop in stops {
        if !stop.coordinates.is_valid() {
            return Err(PlannerError::InvalidStop {
                id: stop.id.clone(),
                reason: "coordinates out of range".to_string(),
            });
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.max_parallel_lookups.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| plan(oracle, depot, stops)),
        Err(err) => {
            tracing::warn!(error = %err, "dedicated lookup pool unavailable, using global pool");
            plan(oracle, depot, stops)
        }
    }
}

fn plan<O>(oracle: &O, depot: &Waypoint, stops: &[StopPoint]) -> Result<RoutePlan, PlannerError>
where
    O: TravelOracle + Sync,
{
    let waypoints: Vec<Waypoint> = stops.iter().map(StopPoint::waypoint).collect();

    // Farthest-first seed: depot distance to every stop. Strict maximum,
    // first stop in list order wins exact ties.
    let seed: Vec<u32> = waypoints
        .par_iter()
        .map(|stop| {
            oracle
                .travel_estimate(depot, stop)
                .map(|est| est.distance_meters)
        })
        .collect::<Result<_, _>>()?;

    let mut farthest = 0usize;
    for (index, &meters) in seed.iter().enumerate().skip(1) {
        if meters > seed[farthest] {
            farthest = index;
        }
    }

    let remaining: Vec<usize> = (0..stops.len()).filter(|&i| i != farthest).collect();

    // Pairwise distances among the remaining stops. Depot legs reuse the
    // seed values; each unordered pair is fetched once.
    let pairs: Vec<(usize, usize)> = remaining
        .iter()
        .enumerate()
        .flat_map(|(pos, &i)| remaining[pos + 1..].iter().map(move |&j| (i, j)))
        .collect();

    let measured: Vec<((usize, usize), u32)> = pairs
        .par_iter()
        .map(|&(i, j)| {
            oracle
                .travel_estimate(&waypoints[i], &waypoints[j])
                .map(|est| ((i, j), est.distance_meters))
        })
        .collect::<Result<_, _>>()?;

    let mut matrix: HashMap<(usize, usize), u32> = HashMap::with_capacity(measured.len() * 2);
    for ((i, j), meters) in measured {
        matrix.insert((i, j), meters);
        matrix.insert((j, i), meters);
    }

    let order = nearest_neighbor_walk(&seed, &matrix, remaining, farthest);

    // Materialize every leg, including the return to depot. Real leg
    // distances supersede the matrix values used for ordering.
    let legs = materialize_legs(oracle, depot, stops, &waypoints, &order)?;

    let total_distance_meters = legs.iter().map(|leg| leg.distance_meters).sum();
    let total_duration_seconds: u32 = legs.iter().map(|leg| leg.duration_seconds).sum();

    Ok(RoutePlan {
        depot: depot.coordinates,
        order: order.iter().map(|&i| stops[i].id.clone()).collect(),
        legs,
        total_distance_meters,
        total_duration_seconds,
        estimated_return_time: Utc::now() + Duration::seconds(i64::from(total_duration_seconds)),
    })
}

/// Greedy walk from the depot over the remaining stops; the farthest stop
/// is appended last regardless of its distance from the walk's end.
fn nearest_neighbor_walk(
    seed: &[u32],
    matrix: &HashMap<(usize, usize), u32>,
    mut remaining: Vec<usize>,
    farthest: usize,
) -> Vec<usize> {
    let mut order = Vec::with_capacity(remaining.len() + 1);
    let mut current: Option<usize> = None;

    while !remaining.is_empty() {
        let mut best = 0usize;
        for pos in 1..remaining.len() {
            let candidate = distance_from(current, remaining[pos], seed, matrix);
            let incumbent = distance_from(current, remaining[best], seed, matrix);
            // Strict comparison: exact ties keep the earlier stop.
            if candidate < incumbent {
                best = pos;
            }
        }
        let next = remaining.remove(best);
        order.push(next);
        current = Some(next);
    }

    order.push(farthest);
    order
}

fn distance_from(
    current: Option<usize>,
    stop: usize,
    seed: &[u32],
    matrix: &HashMap<(usize, usize), u32>,
) -> u32 {
    match current {
        None => seed[stop],
        Some(from) => matrix.get(&(from, stop)).copied().unwrap_or(u32::MAX),
    }
}

fn materialize_legs<O>(
    oracle: &O,
    depot: &Waypoint,
    stops: &[StopPoint],
    waypoints: &[Waypoint],
    order: &[usize],
) -> Result<Vec<RouteLeg>, PlannerError>
where
    O: TravelOracle + Sync,
{
    let mut specs: Vec<(LegEndpoint, &Waypoint, LegEndpoint, &Waypoint)> =
        Vec::with_capacity(order.len() + 1);

    let mut from_endpoint = LegEndpoint::Depot;
    let mut from_waypoint = depot;
    for &index in order {
        specs.push((
            from_endpoint.clone(),
            from_waypoint,
            LegEndpoint::Stop(stops[index].id.clone()),
            &waypoints[index],
        ));
        from_endpoint = LegEndpoint::Stop(stops[index].id.clone());
        from_waypoint = &waypoints[index];
    }
    specs.push((
        from_endpoint,
        from_waypoint,
        LegEndpoint::Depot,
        depot,
    ));

    // Directions calls are independent; output order follows the visiting
    // order regardless of completion order.
    specs
        .into_par_iter()
        .map(|(from, from_wp, to, to_wp)| -> Result<RouteLeg, PlannerError> {
            let leg = oracle.leg_directions(from_wp, to_wp)?;
            Ok(RouteLeg {
                from,
                to,
                distance_meters: leg.distance_meters,
                duration_seconds: leg.duration_seconds,
                polyline: leg.polyline,
            })
        })
        .collect()
}
