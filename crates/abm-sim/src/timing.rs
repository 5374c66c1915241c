//! Travel-time chaining and tour start/end estimation.
//!
//! All derived times are snapped onto the half-hour grid before they are
//! stored; tour anchors additionally clamp to the day bounds.

use abm_core::{slot_of, snap_to_grid, ZoneId, FIRST_MIDPOINT, LAST_MIDPOINT};
use abm_data::{Direction, SkimTable};
use abm_population::{Activity, Tour};

use crate::{SimError, SimResult};

/// Travel time substituted when the skim marks a connection unavailable.
pub const UNAVAILABLE_TT_PENALTY: f64 = 999.0;

fn activity_times(activity: &Activity) -> SimResult<(f64, f64)> {
    let arrival = activity
        .arrival
        .ok_or(SimError::Invariant("activity has no arrival time"))?;
    let departure = activity
        .departure
        .ok_or(SimError::Invariant("activity has no departure time"))?;
    Ok((arrival, departure))
}

fn leg_travel_time(
    skims:       &SkimTable,
    neighbor:    &Activity,
    origin:      ZoneId,
    destination: ZoneId,
    dir:         Direction,
    at:          f64,
) -> SimResult<f64> {
    if origin == destination {
        return Ok(0.0);
    }
    let mode = neighbor
        .mode
        .ok_or(SimError::Invariant("activity has no mode"))?;
    let slot = slot_of(at).ok_or(SimError::Invariant("activity time is off the day grid"))?;
    Ok(skims
        .travel_time(mode, origin, destination, dir, slot)
        .unwrap_or(UNAVAILABLE_TT_PENALTY))
}

/// Departure time of a pre-primary stop, chained backwards off the next
/// activity's arrival.
pub(crate) fn chain_departure(
    skims: &SkimTable,
    stop:  &Activity,
    next:  &Activity,
) -> SimResult<f64> {
    let next_arrival = next
        .arrival
        .ok_or(SimError::Invariant("next activity has no arrival time"))?;
    let origin = stop
        .destination
        .ok_or(SimError::Invariant("stop has no destination"))?;
    let destination = next
        .destination
        .ok_or(SimError::Invariant("next activity has no destination"))?;
    let tt = leg_travel_time(skims, next, origin, destination, Direction::Arrival, next_arrival)?;
    Ok(snap_to_grid(next_arrival - tt))
}

/// Arrival time of a post-primary stop, chained forwards off the previous
/// activity's departure.
pub(crate) fn chain_arrival(
    skims: &SkimTable,
    stop:  &Activity,
    prev:  &Activity,
) -> SimResult<f64> {
    let prev_departure = prev
        .departure
        .ok_or(SimError::Invariant("previous activity has no departure time"))?;
    let origin = stop
        .destination
        .ok_or(SimError::Invariant("stop has no destination"))?;
    let destination = prev
        .destination
        .ok_or(SimError::Invariant("previous activity has no destination"))?;
    let tt = leg_travel_time(skims, prev, origin, destination, Direction::Departure, prev_departure)?;
    Ok(snap_to_grid(prev_departure + tt))
}

/// Tour start: the first chain activity's arrival minus the home-to-first
/// travel time, snapped, never earlier than the first grid midpoint.
pub(crate) fn estimate_tour_start(
    skims: &SkimTable,
    home:  ZoneId,
    tour:  &Tour,
) -> SimResult<Option<f64>> {
    let Some(first) = tour.trip_chain.first() else {
        return Ok(None);
    };
    let (arrival, _) = activity_times(first)?;
    let destination = first
        .destination
        .ok_or(SimError::Invariant("activity has no destination"))?;
    let tt = leg_travel_time(skims, first, home, destination, Direction::Arrival, arrival)?;
    Ok(Some(snap_to_grid(arrival - tt).max(FIRST_MIDPOINT)))
}

/// Tour end: the last chain activity's departure plus the travel time home,
/// snapped, never later than the last grid midpoint.
pub(crate) fn estimate_tour_end(
    skims: &SkimTable,
    home:  ZoneId,
    tour:  &Tour,
) -> SimResult<Option<f64>> {
    let Some(last) = tour.trip_chain.last() else {
        return Ok(None);
    };
    let (_, departure) = activity_times(last)?;
    let destination = last
        .destination
        .ok_or(SimError::Invariant("activity has no destination"))?;
    let tt = leg_travel_time(skims, last, home, destination, Direction::Departure, departure)?;
    Ok(Some(snap_to_grid(departure + tt).min(LAST_MIDPOINT)))
}
