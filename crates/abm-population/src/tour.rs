//! Tours, activities, and the derived trip chain.

use abm_core::{Mode, Purpose, TimeWindow, ZoneId};

// ── ModeDestination ───────────────────────────────────────────────────────────

/// The shared decision surface of tours and activities: both receive the
/// outcome of a joint mode/destination choice the same way.
pub trait ModeDestination {
    fn purpose(&self) -> Purpose;
    fn assign_mode_destination(&mut self, mode: Mode, destination: ZoneId);
}

// ── Activity ──────────────────────────────────────────────────────────────────

/// One element of a tour's trip chain: the primary activity or an
/// intermediate stop.
///
/// Fields fill in as decisions are made; times are fractional hours on the
/// half-hour grid once set.
#[derive(Clone, Debug)]
pub struct Activity {
    pub purpose:     Purpose,
    pub primary:     bool,
    pub arrival:     Option<f64>,
    pub departure:   Option<f64>,
    pub mode:        Option<Mode>,
    pub destination: Option<ZoneId>,
}

impl Activity {
    /// The primary activity, created when its tour wins a time window.
    pub fn primary(purpose: Purpose, window: TimeWindow) -> Self {
        Self {
            purpose,
            primary:     true,
            arrival:     Some(window.start),
            departure:   Some(window.end),
            mode:        None,
            destination: None,
        }
    }

    /// An intermediate stop; times and mode/destination follow from its own
    /// sub-decisions.
    pub fn intermediate(purpose: Purpose) -> Self {
        Self {
            purpose,
            primary:     false,
            arrival:     None,
            departure:   None,
            mode:        None,
            destination: None,
        }
    }
}

impl ModeDestination for Activity {
    fn purpose(&self) -> Purpose {
        self.purpose
    }

    fn assign_mode_destination(&mut self, mode: Mode, destination: ZoneId) {
        self.mode = Some(mode);
        self.destination = Some(destination);
    }
}

// ── Tour ──────────────────────────────────────────────────────────────────────

/// A home-anchored travel loop with one primary activity and zero-or-more
/// intermediate stops.
#[derive(Clone, Debug)]
pub struct Tour {
    pub purpose:        Purpose,
    /// Tour goes to the person's fixed workplace/school zone.
    pub usual_location: bool,
    /// Work-based sub-tour, inserted after its parent in the person's list.
    pub sub_tour:       bool,
    /// Index of the parent tour in the person's list, for sub-tours.
    pub parent:         Option<usize>,
    pub mode:           Option<Mode>,
    pub destination:    Option<ZoneId>,
    pub start_time:     Option<f64>,
    pub end_time:       Option<f64>,
    /// Access/egress walk distances, carried through to tour output for
    /// walk-mode tours (0 otherwise).
    pub walk_distance_first:  f64,
    pub walk_distance_second: f64,
    /// Trip chain in travel order: pre-primary stops, the primary activity,
    /// post-primary stops.
    pub trip_chain:     Vec<Activity>,
}

impl Tour {
    pub fn new(purpose: Purpose, usual_location: bool) -> Self {
        Self {
            purpose,
            usual_location,
            sub_tour:            false,
            parent:              None,
            mode:                None,
            destination:         None,
            start_time:          None,
            end_time:            None,
            walk_distance_first:  0.0,
            walk_distance_second: 0.0,
            trip_chain:          Vec::new(),
        }
    }

    /// A work-based sub-tour of the tour at `parent`.
    pub fn sub_tour(purpose: Purpose, parent: usize) -> Self {
        let mut tour = Self::new(purpose, false);
        tour.sub_tour = true;
        tour.parent = Some(parent);
        tour
    }

    pub fn primary_activity(&self) -> Option<&Activity> {
        self.trip_chain.iter().find(|a| a.primary)
    }

    /// Number of intermediate stops.
    pub fn num_stops(&self) -> usize {
        self.trip_chain.len().saturating_sub(1)
    }

    /// Rebuild the trip legs of this tour: home → each chain destination →
    /// home.  Each leg to an activity uses that activity's mode; the
    /// home-bound leg uses the last activity's mode.  Derived output only —
    /// holds no state of its own.
    pub fn trips(&self, home: ZoneId) -> Vec<Trip> {
        let mut trips = Vec::with_capacity(self.trip_chain.len() + 1);
        let mut from = home;
        for (sequence, activity) in self.trip_chain.iter().enumerate() {
            let to = activity.destination.unwrap_or(home);
            trips.push(Trip { sequence, from, to, mode: activity.mode });
            from = to;
        }
        if let Some(last) = self.trip_chain.last() {
            trips.push(Trip {
                sequence: self.trip_chain.len(),
                from,
                to: home,
                mode: last.mode,
            });
        }
        trips
    }
}

impl ModeDestination for Tour {
    fn purpose(&self) -> Purpose {
        self.purpose
    }

    fn assign_mode_destination(&mut self, mode: Mode, destination: ZoneId) {
        self.mode = Some(mode);
        self.destination = Some(destination);
    }
}

// ── Trip ──────────────────────────────────────────────────────────────────────

/// One leg of a flattened tour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trip {
    pub sequence: usize,
    pub from:     ZoneId,
    pub to:       ZoneId,
    pub mode:     Option<Mode>,
}
