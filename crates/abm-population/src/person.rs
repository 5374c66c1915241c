//! The person record built up over one simulated day.

use abm_core::{PersonId, Purpose, ZoneId};

use crate::tour::Tour;
use crate::windows::TimeWindowLedger;

fn purpose_index(purpose: Purpose) -> usize {
    purpose.code() as usize - 1
}

// ── DayPattern ────────────────────────────────────────────────────────────────

/// Which tour and intermediate-stop purposes a person engages in today.
///
/// The day-pattern model's alternatives are eight comma-separated flags in
/// the fixed order: tour flags for Work, Education, Shopping, Others, then
/// stop flags in the same purpose order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayPattern {
    tours: [bool; 4],
    stops: [bool; 4],
}

impl DayPattern {
    /// No activity at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a sampled day-pattern alternative like `"1,0,0,1,0,0,1,0"`.
    pub fn from_flags(choice: &str) -> Option<Self> {
        let flags: Vec<bool> = choice
            .split(',')
            .map(|f| match f.trim() {
                "0" => Some(false),
                "1" => Some(true),
                _ => None,
            })
            .collect::<Option<_>>()?;
        if flags.len() != 8 {
            return None;
        }
        let mut pattern = Self::none();
        pattern.tours.copy_from_slice(&flags[..4]);
        pattern.stops.copy_from_slice(&flags[4..]);
        Some(pattern)
    }

    pub fn tour(&self, purpose: Purpose) -> bool {
        self.tours[purpose_index(purpose)]
    }

    pub fn stop(&self, purpose: Purpose) -> bool {
        self.stops[purpose_index(purpose)]
    }

    pub fn any_stop(&self) -> bool {
        self.stops.iter().any(|&f| f)
    }
}

// ── NumTours ──────────────────────────────────────────────────────────────────

/// Sampled tour count per purpose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumTours([u32; 4]);

impl NumTours {
    pub fn get(&self, purpose: Purpose) -> u32 {
        self.0[purpose_index(purpose)]
    }

    pub fn set(&mut self, purpose: Purpose, count: u32) {
        self.0[purpose_index(purpose)] = count;
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

// ── Person ────────────────────────────────────────────────────────────────────

/// One person's static attributes plus everything the day simulation builds:
/// day pattern, tour counts, the tour list, and the time-window ledger.
///
/// Created at simulation start, mutated decision by decision, discarded
/// after output emission.
#[derive(Debug)]
pub struct Person {
    pub id:        PersonId,
    pub home_zone: ZoneId,

    /// Fixed workplace zone; `None` when the person has no fixed workplace
    /// (the usual-work-location decision is skipped entirely).
    pub fixed_work_zone: Option<ZoneId>,

    /// Usual school zone, for education tours.
    pub school_zone: Option<ZoneId>,

    /// Person-type code, passed through to output.
    pub person_type: u8,

    pub is_student: bool,

    pub day_pattern: DayPattern,
    pub num_tours:   NumTours,

    /// Tours in priority order; discarded tours are removed in place.
    pub tours: Vec<Tour>,

    pub windows: TimeWindowLedger,
}

impl Person {
    pub fn new(id: PersonId, home_zone: ZoneId) -> Self {
        Self {
            id,
            home_zone,
            fixed_work_zone: None,
            school_zone:     None,
            person_type:     0,
            is_student:      false,
            day_pattern:     DayPattern::none(),
            num_tours:       NumTours::default(),
            tours:           Vec::new(),
            windows:         TimeWindowLedger::new(),
        }
    }
}
