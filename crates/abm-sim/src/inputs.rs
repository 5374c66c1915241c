//! Per-person input rows, fetched once per person at LOAD_INPUT.
//!
//! Each decision point reads from its own dataset; the rows are cloned out
//! of the store because the scheduler writes derived fields (travel-time
//! profiles, bound flags, stop ranks, …) into them between decisions.

use abm_core::PersonId;
use abm_data::{InputStore, Record};

use crate::{SimError, SimResult};

/// Dataset names, matching the decision points they feed.
pub mod dataset {
    pub const PERSON: &str = "Person Data";
    pub const DAY_PATTERN: &str = "Day Pattern";
    pub const USUAL_WORK: &str = "Attend Usual Work";
    pub const TOUR_MODE_DESTINATION: &str = "Tour Mode/Destination";
    pub const TOUR_MODE_EDUCATION: &str = "Tour Mode Education";
    pub const TOUR_MODE_WORK: &str = "Tour Mode Work";
    pub const TOUR_TIME_OF_DAY: &str = "Tour Time Of Day";
    pub const STOP_GENERATION: &str = "Intermediate Stop Generation";
    pub const STOP_TIME_OF_DAY: &str = "Intermediate Stop Time Of Day";
}

/// One person's input row per decision point.
///
/// The person-attribute row is required; any other missing row acts as an
/// empty record, so every model variable falls back to its per-field
/// default.
#[derive(Debug)]
pub struct PersonInputs {
    pub person:                Record,
    pub day_pattern:           Record,
    pub usual_work:            Record,
    pub tour_mode_destination: Record,
    pub tour_mode_education:   Record,
    pub tour_mode_work:        Record,
    pub tour_time_of_day:      Record,
    pub stop_generation:       Record,
    pub stop_time_of_day:      Record,
}

impl PersonInputs {
    pub fn load<S: InputStore>(store: &S, person: PersonId) -> SimResult<Self> {
        let required = store
            .record(dataset::PERSON, person)
            .cloned()
            .ok_or(SimError::MissingPersonData(person))?;
        let fetch = |name: &str| store.record(name, person).cloned().unwrap_or_default();

        Ok(Self {
            person:                required,
            day_pattern:           fetch(dataset::DAY_PATTERN),
            usual_work:            fetch(dataset::USUAL_WORK),
            tour_mode_destination: fetch(dataset::TOUR_MODE_DESTINATION),
            tour_mode_education:   fetch(dataset::TOUR_MODE_EDUCATION),
            tour_mode_work:        fetch(dataset::TOUR_MODE_WORK),
            tour_time_of_day:      fetch(dataset::TOUR_TIME_OF_DAY),
            stop_generation:       fetch(dataset::STOP_GENERATION),
            stop_time_of_day:      fetch(dataset::STOP_TIME_OF_DAY),
        })
    }
}
