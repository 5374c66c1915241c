//! The per-person day simulation — a strict decision sequence against the
//! shared time-window inventory.
//!
//! State order per person: LOAD_INPUT → DAY_PATTERN → NUM_TOURS →
//! USUAL_LOCATION (per fixed-workplace work tour) → per tour in priority
//! order: MODE or MODE_DESTINATION → TOUR_TIME_OF_DAY → PRIMARY_ACTIVITY →
//! INTERMEDIATE_STOP_GENERATION → START/END estimation.  A tour that cannot
//! win a time window is discarded from the list; the person survives.
//!
//! Priority order: fixed-location tours first — Education before Work for
//! students, Work before Education otherwise — then Shopping, then Others.
//! Priority only decides who picks from the shared time inventory first; it
//! never changes tour counts.

use log::warn;

use abm_choice::{ChoiceError, ChoiceModel, ChoiceOutcome, DecisionPoint, ModelRepository};
use abm_core::{
    Mode, PersonId, PersonRng, Purpose, StopChoice, TimeWindow, ZoneId, DAY_START, SLOT_COUNT,
};
use abm_data::{Direction, InputStore, Record, SkimTable};
use abm_population::{Activity, DayPattern, ModeDestination, Person, Tour};

use crate::config::RunConfig;
use crate::inputs::PersonInputs;
use crate::timing::{self, UNAVAILABLE_TT_PENALTY};
use crate::{SimError, SimResult};

/// Person-type code marking students in the person-attribute dataset.
const STUDENT_PERSON_TYPE: u8 = 4;

/// Cap on generated work-based sub-tours per parent tour.
const SUB_TOUR_CAP: usize = 3;

// ── DaySimulator ──────────────────────────────────────────────────────────────

/// Simulates one person at a time against a worker-owned model repository,
/// input store, and skim table.
///
/// The repository is `&mut` because decisions toggle model availability;
/// every toggle is snapshot-restored before the next decision runs.
pub struct DaySimulator<'a, S: InputStore> {
    pub(crate) repo:   &'a mut ModelRepository,
    pub(crate) store:  &'a S,
    pub(crate) skims:  &'a SkimTable,
    pub(crate) config: &'a RunConfig,
}

impl<'a, S: InputStore> DaySimulator<'a, S> {
    pub fn new(
        repo:   &'a mut ModelRepository,
        store:  &'a S,
        skims:  &'a SkimTable,
        config: &'a RunConfig,
    ) -> Self {
        Self { repo, store, skims, config }
    }

    /// Simulate one person's full day.
    ///
    /// Any error returned here discards the person at the worker boundary;
    /// nothing below aborts the batch except model-definition failures.
    pub fn simulate_person(&mut self, id: PersonId, rng: &mut PersonRng) -> SimResult<Person> {
        let mut inputs = PersonInputs::load(self.store, id)?;
        let mut person = self.build_person(id, &inputs)?;

        self.predict_day_pattern(&mut person, &inputs, rng)?;
        self.predict_num_tours(&mut person, &inputs, rng)?;
        self.build_tours(&mut person, &mut inputs, rng)?;

        let mut idx = 0;
        while idx < person.tours.len() {
            if self.simulate_tour(&mut person, &mut inputs, idx, rng)? {
                idx += 1;
            } else {
                person.tours.remove(idx);
            }
        }

        Ok(person)
    }

    // ── LOAD_INPUT ────────────────────────────────────────────────────────

    fn build_person(&self, id: PersonId, inputs: &PersonInputs) -> SimResult<Person> {
        let home = inputs
            .person
            .float("home_mtz")?
            .ok_or(SimError::MissingField { field: "home_mtz" })?;
        let mut person = Person::new(id, ZoneId(home as u32));

        person.fixed_work_zone = zone_field(&inputs.person, "fix_work_location_mtz")?;
        person.school_zone = zone_field(&inputs.person, "school_location_mtz")?;
        person.person_type = inputs.person.float("person_type_id")?.unwrap_or(0.0) as u8;
        person.is_student = person.person_type == STUDENT_PERSON_TYPE;
        Ok(person)
    }

    // ── DAY_PATTERN ───────────────────────────────────────────────────────

    fn predict_day_pattern(
        &mut self,
        person: &mut Person,
        inputs: &PersonInputs,
        rng:    &mut PersonRng,
    ) -> SimResult<()> {
        let model = self.repo.get(DecisionPoint::DayPattern)?;
        let outcome = model.simulate(&inputs.day_pattern, rng)?;
        person.day_pattern = DayPattern::from_flags(&outcome.chosen).ok_or(SimError::BadChoice {
            decision: "Day Pattern",
            chosen:   outcome.chosen,
        })?;
        Ok(())
    }

    // ── NUM_TOURS ─────────────────────────────────────────────────────────

    /// One count model per purpose, each invoked only when the day pattern
    /// flags that purpose.
    fn predict_num_tours(
        &mut self,
        person: &mut Person,
        inputs: &PersonInputs,
        rng:    &mut PersonRng,
    ) -> SimResult<()> {
        for purpose in Purpose::ALL {
            if !person.day_pattern.tour(purpose) {
                continue;
            }
            let model = self.repo.get(DecisionPoint::num_tours(purpose))?;
            let outcome = model.simulate(&inputs.day_pattern, rng)?;
            let count: u32 = outcome.chosen.trim().parse().map_err(|_| SimError::BadChoice {
                decision: "Number Of Tours",
                chosen:   outcome.chosen.clone(),
            })?;
            person.num_tours.set(purpose, count);
        }
        Ok(())
    }

    // ── Tour list construction (priority order) ───────────────────────────

    fn build_tours(
        &mut self,
        person: &mut Person,
        inputs: &mut PersonInputs,
        rng:    &mut PersonRng,
    ) -> SimResult<()> {
        if person.is_student {
            self.push_education_tours(person);
            self.push_work_tours(person, inputs, rng)?;
        } else {
            self.push_work_tours(person, inputs, rng)?;
            self.push_education_tours(person);
        }
        for _ in 0..person.num_tours.get(Purpose::Shopping) {
            person.tours.push(Tour::new(Purpose::Shopping, false));
        }
        for _ in 0..person.num_tours.get(Purpose::Others) {
            person.tours.push(Tour::new(Purpose::Others, false));
        }
        Ok(())
    }

    fn push_education_tours(&self, person: &mut Person) {
        for _ in 0..person.num_tours.get(Purpose::Education) {
            person.tours.push(Tour::new(Purpose::Education, true));
        }
    }

    /// USUAL_LOCATION runs once per work tour, but only for persons with a
    /// fixed workplace; the record carries first-vs-subsequent flags.
    fn push_work_tours(
        &mut self,
        person: &mut Person,
        inputs: &mut PersonInputs,
        rng:    &mut PersonRng,
    ) -> SimResult<()> {
        let count = person.num_tours.get(Purpose::Work);
        let mut first_of_multiple = true;
        for _ in 0..count {
            let mut usual = false;
            if person.fixed_work_zone.is_some() {
                inputs.usual_work.set_flag("first_of_multiple", first_of_multiple);
                inputs.usual_work.set_flag("subsequent_of_multiple", !first_of_multiple);
                first_of_multiple = false;

                let model = self.repo.get(DecisionPoint::AttendUsualWork)?;
                let outcome = model.simulate(&inputs.usual_work, rng)?;
                usual = outcome.chosen == "Attend";
            }
            person.tours.push(Tour::new(Purpose::Work, usual));
        }
        Ok(())
    }

    // ── Per-tour sequence ─────────────────────────────────────────────────

    /// Run one tour through mode, time-of-day, primary activity, stops, and
    /// start/end estimation.  Returns `false` when the tour is discarded.
    fn simulate_tour(
        &mut self,
        person: &mut Person,
        inputs: &mut PersonInputs,
        idx:    usize,
        rng:    &mut PersonRng,
    ) -> SimResult<bool> {
        // MODE / MODE_DESTINATION — no sampleable alternative discards the
        // tour, not the person.
        let assigned = if person.tours[idx].usual_location {
            self.predict_tour_mode(person, inputs, idx, rng)?
        } else {
            self.predict_tour_mode_destination(person, inputs, idx, rng)?
        };
        if !assigned {
            return Ok(false);
        }

        // TOUR_TIME_OF_DAY — the only source of a tour's window.
        let Some(window) = self.predict_tour_time_of_day(person, inputs, idx, rng)? else {
            return Ok(false);
        };

        // PRIMARY_ACTIVITY inherits the tour's mode and destination.
        {
            let tour = &mut person.tours[idx];
            let mut primary = Activity::primary(tour.purpose, window);
            primary.mode = tour.mode;
            primary.destination = tour.destination;
            tour.trip_chain.push(primary);
        }

        // INTERMEDIATE_STOP_GENERATION, before and after the primary.
        self.generate_intermediate_stops(person, inputs, idx, rng)?;

        // START/END estimation over the completed chain.
        let start = timing::estimate_tour_start(self.skims, person.home_zone, &person.tours[idx])?;
        let end = timing::estimate_tour_end(self.skims, person.home_zone, &person.tours[idx])?;
        person.tours[idx].start_time = start;
        person.tours[idx].end_time = end;

        match (start, end) {
            (Some(start), Some(end)) if start > DAY_START && end > DAY_START && end >= start => {
                person.windows.block(start, end);
            }
            (Some(start), Some(end)) => {
                let err = SimError::InvalidTimeWindow { start, end };
                warn!("person {}: {err}; window blocking skipped", person.id);
            }
            _ => {}
        }

        // Work-based sub-tours append after their completed parent.
        if self.config.enable_subtours
            && person.tours[idx].purpose == Purpose::Work
            && !person.tours[idx].sub_tour
        {
            self.generate_sub_tours(person, inputs, idx, rng)?;
        }

        Ok(true)
    }

    // ── MODE (usual location) ─────────────────────────────────────────────

    /// Mode-only choice for tours to the person's fixed workplace/school.
    /// Returns `false` when no mode alternative is available.
    fn predict_tour_mode(
        &mut self,
        person: &mut Person,
        inputs: &PersonInputs,
        idx:    usize,
        rng:    &mut PersonRng,
    ) -> SimResult<bool> {
        let purpose = person.tours[idx].purpose;
        let (decision, record, destination) = match purpose {
            Purpose::Education => (
                DecisionPoint::TourModeEducation,
                &inputs.tour_mode_education,
                person.school_zone,
            ),
            Purpose::Work => (
                DecisionPoint::TourModeWork,
                &inputs.tour_mode_work,
                person.fixed_work_zone,
            ),
            _ => return Err(SimError::Invariant("usual-location tour with a non-fixed purpose")),
        };
        let destination =
            destination.ok_or(SimError::Invariant("usual-location tour without a fixed zone"))?;

        let model = self.repo.get(decision)?;
        let outcome = match model.simulate(record, rng) {
            Ok(outcome) => outcome,
            Err(ChoiceError::NoAvailableAlternative) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let mode = Mode::parse(&outcome.chosen).ok_or(SimError::BadChoice {
            decision: "Tour Mode",
            chosen:   outcome.chosen,
        })?;

        let tour = &mut person.tours[idx];
        tour.assign_mode_destination(mode, destination);
        if mode == Mode::Walk {
            tour.walk_distance_first = record.float("walk_distance1")?.unwrap_or(0.0);
            tour.walk_distance_second = record.float("walk_distance2")?.unwrap_or(0.0);
        }
        Ok(true)
    }

    // ── MODE_DESTINATION ──────────────────────────────────────────────────

    /// Joint mode/destination choice for non-usual-location tours.
    fn predict_tour_mode_destination(
        &mut self,
        person: &mut Person,
        inputs: &mut PersonInputs,
        idx:    usize,
        rng:    &mut PersonRng,
    ) -> SimResult<bool> {
        let purpose = person.tours[idx].purpose;
        let decision = DecisionPoint::tour_mode_destination(purpose)
            .ok_or(SimError::Invariant("mode/destination requested for an education tour"))?;

        inputs
            .tour_mode_destination
            .set_number("stop_type", purpose.code().into());

        let model = self.repo.get(decision)?;
        let Some((mode, destination)) =
            simulate_mode_destination(model, &inputs.tour_mode_destination, rng)?
        else {
            return Ok(false);
        };

        let tour = &mut person.tours[idx];
        tour.assign_mode_destination(mode, destination);
        if mode == Mode::Walk {
            tour.walk_distance_first =
                inputs.tour_mode_destination.float("walk_distance1")?.unwrap_or(0.0);
            tour.walk_distance_second =
                inputs.tour_mode_destination.float("walk_distance2")?.unwrap_or(0.0);
        }
        Ok(true)
    }

    /// Stop mode/destination: same joint model, with the mode side of each
    /// alternative restricted by the tour's mode before the draw.
    pub(crate) fn predict_stop_mode_destination(
        &mut self,
        stop:      &mut Activity,
        tour_mode: Mode,
        inputs:    &mut PersonInputs,
        rng:       &mut PersonRng,
    ) -> SimResult<bool> {
        inputs
            .tour_mode_destination
            .set_number("stop_type", stop.purpose().code().into());

        let allowed = stop_modes_for(tour_mode);
        let model = self.repo.get_mut(DecisionPoint::StopModeDestination)?;
        let snapshot = model.availability_snapshot();
        for leaf in model.leaves().to_vec() {
            let mode_part = leaf.split(',').next().unwrap_or("");
            model.set_availability(&leaf, allowed.contains(&mode_part));
        }

        let result = simulate_mode_destination(model, &inputs.tour_mode_destination, rng);
        self.repo
            .get_mut(DecisionPoint::StopModeDestination)?
            .restore_availability(snapshot);

        match result? {
            Some((mode, destination)) => {
                stop.assign_mode_destination(mode, destination);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── TOUR_TIME_OF_DAY ──────────────────────────────────────────────────

    /// Pick the tour's window from the still-available inventory.  Blocks
    /// every intersecting token on success; returns `None` when no feasible
    /// window remains.
    fn predict_tour_time_of_day(
        &mut self,
        person: &mut Person,
        inputs: &mut PersonInputs,
        idx:    usize,
        rng:    &mut PersonRng,
    ) -> SimResult<Option<TimeWindow>> {
        let decision = DecisionPoint::tour_time_of_day(person.tours[idx].purpose);

        // The inventory is the time-of-day model's own choice set, installed
        // at the person's first time-of-day decision.
        if !person.windows.is_initialized() {
            let model = self.repo.get(decision)?;
            let mut tokens = Vec::with_capacity(model.leaves().len());
            for leaf in model.leaves() {
                let window = TimeWindow::parse(leaf).ok_or_else(|| {
                    ChoiceError::ModelDefinition(format!(
                        "time-of-day alternative {leaf:?} is not a start,end window"
                    ))
                })?;
                tokens.push((leaf.clone(), window));
            }
            person.windows.initialize(tokens);
        }

        if person.tours[idx].sub_tour {
            return self.predict_sub_tour_time_of_day(person, inputs, idx, rng);
        }

        self.set_tour_tod_travel_times(person, inputs, idx)?;

        let model = self.repo.get_mut(decision)?;
        let snapshot = model.availability_snapshot();
        for token in person.windows.unavailable_tokens() {
            model.set_availability(token, false);
        }
        let result = model.simulate(&inputs.tour_time_of_day, rng);
        self.repo.get_mut(decision)?.restore_availability(snapshot);

        match result {
            Ok(outcome) => {
                let window = TimeWindow::parse(&outcome.chosen).ok_or(SimError::BadChoice {
                    decision: "Tour Time Of Day",
                    chosen:   outcome.chosen,
                })?;
                person.windows.block(window.start, window.end);
                Ok(Some(window))
            }
            Err(ChoiceError::NoAvailableAlternative) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Per-slot travel times between the tour destination and home, for both
    /// the home-to-destination bound (arrival-indexed) and the return bound
    /// (departure-indexed).
    fn set_tour_tod_travel_times(
        &mut self,
        person: &Person,
        inputs: &mut PersonInputs,
        idx:    usize,
    ) -> SimResult<()> {
        let tour = &person.tours[idx];
        let mode = tour.mode.ok_or(SimError::Invariant("tour has no mode"))?;
        let origin = tour
            .destination
            .ok_or(SimError::Invariant("tour has no destination"))?;
        let home = person.home_zone;

        for slot in 0..SLOT_COUNT {
            let arrive = self
                .skims
                .travel_time(mode, origin, home, Direction::Arrival, slot)
                .unwrap_or(UNAVAILABLE_TT_PENALTY);
            let depart = self
                .skims
                .travel_time(mode, origin, home, Direction::Departure, slot)
                .unwrap_or(UNAVAILABLE_TT_PENALTY);
            inputs
                .tour_time_of_day
                .set_float(&format!("TT_HT1_{}", slot + 1), arrive);
            inputs
                .tour_time_of_day
                .set_float(&format!("TT_HT2_{}", slot + 1), depart);
        }
        Ok(())
    }

    /// Sub-tour windows must fit inside the parent's primary activity and
    /// avoid windows already taken by earlier sub-tours of the same parent.
    fn predict_sub_tour_time_of_day(
        &mut self,
        person: &mut Person,
        inputs: &PersonInputs,
        idx:    usize,
        rng:    &mut PersonRng,
    ) -> SimResult<Option<TimeWindow>> {
        let parent_idx = person.tours[idx]
            .parent
            .ok_or(SimError::Invariant("sub-tour without a parent"))?;
        let parent_window = person.tours[parent_idx]
            .primary_activity()
            .and_then(|a| Some(TimeWindow::new(a.arrival?, a.departure?)))
            .ok_or(SimError::Invariant("sub-tour scheduled before its parent's primary"))?;

        let sibling_windows: Vec<TimeWindow> = person
            .tours
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != idx && t.parent == Some(parent_idx))
            .filter_map(|(_, t)| t.primary_activity())
            .filter_map(|a| Some(TimeWindow::new(a.arrival?, a.departure?)))
            .collect();

        let decision = DecisionPoint::tour_time_of_day(person.tours[idx].purpose);
        let model = self.repo.get_mut(decision)?;
        let snapshot = model.availability_snapshot();
        for leaf in model.leaves().to_vec() {
            let available = TimeWindow::parse(&leaf).is_some_and(|w| {
                parent_window.contains(&w)
                    && !sibling_windows.iter().any(|s| w.intersects(s.start, s.end))
            });
            model.set_availability(&leaf, available);
        }
        let result = model.simulate(&inputs.tour_time_of_day, rng);
        self.repo.get_mut(decision)?.restore_availability(snapshot);

        match result {
            Ok(outcome) => {
                let window = TimeWindow::parse(&outcome.chosen).ok_or(SimError::BadChoice {
                    decision: "Tour Time Of Day",
                    chosen:   outcome.chosen,
                })?;
                // The parent's span is already blocked in the person ledger;
                // sub-tours only contend with their siblings.
                Ok(Some(window))
            }
            Err(ChoiceError::NoAvailableAlternative) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Work-based sub-tours ──────────────────────────────────────────────

    /// Bounded generation loop: sample a sub-tour purpose until "Quit" or
    /// the cap, inserting each child right after its parent.
    fn generate_sub_tours(
        &mut self,
        person: &mut Person,
        inputs: &PersonInputs,
        parent_idx: usize,
        rng:    &mut PersonRng,
    ) -> SimResult<()> {
        let mut insert_at = parent_idx + 1;
        let mut generated = 0;
        while generated < SUB_TOUR_CAP {
            let model = self.repo.get(DecisionPoint::WorkBasedSubTours)?;
            let outcome = match model.simulate(&inputs.person, rng) {
                Ok(outcome) => outcome,
                Err(ChoiceError::NoAvailableAlternative) => break,
                Err(e) => return Err(e.into()),
            };
            match StopChoice::parse(&outcome.chosen) {
                Some(StopChoice::Quit) => break,
                Some(StopChoice::Stop(purpose)) => {
                    person
                        .tours
                        .insert(insert_at, Tour::sub_tour(purpose, parent_idx));
                    insert_at += 1;
                    generated += 1;
                }
                None => {
                    return Err(SimError::BadChoice {
                        decision: "Work Based Sub-Tours",
                        chosen:   outcome.chosen,
                    });
                }
            }
        }
        Ok(())
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Run a joint mode/destination model and split the chosen `"mode,zone"`
/// alternative.  `None` means nothing was available.
fn simulate_mode_destination(
    model:  &ChoiceModel,
    record: &Record,
    rng:    &mut PersonRng,
) -> SimResult<Option<(Mode, ZoneId)>> {
    let outcome: ChoiceOutcome = match model.simulate(record, rng) {
        Ok(outcome) => outcome,
        Err(ChoiceError::NoAvailableAlternative) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let parsed = outcome.chosen.split_once(',').and_then(|(mode, zone)| {
        Some((Mode::parse(mode)?, ZoneId(zone.trim().parse().ok()?)))
    });
    match parsed {
        Some(choice) => Ok(Some(choice)),
        None => Err(SimError::BadChoice {
            decision: "Mode/Destination",
            chosen:   outcome.chosen,
        }),
    }
}

/// Stop modes compatible with each tour mode.
fn stop_modes_for(tour_mode: Mode) -> &'static [&'static str] {
    match tour_mode {
        Mode::PublicBus | Mode::Mrt => {
            &["bus", "mrt", "drive1", "share2", "share3", "motor", "walk", "taxi"]
        }
        Mode::PrivateBus => {
            &["bus", "mrt", "private_bus", "drive1", "share2", "share3", "motor", "walk", "taxi"]
        }
        Mode::DriveAlone => &["drive1", "motor", "walk", "taxi"],
        Mode::SharedTwo => &["drive1", "share2", "motor", "walk", "taxi"],
        Mode::SharedThreePlus => &["drive1", "share2", "share3", "motor", "walk", "taxi"],
        Mode::Motorcycle => &["motor", "walk"],
        Mode::Walk => &["walk"],
        Mode::Taxi => &["motor", "walk", "taxi"],
    }
}

fn zone_field(record: &Record, field: &'static str) -> SimResult<Option<ZoneId>> {
    Ok(record
        .float(field)?
        .filter(|&z| z != 0.0)
        .map(|z| ZoneId(z as u32)))
}
