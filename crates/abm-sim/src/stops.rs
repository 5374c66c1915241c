//! Intermediate-stop generation — bounded retry loops before and after the
//! primary activity.
//!
//! Each half-loop samples a stop purpose (with the distinguished "Quit"
//! alternative ending the half), then runs the stop's own mode/destination
//! and time-of-day decisions, chaining its clock time off the neighboring
//! activity.  At most [`STOP_CAP`] stops are generated per half-tour no
//! matter what the model returns, and a stop whose chained time falls
//! outside the day is dropped while the loop continues toward the cap.

use abm_choice::{ChoiceError, DecisionPoint};
use abm_core::{
    slot_midpoint, Mode, ModeBucket, PersonRng, Purpose, StopChoice, ZoneId, FIRST_MIDPOINT,
    LAST_MIDPOINT, SLOT_COUNT,
};
use abm_data::{Direction, InputStore, Period, Record, SkimTable};
use abm_population::{Activity, Person};

use crate::inputs::PersonInputs;
use crate::scheduler::DaySimulator;
use crate::timing::{self, UNAVAILABLE_TT_PENALTY};
use crate::{SimError, SimResult};

/// Hard cap on generated stops per half-tour, counting dropped attempts.
const STOP_CAP: usize = 3;

/// Car operating cost per kilometre.
const CAR_COST_PER_KM: f64 = 0.147;

/// Taxi fare: flagfall, central-area surcharge, and metered rate.  Distance
/// converts to fare units at 400 m per unit up to 10 km, 350 m beyond.
const TAXI_FLAGFALL: f64 = 3.4;
const TAXI_CENTRAL_SURCHARGE: f64 = 3.0;
const TAXI_UNIT_RATE: f64 = 0.22;

/// Parking is charged for at most this many hours.
const MAX_CHARGED_PARKING_HOURS: f64 = 8.0;

impl<S: InputStore> DaySimulator<'_, S> {
    /// Generate intermediate stops for the tour at `tour_idx`, whose primary
    /// activity is already scheduled.
    pub(crate) fn generate_intermediate_stops(
        &mut self,
        person:   &mut Person,
        inputs:   &mut PersonInputs,
        tour_idx: usize,
        rng:      &mut PersonRng,
    ) -> SimResult<()> {
        // Stop purposes the day pattern rules out are toggled off for the
        // whole tour; with all four off there is nothing to generate.
        let snapshot = {
            let model = self.repo.get_mut(DecisionPoint::StopGeneration)?;
            let snapshot = model.availability_snapshot();
            let mut unavailable = 0;
            for purpose in Purpose::ALL {
                if !person.day_pattern.stop(purpose) {
                    model.set_availability(purpose.as_str(), false);
                    unavailable += 1;
                }
            }
            if unavailable == Purpose::ALL.len() {
                model.restore_availability(snapshot);
                return Ok(());
            }
            snapshot
        };

        let result = self.stop_half_loops(person, inputs, tour_idx, rng);
        if let Ok(model) = self.repo.get_mut(DecisionPoint::StopGeneration) {
            model.restore_availability(snapshot);
        }
        result
    }

    fn stop_half_loops(
        &mut self,
        person:   &mut Person,
        inputs:   &mut PersonInputs,
        tour_idx: usize,
        rng:      &mut PersonRng,
    ) -> SimResult<()> {
        let (primary_arrival, primary_departure, primary_dest, tour_mode) = {
            let tour = &person.tours[tour_idx];
            let primary = tour
                .primary_activity()
                .ok_or(SimError::Invariant("tour has no primary activity"))?;
            (
                primary
                    .arrival
                    .ok_or(SimError::Invariant("primary activity has no arrival"))?,
                primary
                    .departure
                    .ok_or(SimError::Invariant("primary activity has no departure"))?,
                primary
                    .destination
                    .ok_or(SimError::Invariant("primary activity has no destination"))?,
                tour.mode.ok_or(SimError::Invariant("tour has no mode"))?,
            )
        };
        let home = person.home_zone;

        {
            let record = &mut inputs.stop_generation;
            record.set_number("tour_type", person.tours[tour_idx].purpose.code().into());
            record.set_flag("driver_dummy", tour_mode == Mode::DriveAlone);
            record.set_flag(
                "passenger_dummy",
                matches!(tour_mode, Mode::SharedTwo | Mode::SharedThreePlus),
            );
            record.set_flag("public_dummy", tour_mode.bucket() == ModeBucket::Transit);
            record.set_flag("first_tour_dummy", tour_idx == 0);
            record.set_float("tour_remain", (person.tours.len() - tour_idx - 1) as f64);
        }

        // First half: stops on the way to the primary activity.
        {
            let record = &mut inputs.stop_generation;
            let distance = self
                .skims
                .distance(Period::AmPeak, primary_dest, home)
                .unwrap_or(0.0);
            record.set_float("distance", distance);
            set_period_dummies(record, primary_arrival);
            record.set_flag("first_bound", true);
            record.set_flag("second_bound", false);
        }
        self.stop_loop(person, inputs, tour_idx, tour_mode, true, rng)?;

        // Second half: stops on the way home.
        {
            let record = &mut inputs.stop_generation;
            let distance = self
                .skims
                .distance(Period::PmPeak, primary_dest, home)
                .unwrap_or(0.0);
            record.set_float("distance", distance);
            set_period_dummies(record, primary_departure);
            record.set_flag("first_bound", false);
            record.set_flag("second_bound", true);
        }
        self.stop_loop(person, inputs, tour_idx, tour_mode, false, rng)
    }

    /// One half-loop.  `before` selects the pre-primary half (stops insert
    /// at the chain front, times chain backwards) versus the post-primary
    /// half (append, chain forwards).
    fn stop_loop(
        &mut self,
        person:    &mut Person,
        inputs:    &mut PersonInputs,
        tour_idx:  usize,
        tour_mode: Mode,
        before:    bool,
        rng:       &mut PersonRng,
    ) -> SimResult<()> {
        let mut counter = 0;
        while counter < STOP_CAP {
            let Some(purpose) = self.draw_stop_purpose(inputs, counter, rng)? else {
                break;
            };
            counter += 1;

            let mut stop = Activity::intermediate(purpose);
            if !self.predict_stop_mode_destination(&mut stop, tour_mode, inputs, rng)? {
                continue;
            }

            // Chain the stop's clock time off its neighbor; a time outside
            // the day bounds drops the stop and keeps looping toward the cap.
            if before {
                let next = person.tours[tour_idx]
                    .trip_chain
                    .first()
                    .ok_or(SimError::Invariant("empty trip chain during stop generation"))?;
                let departure = timing::chain_departure(self.skims, &stop, next)?;
                if departure <= FIRST_MIDPOINT {
                    continue;
                }
                stop.departure = Some(departure);
            } else {
                let prev = person.tours[tour_idx]
                    .trip_chain
                    .last()
                    .ok_or(SimError::Invariant("empty trip chain during stop generation"))?;
                let arrival = timing::chain_arrival(self.skims, &stop, prev)?;
                if arrival >= LAST_MIDPOINT {
                    continue;
                }
                stop.arrival = Some(arrival);
            }

            if !self.predict_stop_time_of_day(person, inputs, tour_idx, &mut stop, before, rng)? {
                continue;
            }

            let (Some(arrival), Some(departure)) = (stop.arrival, stop.departure) else {
                return Err(SimError::Invariant("stop missing a time after its decisions"));
            };
            person.windows.block(arrival, departure);

            let chain = &mut person.tours[tour_idx].trip_chain;
            if before {
                chain.insert(0, stop);
            } else {
                chain.push(stop);
            }
        }
        Ok(())
    }

    /// Sample one stop purpose.  `None` ends the half-loop — either the
    /// model chose "Quit" or nothing was left to sample.
    fn draw_stop_purpose(
        &mut self,
        inputs: &mut PersonInputs,
        rank:   usize,
        rng:    &mut PersonRng,
    ) -> SimResult<Option<Purpose>> {
        let record = &mut inputs.stop_generation;
        record.set_flag("first_stop", rank == 0);
        record.set_flag("second_stop", rank == 1);
        record.set_flag("three_plus_stop", rank >= 2);

        let model = self.repo.get(DecisionPoint::StopGeneration)?;
        let outcome = match model.simulate(record, rng) {
            Ok(outcome) => outcome,
            Err(ChoiceError::NoAvailableAlternative) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match StopChoice::parse(&outcome.chosen) {
            Some(StopChoice::Quit) => Ok(None),
            Some(StopChoice::Stop(purpose)) => Ok(Some(purpose)),
            None => Err(SimError::BadChoice {
                decision: "Intermediate Stop Generation",
                chosen:   outcome.chosen,
            }),
        }
    }

    /// The stop's own time-of-day decision: alternatives are grid times,
    /// masked to the open interval between `low_tod` and `high_tod`.
    /// Returns `false` when no time is sampleable — the caller drops the
    /// stop and keeps looping.
    fn predict_stop_time_of_day(
        &mut self,
        person:   &Person,
        inputs:   &mut PersonInputs,
        tour_idx: usize,
        stop:     &mut Activity,
        before:   bool,
        rng:      &mut PersonRng,
    ) -> SimResult<bool> {
        let home = person.home_zone;
        let origin = stop
            .destination
            .ok_or(SimError::Invariant("stop has no destination"))?;
        let mode = stop.mode.ok_or(SimError::Invariant("stop has no mode"))?;

        let (low, high) = if before {
            let low = if tour_idx == 0 {
                FIRST_MIDPOINT
            } else {
                person.tours[tour_idx - 1].end_time.unwrap_or(FIRST_MIDPOINT)
            };
            let high = stop
                .departure
                .ok_or(SimError::Invariant("pre-primary stop has no departure"))?;
            (low, high)
        } else {
            let low = stop
                .arrival
                .ok_or(SimError::Invariant("post-primary stop has no arrival"))?;
            (low, LAST_MIDPOINT)
        };

        {
            let record = &mut inputs.stop_time_of_day;
            record.set_number("stop_type", stop.purpose.code().into());
            record.set_flag("first_bound", before);
            record.set_flag("second_bound", !before);
            record.set_float("low_tod", low);
            record.set_float("high_tod", high);

            let dir = if before { Direction::Arrival } else { Direction::Departure };
            for slot in 0..SLOT_COUNT {
                let tt = self
                    .skims
                    .travel_time(mode, origin, home, dir, slot)
                    .unwrap_or(UNAVAILABLE_TT_PENALTY);
                record.set_float(&format!("TT_{}", slot + 1), tt);
            }

            let central_dummy = inputs.person.float("central_dummy")?.unwrap_or(0.0);
            let costs =
                stop_cost_profile(self.skims, mode, origin, home, low, high, before, central_dummy);
            for (slot, cost) in costs.iter().enumerate() {
                record.set_float(&format!("cost_{}", slot + 1), *cost);
            }
        }

        let model = self.repo.get_mut(DecisionPoint::StopTimeOfDay)?;
        let snapshot = model.availability_snapshot();
        for leaf in model.leaves().to_vec() {
            if let Ok(t) = leaf.trim().parse::<f64>() {
                if t <= low || t >= high {
                    model.set_availability(&leaf, false);
                }
            }
        }
        let result = model.simulate(&inputs.stop_time_of_day, rng);
        if let Ok(model) = self.repo.get_mut(DecisionPoint::StopTimeOfDay) {
            model.restore_availability(snapshot);
        }

        match result {
            Ok(outcome) => {
                let t: f64 = outcome.chosen.trim().parse().map_err(|_| SimError::BadChoice {
                    decision: "Intermediate Stop Time Of Day",
                    chosen:   outcome.chosen.clone(),
                })?;
                if before {
                    stop.arrival = Some(t);
                } else {
                    stop.departure = Some(t);
                }
                Ok(true)
            }
            Err(ChoiceError::NoAvailableAlternative) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Record helpers ────────────────────────────────────────────────────────────

/// Time-of-day period dummies keyed to the primary activity's bound time.
fn set_period_dummies(record: &mut Record, t: f64) {
    record.set_flag("p_700a_930a", t > 7.0 && t <= 9.5);
    record.set_flag("p_930a_1200a", t > 9.5 && t <= 12.0);
    record.set_flag("p_300p_530p", t > 15.0 && t <= 17.5);
    record.set_flag("p_530p_730p", t > 17.5 && t <= 19.5);
    record.set_flag("p_730p_1000p", t > 19.5 && t <= 22.0);
    record.set_flag("p_1000p_700a", (t > 22.0 && t <= 27.0) || (t > 0.0 && t <= 7.0));
}

/// Per-slot out-of-pocket cost of making this stop, by mode group.
///
/// Car-like modes pay operating cost, road pricing, and parking for the
/// dwell between the slot and the primary-activity bound; transit modes pay
/// the period fare; walking is free.
#[allow(clippy::too_many_arguments)]
fn stop_cost_profile(
    skims:         &SkimTable,
    mode:          Mode,
    origin:        ZoneId,
    home:          ZoneId,
    low:           f64,
    high:          f64,
    before:        bool,
    central_dummy: f64,
) -> [f64; SLOT_COUNT] {
    let mut costs = [0.0; SLOT_COUNT];
    if mode.bucket() == ModeBucket::Walk {
        return costs;
    }
    let parking_rate = skims.parking_rate(origin);

    for (slot, cost) in costs.iter_mut().enumerate() {
        let period = Period::of_slot(slot);
        let Some(cell) = skims.cost(period, origin, home) else {
            continue;
        };
        *cost = match mode {
            Mode::PublicBus | Mode::Mrt | Mode::PrivateBus => cell.pub_cost,
            Mode::Walk => 0.0,
            _ => {
                let midpoint = slot_midpoint(slot);
                let dwell = if before {
                    (high - midpoint).max(0.0)
                } else {
                    (midpoint - low).max(0.0)
                };
                let parking = dwell.min(MAX_CHARGED_PARKING_HOURS) * parking_rate;
                let operating = cell.distance * CAR_COST_PER_KM;
                match mode {
                    Mode::Motorcycle => {
                        0.5 * cell.car_cost_erp + 0.5 * operating + 0.65 * parking
                    }
                    Mode::Taxi => {
                        let base_km = cell.distance.min(10.0);
                        let excess_km = (cell.distance - 10.0).max(0.0);
                        TAXI_FLAGFALL
                            + cell.car_cost_erp
                            + TAXI_CENTRAL_SURCHARGE * central_dummy
                            + (excess_km / 0.35 + base_km / 0.4) * TAXI_UNIT_RATE
                    }
                    // drive-alone and the shared modes split the car cost by
                    // occupancy (1, 2, 3).
                    _ => {
                        let occupancy = (mode.code() - 3) as f64;
                        (parking + operating + cell.car_cost_erp) / occupancy
                    }
                }
            }
        };
    }
    costs
}
