//! Scenario tests for the day-simulation loop, driven by small fixture
//! models and an in-memory store.

use std::io::Cursor;

use abm_choice::{ChoiceModel, DecisionPoint, ModelRepository};
use abm_core::{Mode, PersonId, PersonRng, Purpose, ZoneId};
use abm_data::{record_from_numbers, MemoryStore, SkimTable};
use abm_output::MemoryWriter;

use crate::config::RunConfig;
use crate::inputs::dataset;
use crate::runner::run_shard;
use crate::scheduler::DaySimulator;
use crate::SimError;

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// A flat model whose alternatives all have utility 0, with per-alternative
/// availability literals.
fn flat_model(alternatives: &[(&str, u8)]) -> ChoiceModel {
    let names: Vec<String> = alternatives.iter().map(|(a, _)| format!("\"{a}\"")).collect();
    let utility: Vec<String> = alternatives
        .iter()
        .map(|(a, _)| format!("\"{a}\": \"0\""))
        .collect();
    let availability: Vec<String> = alternatives
        .iter()
        .map(|(a, av)| format!("\"{a}\": {av}"))
        .collect();
    let json = format!(
        "{{\"Choiceset\": [{}], \"Parameters\": {{}}, \"Variable\": {{}}, \
         \"Utility\": {{{}}}, \"Availability\": {{{}}}}}",
        names.join(", "),
        utility.join(", "),
        availability.join(", ")
    );
    ChoiceModel::from_reader(Cursor::new(json)).unwrap()
}

fn single(alternative: &str) -> ChoiceModel {
    flat_model(&[(alternative, 1)])
}

const PRE_STOP_TIMES: [&str; 11] = [
    "3.75", "4.25", "4.75", "5.25", "5.75", "6.25", "6.75", "7.25", "7.75", "8.25", "8.75",
];
const POST_STOP_TIMES: [&str; 9] = [
    "17.75", "18.75", "19.75", "20.75", "21.75", "22.75", "23.75", "24.75", "25.75",
];

fn stop_tod_model() -> ChoiceModel {
    let alts: Vec<(&str, u8)> = PRE_STOP_TIMES
        .iter()
        .chain(POST_STOP_TIMES.iter())
        .map(|&t| (t, 1))
        .collect();
    flat_model(&alts)
}

/// Repository for a plain one-work-tour day: fixed workplace, no stops.
fn work_day_repo(day_pattern: &str, work_tours: &str) -> ModelRepository {
    let mut repo = ModelRepository::new();
    repo.insert(DecisionPoint::DayPattern, single(day_pattern));
    repo.insert(DecisionPoint::NumToursWork, single(work_tours));
    repo.insert(
        DecisionPoint::AttendUsualWork,
        flat_model(&[("Attend", 1), ("Not Attend", 0)]),
    );
    repo.insert(DecisionPoint::TourModeWork, single("Auto"));
    repo.insert(DecisionPoint::TourTimeOfDayWork, single("9.25,17.25"));
    repo.insert(
        DecisionPoint::StopGeneration,
        flat_model(&[("Work", 1), ("Education", 1), ("Shopping", 1), ("Others", 1), ("Quit", 1)]),
    );
    repo
}

/// Store with one non-student worker: home zone 1, fixed workplace zone 5.
fn worker_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert(
        dataset::PERSON,
        PersonId(100),
        record_from_numbers([
            ("home_mtz", 1.0),
            ("person_type_id", 1.0),
            ("fix_work_location_mtz", 5.0),
        ]),
    );
    store
}

fn config(seed: u64) -> RunConfig {
    RunConfig { seed, shards: 1, enable_subtours: false }
}

fn simulate(
    repo:   &mut ModelRepository,
    store:  &MemoryStore,
    skims:  &SkimTable,
    config: &RunConfig,
    id:     PersonId,
) -> crate::SimResult<abm_population::Person> {
    let mut sim = DaySimulator::new(repo, store, skims, config);
    let mut rng = PersonRng::new(config.seed, id);
    sim.simulate_person(id, &mut rng)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod single_work_tour {
    use super::*;

    #[test]
    fn produces_one_work_tour_with_home_anchored_chain() {
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(7);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();

        assert_eq!(person.num_tours.get(Purpose::Work), 1);
        assert_eq!(person.num_tours.total(), 1);
        assert!(!person.is_student);

        assert_eq!(person.tours.len(), 1);
        let tour = &person.tours[0];
        assert_eq!(tour.purpose, Purpose::Work);
        assert!(tour.usual_location);
        assert_eq!(tour.mode, Some(Mode::DriveAlone));
        assert_eq!(tour.destination, Some(ZoneId(5)));

        // Exactly one primary activity, carrying the sampled window.
        assert_eq!(tour.trip_chain.len(), 1);
        let primary = &tour.trip_chain[0];
        assert!(primary.primary);
        assert_eq!(primary.arrival, Some(9.25));
        assert_eq!(primary.departure, Some(17.25));

        // Trip chain starts and ends at the home zone.
        let trips = tour.trips(person.home_zone);
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].from, ZoneId(1));
        assert_eq!(trips[0].to, ZoneId(5));
        assert_eq!(trips[1].from, ZoneId(5));
        assert_eq!(trips[1].to, ZoneId(1));
    }

    #[test]
    fn empty_skims_clamp_tour_anchors_to_day_bounds() {
        // No skim data: the unavailable-travel-time penalty pushes the
        // anchors past the day bounds, where they clamp.
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(7);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        assert_eq!(person.tours[0].start_time, Some(3.25));
        assert_eq!(person.tours[0].end_time, Some(26.75));
    }

    #[test]
    fn tour_window_is_blocked_in_the_ledger() {
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(7);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        let blocked: Vec<&str> = person.windows.unavailable_tokens().collect();
        assert!(blocked.contains(&"9.25,17.25"));
    }
}

#[cfg(test)]
mod day_pattern_gating {
    use super::*;

    #[test]
    fn zero_flags_invoke_no_count_models() {
        // The repository holds nothing but the day-pattern model.  If any
        // tour-count decision were invoked the missing model would abort,
        // so success proves the gating.
        let mut repo = ModelRepository::new();
        repo.insert(DecisionPoint::DayPattern, single("0,0,0,0,0,0,0,0"));

        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(3);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        assert_eq!(person.num_tours.total(), 0);
        assert!(person.tours.is_empty());
    }

    #[test]
    fn flagged_purpose_without_model_is_fatal() {
        let mut repo = ModelRepository::new();
        repo.insert(DecisionPoint::DayPattern, single("1,0,0,0,0,0,0,0"));

        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(3);

        let err = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap_err();
        assert!(err.is_fatal());
    }
}

#[cfg(test)]
mod intermediate_stops {
    use super::*;

    fn stop_repo(stop_zone: &str) -> ModelRepository {
        // Work tour plus shopping stops; the generation model can never
        // return Quit.
        let mut repo = work_day_repo("1,0,0,0,0,0,1,0", "1");
        repo.insert(
            DecisionPoint::StopGeneration,
            flat_model(&[("Shopping", 1), ("Quit", 0)]),
        );
        repo.insert(
            DecisionPoint::StopModeDestination,
            single(&format!("drive1,{stop_zone}")),
        );
        repo.insert(DecisionPoint::StopTimeOfDay, stop_tod_model());
        repo
    }

    #[test]
    fn never_exceeds_three_stops_per_half_even_without_quit() {
        let mut repo = stop_repo("5"); // same zone as the primary: tt = 0
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(11);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        let tour = &person.tours[0];

        let primary_pos = tour
            .trip_chain
            .iter()
            .position(|a| a.primary)
            .expect("primary survives stop generation");
        let pre = primary_pos;
        let post = tour.trip_chain.len() - primary_pos - 1;

        assert!(pre >= 1, "same-zone chaining schedules at least one pre stop");
        assert!(post >= 1);
        assert!(pre <= 3, "pre-primary cap exceeded: {pre}");
        assert!(post <= 3, "post-primary cap exceeded: {post}");
        assert_eq!(tour.num_stops(), pre + post);
    }

    #[test]
    fn stops_carry_their_own_mode_destination_and_times() {
        let mut repo = stop_repo("5");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(11);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        for stop in person.tours[0].trip_chain.iter().filter(|a| !a.primary) {
            assert_eq!(stop.purpose, Purpose::Shopping);
            assert_eq!(stop.mode, Some(Mode::DriveAlone));
            assert_eq!(stop.destination, Some(ZoneId(5)));
            let arrival = stop.arrival.unwrap();
            let departure = stop.departure.unwrap();
            assert!(arrival < departure);
            assert!((3.25..=26.75).contains(&arrival));
            assert!((3.25..=26.75).contains(&departure));
        }
    }

    #[test]
    fn out_of_bounds_stops_are_dropped_and_absent_from_output() {
        // Unknown stop zone: every chained time picks up the 999-hour
        // penalty and lands outside the day, so every attempt is dropped —
        // and the loop still terminates at the cap.
        let mut repo = stop_repo("9");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(11);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        let tour = &person.tours[0];
        assert_eq!(tour.num_stops(), 0);
        assert_eq!(tour.trip_chain.len(), 1);
        assert!(tour.trip_chain[0].primary);
    }
}

#[cfg(test)]
mod tour_discard {
    use super::*;

    #[test]
    fn tour_without_a_feasible_window_is_discarded_not_the_person() {
        // Two work tours compete for a single window alternative.
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "2");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(5);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        assert_eq!(person.num_tours.get(Purpose::Work), 2);
        assert_eq!(person.tours.len(), 1, "second tour found no window");
        assert_eq!(person.tours[0].purpose, Purpose::Work);
    }
}

#[cfg(test)]
mod sub_tours {
    use super::*;

    fn sub_tour_repo() -> ModelRepository {
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        repo.insert(
            DecisionPoint::WorkBasedSubTours,
            flat_model(&[("Others", 1), ("Quit", 0)]),
        );
        repo.insert(DecisionPoint::TourModeDestinationOthers, single("drive1,9"));
        repo.insert(
            DecisionPoint::TourTimeOfDayOthers,
            flat_model(&[("10.25,11.25", 1), ("12.25,13.25", 1), ("14.25,15.25", 1)]),
        );
        repo
    }

    #[test]
    fn sub_tours_cap_at_three_and_nest_inside_the_parent_window() {
        let mut repo = sub_tour_repo();
        let store = worker_store();
        let skims = SkimTable::new();
        let config = RunConfig { seed: 13, shards: 1, enable_subtours: true };

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();

        assert_eq!(person.tours.len(), 4, "parent plus capped sub-tours");
        let parent = &person.tours[0];
        assert!(!parent.sub_tour);

        let mut windows: Vec<(f64, f64)> = Vec::new();
        for sub in &person.tours[1..] {
            assert!(sub.sub_tour);
            assert_eq!(sub.parent, Some(0));
            assert_eq!(sub.purpose, Purpose::Others);
            let primary = sub.primary_activity().unwrap();
            let window = (primary.arrival.unwrap(), primary.departure.unwrap());
            assert!(window.0 >= 9.25 && window.1 <= 17.25, "outside parent window");
            windows.push(window);
        }
        // Siblings never share a window.
        windows.sort_by(|a, b| a.0.total_cmp(&b.0));
        windows.dedup();
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn sub_tours_off_by_default() {
        let mut repo = sub_tour_repo();
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(13);

        let person = simulate(&mut repo, &store, &skims, &config, PersonId(100)).unwrap();
        assert_eq!(person.tours.len(), 1);
    }
}

#[cfg(test)]
mod workers {
    use super::*;

    fn two_person_store() -> MemoryStore {
        let mut store = worker_store();
        store.insert(
            dataset::PERSON,
            PersonId(101),
            record_from_numbers([
                ("home_mtz", 1.0),
                ("person_type_id", 2.0),
                ("fix_work_location_mtz", 5.0),
            ]),
        );
        store
    }

    #[test]
    fn same_seed_reproduces_identical_output() {
        let run = |seed: u64| -> MemoryWriter {
            let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
            let store = two_person_store();
            let skims = SkimTable::new();
            let config = config(seed);
            let mut writer = MemoryWriter::new();
            run_shard(
                &[PersonId(100), PersonId(101)],
                config.seed,
                &mut repo,
                &store,
                &skims,
                &config,
                &mut writer,
            )
            .unwrap();
            writer
        };

        let (a, b) = (run(21), run(21));
        assert_eq!(a.persons, b.persons);
        assert_eq!(a.tours, b.tours);
        assert_eq!(a.activities, b.activities);
    }

    #[test]
    fn emission_order_is_person_then_tours_then_activities() {
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        let store = two_person_store();
        let skims = SkimTable::new();
        let config = config(21);
        let mut writer = MemoryWriter::new();

        let summary = run_shard(
            &[PersonId(100), PersonId(101)],
            config.seed,
            &mut repo,
            &store,
            &skims,
            &config,
            &mut writer,
        )
        .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.emitted, 2);
        assert!(summary.discarded.is_empty());

        assert_eq!(writer.persons.len(), 2);
        assert_eq!(writer.persons[0].person_id, 100);
        assert_eq!(writer.persons[1].person_id, 101);
        assert!(writer.tours.iter().all(|t| t.purpose == "Work"));
    }

    #[test]
    fn person_without_input_is_discarded_and_accounted() {
        let mut repo = work_day_repo("1,0,0,0,0,0,0,0", "1");
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(21);
        let mut writer = MemoryWriter::new();

        let summary = run_shard(
            &[PersonId(100), PersonId(999)],
            config.seed,
            &mut repo,
            &store,
            &skims,
            &config,
            &mut writer,
        )
        .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.discarded, vec![(PersonId(999), "MissingInput")]);
        assert_eq!(summary.discard_counts(), vec![("MissingInput", 1)]);
    }

    #[test]
    fn missing_shared_model_aborts_the_shard() {
        let mut repo = ModelRepository::new(); // no models at all
        let store = worker_store();
        let skims = SkimTable::new();
        let config = config(21);
        let mut writer = MemoryWriter::new();

        let err = run_shard(
            &[PersonId(100)],
            config.seed,
            &mut repo,
            &store,
            &skims,
            &config,
            &mut writer,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Choice(_)));
        assert!(err.is_fatal());
    }
}
