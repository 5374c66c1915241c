//! Unit tests for abm-data.

use std::io::Cursor;

use abm_core::{Mode, ModeBucket, PersonId, ZoneId};

use crate::record::Record;
use crate::skims::{CostCell, Direction, Period, SkimTable, TtProfile};
use crate::store::{InputStore, MemoryStore};
use crate::DataError;

// ── Record ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod record {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn missing_field_reads_as_none() {
        let record = Record::new();
        assert_eq!(record.number("absent").unwrap(), None);
        assert_eq!(record.float("absent").unwrap(), None);
    }

    #[test]
    fn numeric_text_coerces() {
        let mut record = Record::new();
        record.set_text("zone", "42");
        assert_eq!(record.number("zone").unwrap(), Some(Decimal::from(42)));
    }

    #[test]
    fn non_numeric_text_errors_naming_the_field() {
        let mut record = Record::new();
        record.set_text("person_type", "student");
        let err = record.number("person_type").unwrap_err();
        match err {
            DataError::Coercion { field, .. } => assert_eq!(field, "person_type"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn collects_from_pairs() {
        let record: Record = [
            ("home_mtz", crate::Value::Number(Decimal::from(17))),
            ("note", crate::Value::Text("downtown".into())),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.len(), 2);
        assert!(!record.is_empty());
        assert_eq!(record.float("home_mtz").unwrap(), Some(17.0));
        assert_eq!(record.text("note"), Some("downtown"));
    }

    #[test]
    fn flags_store_as_zero_one() {
        let mut record = Record::new();
        record.set_flag("first_bound", true);
        record.set_flag("second_bound", false);
        assert_eq!(record.float("first_bound").unwrap(), Some(1.0));
        assert_eq!(record.float("second_bound").unwrap(), Some(0.0));
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use super::*;

    const CSV: &[u8] = b"\
person_id,home_mtz,person_type_id,fix_work_location_mtz,note\n\
100,17,1,512,\n\
101,17,4,0,part timer\n\
102,9,1,NULL,\n\
";

    #[test]
    fn loads_rows_by_person() {
        let mut store = MemoryStore::new();
        store.load_reader("persons", Cursor::new(CSV)).unwrap();

        let row = store.record("persons", PersonId(100)).unwrap();
        assert_eq!(row.float("home_mtz").unwrap(), Some(17.0));
        assert_eq!(row.float("fix_work_location_mtz").unwrap(), Some(512.0));

        assert!(store.record("persons", PersonId(999)).is_none());
        assert!(store.record("other_dataset", PersonId(100)).is_none());
    }

    #[test]
    fn null_and_empty_cells_are_absent() {
        let mut store = MemoryStore::new();
        store.load_reader("persons", Cursor::new(CSV)).unwrap();

        let row = store.record("persons", PersonId(102)).unwrap();
        assert_eq!(row.number("fix_work_location_mtz").unwrap(), None);
        assert_eq!(row.number("note").unwrap(), None);
    }

    #[test]
    fn text_cells_stay_text() {
        let mut store = MemoryStore::new();
        store.load_reader("persons", Cursor::new(CSV)).unwrap();
        let row = store.record("persons", PersonId(101)).unwrap();
        assert_eq!(row.text("note"), Some("part timer"));
    }

    #[test]
    fn person_ids_sorted() {
        let mut store = MemoryStore::new();
        store.load_reader("persons", Cursor::new(CSV)).unwrap();
        assert_eq!(
            store.person_ids("persons"),
            vec![PersonId(100), PersonId(101), PersonId(102)]
        );
    }

    #[test]
    fn missing_person_id_column_is_an_error() {
        let mut store = MemoryStore::new();
        let bad = b"id,home_mtz\n1,17\n";
        assert!(store.load_reader("persons", Cursor::new(bad.as_slice())).is_err());
    }
}

// ── SkimTable ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod skims {
    use super::*;

    fn table() -> SkimTable {
        let mut skims = SkimTable::new();
        skims.insert_travel_times(
            ModeBucket::Car,
            ZoneId(1),
            ZoneId(2),
            TtProfile::constant(0.4),
        );
        skims.insert_travel_times(
            ModeBucket::Transit,
            ZoneId(1),
            ZoneId(2),
            TtProfile::constant(0.9),
        );
        skims.insert_cost(
            Period::AmPeak,
            ZoneId(1),
            ZoneId(2),
            CostCell { distance: 6.0, car_cost_erp: 2.0, pub_cost: 1.4 },
        );
        skims.insert_cost(
            Period::PmPeak,
            ZoneId(1),
            ZoneId(2),
            CostCell { distance: 3.5, car_cost_erp: 1.0, pub_cost: 1.4 },
        );
        skims
    }

    #[test]
    fn mode_bucketed_lookups() {
        let skims = table();
        let car = skims.travel_time(Mode::DriveAlone, ZoneId(1), ZoneId(2), Direction::Arrival, 10);
        let taxi = skims.travel_time(Mode::Taxi, ZoneId(1), ZoneId(2), Direction::Departure, 30);
        let bus = skims.travel_time(Mode::PublicBus, ZoneId(1), ZoneId(2), Direction::Arrival, 10);
        assert_eq!(car, Some(0.4));
        assert_eq!(taxi, Some(0.4));
        assert_eq!(bus, Some(0.9));
    }

    #[test]
    fn intra_zonal_is_free() {
        let skims = table();
        assert_eq!(
            skims.travel_time(Mode::DriveAlone, ZoneId(5), ZoneId(5), Direction::Arrival, 0),
            Some(0.0)
        );
        assert_eq!(skims.walk_time(ZoneId(5), ZoneId(5)), Some(0.0));
    }

    #[test]
    fn unknown_pair_is_unavailable() {
        let skims = table();
        assert_eq!(
            skims.travel_time(Mode::DriveAlone, ZoneId(2), ZoneId(1), Direction::Arrival, 10),
            None
        );
    }

    #[test]
    fn walk_time_derives_from_distances() {
        let skims = table();
        // (6.0 - 3.5) / 5 km/h
        let walk = skims.walk_time(ZoneId(1), ZoneId(2)).unwrap();
        assert!((walk - 0.5).abs() < 1e-12);
    }

    #[test]
    fn null_cells_load_as_unavailable() {
        let csv = b"\
origin,destination,tt_arrival_1,tt_arrival_2,tt_departure_1,tt_departure_2\n\
1,2,0.25,NULL,0.30,\n\
";
        let mut skims = SkimTable::new();
        skims
            .load_travel_times_reader(Cursor::new(csv.as_slice()), ModeBucket::Car)
            .unwrap();

        let at = |dir, slot| skims.travel_time(Mode::DriveAlone, ZoneId(1), ZoneId(2), dir, slot);
        assert_eq!(at(Direction::Arrival, 0), Some(0.25));
        assert_eq!(at(Direction::Arrival, 1), None);
        assert_eq!(at(Direction::Departure, 0), Some(0.30));
        assert_eq!(at(Direction::Departure, 1), None);
        // Columns beyond those present load as unavailable.
        assert_eq!(at(Direction::Arrival, 40), None);
    }

    #[test]
    fn cost_csv_loads() {
        let csv = b"\
origin,destination,distance,car_cost_erp,pub_cost\n\
1,2,6.0,2.0,1.4\n\
";
        let mut skims = SkimTable::new();
        skims
            .load_costs_reader(Cursor::new(csv.as_slice()), Period::OffPeak)
            .unwrap();
        let cell = skims.cost(Period::OffPeak, ZoneId(1), ZoneId(2)).unwrap();
        assert_eq!(cell.distance, 6.0);
        assert_eq!(cell.car_cost_erp, 2.0);
        assert_eq!(cell.pub_cost, 1.4);
    }

    #[test]
    fn period_of_slot() {
        assert_eq!(Period::of_slot(9), Period::AmPeak);
        assert_eq!(Period::of_slot(12), Period::AmPeak);
        assert_eq!(Period::of_slot(13), Period::OffPeak);
        assert_eq!(Period::of_slot(29), Period::PmPeak);
        assert_eq!(Period::of_slot(32), Period::PmPeak);
        assert_eq!(Period::of_slot(0), Period::OffPeak);
        assert_eq!(Period::of_slot(47), Period::OffPeak);
    }
}
