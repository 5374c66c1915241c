//! Unit tests for output rows and writers.

use abm_core::{Mode, PersonId, Purpose, TimeWindow, ZoneId};
use abm_population::{Activity, ModeDestination, Person, Tour};

use crate::emit::person_output;
use crate::memory::MemoryWriter;
use crate::writer::OutputWriter;

fn sample_person() -> Person {
    let mut person = Person::new(PersonId(100), ZoneId(1));
    person.person_type = 4;

    let mut work = Tour::new(Purpose::Work, true);
    work.assign_mode_destination(Mode::DriveAlone, ZoneId(5));
    work.start_time = Some(8.25);
    work.end_time = Some(18.25);

    let mut primary = Activity::primary(Purpose::Work, TimeWindow::new(9.25, 17.25));
    primary.assign_mode_destination(Mode::DriveAlone, ZoneId(5));
    let mut stop = Activity::intermediate(Purpose::Shopping);
    stop.assign_mode_destination(Mode::DriveAlone, ZoneId(9));
    stop.arrival = Some(17.75);
    stop.departure = Some(18.25);

    work.trip_chain.push(primary);
    work.trip_chain.push(stop);

    let mut other = Tour::new(Purpose::Others, false);
    other.assign_mode_destination(Mode::Walk, ZoneId(2));
    other.trip_chain.push(Activity::primary(
        Purpose::Others,
        TimeWindow::new(19.25, 20.25),
    ));

    person.tours.push(work);
    person.tours.push(other);
    person
}

#[cfg(test)]
mod emit {
    use super::*;

    #[test]
    fn summary_counts_tours() {
        let output = person_output(&sample_person());
        assert_eq!(output.summary.person_id, 100);
        assert_eq!(output.summary.num_tours, 2);
        assert_eq!(output.summary.person_type, 4);
    }

    #[test]
    fn tour_rows_numbered_in_order() {
        let output = person_output(&sample_person());
        assert_eq!(output.tours.len(), 2);
        assert_eq!(output.tours[0].tour_num, 1);
        assert_eq!(output.tours[0].purpose, "Work");
        assert_eq!(output.tours[0].mode, 4);
        assert_eq!(output.tours[0].num_stops, 1);
        assert_eq!(output.tours[0].primary_arrival, 9.25);
        assert_eq!(output.tours[0].primary_departure, 17.25);
        assert_eq!(output.tours[1].tour_num, 2);
        assert_eq!(output.tours[1].purpose, "Others");
        assert_eq!(output.tours[1].mode, 8);
    }

    #[test]
    fn activity_rows_in_trip_chain_order() {
        let output = person_output(&sample_person());
        assert_eq!(output.activities.len(), 3);

        let first = &output.activities[0];
        assert!((first.tour_num, first.stop_num) == (1, 1) && first.primary);
        assert_eq!(first.purpose, "Work");

        let second = &output.activities[1];
        assert_eq!((second.tour_num, second.stop_num), (1, 2));
        assert!(!second.primary);
        assert_eq!(second.purpose, "Shopping");
        assert_eq!(second.tour_purpose, "Work");
        assert_eq!(second.destination, 9);

        assert_eq!(output.activities[2].tour_num, 2);
    }
}

#[cfg(test)]
mod writers {
    use super::*;

    #[test]
    fn memory_writer_preserves_order() {
        let mut writer = MemoryWriter::new();
        writer.write_person(&person_output(&sample_person())).unwrap();
        writer.write_person(&person_output(&sample_person())).unwrap();
        writer.finish().unwrap();

        assert_eq!(writer.persons.len(), 2);
        assert_eq!(writer.tours.len(), 4);
        assert_eq!(writer.activities.len(), 6);
    }

    #[test]
    fn csv_writer_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = crate::csv::CsvWriter::new(dir.path()).unwrap();
        writer.write_person(&person_output(&sample_person())).unwrap();
        writer.finish().unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();

        let persons = read("person_summaries.csv");
        assert!(persons.starts_with("person_id,num_tours,person_type"));
        assert!(persons.contains("100,2,4"));

        let tours = read("tours.csv");
        assert_eq!(tours.lines().count(), 3); // header + 2 tours
        assert!(tours.contains("Work"));

        let activities = read("activities.csv");
        assert_eq!(activities.lines().count(), 4); // header + 3 activities
    }

    #[test]
    fn csv_finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = crate::csv::CsvWriter::new(dir.path()).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_writer_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = crate::sqlite::SqliteWriter::new(dir.path()).unwrap();
        writer.write_person(&person_output(&sample_person())).unwrap();
        writer.finish().unwrap();
        drop(writer);

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let tours: i64 = conn
            .query_row("SELECT COUNT(*) FROM tours", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tours, 2);
        let stops: i64 = conn
            .query_row("SELECT COUNT(*) FROM activities WHERE is_primary = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stops, 1);
    }
}
