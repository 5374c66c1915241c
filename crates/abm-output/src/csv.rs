//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `person_summaries.csv`
//! - `tours.csv`
//! - `activities.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::emit::PersonOutput;
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Writes simulation output to three CSV files.
pub struct CsvWriter {
    persons:    Writer<File>,
    tours:      Writer<File>,
    activities: Writer<File>,
    finished:   bool,
}

impl CsvWriter {
    /// Open (or create) the three CSV files in `dir` and write header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut persons = Writer::from_path(dir.join("person_summaries.csv"))?;
        persons.write_record(["person_id", "num_tours", "person_type"])?;

        let mut tours = Writer::from_path(dir.join("tours.csv"))?;
        tours.write_record([
            "person_id",
            "tour_num",
            "purpose",
            "mode",
            "num_stops",
            "start_time",
            "end_time",
            "primary_arrival",
            "primary_departure",
            "destination",
            "walk_distance_first",
            "walk_distance_second",
        ])?;

        let mut activities = Writer::from_path(dir.join("activities.csv"))?;
        activities.write_record([
            "person_id",
            "tour_num",
            "stop_num",
            "primary",
            "purpose",
            "tour_purpose",
            "mode",
            "arrival",
            "departure",
            "destination",
        ])?;

        Ok(Self { persons, tours, activities, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_person(&mut self, output: &PersonOutput) -> OutputResult<()> {
        let summary = &output.summary;
        self.persons.write_record(&[
            summary.person_id.to_string(),
            summary.num_tours.to_string(),
            summary.person_type.to_string(),
        ])?;

        for row in &output.tours {
            self.tours.write_record(&[
                row.person_id.to_string(),
                row.tour_num.to_string(),
                row.purpose.to_string(),
                row.mode.to_string(),
                row.num_stops.to_string(),
                row.start_time.to_string(),
                row.end_time.to_string(),
                row.primary_arrival.to_string(),
                row.primary_departure.to_string(),
                row.destination.to_string(),
                row.walk_distance_first.to_string(),
                row.walk_distance_second.to_string(),
            ])?;
        }

        for row in &output.activities {
            self.activities.write_record(&[
                row.person_id.to_string(),
                row.tour_num.to_string(),
                row.stop_num.to_string(),
                (row.primary as u8).to_string(),
                row.purpose.to_string(),
                row.tour_purpose.to_string(),
                row.mode.to_string(),
                row.arrival.to_string(),
                row.departure.to_string(),
                row.destination.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.persons.flush()?;
        self.tours.flush()?;
        self.activities.flush()?;
        Ok(())
    }
}
