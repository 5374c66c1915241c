//! The input-store interface and its in-memory implementation.
//!
//! Production deployments bind decision-point datasets to an external
//! datastore; the engine only requires the one-record-at-a-time read below.
//! [`MemoryStore`] is the bundled implementation: datasets are loaded up
//! front (typically from CSV exports) and served from memory.
//!
//! # CSV format
//!
//! One row per person, one column per field, with a mandatory `person_id`
//! column.  Cells that parse as decimals become numeric fields; empty cells
//! and the literal `NULL` are treated as absent (so per-field defaults
//! apply); anything else becomes a text field.
//!
//! ```csv
//! person_id,home_mtz,person_type_id,fix_work_location_mtz
//! 100,17,1,512
//! 101,17,4,0
//! ```

use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashMap;

use abm_core::PersonId;

use crate::record::Record;
use crate::{DataError, DataResult};

// ── InputStore ────────────────────────────────────────────────────────────────

/// Read access to per-person input rows, one dataset per decision point.
///
/// Returning `None` means the store has no row for that person in that
/// dataset; the caller decides whether that is a default-to-empty situation
/// or a discard.
pub trait InputStore {
    fn record(&self, dataset: &str, person: PersonId) -> Option<&Record>;
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// All datasets held in memory, keyed by dataset name and person.
#[derive(Default)]
pub struct MemoryStore {
    datasets: FxHashMap<String, FxHashMap<PersonId, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: &str, person: PersonId, record: Record) {
        self.datasets
            .entry(dataset.to_string())
            .or_default()
            .insert(person, record);
    }

    /// Person IDs present in `dataset`, ascending.
    pub fn person_ids(&self, dataset: &str) -> Vec<PersonId> {
        let mut ids: Vec<PersonId> = self
            .datasets
            .get(dataset)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Load one dataset from a CSV file.
    pub fn load_csv(&mut self, dataset: &str, path: &Path) -> DataResult<()> {
        let file = std::fs::File::open(path)?;
        self.load_reader(dataset, file)
    }

    /// Like [`load_csv`][Self::load_csv] but accepts any `Read` source.
    /// Useful for testing (pass a `std::io::Cursor`).
    pub fn load_reader<R: Read>(&mut self, dataset: &str, reader: R) -> DataResult<()> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .clone();

        let id_col = headers
            .iter()
            .position(|h| h == "person_id")
            .ok_or_else(|| DataError::Parse(format!("dataset {dataset:?} has no person_id column")))?;

        for row in csv_reader.records() {
            let row = row.map_err(|e| DataError::Parse(e.to_string()))?;
            let person = row
                .get(id_col)
                .and_then(|c| c.trim().parse::<u64>().ok())
                .map(PersonId)
                .ok_or_else(|| DataError::Parse(format!("bad person_id in dataset {dataset:?}")))?;

            let mut record = Record::new();
            for (i, cell) in row.iter().enumerate() {
                if i == id_col {
                    continue;
                }
                let cell = cell.trim();
                if cell.is_empty() || cell == "NULL" {
                    continue;
                }
                let field = &headers[i];
                match cell.parse() {
                    Ok(d) => record.set_number(field, d),
                    Err(_) => record.set_text(field, cell),
                }
            }
            self.insert(dataset, person, record);
        }
        Ok(())
    }
}

impl InputStore for MemoryStore {
    fn record(&self, dataset: &str, person: PersonId) -> Option<&Record> {
        self.datasets.get(dataset)?.get(&person)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a record from `(field, numeric value)` pairs — test and fixture
/// convenience.
pub fn record_from_numbers<'a, I>(pairs: I) -> Record
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut record = Record::new();
    for (field, value) in pairs {
        record.set_float(field, value);
    }
    record
}
