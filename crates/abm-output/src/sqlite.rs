//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! three tables: `person_summaries`, `tours`, and `activities`.

use std::path::Path;

use rusqlite::Connection;

use crate::emit::PersonOutput;
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Writes simulation output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS person_summaries (
                 person_id   INTEGER PRIMARY KEY,
                 num_tours   INTEGER NOT NULL,
                 person_type INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tours (
                 person_id            INTEGER NOT NULL,
                 tour_num             INTEGER NOT NULL,
                 purpose              TEXT    NOT NULL,
                 mode                 INTEGER NOT NULL,
                 num_stops            INTEGER NOT NULL,
                 start_time           REAL    NOT NULL,
                 end_time             REAL    NOT NULL,
                 primary_arrival      REAL    NOT NULL,
                 primary_departure    REAL    NOT NULL,
                 destination          INTEGER NOT NULL,
                 walk_distance_first  REAL    NOT NULL,
                 walk_distance_second REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS activities (
                 person_id    INTEGER NOT NULL,
                 tour_num     INTEGER NOT NULL,
                 stop_num     INTEGER NOT NULL,
                 is_primary   INTEGER NOT NULL,
                 purpose      TEXT    NOT NULL,
                 tour_purpose TEXT    NOT NULL,
                 mode         INTEGER NOT NULL,
                 arrival      REAL    NOT NULL,
                 departure    REAL    NOT NULL,
                 destination  INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_person(&mut self, output: &PersonOutput) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            tx.execute(
                "INSERT INTO person_summaries (person_id, num_tours, person_type) \
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    output.summary.person_id,
                    output.summary.num_tours,
                    output.summary.person_type,
                ],
            )?;

            let mut tour_stmt = tx.prepare_cached(
                "INSERT INTO tours \
                 (person_id, tour_num, purpose, mode, num_stops, start_time, end_time, \
                  primary_arrival, primary_departure, destination, \
                  walk_distance_first, walk_distance_second) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for row in &output.tours {
                tour_stmt.execute(rusqlite::params![
                    row.person_id,
                    row.tour_num,
                    row.purpose,
                    row.mode,
                    row.num_stops,
                    row.start_time,
                    row.end_time,
                    row.primary_arrival,
                    row.primary_departure,
                    row.destination,
                    row.walk_distance_first,
                    row.walk_distance_second,
                ])?;
            }

            let mut activity_stmt = tx.prepare_cached(
                "INSERT INTO activities \
                 (person_id, tour_num, stop_num, is_primary, purpose, tour_purpose, \
                  mode, arrival, departure, destination) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for row in &output.activities {
                activity_stmt.execute(rusqlite::params![
                    row.person_id,
                    row.tour_num,
                    row.stop_num,
                    row.primary as i64,
                    row.purpose,
                    row.tour_purpose,
                    row.mode,
                    row.arrival,
                    row.departure,
                    row.destination,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
