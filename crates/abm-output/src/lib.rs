//! `abm-output` — output rows and pluggable writer backends.
//!
//! # Crate layout
//!
//! | Module     | Contents                                             |
//! |------------|------------------------------------------------------|
//! | [`row`]    | `PersonSummaryRow`, `TourRow`, `ActivityRow`         |
//! | [`emit`]   | `person_output()` — flatten a `Person` into rows     |
//! | [`writer`] | `OutputWriter` trait                                 |
//! | [`csv`]    | CSV backend (three files)                            |
//! | [`memory`] | in-memory collector, used by tests                   |
//! | [`sqlite`] | SQLite backend (feature `sqlite`)                    |
//!
//! Emission order is fixed per person: summary, then tours in post-discard
//! order, then activities in trip-chain order.

pub mod csv;
pub mod emit;
pub mod error;
pub mod memory;
pub mod row;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod writer;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use csv::CsvWriter;
pub use emit::{person_output, PersonOutput};
pub use error::{OutputError, OutputResult};
pub use memory::MemoryWriter;
pub use row::{ActivityRow, PersonSummaryRow, TourRow};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
pub use writer::OutputWriter;
