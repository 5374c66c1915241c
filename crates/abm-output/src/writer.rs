//! The `OutputWriter` trait implemented by all backend writers.

use crate::emit::PersonOutput;
use crate::OutputResult;

/// Trait implemented by the CSV, in-memory, and SQLite writers.
///
/// One call per person keeps the required emission order (person → tours →
/// activities) a property of the interface rather than caller discipline.
pub trait OutputWriter {
    /// Write one person's summary, tour, and activity rows.
    fn write_person(&mut self, output: &PersonOutput) -> OutputResult<()>;

    /// Flush and close all underlying handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
