//! In-memory output backend — the test and embedding collector.

use crate::emit::PersonOutput;
use crate::row::{ActivityRow, PersonSummaryRow, TourRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Collects all rows in memory, preserving emission order.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub persons:    Vec<PersonSummaryRow>,
    pub tours:      Vec<TourRow>,
    pub activities: Vec<ActivityRow>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputWriter for MemoryWriter {
    fn write_person(&mut self, output: &PersonOutput) -> OutputResult<()> {
        self.persons.push(output.summary);
        self.tours.extend_from_slice(&output.tours);
        self.activities.extend_from_slice(&output.activities);
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
