//! The simulated day and its 48-slot half-hour grid.
//!
//! # Design
//!
//! The day runs from 03:00 to 27:00 (3 a.m. to 3 a.m. the next morning) and
//! is divided into 48 half-hour slots.  Scheduled times are fractional hours
//! on the slot-midpoint grid: 3.25, 3.75, 4.25, …, 26.75.  Travel-time
//! arithmetic produces off-grid values; [`snap_to_grid`] pulls them back onto
//! the grid before they are stored on an activity or tour.
//!
//! A [`TimeWindow`] is a `(start, end)` pair of fractional hours.  Windows
//! appear in two roles: as the alternatives of time-of-day choice models
//! (where the alternative *name* is the `"start,end"` token) and as the
//! tokens of a person's time-window ledger.

use std::fmt;

/// Start of the simulated day, fractional hours.
pub const DAY_START: f64 = 3.0;

/// End of the simulated day, fractional hours (27.0 = 3 a.m. next day).
pub const DAY_END: f64 = 27.0;

/// Number of half-hour slots between [`DAY_START`] and [`DAY_END`].
pub const SLOT_COUNT: usize = 48;

/// Midpoint of the first slot; also the earliest schedulable time.
pub const FIRST_MIDPOINT: f64 = 3.25;

/// Midpoint of the last slot; also the latest schedulable time.
pub const LAST_MIDPOINT: f64 = 26.75;

/// Fractional-hour midpoint of slot `slot` (0-based).
#[inline]
pub fn slot_midpoint(slot: usize) -> f64 {
    FIRST_MIDPOINT + slot as f64 * 0.5
}

/// The 0-based slot index whose midpoint equals `t`, or `None` for any
/// off-grid value.
pub fn slot_of(t: f64) -> Option<usize> {
    let idx = ((t - FIRST_MIDPOINT) * 2.0).round();
    if !(0.0..SLOT_COUNT as f64).contains(&idx) {
        return None;
    }
    let idx = idx as usize;
    ((t - slot_midpoint(idx)).abs() < 1e-9).then_some(idx)
}

/// Snap an off-grid fractional hour onto the slot-midpoint grid.
///
/// Values with a fractional part below 0.5 map to X.25, the rest to X.75.
/// A whole hour (fraction exactly 0) maps to X.25.
pub fn snap_to_grid(t: f64) -> f64 {
    let base = t.floor();
    if t < base + 0.5 {
        base + 0.25
    } else {
        base + 0.75
    }
}

// ── TimeWindow ────────────────────────────────────────────────────────────────

/// A contiguous span of the day, `start <= end`, in fractional hours.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end:   f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Parse a `"start,end"` token as used for time-of-day alternatives.
    pub fn parse(token: &str) -> Option<Self> {
        let (start, end) = token.split_once(',')?;
        let start: f64 = start.trim().parse().ok()?;
        let end: f64 = end.trim().parse().ok()?;
        (start <= end).then_some(Self { start, end })
    }

    /// `true` if this window intersects the closed span `[start, end]`,
    /// including touching endpoints and full containment either way.
    #[inline]
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        self.start <= end && self.end >= start
    }

    /// `true` if `other` lies entirely within this window.
    #[inline]
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}
