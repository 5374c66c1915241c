//! The per-person time-window ledger.
//!
//! One person has one shared inventory of window tokens for the whole day —
//! initialized from the tour time-of-day model's choice set on first use.
//! Blocking a span moves every intersecting token from the available set to
//! the unavailable set; the two sets always partition the initial inventory.
//! This inventory is the sole mechanism preventing overlapping tours.

use abm_core::{TimeWindow, DAY_START, SLOT_COUNT};

/// One inventory token: the original alternative string (used to toggle
/// model availability) plus its parsed bounds.
#[derive(Clone, Debug)]
pub struct WindowToken {
    token:  String,
    window: TimeWindow,
}

impl WindowToken {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }
}

/// Available/unavailable partition of a person's window inventory.
#[derive(Clone, Debug, Default)]
pub struct TimeWindowLedger {
    available:   Vec<WindowToken>,
    unavailable: Vec<WindowToken>,
}

impl TimeWindowLedger {
    /// An uninitialized ledger; filled by [`initialize`][Self::initialize]
    /// at the person's first time-of-day decision.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        !self.available.is_empty() || !self.unavailable.is_empty()
    }

    /// Install the inventory.  All tokens start available.
    pub fn initialize<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = (String, TimeWindow)>,
    {
        self.available = tokens
            .into_iter()
            .map(|(token, window)| WindowToken { token, window })
            .collect();
        self.unavailable.clear();
    }

    /// Remove every available token intersecting `[start, end]` from future
    /// availability.  A zero-length span blocks nothing.
    pub fn block(&mut self, start: f64, end: f64) {
        if start == end {
            return;
        }
        let mut idx = 0;
        while idx < self.available.len() {
            if self.available[idx].window.intersects(start, end) {
                let taken = self.available.remove(idx);
                self.unavailable.push(taken);
            } else {
                idx += 1;
            }
        }
    }

    pub fn available(&self) -> impl Iterator<Item = &WindowToken> {
        self.available.iter()
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &WindowToken> {
        self.unavailable.iter()
    }

    /// Alternative strings of the currently unavailable tokens — the set the
    /// scheduler toggles off before a time-of-day decision.
    pub fn unavailable_tokens(&self) -> impl Iterator<Item = &str> {
        self.unavailable.iter().map(|t| t.token.as_str())
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable.len()
    }

    /// Total inventory size; constant after initialization.
    pub fn total_count(&self) -> usize {
        self.available.len() + self.unavailable.len()
    }
}

/// The plain half-hour grid as `(token, window)` pairs — a ready-made
/// inventory for embeddings and tests that schedule without a time-of-day
/// model.
pub fn half_hour_grid() -> Vec<(String, TimeWindow)> {
    (0..SLOT_COUNT)
        .map(|slot| {
            let start = DAY_START + slot as f64 * 0.5;
            let window = TimeWindow::new(start, start + 0.5);
            (window.to_string(), window)
        })
        .collect()
}
