//! Tour and stop purposes.

/// The four modelled activity purposes.
///
/// The declaration order here is the canonical purpose order: it fixes the
/// numeric `stop_type`/`tour_type` codes fed back into choice-model input
/// records (1 = Work … 4 = Others).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Purpose {
    Work,
    Education,
    Shopping,
    Others,
}

impl Purpose {
    pub const ALL: [Purpose; 4] = [
        Purpose::Work,
        Purpose::Education,
        Purpose::Shopping,
        Purpose::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Work      => "Work",
            Purpose::Education => "Education",
            Purpose::Shopping  => "Shopping",
            Purpose::Others    => "Others",
        }
    }

    pub fn parse(name: &str) -> Option<Purpose> {
        Purpose::ALL.into_iter().find(|p| p.as_str() == name.trim())
    }

    /// 1-based purpose code (`tour_type`/`stop_type` record fields).
    pub fn code(self) -> u8 {
        match self {
            Purpose::Work      => 1,
            Purpose::Education => 2,
            Purpose::Shopping  => 3,
            Purpose::Others    => 4,
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── StopChoice ────────────────────────────────────────────────────────────────

/// Outcome of one intermediate-stop-generation draw: either a stop of some
/// purpose, or the distinguished `Quit` alternative ending the half-loop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StopChoice {
    Stop(Purpose),
    Quit,
}

impl StopChoice {
    pub fn parse(name: &str) -> Option<StopChoice> {
        if name.trim() == "Quit" {
            return Some(StopChoice::Quit);
        }
        Purpose::parse(name).map(StopChoice::Stop)
    }
}
