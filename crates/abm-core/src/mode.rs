//! Travel modes shared across tour and stop decisions.
//!
//! Choice models name modes two ways: tour-mode models use display labels
//! (`"Public bus"`, `"Auto"`, `"Share 2+"`, …) while mode/destination models
//! use short tokens (`"bus"`, `"drive1"`, `"share2"`, …).  [`Mode::parse`]
//! accepts both spellings.  Output rows and input-record fields carry the
//! numeric mode code.

/// The means by which a tour or an intermediate stop is made.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
    PublicBus,
    Mrt,
    PrivateBus,
    DriveAlone,
    SharedTwo,
    SharedThreePlus,
    Motorcycle,
    Walk,
    Taxi,
}

/// Coarse mode grouping used for skim lookups: car-like modes share the car
/// travel-time tables, the three transit modes share the bus tables, and walk
/// times are derived from distance.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ModeBucket {
    Transit,
    Car,
    Walk,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::PublicBus,
        Mode::Mrt,
        Mode::PrivateBus,
        Mode::DriveAlone,
        Mode::SharedTwo,
        Mode::SharedThreePlus,
        Mode::Motorcycle,
        Mode::Walk,
        Mode::Taxi,
    ];

    /// Numeric mode code used in input records and output rows.
    pub fn code(self) -> u8 {
        match self {
            Mode::PublicBus       => 1,
            Mode::Mrt             => 2,
            Mode::PrivateBus      => 3,
            Mode::DriveAlone      => 4,
            Mode::SharedTwo       => 5,
            Mode::SharedThreePlus => 6,
            Mode::Motorcycle      => 7,
            Mode::Walk            => 8,
            Mode::Taxi            => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Mode> {
        Mode::ALL.into_iter().find(|m| m.code() == code)
    }

    /// Short token used by mode/destination choice models.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::PublicBus       => "bus",
            Mode::Mrt             => "mrt",
            Mode::PrivateBus      => "private_bus",
            Mode::DriveAlone      => "drive1",
            Mode::SharedTwo       => "share2",
            Mode::SharedThreePlus => "share3",
            Mode::Motorcycle      => "motor",
            Mode::Walk            => "walk",
            Mode::Taxi            => "taxi",
        }
    }

    /// Parse either a short token or a tour-mode display label.
    pub fn parse(name: &str) -> Option<Mode> {
        match name.trim() {
            "bus" | "Public bus"            => Some(Mode::PublicBus),
            "mrt" | "MRT"                   => Some(Mode::Mrt),
            "private_bus" | "Private bus"   => Some(Mode::PrivateBus),
            "drive1" | "Auto"               => Some(Mode::DriveAlone),
            "share2" | "Share 2+"           => Some(Mode::SharedTwo),
            "share3" | "Share 3+"           => Some(Mode::SharedThreePlus),
            "motor" | "Motor"               => Some(Mode::Motorcycle),
            "walk" | "Walk"                 => Some(Mode::Walk),
            "taxi" | "Taxi"                 => Some(Mode::Taxi),
            _ => None,
        }
    }

    pub fn bucket(self) -> ModeBucket {
        match self {
            Mode::PublicBus | Mode::Mrt | Mode::PrivateBus => ModeBucket::Transit,
            Mode::Walk => ModeBucket::Walk,
            Mode::DriveAlone
            | Mode::SharedTwo
            | Mode::SharedThreePlus
            | Mode::Motorcycle
            | Mode::Taxi => ModeBucket::Car,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
