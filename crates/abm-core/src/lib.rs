//! `abm-core` — foundational types for the `abm` activity-based
//! travel-demand simulator.
//!
//! This crate is a dependency of every other `abm-*` crate.  It intentionally
//! has no `abm-*` dependencies and a minimal external surface (only `rand`).
//!
//! # What lives here
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`ids`]     | `PersonId`, `ZoneId`                                  |
//! | [`time`]    | the 48-slot half-hour day grid, `TimeWindow`, snapping|
//! | [`mode`]    | `Mode` (nine travel modes) and `ModeBucket`           |
//! | [`purpose`] | `Purpose`, `StopChoice`                               |
//! | [`rng`]     | `PersonRng` (per-person), shard seed derivation       |

pub mod ids;
pub mod mode;
pub mod purpose;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{PersonId, ZoneId};
pub use mode::{Mode, ModeBucket};
pub use purpose::{Purpose, StopChoice};
pub use rng::{shard_seed, PersonRng};
pub use time::{
    slot_midpoint, slot_of, snap_to_grid, TimeWindow, DAY_END, DAY_START, FIRST_MIDPOINT,
    LAST_MIDPOINT, SLOT_COUNT,
};
