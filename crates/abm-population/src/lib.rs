//! `abm-population` — the mutable per-person data model.
//!
//! # Crate layout
//!
//! | Module      | Contents                                             |
//! |-------------|------------------------------------------------------|
//! | [`person`]  | `Person`, `DayPattern`, `NumTours`                   |
//! | [`tour`]    | `Tour`, `Activity`, `Trip`, `ModeDestination`        |
//! | [`windows`] | `TimeWindowLedger` — the shared time-token inventory |
//!
//! These records are built incrementally as the scheduler makes decisions;
//! nothing here samples or reads external data.

pub mod person;
pub mod tour;
pub mod windows;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use person::{DayPattern, NumTours, Person};
pub use tour::{Activity, ModeDestination, Tour, Trip};
pub use windows::{half_hour_grid, TimeWindowLedger, WindowToken};
