//! `abm-sim` — the day-simulation loop and its workers.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`config`]    | `RunConfig` — seed, shard count, feature toggles          |
//! | [`inputs`]    | `PersonInputs` — per-decision input rows, loaded once     |
//! | [`scheduler`] | `DaySimulator` — the fixed per-person decision sequence   |
//! | `stops`       | intermediate-stop generation (bounded half-loops)         |
//! | `timing`      | travel-time chaining, snapping, tour start/end estimation |
//! | [`runner`]    | shard workers, the per-person catch boundary, summaries   |
//! | [`error`]     | `SimError`, `SimResult<T>`                                |
//!
//! # Control flow
//!
//! Per person: day pattern → tour counts → tour list in priority order →
//! per tour: mode (or mode/destination) → time-of-day → primary activity →
//! intermediate stops → start/end estimation.  All mutually-constraining
//! state funnels through the person's time-window ledger, so the sequence
//! within a person is strictly sequential; across persons everything is
//! independent and shards freely.

pub mod config;
pub mod error;
pub mod inputs;
pub mod runner;
pub mod scheduler;
mod stops;
mod timing;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::RunConfig;
pub use error::{SimError, SimResult};
pub use inputs::PersonInputs;
pub use runner::{run_population, run_shard, RunSummary};
pub use scheduler::DaySimulator;
