//! `abm-choice` — the discrete-choice engine.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                    |
//! |----------------|-------------------------------------------------------------|
//! | [`tree`]       | `ChoiceTree` — ordered flat/nested choice sets              |
//! | [`expr`]       | formula expression trees, parsed once at load               |
//! | [`model`]      | `ChoiceModel`, `ModelSpec`, `ChoiceOutcome`, `simulate()`   |
//! | [`logit`]      | utility evaluation + flat/nested probability (internal)     |
//! | [`sample`]     | cumulative-distribution draw (internal)                     |
//! | [`repository`] | `DecisionPoint`, `ModelRepository`, manifest loading        |
//! | [`error`]      | `ChoiceError`, `ChoiceResult<T>`                            |
//!
//! # Design notes
//!
//! Everything per-call is explicit: `simulate(record, rng)` reads variables
//! and availability from the record, computes in `Decimal` end to end, and
//! samples with the caller's RNG.  The nested-logit probability formula is
//! valid for exactly two levels, and model loading enforces that bound.

pub mod error;
pub mod expr;
mod logit;
pub mod model;
pub mod repository;
mod sample;
pub mod tree;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{ChoiceError, ChoiceResult};
pub use model::{Binding, ChoiceModel, ChoiceOutcome, ModelSpec};
pub use repository::{DecisionPoint, ModelRepository};
pub use tree::ChoiceTree;
