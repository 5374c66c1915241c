//! Run configuration.
//!
//! Everything here arrives from the embedding application (CLI parsing, log
//! wiring, and path handling live outside the engine).

/// Top-level configuration for one simulation run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Master RNG seed.  Worker and per-person seeds derive from it, so the
    /// same seed over the same inputs reproduces every draw.
    pub seed: u64,

    /// Number of contiguous population shards, each processed by one
    /// independent worker.
    pub shards: usize,

    /// Generate work-based sub-tours.  Off by default: the sub-tour model
    /// is optional input and most deployments run without it.
    pub enable_subtours: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed:            0,
            shards:          1,
            enable_subtours: false,
        }
    }
}
