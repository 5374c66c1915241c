//! Shard workers — the per-person catch boundary and run accounting.
//!
//! The population is split into disjoint contiguous shards up front; each
//! shard is processed by one worker holding its own model repository, its
//! own writer, and a shard-derived RNG seed.  Workers share nothing mutable
//! and never synchronize.
//!
//! A person failing for any non-fatal reason is logged and dropped from
//! output; the batch continues.  Model-definition errors abort the run —
//! they would corrupt every remaining person the same way.

use std::time::Instant;

use log::{debug, info, warn};

use abm_choice::ModelRepository;
use abm_core::{shard_seed, PersonId, PersonRng};
use abm_data::{InputStore, SkimTable};
use abm_output::{person_output, OutputError, OutputWriter};

use crate::config::RunConfig;
use crate::scheduler::DaySimulator;
use crate::SimResult;

// ── RunSummary ────────────────────────────────────────────────────────────────

/// Per-run accounting: how many persons were processed, emitted, and
/// discarded, with a reason kind per discard.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub emitted:   usize,
    pub discarded: Vec<(PersonId, &'static str)>,
}

impl RunSummary {
    pub fn merge(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.emitted += other.emitted;
        self.discarded.extend(other.discarded);
    }

    /// Discards aggregated by reason kind, in first-seen order.
    pub fn discard_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for (_, kind) in &self.discarded {
            match counts.iter_mut().find(|(k, _)| k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}

// ── Shard processing ──────────────────────────────────────────────────────────

/// Process one shard of persons sequentially.
pub fn run_shard<S: InputStore, W: OutputWriter>(
    persons: &[PersonId],
    seed:    u64,
    repo:    &mut ModelRepository,
    store:   &S,
    skims:   &SkimTable,
    config:  &RunConfig,
    writer:  &mut W,
) -> SimResult<RunSummary> {
    let mut summary = RunSummary::default();
    let mut sim = DaySimulator::new(repo, store, skims, config);

    for &id in persons {
        summary.processed += 1;
        let started = Instant::now();
        let mut rng = PersonRng::new(seed, id);
        match sim.simulate_person(id, &mut rng) {
            Ok(person) => {
                writer.write_person(&person_output(&person))?;
                summary.emitted += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("person {id} discarded: {e}");
                summary.discarded.push((id, e.kind()));
            }
        }
        debug!("person {id} took {:?}", started.elapsed());
    }
    writer.finish()?;

    info!(
        "shard done: {} processed, {} emitted, {} discarded",
        summary.processed,
        summary.emitted,
        summary.discarded.len()
    );
    for (kind, count) in summary.discard_counts() {
        info!("  {count} discarded: {kind}");
    }
    Ok(summary)
}

/// Partition the population into contiguous shards and process each with an
/// independent worker.
///
/// `make_writer` opens one output sink per shard index.  With the
/// `parallel` feature, shards run on Rayon's thread pool; results are
/// identical either way because nothing is shared between workers.
pub fn run_population<S, W, F>(
    persons:     &[PersonId],
    repo:        &ModelRepository,
    store:       &S,
    skims:       &SkimTable,
    config:      &RunConfig,
    make_writer: F,
) -> SimResult<RunSummary>
where
    S: InputStore + Sync,
    W: OutputWriter,
    F: Fn(usize) -> Result<W, OutputError> + Sync,
{
    if persons.is_empty() {
        return Ok(RunSummary::default());
    }
    let shards = config.shards.clamp(1, persons.len());
    let chunk = persons.len().div_ceil(shards);

    #[cfg(not(feature = "parallel"))]
    {
        let mut total = RunSummary::default();
        for (i, slice) in persons.chunks(chunk).enumerate() {
            let mut repo = repo.clone();
            let mut writer = make_writer(i)?;
            let summary = run_shard(
                slice,
                shard_seed(config.seed, i as u64),
                &mut repo,
                store,
                skims,
                config,
                &mut writer,
            )?;
            total.merge(summary);
        }
        Ok(total)
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let results: Vec<SimResult<RunSummary>> = persons
            .par_chunks(chunk)
            .enumerate()
            .map(|(i, slice)| {
                let mut repo = repo.clone();
                let mut writer = make_writer(i)?;
                run_shard(
                    slice,
                    shard_seed(config.seed, i as u64),
                    &mut repo,
                    store,
                    skims,
                    config,
                    &mut writer,
                )
            })
            .collect();

        let mut total = RunSummary::default();
        for result in results {
            total.merge(result?);
        }
        Ok(total)
    }
}
