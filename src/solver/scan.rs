// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The frontier-less induction strategy.
//!
//! Trades time for memory: instead of queueing solved positions, each
//! remoteness level rescans the transposition table and the loaded child
//! arrays for records settled at exactly that level and propagates them with
//! the same rules as percolation, which is why the two strategies produce
//! identical records. Requires native canonical-parent enumeration, as no
//! reverse graph is built.

use super::worker::SolveCore;
use crate::{frontier::Source, model::Remoteness, record_array::RecordArray, stats::TierStats};
use rayon::prelude::*;
use std::sync::atomic::Ordering;

const POLL_CHUNK: usize = 4_096;

pub(crate) fn solve(core: &SolveCore<'_>) -> crate::Result<TierStats> {
    core.init_positions(None, None)?;

    // Child records are fixed, so their contribution to the level bound is
    // known up front; the solving tier's bound grows as records are written
    let child_bound = core.child_max_remoteness();
    let mut processed: u64 = 0;
    let mut remoteness = 0;

    loop {
        core.ctx.signal().check()?;

        processed += scan_level(core, &core.records, Source::This, remoteness)?;

        for (i, child) in core.children.iter().enumerate() {
            processed += scan_level(core, &child.records, Source::Child(i), remoteness)?;
        }

        let bound = core.max_written.load(Ordering::Acquire).max(child_bound);

        if remoteness >= bound {
            break;
        }

        remoteness += 1;
    }

    core.finalize_draws()?;

    log::trace!("tier {}: rescanning processed {processed} settled records", core.tier);

    Ok(core.base_stats(processed))
}

/// Rediscovers the records of one source settled at exactly `remoteness` and
/// propagates them.
#[allow(clippy::cast_possible_wrap)]
fn scan_level(
    core: &SolveCore<'_>,
    records: &RecordArray,
    source: Source,
    remoteness: Remoteness,
) -> crate::Result<u64> {
    (0..records.len() as usize)
        .into_par_iter()
        .chunks(POLL_CHUNK)
        .map(|chunk| {
            core.ctx.signal().check()?;

            let mut hits = 0;

            for position in chunk {
                let position = position as i64;
                let record = records.get(position);

                if record.value().has_remoteness() && record.remoteness() == remoteness {
                    core.propagate(position, source, remoteness, None, None)?;
                    hits += 1;
                }
            }

            Ok(hits)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))
}
