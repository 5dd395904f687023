// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Frontier percolation, the preferred induction strategy.
//!
//! Keeps the whole transposition table in memory together with an explicit
//! frontier of solved-but-unpropagated positions. Remoteness levels are
//! processed in strict ascending order; within a level, entries are
//! propagated in parallel and the record comparator makes the write order
//! irrelevant.

use super::worker::SolveCore;
use crate::{
    frontier::{Frontier, Source},
    model::{Tier, MAX_REMOTENESS},
    reverse_graph::ReverseGraph,
    stats::TierStats,
};
use rayon::prelude::*;

const POLL_CHUNK: usize = 4_096;

pub(crate) fn solve(core: &SolveCore<'_>, build_reverse_graph: bool) -> crate::Result<TierStats> {
    let mut frontier = Frontier::new(MAX_REMOTENESS, core.children.len());

    let reverse_graph = if build_reverse_graph {
        let mut tiers: Vec<(Tier, u64)> = core
            .children
            .iter()
            .map(|child| (child.tier, child.records.len()))
            .collect();
        tiers.push((core.tier, core.size));

        Some(ReverseGraph::new(&tiers)?)
    } else {
        None
    };

    // Phase 1a: primitives, counters and (if needed) reverse-graph edges
    core.init_positions(Some(&frontier), reverse_graph.as_ref())?;

    // Phase 1b: load decided child records, one child at a time so every
    // bucket stays a concatenation of per-source segments
    for (i, child) in core.children.iter().enumerate() {
        core.ctx.signal().check()?;

        (0..child.records.len() as usize)
            .into_par_iter()
            .chunks(POLL_CHUNK)
            .try_for_each(|chunk| {
                core.ctx.signal().check()?;

                #[allow(clippy::cast_possible_wrap)]
                for position in chunk {
                    let position = position as i64;
                    let record = child.records.get(position);

                    // Undecided cells are illegal or non-canonical slots;
                    // draws have nothing to propagate
                    if record.value().has_remoteness() {
                        frontier.add(position, record.remoteness(), Source::Child(i))?;
                    }
                }

                Ok::<(), crate::Error>(())
            })?;
    }

    frontier.accumulate_dividers();

    log::trace!(
        "tier {}: frontier loaded with {} entries up to remoteness {}",
        core.tier,
        frontier.total_added(),
        frontier.max_used(),
    );

    // Phase 2: percolate levels in ascending order; processing level r only
    // ever pushes into level r + 1, so each bucket is complete when reached
    let mut remoteness = 0;

    while remoteness <= frontier.max_used() {
        core.ctx.signal().check()?;

        {
            let bucket = frontier.bucket(remoteness);
            let segments = frontier.segments(remoteness, bucket.len());

            for (source, range) in segments {
                let entries = bucket.get(range).unwrap_or(&[]);

                entries.par_chunks(POLL_CHUNK).try_for_each(|chunk| {
                    core.ctx.signal().check()?;

                    for &position in chunk {
                        core.propagate(
                            position,
                            source,
                            remoteness,
                            reverse_graph.as_ref(),
                            Some(&frontier),
                        )?;
                    }

                    Ok::<(), crate::Error>(())
                })?;
            }
        }

        frontier.free(remoteness);

        if remoteness == MAX_REMOTENESS {
            break;
        }

        remoteness += 1;
    }

    // Phase 3: whatever never settled is drawing
    core.finalize_draws()?;

    Ok(core.base_stats(frontier.total_added()))
}
