// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Solving a single tier by backward induction.

use crate::{
    context::SolveContext,
    db::TierStatus,
    frontier::{Frontier, Source},
    model::{Position, Remoteness, Tier, TierPosition, Value, MAX_REMOTENESS},
    record::Record,
    record_array::RecordArray,
    reverse_graph::{ParentList, ReverseGraph},
    stats::TierStats,
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering},
    Arc,
};

/// Positions processed between two cancellation checks
const POLL_CHUNK: usize = 4_096;

/// Outcome of handing a tier to the worker
#[derive(Debug)]
pub enum SolveOutcome {
    /// The tier was solved and flushed; counters describe the solve
    Fresh(TierStats),

    /// A valid record file already existed and `force` was off
    Skipped,
}

/// How a single tier is driven to its fixed point
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Strategy {
    /// In-memory transposition table plus an explicit frontier; builds a
    /// reverse graph when the game has no native parent enumeration
    Percolation {
        /// Whether a reverse graph must be built
        reverse_graph: bool,
    },

    /// No frontier: rediscovers newly settled positions by rescanning the
    /// table at each remoteness level; requires native canonical parents
    Scan,
}

/// Solves one canonical tier, with all canonical children already on disk
///
/// Both strategies produce identical records for every legal position; the
/// choice is purely a memory trade-off.
pub struct TierWorker<'a> {
    ctx: &'a SolveContext,
}

impl<'a> TierWorker<'a> {
    /// Creates a worker borrowing the context.
    #[must_use]
    pub fn new(ctx: &'a SolveContext) -> Self {
        Self { ctx }
    }

    /// Solves a canonical tier and flushes it to a record file.
    pub fn solve(&self, tier: Tier) -> crate::Result<SolveOutcome> {
        let ctx = self.ctx;
        let name = ctx.tier_file_name(tier)?;

        match ctx.db().tier_status(&name) {
            TierStatus::Solved if !ctx.options().force => {
                log::debug!("tier {tier} ({name}) already solved, skipping");
                return Ok(SolveOutcome::Skipped);
            }
            TierStatus::Solved | TierStatus::Missing => {}
            TierStatus::Corrupted => {
                log::warn!("tier {tier} ({name}) has a corrupt record file, re-solving");
                crate::file::quarantine(&ctx.db().tier_path(&name))?;
            }
            TierStatus::CheckError => {
                return Err(crate::Error::Io(std::io::Error::other(
                    "cannot determine tier status",
                )));
            }
        }

        let start = std::time::Instant::now();
        let size = ctx.tier_size(tier)?;
        let child_tiers = ctx.canonical_child_tiers(tier);

        let mut child_sizes = Vec::with_capacity(child_tiers.len());
        for &child in &child_tiers {
            child_sizes.push(ctx.tier_size(child)?);
        }

        let strategy = self.select_strategy(size, &child_sizes)?;

        if ctx.options().verbose >= 1 {
            log::info!(
                "solving tier {tier} ({name}): {size} positions, {} children, {strategy:?}",
                child_tiers.len(),
            );
        }

        let result = self.solve_with(tier, &name, size, &child_tiers, strategy);

        // A failed or aborted solve must not leave the tier in memory
        if result.is_err() {
            ctx.db().free_solving_tier();
        }

        let mut stats = result?;

        // NOTE: Truncation is OK, nothing solves for 585 million years
        #[allow(clippy::cast_possible_truncation)]
        {
            stats.elapsed_ms = start.elapsed().as_millis() as u64;
        }

        if ctx.options().verbose >= 1 {
            log::info!("tier {tier} ({name}) solved: {stats}");
        }

        write_sidecar(ctx, &name, &stats)?;

        Ok(SolveOutcome::Fresh(stats))
    }

    fn solve_with(
        &self,
        tier: Tier,
        name: &str,
        size: u64,
        child_tiers: &[Tier],
        strategy: Strategy,
    ) -> crate::Result<TierStats> {
        let ctx = self.ctx;

        let mut children = Vec::with_capacity(child_tiers.len());
        for &child in child_tiers {
            let child_name = ctx.tier_file_name(child)?;
            let mut reader = ctx.db().open_tier(&child_name)?;
            let records = reader.read_records()?;

            log::trace!("loaded child tier {child} ({child_name}): {} records", records.len());

            children.push(ChildTier {
                tier: child,
                records,
            });
        }

        let records = ctx.db().create_solving_tier(tier, name, size)?;
        let counters = ChildCounters::new(size)?;

        let core = SolveCore {
            ctx,
            tier,
            size,
            children,
            records,
            counters,
            max_written: AtomicU16::new(0),
            legal: AtomicU64::new(0),
            primitive: AtomicU64::new(0),
        };

        let mut stats = ctx.run_parallel(|| match strategy {
            Strategy::Percolation { reverse_graph } => {
                super::percolation::solve(&core, reverse_graph)
            }
            Strategy::Scan => super::scan::solve(&core),
        })??;

        stats.tier = tier;
        core.fill_value_counts(&mut stats);

        ctx.db().flush_solving_tier()?;
        ctx.db().free_solving_tier();

        Ok(stats)
    }

    /// Picks the cheapest strategy fitting the memory budget, preferring
    /// frontier percolation.
    fn select_strategy(&self, size: u64, child_sizes: &[u64]) -> crate::Result<Strategy> {
        let ctx = self.ctx;
        let memlimit = ctx.memlimit();

        let native_parents = ctx.game().supports_canonical_parents();
        let reverse_graph = !native_parents;

        if reverse_graph && !ctx.options().use_retrograde {
            return Err(crate::Error::Unsupported(
                "game has no canonical-parent enumeration and retrograde graphs are disabled",
            ));
        }

        let child_total: u64 = child_sizes.iter().sum();

        // records + counters, plus the loaded child arrays
        let base = 6 * size + 2 * child_total;

        let percolation = base
            + 8 * (size + child_total)
            + if reverse_graph {
                ReverseGraph::estimated_bytes(size + child_total)
            } else {
                0
            };

        if ctx.options().verbose >= 2 {
            log::debug!(
                "strategy estimate: percolation={percolation}B, scan={base}B, limit={memlimit}B",
            );
        }

        if percolation <= memlimit {
            return Ok(Strategy::Percolation { reverse_graph });
        }

        if native_parents && base <= memlimit {
            log::info!(
                "frontier percolation needs {percolation}B of {memlimit}B, falling back to rescanning",
            );
            return Ok(Strategy::Scan);
        }

        Err(crate::Error::OutOfMemory)
    }
}

pub(crate) struct ChildTier {
    pub tier: Tier,
    pub records: RecordArray,
}

/// Per-position undecided-children counter, one atomic word each
///
/// Low 16 bits count distinct canonical children not yet propagated as win
/// or tie; bit 30 records that at least one tie child was seen; bit 31 marks
/// the position as counted (legal, non-primitive, canonical). Sharing one
/// word makes the flag visible to whichever thread performs the zeroing
/// decrement.
pub(crate) struct ChildCounters {
    cells: Box<[AtomicU32]>,
}

const COUNT_MASK: u32 = 0xFFFF;
const TIE_SEEN: u32 = 1 << 30;
const COUNTED: u32 = 1 << 31;

/// What a counter decrement observed
pub(crate) enum Decrement {
    /// The position is not counted, or other children are still pending
    Pending,

    /// This decrement zeroed the counter
    Zero {
        /// A tie child was propagated into this position at some point
        tie_seen: bool,
    },
}

impl ChildCounters {
    fn new(len: u64) -> crate::Result<Self> {
        let len = usize::try_from(len).map_err(|_| crate::Error::OutOfMemory)?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| crate::Error::OutOfMemory)?;
        cells.resize_with(len, || AtomicU32::new(0));

        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    fn seed(&self, position: Position, children: usize) {
        debug_assert!(children > 0 && children <= COUNT_MASK as usize);

        if let Some(cell) = self.cells.get(position as usize) {
            cell.store(COUNTED | children as u32, Ordering::Release);
        }
    }

    /// Whether the position participates in the induction.
    pub fn is_counted(&self, position: Position) -> bool {
        self.cells
            .get(position as usize)
            .is_some_and(|cell| cell.load(Ordering::Acquire) & COUNTED != 0)
    }

    /// Remaining undecided children of a counted position.
    pub fn remaining(&self, position: Position) -> u32 {
        self.cells
            .get(position as usize)
            .map_or(0, |cell| cell.load(Ordering::Acquire) & COUNT_MASK)
    }

    fn mark_tie(&self, position: Position) {
        if let Some(cell) = self.cells.get(position as usize) {
            cell.fetch_or(TIE_SEEN, Ordering::AcqRel);
        }
    }

    fn decrement(&self, position: Position) -> Decrement {
        let Some(cell) = self.cells.get(position as usize) else {
            return Decrement::Pending;
        };

        let result = cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            if word & COUNTED == 0 || word & COUNT_MASK == 0 {
                None
            } else {
                Some(word - 1)
            }
        });

        match result {
            Ok(previous) if previous & COUNT_MASK == 1 => Decrement::Zero {
                tie_seen: previous & TIE_SEEN != 0,
            },
            _ => Decrement::Pending,
        }
    }
}

/// Shared state of one tier solve, used by both strategies
pub(crate) struct SolveCore<'a> {
    pub ctx: &'a SolveContext,
    pub tier: Tier,
    pub size: u64,
    pub children: Vec<ChildTier>,
    pub records: Arc<RecordArray>,
    pub counters: ChildCounters,
    pub max_written: AtomicU16,
    pub legal: AtomicU64,
    pub primitive: AtomicU64,
}

impl SolveCore<'_> {
    /// Phase 1: seeds primitive records and child counters for every legal
    /// canonical position, optionally feeding the frontier and the reverse
    /// graph.
    #[allow(clippy::cast_possible_wrap)]
    pub fn init_positions(
        &self,
        frontier: Option<&Frontier>,
        reverse_graph: Option<&ReverseGraph>,
    ) -> crate::Result<()> {
        (0..self.size as usize)
            .into_par_iter()
            .chunks(POLL_CHUNK)
            .try_for_each(|chunk| {
                self.ctx.signal().check()?;

                for position in chunk {
                    self.init_position(position as i64, frontier, reverse_graph)?;
                }

                Ok(())
            })
    }

    fn init_position(
        &self,
        position: Position,
        frontier: Option<&Frontier>,
        reverse_graph: Option<&ReverseGraph>,
    ) -> crate::Result<()> {
        let game = self.ctx.game();
        let tp = TierPosition::new(self.tier, position);

        if !game.is_legal(tp) || self.ctx.canonical_position(tp) != position {
            return Ok(());
        }

        self.legal.fetch_add(1, Ordering::Relaxed);

        let value = game.primitive(tp);

        if value.is_decided() {
            if value == Value::Draw {
                log::error!("game API violation: primitive value of {tp} is draw");
                return Err(crate::Error::GameApi(tp, "primitive positions cannot draw"));
            }

            self.primitive.fetch_add(1, Ordering::Relaxed);
            self.records.set(position, Record::new(value, 0));

            if let Some(frontier) = frontier {
                frontier.add(position, 0, Source::This)?;
            }

            return Ok(());
        }

        let children = self.ctx.distinct_children(tp)?;

        if children.is_empty() {
            log::error!("game API violation: non-primitive {tp} has no moves");
            return Err(crate::Error::GameApi(tp, "non-primitive position has no children"));
        }

        self.counters.seed(position, children.len());

        if let Some(graph) = reverse_graph {
            for child in children {
                graph.add_parent(child, position);
            }
        }

        Ok(())
    }

    /// The solved record of a frontier entry, looked up in its source tier.
    pub fn entry_record(&self, position: Position, source: Source) -> Record {
        match source {
            Source::This => self.records.get(position),
            Source::Child(i) => self
                .children
                .get(i)
                .map_or(Record::UNDECIDED, |child| child.records.get(position)),
        }
    }

    /// The tier a frontier source refers to.
    pub fn source_tier(&self, source: Source) -> Tier {
        match source {
            Source::This => self.tier,
            Source::Child(i) => self.children.get(i).map_or(self.tier, |child| child.tier),
        }
    }

    /// Enumerates the parents (within the solving tier) of a solved child.
    pub fn parents_of(
        &self,
        child: TierPosition,
        reverse_graph: Option<&ReverseGraph>,
    ) -> ParentList {
        match reverse_graph {
            Some(graph) => graph.pop_parents(child),
            None => self
                .ctx
                .native_parents(child, self.tier)
                .into_iter()
                .collect(),
        }
    }

    /// Propagates one solved position into its parents.
    ///
    /// `remoteness` is the entry's own remoteness (its frontier bucket).
    /// Returns the parents newly decided at `remoteness + 1` so the caller
    /// can push them.
    pub fn propagate(
        &self,
        position: Position,
        source: Source,
        remoteness: Remoteness,
        reverse_graph: Option<&ReverseGraph>,
        frontier: Option<&Frontier>,
    ) -> crate::Result<()> {
        let record = self.entry_record(position, source);
        let value = record.value();

        if !value.has_remoteness() {
            return Ok(());
        }

        debug_assert_eq!(remoteness, record.remoteness());

        let child = TierPosition::new(self.source_tier(source), position);
        let parents = self.parents_of(child, reverse_graph);

        if parents.is_empty() {
            return Ok(());
        }

        if remoteness >= MAX_REMOTENESS {
            return Err(crate::Error::Config("remoteness exceeds the configured maximum"));
        }

        let next = remoteness + 1;

        for &parent in &parents {
            let decided = match value {
                Value::Lose => self.claim_win(parent, next),
                Value::Win => self.settle_counter(parent, next, false),
                Value::Tie => {
                    self.counters.mark_tie(parent);
                    self.settle_counter(parent, next, true)
                }
                Value::Draw | Value::Undecided => None,
            };

            if let Some(record) = decided {
                self.max_written.fetch_max(record.remoteness(), Ordering::Relaxed);

                if let Some(frontier) = frontier {
                    frontier.add(parent, record.remoteness(), Source::This)?;
                }
            }
        }

        Ok(())
    }

    /// A lose child means the parent's mover can force a win in `remoteness`
    /// moves; only the first (smallest-remoteness) win sticks.
    fn claim_win(&self, parent: Position, remoteness: Remoteness) -> Option<Record> {
        if !self.counters.is_counted(parent) {
            return None;
        }

        let candidate = Record::new(Value::Win, remoteness);
        let previous = self.records.update_max(parent, candidate);

        (!previous.is_decided()).then_some(candidate)
    }

    /// A win or tie child consumes one slot of the parent's counter; the
    /// zeroing decrement decides the parent as lose (all children winning)
    /// or tie (a tie child was seen), delayed as long as possible.
    fn settle_counter(
        &self,
        parent: Position,
        remoteness: Remoteness,
        via_tie: bool,
    ) -> Option<Record> {
        let Decrement::Zero { tie_seen } = self.counters.decrement(parent) else {
            return None;
        };

        if tie_seen && !via_tie {
            // Both a tie and a lose outcome fire on the same zero trigger;
            // keep the legacy resolution (tie) and leave a trace for the
            // test-suite sentinel
            log::debug!(
                "position {}:{parent} zeroed its counter on a win child after a tie child",
                self.tier,
            );
        }

        let value = if tie_seen { Value::Tie } else { Value::Lose };
        let candidate = Record::new(value, remoteness);
        let previous = self.records.update_max(parent, candidate);

        (!previous.is_decided()).then_some(candidate)
    }

    /// Final sweep: positions never settled to a decisive value are draws;
    /// a counted position whose counter reached zero without a record is
    /// re-derived from its children directly.
    #[allow(clippy::cast_possible_wrap)]
    pub fn finalize_draws(&self) -> crate::Result<()> {
        (0..self.size as usize)
            .into_par_iter()
            .chunks(POLL_CHUNK)
            .try_for_each(|chunk| {
                self.ctx.signal().check()?;

                for position in chunk {
                    let position = position as i64;
                    if self.records.get(position).is_decided()
                        || !self.counters.is_counted(position)
                    {
                        continue;
                    }

                    if self.counters.remaining(position) > 0 {
                        self.records.set(position, Record::new(Value::Draw, 0));
                    } else {
                        self.rederive(position)?;
                    }
                }

                Ok(())
            })
    }

    /// Recomputes a residual counter-zero position from its children.
    fn rederive(&self, position: Position) -> crate::Result<()> {
        let tp = TierPosition::new(self.tier, position);
        log::warn!("re-deriving residual position {tp} from its children");

        let mut saw_tie = false;
        let mut max_remoteness = 0;

        for child in self.ctx.distinct_children(tp)? {
            let record = if child.tier == self.tier {
                self.records.get(child.position)
            } else {
                self.children
                    .iter()
                    .find(|c| c.tier == child.tier)
                    .map_or(Record::UNDECIDED, |c| c.records.get(child.position))
            };

            match record.value() {
                Value::Win => max_remoteness = max_remoteness.max(record.remoteness()),
                Value::Tie => {
                    saw_tie = true;
                    max_remoteness = max_remoteness.max(record.remoteness());
                }
                _ => {
                    return Err(crate::Error::GameApi(
                        tp,
                        "counter reached zero with a non-win/tie child",
                    ));
                }
            }
        }

        let value = if saw_tie { Value::Tie } else { Value::Lose };
        self.records.set(position, Record::new(value, max_remoteness + 1));
        self.max_written.fetch_max(max_remoteness + 1, Ordering::Relaxed);

        Ok(())
    }

    /// Largest remoteness of any decided record in a child tier.
    #[allow(clippy::cast_possible_wrap)]
    pub fn child_max_remoteness(&self) -> Remoteness {
        self.children
            .iter()
            .map(|child| {
                let bound = (0..child.records.len() as i64)
                    .into_par_iter()
                    .map(|q| {
                        let record = child.records.get(q);
                        if record.value().has_remoteness() {
                            record.remoteness()
                        } else {
                            0
                        }
                    })
                    .max();

                bound.unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    }

    /// Assembles the base statistics of a finished induction.
    pub fn base_stats(&self, frontier_entries: u64) -> TierStats {
        TierStats {
            tier: self.tier,
            legal: self.legal.load(Ordering::Relaxed),
            primitive: self.primitive.load(Ordering::Relaxed),
            max_remoteness: self.max_written.load(Ordering::Relaxed),
            frontier_entries,
            ..Default::default()
        }
    }

    /// Counts final values across the record array.
    #[allow(clippy::cast_possible_wrap)]
    pub fn fill_value_counts(&self, stats: &mut TierStats) {
        let (wins, loses, ties, draws) = (0..self.size as i64)
            .into_par_iter()
            .fold(
                || (0u64, 0u64, 0u64, 0u64),
                |(w, l, t, d), position| match self.records.get(position).value() {
                    Value::Win => (w + 1, l, t, d),
                    Value::Lose => (w, l + 1, t, d),
                    Value::Tie => (w, l, t + 1, d),
                    Value::Draw => (w, l, t, d + 1),
                    Value::Undecided => (w, l, t, d),
                },
            )
            .reduce(
                || (0, 0, 0, 0),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
            );

        stats.wins = wins;
        stats.loses = loses;
        stats.ties = ties;
        stats.draws = draws;
    }
}

/// Writes the per-tier statistics blob into the sidecar tree.
fn write_sidecar(ctx: &SolveContext, name: &str, stats: &TierStats) -> crate::Result<()> {
    use crate::coding::Encode;

    let folder = ctx.db().folder().join("analysis");
    std::fs::create_dir_all(&folder)?;

    let path = folder.join(format!("{name}.stats"));
    std::fs::write(&path, stats.encode_into_vec())?;

    log::trace!("wrote sidecar {path:?}");

    Ok(())
}
