// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Topological scheduling of canonical tiers.

use super::worker::{SolveOutcome, TierWorker};
use crate::{
    context::SolveContext,
    model::{Tier, TierPosition},
    stats::TierStats,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// What happened to each tier of a full-game solve
#[derive(Debug, Default)]
pub struct SolveReport {
    /// Tiers solved in this run
    pub solved: Vec<Tier>,

    /// Tiers whose record file already existed
    pub skipped: Vec<Tier>,

    /// Tiers that failed (memory or input errors); independent subgraphs
    /// continue
    pub failed: Vec<Tier>,

    /// Tiers never attempted because an ancestor failed
    pub blocked: Vec<Tier>,

    /// Counters accumulated over the tiers solved in this run
    pub totals: TierStats,
}

impl SolveReport {
    /// Whether every discovered tier ended up solved (or was already).
    #[must_use]
    pub fn all_solved(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum NodeState {
    Pending,
    Ready,
    Done,
    Failed,
}

struct TierNode {
    children: Vec<Tier>,
    parents: Vec<Tier>,
    pending_children: usize,
    remaining_parents: usize,
    state: NodeState,
}

/// The graph of canonical tiers, topologically consumed
///
/// Nodes are canonical tiers, edges the child relations of the game. A tier
/// becomes ready once all of its canonical children are done; cyclic graphs
/// are a contract violation (games are finite) and abort discovery.
pub(crate) struct TierGraph {
    nodes: FxHashMap<Tier, TierNode>,
    ready: VecDeque<Tier>,
}

impl TierGraph {
    /// Walks the tier graph from the initial tier, canonicalizing along the
    /// way; non-canonical tiers are never visited.
    pub fn discover(ctx: &SolveContext) -> crate::Result<Self> {
        let root = ctx.canonical_tier(ctx.game().initial_tier());

        let mut nodes: FxHashMap<Tier, TierNode> = FxHashMap::default();
        let mut queue = VecDeque::from([root]);

        while let Some(tier) = queue.pop_front() {
            if nodes.contains_key(&tier) {
                continue;
            }

            let children = ctx.canonical_child_tiers(tier);

            for &child in &children {
                queue.push_back(child);
            }

            nodes.insert(
                tier,
                TierNode {
                    pending_children: children.len(),
                    children,
                    parents: Vec::new(),
                    remaining_parents: 0,
                    state: NodeState::Pending,
                },
            );
        }

        // Wire up the parent lists
        let edges: Vec<(Tier, Tier)> = nodes
            .iter()
            .flat_map(|(&tier, node)| node.children.iter().map(move |&child| (tier, child)))
            .collect();

        for (parent, child) in edges {
            if let Some(node) = nodes.get_mut(&child) {
                node.parents.push(parent);
                node.remaining_parents += 1;
            }
        }

        let mut graph = Self {
            nodes,
            ready: VecDeque::new(),
        };

        graph.assert_acyclic()?;

        let mut leaves: Vec<Tier> = graph
            .nodes
            .iter()
            .filter(|(_, node)| node.pending_children == 0)
            .map(|(&tier, _)| tier)
            .collect();
        leaves.sort_unstable();

        for tier in leaves {
            graph.mark_ready(tier);
        }

        log::debug!(
            "discovered {} canonical tiers, {} initially ready",
            graph.nodes.len(),
            graph.ready.len(),
        );

        Ok(graph)
    }

    /// Kahn's algorithm over the child relation; leftovers mean a cycle.
    fn assert_acyclic(&self) -> crate::Result<()> {
        let mut pending: FxHashMap<Tier, usize> = self
            .nodes
            .iter()
            .map(|(&tier, node)| (tier, node.pending_children))
            .collect();

        let mut queue: VecDeque<Tier> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&tier, _)| tier)
            .collect();

        let mut visited = 0;

        while let Some(tier) = queue.pop_front() {
            visited += 1;

            if let Some(node) = self.nodes.get(&tier) {
                for &parent in &node.parents {
                    if let Some(count) = pending.get_mut(&parent) {
                        *count -= 1;

                        if *count == 0 {
                            queue.push_back(parent);
                        }
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            let cyclic = self
                .nodes
                .iter()
                .find(|(tier, _)| pending.get(tier).is_some_and(|&count| count > 0))
                .map_or(0, |(&tier, _)| tier);

            log::error!("tier graph has a cycle through tier {cyclic}");

            return Err(crate::Error::GameApi(
                TierPosition::new(cyclic, 0),
                "tier graph must be acyclic",
            ));
        }

        Ok(())
    }

    fn mark_ready(&mut self, tier: Tier) {
        if let Some(node) = self.nodes.get_mut(&tier) {
            if node.state == NodeState::Pending {
                node.state = NodeState::Ready;
                self.ready.push_back(tier);
            }
        }
    }

    /// The next ready tier, if any.
    pub fn pop_ready(&mut self) -> Option<Tier> {
        self.ready.pop_front()
    }

    /// Records the outcome of a dispatched tier.
    ///
    /// On success, parents with no further pending children become ready,
    /// and fully consumed children are reported as evictable. A failure is
    /// not propagated: the failed tier's ancestors simply never become
    /// ready.
    pub fn complete(&mut self, tier: Tier, success: bool) {
        let (parents, children) = {
            let Some(node) = self.nodes.get_mut(&tier) else {
                return;
            };

            node.state = if success { NodeState::Done } else { NodeState::Failed };
            (node.parents.clone(), node.children.clone())
        };

        if !success {
            return;
        }

        for parent in parents {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.pending_children -= 1;

                if node.pending_children == 0 {
                    self.mark_ready(parent);
                }
            }
        }

        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.remaining_parents -= 1;

                if node.remaining_parents == 0 {
                    log::debug!("tier {child} is no longer needed by any unsolved parent");
                }
            }
        }
    }

    /// Whether no tier remains ready or in flight.
    pub fn is_drained(&self) -> bool {
        self.ready.is_empty()
    }

    /// Tiers that never became ready (an ancestor failed), in stable order.
    pub fn blocked(&self) -> Vec<Tier> {
        let mut blocked: Vec<Tier> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.state == NodeState::Pending)
            .map(|(&tier, _)| tier)
            .collect();
        blocked.sort_unstable();
        blocked
    }

    /// All discovered canonical tiers.
    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.nodes.keys().copied()
    }
}

/// Topologically orders the canonical tiers and drives the worker over them
///
/// Tiers are dispatched one at a time (the database holds at most one
/// solving tier in memory); parallelism lives inside the worker. A tier that
/// fails on memory or unreadable inputs is recorded and independent
/// subgraphs continue; a game-API violation aborts the whole run.
pub struct TierManager<'a> {
    ctx: &'a SolveContext,
}

impl<'a> TierManager<'a> {
    /// Creates a manager borrowing the context.
    #[must_use]
    pub fn new(ctx: &'a SolveContext) -> Self {
        Self { ctx }
    }

    /// Solves every canonical tier reachable from the initial tier.
    pub fn solve_all(&self) -> crate::Result<SolveReport> {
        let mut graph = TierGraph::discover(self.ctx)?;
        let worker = TierWorker::new(self.ctx);
        let mut report = SolveReport::default();

        while let Some(tier) = graph.pop_ready() {
            match worker.solve(tier) {
                Ok(SolveOutcome::Fresh(stats)) => {
                    report.totals.absorb(&stats);
                    report.solved.push(tier);
                    graph.complete(tier, true);
                }

                Ok(SolveOutcome::Skipped) => {
                    report.skipped.push(tier);
                    graph.complete(tier, true);
                }

                Err(
                    e @ (crate::Error::OutOfMemory
                    | crate::Error::Io(_)
                    | crate::Error::Decompress(_)
                    | crate::Error::ChecksumMismatch { .. }
                    | crate::Error::InvalidHeader(_)),
                ) => {
                    log::error!("tier {tier} failed: {e}; continuing with independent tiers");
                    report.failed.push(tier);
                    graph.complete(tier, false);
                }

                // Contract violations, bad configuration and cancellation
                // abort the whole run
                Err(e) => return Err(e),
            }
        }

        debug_assert!(graph.is_drained());
        report.blocked = graph.blocked();

        if !report.all_solved() {
            log::warn!(
                "{} tiers failed, {} blocked behind them",
                report.failed.len(),
                report.blocked.len(),
            );
        }

        Ok(report)
    }
}
