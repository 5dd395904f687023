// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::model::{Position, Tier, TierPosition};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Mutex;

/// Parent list of one canonical position; most positions have few parents
pub type ParentList = SmallVec<[Position; 2]>;

/// Parent adjacency for a tier and its canonical children
///
/// Built once per tier solve when the game has no native canonical-parent
/// enumeration: every legal non-primitive canonical position of the solving
/// tier is expanded forward and appended to the slots of its canonical
/// children, which may live in the solving tier itself or in any of its
/// canonical child tiers.
///
/// Slots are indexed by a per-tier base offset plus the position, with one
/// lock per slot so construction can run position-parallel. Reads are
/// destructive ([`ReverseGraph::pop_parents`]) to bound peak memory: once a
/// child's parents have been propagated, the list is dead weight.
pub struct ReverseGraph {
    offsets: FxHashMap<Tier, u64>,
    slots: Vec<Mutex<ParentList>>,
}

impl ReverseGraph {
    /// Allocates empty slots for the given `(tier, tier_size)` pairs.
    ///
    /// The solving tier occupies the trailing slot range by convention, but
    /// nothing depends on the ordering beyond the offsets map.
    pub fn new(tiers: &[(Tier, u64)]) -> crate::Result<Self> {
        let mut offsets = FxHashMap::default();
        let mut total: u64 = 0;

        for &(tier, size) in tiers {
            offsets.insert(tier, total);
            total = total
                .checked_add(size)
                .ok_or(crate::Error::Config("reverse graph exceeds address space"))?;
        }

        let total = usize::try_from(total).map_err(|_| crate::Error::OutOfMemory)?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(total)
            .map_err(|_| crate::Error::OutOfMemory)?;
        slots.resize_with(total, || Mutex::new(ParentList::new()));

        Ok(Self { offsets, slots })
    }

    /// Estimated construction cost in bytes for `total_positions` slots.
    #[must_use]
    pub const fn estimated_bytes(total_positions: u64) -> u64 {
        total_positions * (std::mem::size_of::<Mutex<ParentList>>() as u64)
    }

    /// Whether the graph covers a tier.
    #[must_use]
    pub fn covers(&self, tier: Tier) -> bool {
        self.offsets.contains_key(&tier)
    }

    fn slot(&self, child: TierPosition) -> Option<&Mutex<ParentList>> {
        let base = self.offsets.get(&child.tier)?;
        self.slots.get((base + child.position as u64) as usize)
    }

    /// Records `parent` (a position of the solving tier) as a parent of
    /// `child`.
    pub fn add_parent(&self, child: TierPosition, parent: Position) {
        if let Some(slot) = self.slot(child) {
            #[allow(clippy::expect_used)]
            slot.lock().expect("lock is not poisoned").push(parent);
        } else {
            log::warn!("reverse graph has no slot for {child}");
        }
    }

    /// Destructively reads the parent list of a child position.
    pub fn pop_parents(&self, child: TierPosition) -> ParentList {
        self.slot(child).map_or_else(ParentList::new, |slot| {
            #[allow(clippy::expect_used)]
            std::mem::take(&mut *slot.lock().expect("lock is not poisoned"))
        })
    }
}

impl std::fmt::Debug for ReverseGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ReverseGraph(tiers={}, slots={})",
            self.offsets.len(),
            self.slots.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn parents_accumulate_per_child() -> crate::Result<()> {
        let graph = ReverseGraph::new(&[(1, 4), (0, 8)])?;

        graph.add_parent(TierPosition::new(1, 2), 5);
        graph.add_parent(TierPosition::new(1, 2), 7);
        graph.add_parent(TierPosition::new(0, 3), 5);

        let mut parents = graph.pop_parents(TierPosition::new(1, 2));
        parents.sort_unstable();
        assert_eq!(&[5, 7], parents.as_slice());

        assert_eq!(&[5], graph.pop_parents(TierPosition::new(0, 3)).as_slice());

        Ok(())
    }

    #[test]
    fn pop_is_destructive() -> crate::Result<()> {
        let graph = ReverseGraph::new(&[(0, 2)])?;

        graph.add_parent(TierPosition::new(0, 0), 1);
        assert_eq!(1, graph.pop_parents(TierPosition::new(0, 0)).len());
        assert!(graph.pop_parents(TierPosition::new(0, 0)).is_empty());

        Ok(())
    }

    #[test]
    fn uncovered_tier_yields_no_parents() -> crate::Result<()> {
        let graph = ReverseGraph::new(&[(0, 2)])?;

        assert!(!graph.covers(9));
        assert!(graph.pop_parents(TierPosition::new(9, 0)).is_empty());

        Ok(())
    }
}
