// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::model::{Position, Remoteness};
use std::{
    ops::Range,
    sync::{
        atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

/// Where a frontier entry was loaded from
///
/// Entries are stored as bare position indices; the source identifies the
/// tier they belong to, so their records can be looked up without widening
/// every entry to a tier-position pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// The tier currently being solved
    This,

    /// The n-th canonical child tier, in loading order
    Child(usize),
}

impl Source {
    const fn slot(self) -> usize {
        match self {
            Self::This => 0,
            Self::Child(i) => i + 1,
        }
    }

    const fn from_slot(slot: usize) -> Self {
        match slot {
            0 => Self::This,
            i => Self::Child(i - 1),
        }
    }
}

/// Queue of solved-but-not-yet-propagated positions, bucketed by remoteness
///
/// Loading happens in phases: primitives of the solving tier first, then each
/// child tier in turn, so each bucket is a concatenation of per-source
/// segments. The divider cells count per-source entries during loading;
/// [`Frontier::accumulate_dividers`] turns them into prefix-sum offsets
/// exactly once, after which only propagation pushes (source
/// [`Source::This`], appended past the loaded segments) are permitted.
///
/// `add` serializes per bucket and bumps the divider cell atomically, so the
/// loading scans can run position-parallel.
pub struct Frontier {
    buckets: Vec<Mutex<Vec<Position>>>,
    dividers: Vec<Box<[AtomicU64]>>,
    sources: usize,
    accumulated: AtomicBool,
    max_used: AtomicU16,
    total: AtomicU64,
}

impl Frontier {
    /// Creates an empty frontier for remotenesses `0..=max_remoteness` and
    /// `child_count` child tiers.
    #[must_use]
    pub fn new(max_remoteness: Remoteness, child_count: usize) -> Self {
        let levels = usize::from(max_remoteness) + 1;
        let sources = child_count + 1;

        Self {
            buckets: (0..levels).map(|_| Mutex::new(Vec::new())).collect(),
            dividers: (0..levels)
                .map(|_| (0..=sources).map(|_| AtomicU64::new(0)).collect())
                .collect(),
            sources,
            accumulated: AtomicBool::new(false),
            max_used: AtomicU16::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Number of source slots (children plus the this-tier slot).
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources
    }

    /// Appends a solved position to its remoteness bucket.
    ///
    /// Fails when the remoteness exceeds the configured maximum; the solve
    /// does not truncate.
    pub fn add(&self, position: Position, remoteness: Remoteness, source: Source) -> crate::Result<()> {
        let Some(bucket) = self.buckets.get(usize::from(remoteness)) else {
            return Err(crate::Error::Config("remoteness exceeds the configured maximum"));
        };

        debug_assert!(
            !self.accumulated.load(Ordering::Relaxed) || source == Source::This,
            "child-tier add after accumulate_dividers",
        );

        {
            #[allow(clippy::expect_used)]
            let mut bucket = bucket.lock().expect("lock is not poisoned");
            bucket.push(position);
        }

        if !self.accumulated.load(Ordering::Relaxed) {
            if let Some(row) = self.dividers.get(usize::from(remoteness)) {
                if let Some(cell) = row.get(source.slot() + 1) {
                    cell.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        self.max_used.fetch_max(remoteness, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Converts the per-source divider counts into prefix-sum offsets.
    ///
    /// Must be called exactly once, after all child-tier loading and before
    /// backward induction begins.
    pub fn accumulate_dividers(&mut self) {
        debug_assert!(
            !self.accumulated.load(Ordering::Relaxed),
            "dividers accumulated twice",
        );

        for row in &mut self.dividers {
            let mut running = 0;

            for cell in row.iter_mut() {
                running += *cell.get_mut();
                *cell.get_mut() = running;
            }
        }

        self.accumulated.store(true, Ordering::Release);
    }

    /// Locks a bucket for processing.
    #[must_use]
    #[allow(clippy::expect_used, clippy::indexing_slicing)]
    pub fn bucket(&self, remoteness: Remoteness) -> MutexGuard<'_, Vec<Position>> {
        self.buckets[usize::from(remoteness)]
            .lock()
            .expect("lock is not poisoned")
    }

    /// The per-source segments of a bucket, as index ranges into its
    /// position array.
    ///
    /// Only valid after [`Frontier::accumulate_dividers`]. Entries appended
    /// during propagation sit past the loaded segments and belong to
    /// [`Source::This`], so that source may yield two ranges.
    pub fn segments(&self, remoteness: Remoteness, bucket_len: usize) -> Vec<(Source, Range<usize>)> {
        debug_assert!(self.accumulated.load(Ordering::Acquire));

        let Some(row) = self.dividers.get(usize::from(remoteness)) else {
            return Vec::new();
        };

        let offset = |slot: usize| row.get(slot).map_or(0, |c| c.load(Ordering::Relaxed) as usize);

        let mut segments = Vec::with_capacity(self.sources + 1);

        for slot in 0..self.sources {
            let range = offset(slot)..offset(slot + 1);

            if !range.is_empty() {
                segments.push((Source::from_slot(slot), range));
            }
        }

        let tail = offset(self.sources)..bucket_len;

        if !tail.is_empty() {
            segments.push((Source::This, tail));
        }

        segments
    }

    /// Number of positions loaded into a bucket before accumulation, per the
    /// divider bookkeeping.
    #[must_use]
    pub fn loaded_len(&self, remoteness: Remoteness) -> u64 {
        self.dividers
            .get(usize::from(remoteness))
            .map_or(0, |row| {
                let last = row.last().map_or(0, |c| c.load(Ordering::Relaxed));
                let first = row.first().map_or(0, |c| c.load(Ordering::Relaxed));
                last - first
            })
    }

    /// Releases the storage of a fully processed bucket.
    pub fn free(&self, remoteness: Remoteness) {
        if let Some(bucket) = self.buckets.get(usize::from(remoteness)) {
            #[allow(clippy::expect_used)]
            let mut bucket = bucket.lock().expect("lock is not poisoned");
            *bucket = Vec::new();
        }
    }

    /// Highest remoteness any entry was added at.
    #[must_use]
    pub fn max_used(&self) -> Remoteness {
        self.max_used.load(Ordering::Relaxed)
    }

    /// Total number of entries ever added.
    #[must_use]
    pub fn total_added(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frontier(levels={}, sources={}, total={})",
            self.buckets.len(),
            self.sources,
            self.total_added(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn add_rejects_excess_remoteness() {
        let frontier = Frontier::new(3, 0);

        assert!(frontier.add(1, 3, Source::This).is_ok());
        assert!(matches!(
            frontier.add(1, 4, Source::This),
            Err(crate::Error::Config(_)),
        ));
    }

    #[test]
    fn dividers_count_loaded_positions() {
        let mut frontier = Frontier::new(8, 2);

        // this-tier primitives
        frontier.add(10, 0, Source::This).expect("in range");
        frontier.add(11, 0, Source::This).expect("in range");

        // child 0, then child 1
        frontier.add(20, 0, Source::Child(0)).expect("in range");
        frontier.add(21, 2, Source::Child(0)).expect("in range");
        frontier.add(30, 2, Source::Child(1)).expect("in range");

        frontier.accumulate_dividers();

        assert_eq!(3, frontier.loaded_len(0));
        assert_eq!(0, frontier.loaded_len(1));
        assert_eq!(2, frontier.loaded_len(2));
        assert_eq!(5, frontier.total_added());
    }

    #[test]
    fn segments_follow_loading_order() {
        let mut frontier = Frontier::new(8, 2);

        frontier.add(1, 0, Source::This).expect("in range");
        frontier.add(2, 0, Source::Child(0)).expect("in range");
        frontier.add(3, 0, Source::Child(0)).expect("in range");
        frontier.add(4, 0, Source::Child(1)).expect("in range");

        frontier.accumulate_dividers();

        // propagation pushes land past the loaded segments
        frontier.add(5, 0, Source::This).expect("in range");

        let len = frontier.bucket(0).len();
        let segments = frontier.segments(0, len);

        assert_eq!(
            vec![
                (Source::This, 0..1),
                (Source::Child(0), 1..3),
                (Source::Child(1), 3..4),
                (Source::This, 4..5),
            ],
            segments,
        );
    }

    #[test]
    fn free_releases_bucket() {
        let frontier = Frontier::new(2, 0);
        frontier.add(7, 1, Source::This).expect("in range");

        assert_eq!(1, frontier.bucket(1).len());
        frontier.free(1);
        assert_eq!(0, frontier.bucket(1).len());

        assert_eq!(1, frontier.max_used());
    }
}
