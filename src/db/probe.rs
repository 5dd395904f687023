// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    context::SolveContext,
    db::crf::CrfReader,
    model::{Remoteness, Tier, TierPosition, Value},
    record::Record,
};

/// Number of consecutive blocks loaded on a cache miss, to amortize
/// sequential probing
const BLOCKS_PER_BUFFER: usize = 2;

/// Cached, read-only cursor into the record files for post-solve queries
///
/// A probe holds at most one open record file and a window of its
/// uncompressed record stream. Queries canonicalize the tier-position first,
/// switch files when the canonical tier changes, and answer from the window
/// when the record is covered, otherwise the containing blocks are
/// decompressed into the window.
///
/// Probes are per-thread; the file handle and window are not synchronized.
///
/// The public accessors never fail: a probe error is answered with the
/// `undecided` / remoteness-0 sentinel and the cause is logged, as post-solve
/// queries must not take the caller down.
pub struct Probe {
    ctx: SolveContext,
    tier: Option<Tier>,
    reader: Option<CrfReader>,
    window_start: u64,
    window: Vec<u8>,
}

impl Probe {
    /// Creates an empty probe.
    #[must_use]
    pub fn new(ctx: &SolveContext) -> Self {
        Self {
            ctx: ctx.clone(),
            tier: None,
            reader: None,
            window_start: 0,
            window: Vec::new(),
        }
    }

    /// The value of a position, canonicalized transparently.
    pub fn value(&mut self, position: TierPosition) -> Value {
        match self.record(position) {
            Ok(record) => record.value(),
            Err(e) => {
                log::warn!("probe of {position} failed: {e}; answering undecided");
                Value::Undecided
            }
        }
    }

    /// The remoteness of a position, canonicalized transparently.
    pub fn remoteness(&mut self, position: TierPosition) -> Remoteness {
        match self.record(position) {
            Ok(record) => record.remoteness(),
            Err(e) => {
                log::warn!("probe of {position} failed: {e}; answering remoteness 0");
                0
            }
        }
    }

    /// The full record of a position, with errors propagated.
    pub fn record(&mut self, position: TierPosition) -> crate::Result<Record> {
        let canonical = self.ctx.canonicalize(position);

        if self.tier != Some(canonical.tier) {
            self.switch_tier(canonical.tier)?;
        }

        let reader = self
            .reader
            .as_mut()
            .ok_or(crate::Error::Config("probe has no open record file"))?;

        if canonical.position < 0 || canonical.position as u64 >= reader.record_count() {
            return Err(crate::Error::GameApi(
                canonical,
                "canonical position is outside its tier",
            ));
        }

        #[allow(clippy::cast_sign_loss)]
        let byte_offset = canonical.position as u64 * 2;

        if !self.covers(byte_offset) {
            self.load_window(byte_offset)?;
        }

        let at = (byte_offset - self.window_start) as usize;

        match self.window.get(at..at + 2) {
            Some(&[lo, hi]) => Ok(Record::from_packed(u16::from_le_bytes([lo, hi]))),
            _ => Err(crate::Error::Config("probe window underflow")),
        }
    }

    /// Drops the cached window and file handle.
    pub fn reset(&mut self) {
        self.tier = None;
        self.reader = None;
        self.window.clear();
        self.window_start = 0;
    }

    /// First position covered by the cached window, if any.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn window_start_position(&self) -> Option<TierPosition> {
        self.tier
            .filter(|_| !self.window.is_empty())
            .map(|tier| TierPosition::new(tier, (self.window_start / 2) as i64))
    }

    /// Number of records covered by the cached window.
    #[must_use]
    pub fn window_records(&self) -> u64 {
        (self.window.len() / 2) as u64
    }

    fn covers(&self, byte_offset: u64) -> bool {
        byte_offset >= self.window_start
            && byte_offset + 2 <= self.window_start + self.window.len() as u64
    }

    fn switch_tier(&mut self, tier: Tier) -> crate::Result<()> {
        // Close the previous handle before opening the next file
        self.reset();

        let name = self.ctx.tier_file_name(tier)?;
        let reader = self.ctx.db().open_tier(&name)?;

        log::trace!("probe switched to tier {tier} ({name})");

        self.reader = Some(reader);
        self.tier = Some(tier);

        Ok(())
    }

    fn load_window(&mut self, byte_offset: u64) -> crate::Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or(crate::Error::Config("probe has no open record file"))?;

        let first = reader.block_containing(byte_offset);
        let last = (first + BLOCKS_PER_BUFFER - 1).min(reader.block_count().saturating_sub(1));

        let (start, _) = reader.block_span(first);
        let (_, end) = reader.block_span(last);

        self.window.resize((end - start) as usize, 0);
        reader.read_range(start, &mut self.window)?;
        self.window_start = start;

        log::trace!(
            "probe window now covers bytes {start}..{end} of tier {:?}",
            self.tier,
        );

        Ok(())
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Probe(tier={:?}, window={}records)",
            self.tier,
            self.window_records(),
        )
    }
}
