// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{model::Position, record::Record};
use std::sync::atomic::{AtomicU16, Ordering};

/// The in-memory transposition table of the tier currently being solved
///
/// One packed [`Record`] per position, all starting out `undecided`. Cells
/// are updated concurrently during propagation through a 16-bit
/// compare-and-swap running the record comparator, so distinct positions
/// never contend and racing writers to the same position converge on the
/// dominant record.
pub struct RecordArray {
    cells: Box<[AtomicU16]>,
}

impl RecordArray {
    /// Allocates an all-`undecided` array for a tier of `len` positions.
    ///
    /// Fails with `OutOfMemory` instead of aborting, so the worker can fall
    /// back to a cheaper strategy.
    pub fn new(len: u64) -> crate::Result<Self> {
        let len = usize::try_from(len).map_err(|_| crate::Error::OutOfMemory)?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| crate::Error::OutOfMemory)?;
        cells.resize_with(len, || AtomicU16::new(0));

        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    /// Rebuilds an array from the little-endian packed stream of a record
    /// file.
    pub fn from_le_bytes(bytes: &[u8]) -> crate::Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(crate::Error::InvalidHeader("RecordArray"));
        }

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(bytes.len() / 2)
            .map_err(|_| crate::Error::OutOfMemory)?;

        for pair in bytes.chunks_exact(2) {
            if let &[lo, hi] = pair {
                let raw = u16::from_le_bytes([lo, hi]);
                cells.push(AtomicU16::new(Record::from_packed(raw).as_packed()));
            }
        }

        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    /// Number of positions.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cells.len() as u64
    }

    /// Whether the array covers zero positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads the record of a position.
    #[must_use]
    pub fn get(&self, position: Position) -> Record {
        self.cells
            .get(position as usize)
            .map_or(Record::UNDECIDED, |cell| {
                Record::from_packed(cell.load(Ordering::Acquire))
            })
    }

    /// Unconditionally stores a record.
    pub fn set(&self, position: Position, record: Record) {
        if let Some(cell) = self.cells.get(position as usize) {
            cell.store(record.as_packed(), Ordering::Release);
        }
    }

    /// Value-maximization update (the only comparison the induction uses)
    ///
    /// Stores `candidate` iff it strictly dominates the current cell, and
    /// returns the record the cell held beforehand so the caller can tell a
    /// fresh decision (`undecided` before) from a rejected or re-improved
    /// write.
    pub fn update_max(&self, position: Position, candidate: Record) -> Record {
        let Some(cell) = self.cells.get(position as usize) else {
            return Record::UNDECIDED;
        };

        let result = cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            if candidate.dominates(Record::from_packed(raw)) {
                Some(candidate.as_packed())
            } else {
                None
            }
        });

        match result {
            Ok(previous) | Err(previous) => Record::from_packed(previous),
        }
    }

    /// Serializes the array into the packed little-endian record stream.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cells.len() * 2);

        for cell in &self.cells {
            out.extend_from_slice(&cell.load(Ordering::Acquire).to_le_bytes());
        }

        out
    }
}

impl std::fmt::Debug for RecordArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordArray(len={})", self.cells.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use test_log::test;

    #[test]
    fn array_starts_undecided() -> crate::Result<()> {
        let array = RecordArray::new(10)?;

        assert_eq!(10, array.len());
        assert_eq!(Record::UNDECIDED, array.get(7));

        Ok(())
    }

    #[test]
    fn update_max_applies_comparator() -> crate::Result<()> {
        let array = RecordArray::new(4)?;

        // First win sticks
        let before = array.update_max(2, Record::new(Value::Win, 5));
        assert_eq!(Record::UNDECIDED, before);
        assert_eq!(Record::new(Value::Win, 5), array.get(2));

        // Slower win is rejected
        array.update_max(2, Record::new(Value::Win, 9));
        assert_eq!(Record::new(Value::Win, 5), array.get(2));

        // Faster win replaces
        array.update_max(2, Record::new(Value::Win, 3));
        assert_eq!(Record::new(Value::Win, 3), array.get(2));

        Ok(())
    }

    #[test]
    fn lose_updates_keep_maximum_remoteness() -> crate::Result<()> {
        let array = RecordArray::new(1)?;

        array.update_max(0, Record::new(Value::Lose, 4));
        array.update_max(0, Record::new(Value::Lose, 2));
        assert_eq!(Record::new(Value::Lose, 4), array.get(0));

        array.update_max(0, Record::new(Value::Lose, 6));
        assert_eq!(Record::new(Value::Lose, 6), array.get(0));

        Ok(())
    }

    #[test]
    fn byte_stream_roundtrip() -> crate::Result<()> {
        let array = RecordArray::new(3)?;
        array.set(0, Record::new(Value::Lose, 0));
        array.set(1, Record::new(Value::Win, 1));

        let bytes = array.to_le_bytes();
        assert_eq!(6, bytes.len());

        let restored = RecordArray::from_le_bytes(&bytes)?;
        assert_eq!(3, restored.len());

        for i in 0..3 {
            assert_eq!(array.get(i), restored.get(i));
        }

        Ok(())
    }

    #[test]
    fn record_byte_layout_is_little_endian() -> crate::Result<()> {
        let array = RecordArray::new(1)?;
        array.set(0, Record::new(Value::Win, 1));

        // win = 4 in the top 4 bits, remoteness 1 in the bottom 12
        assert_eq!(vec![0x01, 0x40], array.to_le_bytes());

        Ok(())
    }
}
