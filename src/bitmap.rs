// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::model::Position;
use std::{
    io::{Read, Write},
    path::Path,
};

/// One bit per position of a tier, used by the analysis collaborator to mark
/// discovered (reachable) positions
///
/// On-disk form: `ceil(len / 8)` bytes, little-endian bit order within each
/// byte, so position `8k + i` is bit `i` of byte `k`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryBitmap {
    bytes: Vec<u8>,
    len: u64,
}

impl DiscoveryBitmap {
    /// Creates an all-zero bitmap for a tier of `len` positions.
    #[must_use]
    pub fn new(len: u64) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8) as usize],
            len,
        }
    }

    /// Number of positions covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Whether the bitmap covers zero positions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Marks a position as discovered.
    pub fn set(&mut self, position: Position) {
        debug_assert!((position as u64) < self.len);

        if let Some(byte) = self.bytes.get_mut((position / 8) as usize) {
            *byte |= 1 << (position % 8);
        }
    }

    /// Whether a position is marked.
    #[must_use]
    pub fn get(&self, position: Position) -> bool {
        self.bytes
            .get((position / 8) as usize)
            .is_some_and(|byte| byte & (1 << (position % 8)) != 0)
    }

    /// Number of marked positions.
    #[must_use]
    pub fn count_ones(&self) -> u64 {
        self.bytes.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    /// Writes the raw bitmap.
    pub fn write_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    /// Writes the bitmap to a file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.write_into(&mut file)?;
        file.sync_all()?;
        Ok(())
    }

    /// Reads a bitmap covering `len` positions.
    pub fn read_from<R: Read>(reader: &mut R, len: u64) -> crate::Result<Self> {
        let mut bytes = vec![0; len.div_ceil(8) as usize];
        reader.read_exact(&mut bytes)?;
        Ok(Self { bytes, len })
    }
}
