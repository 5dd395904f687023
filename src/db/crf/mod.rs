// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

pub mod trailer;
pub mod writer;

use crate::{
    checksum::Checksum,
    coding::Decode,
    db::TierStatus,
    CompressionType,
};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};
use trailer::{BlockIndex, Trailer};

/// Random-access reader over a compressed record file
///
/// `open` reads the trailer and memoizes the block index, so any block is
/// one seek plus one decompression away. The reader does no block caching
/// itself; the probe layers its window cache on top.
///
/// Readers are per-thread: the underlying file offset is part of the state.
pub struct CrfReader {
    path: PathBuf,
    file: File,
    trailer: Trailer,
    blocks: Vec<BlockLocation>,
}

#[derive(Copy, Clone, Debug)]
struct BlockLocation {
    file_offset: u64,
    compressed_len: u32,
    uncompressed_len: u32,
    checksum: Checksum,
}

impl CrfReader {
    /// Opens a record file and loads its block index.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        let trailer = Trailer::from_file(&mut file, path)?;
        let index = read_index(&mut file, &trailer)?;

        let mut blocks = Vec::with_capacity(index.0.len());
        let mut offset: u64 = 0;
        let mut uncompressed: u64 = 0;

        for handle in &index.0 {
            blocks.push(BlockLocation {
                file_offset: offset,
                compressed_len: handle.compressed_len,
                uncompressed_len: handle.uncompressed_len,
                checksum: handle.checksum,
            });
            offset += u64::from(handle.compressed_len);
            uncompressed += u64::from(handle.uncompressed_len);
        }

        if offset != trailer.index_offset || uncompressed != trailer.record_count * 2 {
            log::warn!("{path:?} has an inconsistent block index");
            return Err(crate::Error::InvalidHeader("CrfIndex"));
        }

        log::trace!(
            "opened record file {path:?}: {} records in {} blocks ({})",
            trailer.record_count,
            blocks.len(),
            trailer.compression,
        );

        Ok(Self {
            path: path.into(),
            file,
            trailer,
            blocks,
        })
    }

    /// Number of records in the uncompressed stream.
    #[must_use]
    pub const fn record_count(&self) -> u64 {
        self.trailer.record_count
    }

    /// Length of the uncompressed record stream in bytes.
    #[must_use]
    pub const fn uncompressed_len(&self) -> u64 {
        self.trailer.record_count * 2
    }

    /// Uncompressed block size the file was written with.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.trailer.block_size
    }

    /// Codec of the data blocks.
    #[must_use]
    pub const fn compression(&self) -> CompressionType {
        self.trailer.compression
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Index of the block covering an uncompressed byte offset.
    #[must_use]
    pub const fn block_containing(&self, byte_offset: u64) -> usize {
        (byte_offset / self.trailer.block_size as u64) as usize
    }

    /// The uncompressed byte range `[start, end)` covered by a block.
    #[must_use]
    pub fn block_span(&self, block: usize) -> (u64, u64) {
        let start = block as u64 * u64::from(self.trailer.block_size);
        let len = self
            .blocks
            .get(block)
            .map_or(0, |b| u64::from(b.uncompressed_len));
        (start, start + len)
    }

    fn read_block(&mut self, block: usize) -> crate::Result<Vec<u8>> {
        let location = *self
            .blocks
            .get(block)
            .ok_or(crate::Error::InvalidHeader("CrfIndex"))?;

        self.file.seek(SeekFrom::Start(location.file_offset))?;

        let mut compressed = vec![0; location.compressed_len as usize];
        self.file.read_exact(&mut compressed)?;

        let got = Checksum::from_bytes(&compressed);

        if got != location.checksum {
            log::error!("block {block} of {:?} failed its checksum", self.path);
            return Err(crate::Error::ChecksumMismatch {
                got,
                expected: location.checksum,
            });
        }

        self.trailer
            .compression
            .decompress(&compressed, location.uncompressed_len as usize)
    }

    /// Copies `out.len()` bytes of the uncompressed record stream starting
    /// at `byte_offset` into `out`.
    ///
    /// The range may span block boundaries; each required block is
    /// decompressed exactly once.
    pub fn read_range(&mut self, byte_offset: u64, out: &mut [u8]) -> crate::Result<()> {
        if out.is_empty() {
            return Ok(());
        }

        let end = byte_offset + out.len() as u64;

        if end > self.uncompressed_len() {
            return Err(crate::Error::InvalidHeader("CrfIndex"));
        }

        let first = self.block_containing(byte_offset);
        let last = self.block_containing(end - 1);
        let mut written = 0;

        for block in first..=last {
            let bytes = self.read_block(block)?;
            let (span_start, _) = self.block_span(block);

            let from = byte_offset.saturating_sub(span_start) as usize;
            let to = ((end - span_start) as usize).min(bytes.len());

            let slice = bytes
                .get(from..to)
                .ok_or(crate::Error::InvalidHeader("CrfIndex"))?;

            let target = out
                .get_mut(written..written + slice.len())
                .ok_or(crate::Error::InvalidHeader("CrfIndex"))?;
            target.copy_from_slice(slice);

            written += slice.len();
        }

        debug_assert_eq!(written, out.len());

        Ok(())
    }

    /// Reads the whole stream into a record array, one block at a time, so
    /// peak memory is the array plus a single block.
    ///
    /// Used by the worker to pull a child tier into memory; fails with
    /// `OutOfMemory` instead of aborting when the stream does not fit.
    pub fn read_records(&mut self) -> crate::Result<crate::record_array::RecordArray> {
        let array = crate::record_array::RecordArray::new(self.record_count())?;
        let mut position = 0;

        for block in 0..self.block_count() {
            let bytes = self.read_block(block)?;

            for pair in bytes.chunks_exact(2) {
                if let &[lo, hi] = pair {
                    array.set(
                        position,
                        crate::record::Record::from_packed(u16::from_le_bytes([lo, hi])),
                    );
                    position += 1;
                }
            }
        }

        Ok(array)
    }

    /// Reads the whole uncompressed record stream.
    pub fn read_all(&mut self) -> crate::Result<Vec<u8>> {
        let len = usize::try_from(self.uncompressed_len()).map_err(|_| crate::Error::OutOfMemory)?;

        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|_| crate::Error::OutOfMemory)?;
        out.resize(len, 0);

        self.read_range(0, &mut out)?;

        Ok(out)
    }
}

impl std::fmt::Debug for CrfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CrfReader({:?}, records={})",
            self.path, self.trailer.record_count,
        )
    }
}

fn read_index(file: &mut File, trailer: &Trailer) -> crate::Result<BlockIndex> {
    file.seek(SeekFrom::Start(trailer.index_offset))?;

    let mut bytes = vec![0; trailer.index_len as usize];
    file.read_exact(&mut bytes)?;

    let got = Checksum::from_bytes(&bytes);

    if got != trailer.index_checksum {
        return Err(crate::Error::ChecksumMismatch {
            got,
            expected: trailer.index_checksum,
        });
    }

    Ok(BlockIndex::decode_from(&mut &bytes[..])?)
}

/// Determines the state of a record file without fully opening it.
#[must_use]
pub fn status<P: AsRef<Path>>(path: P) -> TierStatus {
    let path = path.as_ref();

    match path.try_exists() {
        Ok(false) => return TierStatus::Missing,
        Ok(true) => {}
        Err(e) => {
            log::warn!("cannot stat {path:?}: {e}");
            return TierStatus::CheckError;
        }
    }

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("cannot open {path:?}: {e}");
            return TierStatus::CheckError;
        }
    };

    match file.metadata() {
        Ok(meta) if meta.len() < trailer::TRAILER_SIZE as u64 => {
            return TierStatus::Corrupted;
        }
        Ok(_) => {}
        Err(e) => {
            log::warn!("cannot stat {path:?}: {e}");
            return TierStatus::CheckError;
        }
    }

    match Trailer::from_file(&mut file, path).and_then(|trailer| read_index(&mut file, &trailer)) {
        Ok(_) => TierStatus::Solved,
        Err(crate::Error::Io(e)) => {
            log::warn!("I/O error while checking {path:?}: {e}");
            TierStatus::CheckError
        }
        Err(_) => TierStatus::Corrupted,
    }
}
