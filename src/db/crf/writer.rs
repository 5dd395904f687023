// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::trailer::{BlockHandle, BlockIndex, Trailer};
use crate::{checksum::Checksum, coding::Encode, file::persist_atomic, CompressionType};
use std::{
    io::{BufWriter, Write},
    path::Path,
};

/// Writes a new record file from the packed record stream of a solved tier.
///
/// The stream is split into `block_size` slices (the last one may be short),
/// each compressed independently, followed by the block index and trailer.
/// The file is staged in a temp file next to the target and atomically
/// renamed into place, so a failed write leaves nothing behind.
pub fn create<P: AsRef<Path>>(
    path: P,
    records: &[u8],
    compression: CompressionType,
    block_size: u32,
) -> crate::Result<()> {
    let path = path.as_ref();

    if block_size == 0 || block_size % 2 != 0 {
        return Err(crate::Error::Config(
            "block size must be a positive multiple of the record size",
        ));
    }

    debug_assert_eq!(records.len() % 2, 0, "odd record stream length");

    let folder = path.parent().ok_or(crate::Error::Config(
        "record file path has no parent directory",
    ))?;

    let start = std::time::Instant::now();

    let temp = tempfile::NamedTempFile::new_in(folder)?;

    let mut index = BlockIndex(Vec::with_capacity(
        records.len().div_ceil(block_size as usize),
    ));
    let mut data_len: u64 = 0;

    {
        let mut writer = BufWriter::new(temp.as_file());

        for chunk in records.chunks(block_size as usize) {
            let block = compression.compress(chunk)?;

            writer.write_all(&block)?;

            // NOTE: Truncation is OK: a compressed block is never larger than
            // one block plus codec framing
            #[allow(clippy::cast_possible_truncation)]
            index.0.push(BlockHandle {
                compressed_len: block.len() as u32,
                uncompressed_len: chunk.len() as u32,
                checksum: Checksum::from_bytes(&block),
            });

            data_len += block.len() as u64;
        }

        let index_bytes = index.encode_into_vec();

        writer.write_all(&index_bytes)?;

        // NOTE: Truncation is OK because of the block count limit
        #[allow(clippy::cast_possible_truncation)]
        let trailer = Trailer {
            compression,
            block_size,
            record_count: (records.len() / 2) as u64,
            index_offset: data_len,
            index_len: index_bytes.len() as u32,
            index_checksum: Checksum::from_bytes(&index_bytes),
        };

        trailer.write_into(&mut writer)?;
        writer.flush()?;
    }

    persist_atomic(temp, path)?;

    log::debug!(
        "wrote record file {path:?}: {} records, {} blocks, {}B -> {}B in {:?}",
        records.len() / 2,
        index.0.len(),
        records.len(),
        data_len,
        start.elapsed(),
    );

    Ok(())
}
