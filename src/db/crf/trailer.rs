// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    checksum::Checksum,
    coding::{Decode, DecodeError, Encode},
    file::MAGIC_BYTES,
    CompressionType,
};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::{
    io::{Read, Seek, Write},
    path::Path,
};

pub const TRAILER_SIZE: usize = 48;

/// Index entry describing one compressed block
///
/// Blocks are laid out back to back from file offset 0, so the byte offset
/// of a block is the running sum of the compressed lengths before it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockHandle {
    /// On-disk (compressed) size of the block
    pub compressed_len: u32,

    /// Size of the block after decompression
    pub uncompressed_len: u32,

    /// Checksum of the compressed bytes
    pub checksum: Checksum,
}

impl Encode for BlockHandle {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LE>(self.compressed_len)?;
        writer.write_u32::<LE>(self.uncompressed_len)?;
        writer.write_u64::<LE>(*self.checksum)?;
        Ok(())
    }
}

impl Decode for BlockHandle {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(Self {
            compressed_len: reader.read_u32::<LE>()?,
            uncompressed_len: reader.read_u32::<LE>()?,
            checksum: Checksum::from_raw(reader.read_u64::<LE>()?),
        })
    }
}

/// The block index of a record file, stored between the data blocks and the
/// trailer
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockIndex(pub Vec<BlockHandle>);

impl Encode for BlockIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        // NOTE: Truncation is OK because a file cannot contain 4 billion blocks
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<LE>(self.0.len() as u32)?;

        for handle in &self.0 {
            handle.encode_into(writer)?;
        }

        Ok(())
    }
}

impl Decode for BlockIndex {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<LE>()? as usize;

        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            handles.push(BlockHandle::decode_from(reader)?);
        }

        Ok(Self(handles))
    }
}

/// Fixed-size footer of a record file
///
/// ----------------
/// | data blocks  | <- implicitly start at 0
/// |--------------|
/// | block index  |
/// |--------------|
/// |   trailer    | <- fixed size
/// |--------------|
///
/// The trailer is the entry point for random access: it locates and
/// checksums the block index ("backward size"), from which any block can be
/// found and decompressed independently.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Trailer {
    /// Codec of the data blocks
    pub compression: CompressionType,

    /// Uncompressed size of each non-final block; a multiple of the 2-byte
    /// record size
    pub block_size: u32,

    /// Number of 16-bit records in the uncompressed stream
    pub record_count: u64,

    /// File offset of the block index
    pub index_offset: u64,

    /// Byte length of the block index
    pub index_len: u32,

    /// Checksum of the encoded block index
    pub index_checksum: Checksum,
}

impl Trailer {
    pub fn write_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let mut v = Vec::with_capacity(TRAILER_SIZE);

        v.write_all(&MAGIC_BYTES)?;
        self.encode_into(&mut v)?;

        // Pad with remaining bytes
        v.resize(TRAILER_SIZE, 0);

        debug_assert_eq!(v.len(), TRAILER_SIZE, "record file trailer has invalid size");

        writer.write_all(&v)?;

        Ok(())
    }

    pub fn from_file<R: Read + Seek>(reader: &mut R, path: &Path) -> crate::Result<Self> {
        reader.seek(std::io::SeekFrom::End(-(TRAILER_SIZE as i64)))?;

        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            log::warn!("{path:?} is not a record file (bad magic)");
            return Err(crate::Error::InvalidHeader("CrfTrailer"));
        }

        let trailer = Self::decode_from(reader)?;

        if trailer.block_size == 0 || trailer.block_size % 2 != 0 {
            return Err(crate::Error::InvalidHeader("CrfTrailer"));
        }

        Ok(trailer)
    }
}

impl Encode for Trailer {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.compression.encode_into(writer)?;
        writer.write_all(&[0; 3])?;
        writer.write_u32::<LE>(self.block_size)?;
        writer.write_u64::<LE>(self.record_count)?;
        writer.write_u64::<LE>(self.index_offset)?;
        writer.write_u32::<LE>(self.index_len)?;
        writer.write_u64::<LE>(*self.index_checksum)?;
        Ok(())
    }
}

impl Decode for Trailer {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let compression = CompressionType::decode_from(reader)?;

        let mut pad = [0u8; 3];
        reader.read_exact(&mut pad)?;

        Ok(Self {
            compression,
            block_size: reader.read_u32::<LE>()?,
            record_count: reader.read_u64::<LE>()?,
            index_offset: reader.read_u64::<LE>()?,
            index_len: reader.read_u32::<LE>()?,
            index_checksum: Checksum::from_raw(reader.read_u64::<LE>()?),
        })
    }
}
