// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Compression algorithm used for record file blocks
///
/// Each block of the record stream is compressed independently, so a single
/// block can be restored without touching its neighbors. The codec also
/// selects the file extension of the record file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum CompressionType {
    /// No compression
    ///
    /// Only sensible for tiny tiers and tests.
    None,

    /// LZMA compression
    ///
    /// The default; record streams are highly repetitive, so this typically
    /// reaches an order-of-magnitude reduction.
    Lzma,

    /// LZ4 compression
    ///
    /// Trades compression ratio for faster block loads.
    #[cfg(feature = "lz4")]
    Lz4,
}

impl CompressionType {
    /// The file extension for record files written with this codec.
    #[must_use]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::None => "adb.raw",
            Self::Lzma => "adb.lzma",

            #[cfg(feature = "lz4")]
            Self::Lz4 => "adb.lz4",
        }
    }

    /// Compresses one block.
    pub fn compress(self, raw: &[u8]) -> crate::Result<Vec<u8>> {
        match self {
            Self::None => Ok(raw.to_vec()),

            Self::Lzma => {
                let mut out = Vec::with_capacity(raw.len() / 4);
                lzma_rs::lzma_compress(&mut &*raw, &mut out).map_err(crate::Error::Io)?;
                Ok(out)
            }

            #[cfg(feature = "lz4")]
            Self::Lz4 => Ok(lz4_flex::compress_prepend_size(raw)),
        }
    }

    /// Restores one block, checking the expected uncompressed length.
    pub fn decompress(self, block: &[u8], uncompressed_len: usize) -> crate::Result<Vec<u8>> {
        let out = match self {
            Self::None => block.to_vec(),

            Self::Lzma => {
                let mut out = Vec::with_capacity(uncompressed_len);
                lzma_rs::lzma_decompress(&mut &*block, &mut out)
                    .map_err(|_| crate::Error::Decompress(self))?;
                out
            }

            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::decompress_size_prepended(block)
                .map_err(|_| crate::Error::Decompress(self))?,
        };

        if out.len() != uncompressed_len {
            return Err(crate::Error::Decompress(self));
        }

        Ok(out)
    }
}

impl Encode for CompressionType {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Self::None => writer.write_u8(0)?,
            Self::Lzma => writer.write_u8(1)?,

            #[cfg(feature = "lz4")]
            Self::Lz4 => writer.write_u8(2)?,
        }

        Ok(())
    }
}

impl Decode for CompressionType {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Lzma),

            #[cfg(feature = "lz4")]
            2 => Ok(Self::Lz4),

            tag => Err(DecodeError::UnknownTag("CompressionType", tag)),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "no compression",
                Self::Lzma => "lzma",

                #[cfg(feature = "lz4")]
                Self::Lz4 => "lz4",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn compression_serialize_tag() {
        let serialized = CompressionType::Lzma.encode_into_vec();
        assert_eq!(1, serialized.len());
    }

    #[test]
    fn lzma_roundtrip() -> crate::Result<()> {
        let raw = b"ABCDEF".repeat(10_000);

        let compressed = CompressionType::Lzma.compress(&raw)?;
        assert!(compressed.len() < raw.len());

        let restored = CompressionType::Lzma.decompress(&compressed, raw.len())?;
        assert_eq!(raw, restored);

        Ok(())
    }

    #[test]
    fn lzma_is_deterministic() -> crate::Result<()> {
        let raw = b"record stream".repeat(5_000);

        assert_eq!(
            CompressionType::Lzma.compress(&raw)?,
            CompressionType::Lzma.compress(&raw)?,
        );

        Ok(())
    }

    #[test]
    fn decompress_rejects_wrong_length() -> crate::Result<()> {
        let raw = b"0123456789".repeat(100);
        let compressed = CompressionType::Lzma.compress(&raw)?;

        assert!(matches!(
            CompressionType::Lzma.decompress(&compressed, raw.len() + 1),
            Err(crate::Error::Decompress(CompressionType::Lzma)),
        ));

        Ok(())
    }

    #[cfg(feature = "lz4")]
    mod lz4 {
        use super::*;
        use test_log::test;

        #[test]
        fn lz4_roundtrip() -> crate::Result<()> {
            let raw = b"ABCDEF".repeat(10_000);

            let compressed = CompressionType::Lz4.compress(&raw)?;
            let restored = CompressionType::Lz4.decompress(&compressed, raw.len())?;
            assert_eq!(raw, restored);

            Ok(())
        }
    }
}
