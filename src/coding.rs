// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Why a structure could not be rebuilt from its on-disk form
///
/// Encoding has no counterpart to this: every structure here has a fixed
/// byte layout, so writing one can only fail when the underlying writer
/// does, and [`Encode`] surfaces that as plain I/O.
#[derive(Debug)]
pub enum DecodeError {
    /// The underlying reader failed
    Io(std::io::Error),

    /// A tag byte names no known variant (structure, tag)
    UnknownTag(&'static str, u8),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "decode failed: {e}"),
            Self::UnknownTag(structure, tag) => {
                write!(f, "unknown {structure} tag {tag}")
            }
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::UnknownTag(..) => None,
        }
    }
}

/// Fixed-layout on-disk serialization
pub trait Encode {
    /// Writes the on-disk form.
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    /// The on-disk form as a fresh buffer.
    #[must_use]
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        #[allow(clippy::expect_used)]
        self.encode_into(&mut bytes)
            .expect("writing to a vec cannot fail");

        bytes
    }
}

/// Fixed-layout on-disk deserialization
pub trait Decode {
    /// Rebuilds a value from its on-disk form.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn decode_error_reports_its_source() {
        let io = DecodeError::from(std::io::Error::other("short read"));
        assert!(std::error::Error::source(&io).is_some());

        let tag = DecodeError::UnknownTag("CompressionType", 9);
        assert!(std::error::Error::source(&tag).is_none());
        assert_eq!("unknown CompressionType tag 9", tag.to_string());
    }
}
