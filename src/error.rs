// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{coding::DecodeError, model::TierPosition, Checksum, CompressionType};

/// Represents errors that can occur in the solver and its database
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Deserialization failed
    Decode(DecodeError),

    /// Decompression failed
    Decompress(CompressionType),

    /// Invalid checksum value (got, expected)
    ChecksumMismatch {
        /// Checksum computed from the data read
        got: Checksum,

        /// Checksum stored alongside the data
        expected: Checksum,
    },

    /// Invalid structure header (magic bytes mismatch)
    InvalidHeader(&'static str),

    /// An allocation did not fit into the configured memory limit
    OutOfMemory,

    /// The game broke its API contract (offending tier-position, detail)
    GameApi(TierPosition, &'static str),

    /// Invalid configuration or a numeric limit was exceeded
    Config(&'static str),

    /// The requested feature is disabled in this build or configuration
    Unsupported(&'static str),

    /// Cancellation was observed at a loop boundary
    Aborted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TierbaseError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Solver result
pub type Result<T> = std::result::Result<T, Error>;
