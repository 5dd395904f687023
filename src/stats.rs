// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{Decode, DecodeError, Encode},
    model::{Remoteness, Tier},
};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

/// Aggregated counters of one tier solve
///
/// Written next to the record files as the analysis sidecar and accumulated
/// into the per-run statistics blob a remote worker reports on termination.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TierStats {
    /// Tier these counters belong to (`0` in a cumulative blob)
    pub tier: Tier,

    /// Legal canonical positions seen
    pub legal: u64,

    /// Primitive positions among them
    pub primitive: u64,

    /// Positions solved to a win
    pub wins: u64,

    /// Positions solved to a loss
    pub loses: u64,

    /// Positions solved to a tie
    pub ties: u64,

    /// Positions left drawing
    pub draws: u64,

    /// Largest remoteness assigned
    pub max_remoteness: Remoteness,

    /// Frontier entries processed
    pub frontier_entries: u64,

    /// Wall-clock solve time in milliseconds
    pub elapsed_ms: u64,
}

impl TierStats {
    /// Folds another tier's counters into a cumulative blob.
    pub fn absorb(&mut self, other: &Self) {
        self.tier = 0;
        self.legal += other.legal;
        self.primitive += other.primitive;
        self.wins += other.wins;
        self.loses += other.loses;
        self.ties += other.ties;
        self.draws += other.draws;
        self.max_remoteness = self.max_remoteness.max(other.max_remoteness);
        self.frontier_entries += other.frontier_entries;
        self.elapsed_ms += other.elapsed_ms;
    }

    /// Positions solved to any decisive value.
    #[must_use]
    pub const fn decided(&self) -> u64 {
        self.wins + self.loses + self.ties
    }
}

impl std::fmt::Display for TierStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "legal={} primitive={} win={} lose={} tie={} draw={} max_remoteness={} in {}ms",
            self.legal,
            self.primitive,
            self.wins,
            self.loses,
            self.ties,
            self.draws,
            self.max_remoteness,
            self.elapsed_ms,
        )
    }
}

impl Encode for TierStats {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i64::<LE>(self.tier)?;
        writer.write_u64::<LE>(self.legal)?;
        writer.write_u64::<LE>(self.primitive)?;
        writer.write_u64::<LE>(self.wins)?;
        writer.write_u64::<LE>(self.loses)?;
        writer.write_u64::<LE>(self.ties)?;
        writer.write_u64::<LE>(self.draws)?;
        writer.write_u16::<LE>(self.max_remoteness)?;
        writer.write_u64::<LE>(self.frontier_entries)?;
        writer.write_u64::<LE>(self.elapsed_ms)?;
        Ok(())
    }
}

impl Decode for TierStats {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(Self {
            tier: reader.read_i64::<LE>()?,
            legal: reader.read_u64::<LE>()?,
            primitive: reader.read_u64::<LE>()?,
            wins: reader.read_u64::<LE>()?,
            loses: reader.read_u64::<LE>()?,
            ties: reader.read_u64::<LE>()?,
            draws: reader.read_u64::<LE>()?,
            max_remoteness: reader.read_u16::<LE>()?,
            frontier_entries: reader.read_u64::<LE>()?,
            elapsed_ms: reader.read_u64::<LE>()?,
        })
    }
}
