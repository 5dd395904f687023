// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Tier identifier
///
/// A tier is a partition of the position space such that every move stays in
/// the same tier or goes to a "later" one.
pub type Tier = i64;

/// Position index within a tier
pub type Position = i64;

/// Opaque move identifier, interpreted only by the game
pub type Move = i64;

/// Distance-to-end of a solved position, in plies
pub type Remoteness = u16;

/// Largest storable remoteness (12-bit record field)
pub const MAX_REMOTENESS: Remoteness = 1023;

/// Largest supported tier size
pub const MAX_TIER_SIZE: i64 = 1 << 62;

/// Largest supported number of distinct canonical children per position
pub const MAX_CHILD_COUNT: usize = 32_767;

/// A position qualified by the tier it lives in
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TierPosition {
    /// Tier the position belongs to
    pub tier: Tier,

    /// Position index inside that tier
    pub position: Position,
}

impl TierPosition {
    /// Creates a tier-qualified position.
    #[must_use]
    pub const fn new(tier: Tier, position: Position) -> Self {
        Self { tier, position }
    }
}

impl std::fmt::Display for TierPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tier, self.position)
    }
}

/// Game-theoretic value of a position, from the perspective of the player
/// whose turn it is
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Value {
    /// Not (yet) solved; also the probe's error sentinel
    #[default]
    Undecided = 0,

    /// The mover loses under optimal play
    Lose = 1,

    /// Optimal play never reaches a terminal position
    Draw = 2,

    /// Optimal play ends in a tie
    Tie = 3,

    /// The mover wins under optimal play
    Win = 4,
}

impl Value {
    /// Whether this value terminates a position (as opposed to `Undecided`).
    #[must_use]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Undecided)
    }

    /// Whether a remoteness is meaningful for this value.
    ///
    /// `Draw` and `Undecided` records carry remoteness 0 by convention.
    #[must_use]
    pub const fn has_remoteness(self) -> bool {
        matches!(self, Self::Win | Self::Lose | Self::Tie)
    }
}

impl TryFrom<u8> for Value {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            0 => Ok(Self::Undecided),
            1 => Ok(Self::Lose),
            2 => Ok(Self::Draw),
            3 => Ok(Self::Tie),
            4 => Ok(Self::Win),
            tag => Err(tag),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Undecided => "undecided",
                Self::Lose => "lose",
                Self::Draw => "draw",
                Self::Tie => "tie",
                Self::Win => "win",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn value_tag_roundtrip() {
        for v in [Value::Undecided, Value::Lose, Value::Draw, Value::Tie, Value::Win] {
            assert_eq!(Ok(v), Value::try_from(v as u8));
        }
        assert_eq!(Err(5), Value::try_from(5));
    }

    #[test]
    fn tier_position_display() {
        assert_eq!("3:1415", TierPosition::new(3, 1415).to_string());
    }
}
