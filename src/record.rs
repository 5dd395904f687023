// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::model::{Remoteness, Value, MAX_REMOTENESS};

const REMOTENESS_BITS: u16 = 12;
const REMOTENESS_MASK: u16 = (1 << REMOTENESS_BITS) - 1;

/// A solved position's value and remoteness, packed into 16 bits
///
/// Layout:
///
/// ```text
/// 15       12 11                    0
/// ┌──────────┬───────────────────────┐
/// │  value   │      remoteness       │
/// └──────────┴───────────────────────┘
/// ```
///
/// Remoteness is only meaningful for `Win`, `Lose` and `Tie`; `Draw` and
/// `Undecided` records store 0 there.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Record(u16);

impl Record {
    /// The all-zero record, meaning "not yet solved"
    pub const UNDECIDED: Self = Self(0);

    /// Packs a value and remoteness.
    ///
    /// Remotenesses beyond [`MAX_REMOTENESS`] are rejected by the solver
    /// before they reach this constructor.
    #[must_use]
    pub fn new(value: Value, remoteness: Remoteness) -> Self {
        debug_assert!(remoteness <= MAX_REMOTENESS, "remoteness out of range");

        let remoteness = if value.has_remoteness() {
            remoteness & REMOTENESS_MASK
        } else {
            0
        };

        Self(((value as u16) << REMOTENESS_BITS) | remoteness)
    }

    /// Reconstructs a record from its packed form.
    ///
    /// An unknown value tag decodes as [`Value::Undecided`], which is what a
    /// probe reports for corrupt cells.
    #[must_use]
    pub fn from_packed(raw: u16) -> Self {
        match Value::try_from((raw >> REMOTENESS_BITS) as u8) {
            Ok(_) => Self(raw),
            Err(_) => Self::UNDECIDED,
        }
    }

    /// The packed 16-bit form.
    #[must_use]
    pub const fn as_packed(self) -> u16 {
        self.0
    }

    /// The stored value.
    #[must_use]
    pub fn value(self) -> Value {
        // Unknown tags are rejected in from_packed
        Value::try_from((self.0 >> REMOTENESS_BITS) as u8).unwrap_or(Value::Undecided)
    }

    /// The stored remoteness.
    #[must_use]
    pub const fn remoteness(self) -> Remoteness {
        self.0 & REMOTENESS_MASK
    }

    /// Whether the record holds a decided value.
    #[must_use]
    pub fn is_decided(self) -> bool {
        self.value().is_decided()
    }

    /// Whether `self` strictly dominates `other` under the induction order
    ///
    /// ```text
    /// lose(r)  <  draw  ≈  undecided  <  tie(r)  <  win(r)
    /// ```
    ///
    /// with ties within a value class broken by: among wins, smaller
    /// remoteness; among loses and ties, larger remoteness. `Draw` and
    /// `Undecided` never dominate each other. This is the full contract of
    /// the value-maximization update; the solver performs no other record
    /// comparison.
    #[must_use]
    pub fn dominates(self, other: Self) -> bool {
        let (a, b) = (self.rank(), other.rank());

        if a != b {
            return a > b;
        }

        match self.value() {
            Value::Win => self.remoteness() < other.remoteness(),
            Value::Lose | Value::Tie => self.remoteness() > other.remoteness(),
            Value::Draw | Value::Undecided => false,
        }
    }

    const fn rank(self) -> u8 {
        match (self.0 >> REMOTENESS_BITS) as u8 {
            1 => 0,          // lose
            0 | 2 => 1,      // undecided, draw
            3 => 2,          // tie
            _ => 3,          // win
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value().has_remoteness() {
            write!(f, "{} in {}", self.value(), self.remoteness())
        } else {
            write!(f, "{}", self.value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn record_packs_value_and_remoteness() {
        let r = Record::new(Value::Win, 17);
        assert_eq!(Value::Win, r.value());
        assert_eq!(17, r.remoteness());
        assert_eq!(r, Record::from_packed(r.as_packed()));
    }

    #[test]
    fn draw_record_has_zero_remoteness() {
        let r = Record::new(Value::Draw, 99);
        assert_eq!(Value::Draw, r.value());
        assert_eq!(0, r.remoteness());
    }

    #[test]
    fn undecided_is_all_zero() {
        assert_eq!(0, Record::UNDECIDED.as_packed());
        assert_eq!(Value::Undecided, Record::UNDECIDED.value());
    }

    #[test]
    fn corrupt_value_tag_decodes_as_undecided() {
        let raw = (7 << 12) | 5;
        assert_eq!(Record::UNDECIDED, Record::from_packed(raw));
    }

    #[test]
    fn value_classes_are_ordered() {
        let lose = Record::new(Value::Lose, 3);
        let draw = Record::new(Value::Draw, 0);
        let tie = Record::new(Value::Tie, 3);
        let win = Record::new(Value::Win, 900);

        assert!(draw.dominates(lose));
        assert!(tie.dominates(draw));
        assert!(win.dominates(tie));
        assert!(win.dominates(Record::UNDECIDED));

        assert!(!lose.dominates(draw));
        assert!(!draw.dominates(tie));
        assert!(!tie.dominates(win));
    }

    #[test]
    fn wins_prefer_smaller_remoteness() {
        let fast = Record::new(Value::Win, 2);
        let slow = Record::new(Value::Win, 9);

        assert!(fast.dominates(slow));
        assert!(!slow.dominates(fast));
        assert!(!fast.dominates(fast));
    }

    #[test]
    fn loses_and_ties_prefer_larger_remoteness() {
        for value in [Value::Lose, Value::Tie] {
            let early = Record::new(value, 2);
            let late = Record::new(value, 9);

            assert!(late.dominates(early));
            assert!(!early.dominates(late));
            assert!(!late.dominates(late));
        }
    }

    #[test]
    fn draw_and_undecided_never_dominate_each_other() {
        let draw = Record::new(Value::Draw, 0);

        assert!(!draw.dominates(Record::UNDECIDED));
        assert!(!Record::UNDECIDED.dominates(draw));
    }
}
