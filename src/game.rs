// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::model::{Move, Position, Tier, TierPosition, Value};

/// The game being solved
///
/// The solver core is game-agnostic; everything it knows about positions and
/// moves comes through this interface. Implementations must be cheap to call
/// and thread-safe, as the worker fans position enumeration out across
/// threads.
///
/// # Tiers
///
/// The position space must decompose into tiers such that every move stays in
/// the same tier or leads into a tier reachable through [`Game::child_tiers`].
/// The tier graph over canonical tiers must be acyclic; the manager aborts
/// the run otherwise.
///
/// # Optional capabilities
///
/// Symmetry and retrograde hooks are optional. Each has a `supports_*`
/// probe so the solver can commit to a strategy up front instead of
/// discovering a missing capability mid-solve. A capability that is reported
/// but answers inconsistently is a contract violation and surfaces as
/// [`Error::GameApi`](crate::Error::GameApi).
pub trait Game: Send + Sync {
    /// Short ASCII game name, used as a path component of the database tree.
    fn name(&self) -> &str;

    /// Variant identifier, used as a path component of the database tree.
    fn variant(&self) -> &str;

    /// The tier holding the initial position(s); tier discovery starts here.
    fn initial_tier(&self) -> Tier;

    /// Number of position slots in a tier (hash space size, not the count of
    /// legal positions).
    fn tier_size(&self, tier: Tier) -> Position;

    /// Tiers reachable from `tier` by a single move, not including `tier`
    /// itself.
    fn child_tiers(&self, tier: Tier) -> Vec<Tier>;

    /// Whether the position slot encodes a reachable, rules-valid position.
    fn is_legal(&self, position: TierPosition) -> bool;

    /// The terminal value of a position, or `Undecided` if play continues.
    fn primitive(&self, position: TierPosition) -> Value;

    /// Legal moves of a non-primitive position.
    fn generate_moves(&self, position: TierPosition) -> Vec<Move>;

    /// Applies a move.
    fn do_move(&self, position: TierPosition, mv: Move) -> TierPosition;

    /// Maps a position onto the representative of its symmetry class within
    /// its own tier. The identity map if the game has no position symmetry.
    fn canonical_position(&self, position: TierPosition) -> Position {
        position.position
    }

    /// Whether [`Game::canonical_parents`] is implemented natively.
    ///
    /// Without it, the worker builds a reverse graph (§retrograde) before
    /// induction, and the frontier-less strategy is unavailable.
    fn supports_canonical_parents(&self) -> bool {
        false
    }

    /// All canonical positions in `parent_tier` with a move onto the
    /// canonical position `child`.
    ///
    /// Only called when [`Game::supports_canonical_parents`] is true. The
    /// list may contain duplicates; the solver de-duplicates before counter
    /// updates.
    fn canonical_parents(&self, _child: TierPosition, _parent_tier: Tier) -> Vec<Position> {
        Vec::new()
    }

    /// Whether [`Game::canonical_children`] is implemented natively.
    fn supports_canonical_children(&self) -> bool {
        false
    }

    /// The distinct canonical children of a position.
    ///
    /// Only called when [`Game::supports_canonical_children`] is true.
    /// Without it, the solver enumerates moves, applies them and
    /// canonicalizes the results.
    fn canonical_children(&self, _position: TierPosition) -> Vec<TierPosition> {
        Vec::new()
    }

    /// Maps a tier onto the representative of its symmetry class. The
    /// identity map if the game has no tier symmetry.
    fn canonical_tier(&self, tier: Tier) -> Tier {
        tier
    }

    /// Re-indexes a position of `position.tier` into the symmetric tier
    /// `symmetric`. Used together with [`Game::canonical_tier`]; the
    /// identity map if the game has no tier symmetry.
    fn position_in_symmetric_tier(&self, position: TierPosition, _symmetric: Tier) -> Position {
        position.position
    }

    /// Human-readable tier name for file naming: ASCII, at most 63
    /// characters, no path separators.
    ///
    /// `None` falls back to the decimal tier id, which is stable across
    /// runs, so record files stay reusable.
    fn tier_name(&self, _tier: Tier) -> Option<String> {
        None
    }
}
