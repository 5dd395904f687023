// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    db::Database,
    game::Game,
    model::{Position, Tier, TierPosition, MAX_CHILD_COUNT, MAX_TIER_SIZE},
    stop_signal::StopSignal,
    SolveOptions,
};
use smallvec::SmallVec;
use std::sync::Arc;

/// Children of one position; inline capacity covers typical branching
pub type ChildList = SmallVec<[TierPosition; 8]>;

/// Everything a solve needs, passed explicitly through manager, worker and
/// probe
///
/// Bundles the game, the database, the validated options and the
/// cancellation signal. Symmetry options are applied here: when a symmetry
/// is disabled, the corresponding game hook is bypassed and the identity
/// map is used, so the rest of the solver never branches on configuration.
///
/// Cloning is cheap and shares the game and database.
#[derive(Clone)]
pub struct SolveContext {
    game: Arc<dyn Game>,
    options: SolveOptions,
    db: Database,
    signal: StopSignal,
    memlimit: u64,
}

impl SolveContext {
    /// Validates the options and opens the database folder.
    pub fn new(game: Arc<dyn Game>, options: SolveOptions) -> crate::Result<Self> {
        options.validate()?;

        for component in [game.name(), game.variant()] {
            if component.is_empty()
                || !component.is_ascii()
                || component.contains(['/', '\\'])
            {
                return Err(crate::Error::Config(
                    "game name and variant must be non-empty ASCII without separators",
                ));
            }
        }

        let db = Database::open(
            &options.data_root,
            game.name(),
            game.variant(),
            &options.db_name,
            options.compression,
            options.block_size,
        )?;

        let memlimit = options.resolved_memlimit();

        log::debug!(
            "solve context for {}/{}: memlimit={}B, threads={}",
            game.name(),
            game.variant(),
            memlimit,
            options.threads,
        );

        Ok(Self {
            game,
            options,
            db,
            signal: StopSignal::default(),
            memlimit,
        })
    }

    /// The game being solved.
    #[must_use]
    pub fn game(&self) -> &dyn Game {
        &*self.game
    }

    /// The solver options.
    #[must_use]
    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// The database of this game and variant.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The cancellation signal shared with the caller.
    #[must_use]
    pub fn signal(&self) -> &StopSignal {
        &self.signal
    }

    /// The effective per-tier memory budget in bytes.
    #[must_use]
    pub const fn memlimit(&self) -> u64 {
        self.memlimit
    }

    /// Maps a tier to its canonical representative (identity when tier
    /// symmetry is disabled).
    #[must_use]
    pub fn canonical_tier(&self, tier: Tier) -> Tier {
        if self.options.tier_symmetry {
            self.game.canonical_tier(tier)
        } else {
            tier
        }
    }

    /// Maps a position to its canonical representative within its tier
    /// (identity when position symmetry is disabled).
    #[must_use]
    pub fn canonical_position(&self, position: TierPosition) -> Position {
        if self.options.position_symmetry {
            self.game.canonical_position(position)
        } else {
            position.position
        }
    }

    /// Fully canonicalizes a tier-position: tier-canonical map, then
    /// position-in-symmetric-tier, then canonical-position map, in that
    /// order.
    #[must_use]
    pub fn canonicalize(&self, position: TierPosition) -> TierPosition {
        let tier = self.canonical_tier(position.tier);

        let position = if tier == position.tier {
            position
        } else {
            TierPosition::new(
                tier,
                self.game.position_in_symmetric_tier(position, tier),
            )
        };

        TierPosition::new(tier, self.canonical_position(position))
    }

    /// The canonical child tiers of a canonical tier, de-duplicated and
    /// without the tier itself.
    #[must_use]
    pub fn canonical_child_tiers(&self, tier: Tier) -> Vec<Tier> {
        let mut children: Vec<Tier> = self
            .game
            .child_tiers(tier)
            .into_iter()
            .map(|child| self.canonical_tier(child))
            .filter(|&child| child != tier)
            .collect();

        children.sort_unstable();
        children.dedup();
        children
    }

    /// The size of a tier, validated against the supported maximum.
    #[allow(clippy::cast_sign_loss)]
    pub fn tier_size(&self, tier: Tier) -> crate::Result<u64> {
        let size = self.game.tier_size(tier);

        if !(0..=MAX_TIER_SIZE).contains(&size) {
            return Err(crate::Error::Config("tier size exceeds the supported maximum"));
        }

        Ok(size as u64)
    }

    /// The distinct canonical children of a canonical position.
    ///
    /// Uses the game's native enumeration when available, otherwise expands
    /// moves and canonicalizes the successors. Every successor is checked
    /// for legality; an illegal one is a contract violation of the game.
    pub fn distinct_children(&self, position: TierPosition) -> crate::Result<ChildList> {
        let mut children: ChildList = if self.game.supports_canonical_children() {
            self.game.canonical_children(position).into_iter().collect()
        } else {
            let moves = self.game.generate_moves(position);
            let mut children = ChildList::with_capacity(moves.len());

            for mv in moves {
                let child = self.game.do_move(position, mv);

                if !self.game.is_legal(child) {
                    log::error!("game API violation: {position} -> {child} is illegal");
                    return Err(crate::Error::GameApi(child, "do_move returned an illegal position"));
                }

                children.push(self.canonicalize(child));
            }

            children
        };

        children.sort_unstable();
        children.dedup();

        if children.len() > MAX_CHILD_COUNT {
            return Err(crate::Error::Config("position exceeds the child-count limit"));
        }

        Ok(children)
    }

    /// The de-duplicated native canonical parents of `child` within
    /// `parent_tier`.
    ///
    /// Must only be called when the game supports native parent
    /// enumeration.
    #[must_use]
    pub fn native_parents(&self, child: TierPosition, parent_tier: Tier) -> SmallVec<[Position; 4]> {
        debug_assert!(self.game.supports_canonical_parents());

        let mut parents: SmallVec<[Position; 4]> = self
            .game
            .canonical_parents(child, parent_tier)
            .into_iter()
            .collect();

        parents.sort_unstable();
        parents.dedup();
        parents
    }

    /// The file-name stem of a tier: the game-supplied name, or the decimal
    /// tier id (stable across runs).
    pub fn tier_file_name(&self, tier: Tier) -> crate::Result<String> {
        let Some(name) = self.game.tier_name(tier) else {
            return Ok(tier.to_string());
        };

        if name.is_empty()
            || name.len() > 63
            || !name.is_ascii()
            || name.contains(['/', '\\'])
        {
            return Err(crate::Error::Config(
                "tier name must be ASCII, at most 63 chars, without separators",
            ));
        }

        Ok(name)
    }

    /// Runs a closure inside the configured thread pool (or the global one
    /// when no thread count was set).
    pub fn run_parallel<T: Send>(&self, f: impl FnOnce() -> T + Send) -> crate::Result<T> {
        if self.options.threads == 0 {
            return Ok(f());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|_| crate::Error::Config("cannot build worker thread pool"))?;

        Ok(pool.install(f))
    }
}

impl std::fmt::Debug for SolveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolveContext(game={}/{}, memlimit={})",
            self.game.name(),
            self.game.variant(),
            self.memlimit,
        )
    }
}
