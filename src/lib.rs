// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A strong solver and block-compressed position database for finite,
//! two-player, perfect-information games.
//!
//! ##### About
//!
//! The solver performs partitioned retrograde analysis: the game's position
//! space is split into *tiers* such that every move stays in the same tier
//! or leads to a later one, the tiers are ordered topologically, and each
//! tier is driven to its fixed point by backward induction over a frontier
//! of solved positions. The result is the exact game-theoretic value
//! (win/lose/tie/draw) and distance-to-end (*remoteness*) of every legal
//! position.
//!
//! Solved tiers are stored as *record files*: a packed stream of 16-bit
//! value/remoteness records, split into independently compressed blocks
//! with a footer index, so a post-solve query touches one block instead of
//! the whole tier. [`Probe`] is the cached read cursor over those files.
//!
//! Games plug in through the [`Game`] trait; the solver core never looks
//! inside a position.
//!
//! # Example usage
//!
//! ```
//! use tierbase::{Game, Probe, SolveContext, SolveOptions, TierManager, TierPosition, Value};
//! use std::sync::Arc;
//!
//! // A one-move game: tier 1 position 0 moves into tier 0 position 0,
//! // which is a primitive loss for the player to move.
//! struct Chain;
//!
//! impl Game for Chain {
//!     fn name(&self) -> &str {
//!         "chain"
//!     }
//!
//!     fn variant(&self) -> &str {
//!         "default"
//!     }
//!
//!     fn initial_tier(&self) -> i64 {
//!         1
//!     }
//!
//!     fn tier_size(&self, _tier: i64) -> i64 {
//!         1
//!     }
//!
//!     fn child_tiers(&self, tier: i64) -> Vec<i64> {
//!         if tier == 1 { vec![0] } else { vec![] }
//!     }
//!
//!     fn is_legal(&self, _position: TierPosition) -> bool {
//!         true
//!     }
//!
//!     fn primitive(&self, position: TierPosition) -> Value {
//!         if position.tier == 0 {
//!             Value::Lose
//!         } else {
//!             Value::Undecided
//!         }
//!     }
//!
//!     fn generate_moves(&self, position: TierPosition) -> Vec<i64> {
//!         if position.tier == 1 { vec![0] } else { vec![] }
//!     }
//!
//!     fn do_move(&self, _position: TierPosition, _mv: i64) -> TierPosition {
//!         TierPosition::new(0, 0)
//!     }
//!
//!     fn supports_canonical_parents(&self) -> bool {
//!         true
//!     }
//!
//!     fn canonical_parents(&self, child: TierPosition, parent_tier: i64) -> Vec<i64> {
//!         if child.tier == 0 && parent_tier == 1 {
//!             vec![0]
//!         } else {
//!             vec![]
//!         }
//!     }
//! }
//!
//! # let folder = tempfile::tempdir()?;
//! let ctx = SolveContext::new(Arc::new(Chain), SolveOptions::new(folder.path()))?;
//!
//! let report = TierManager::new(&ctx).solve_all()?;
//! assert!(report.all_solved());
//!
//! // Probe the database: the initial position wins in one move
//! let mut probe = Probe::new(&ctx);
//! assert_eq!(Value::Win, probe.value(TierPosition::new(1, 0)));
//! assert_eq!(1, probe.remoteness(TierPosition::new(1, 0)));
//! #
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

mod bitmap;
mod checksum;

#[doc(hidden)]
pub mod coding;

mod compression;
mod config;
mod context;

#[doc(hidden)]
pub mod db;

mod error;

#[doc(hidden)]
pub mod file;

#[doc(hidden)]
pub mod frontier;

mod game;
mod model;
mod record;
mod record_array;

#[doc(hidden)]
pub mod reverse_graph;

pub mod solver;

mod stats;
mod stop_signal;

pub use {
    bitmap::DiscoveryBitmap,
    checksum::Checksum,
    compression::CompressionType,
    config::{SolveOptions, DEFAULT_BLOCK_SIZE, DEFAULT_DB_NAME},
    context::SolveContext,
    db::{probe::Probe, Database, TierStatus},
    error::{Error, Result},
    game::Game,
    model::{
        Move, Position, Remoteness, Tier, TierPosition, Value, MAX_CHILD_COUNT, MAX_REMOTENESS,
        MAX_TIER_SIZE,
    },
    record::Record,
    record_array::RecordArray,
    solver::{SolveOutcome, SolveReport, TierManager, TierWorker},
    stats::TierStats,
    stop_signal::StopSignal,
};
