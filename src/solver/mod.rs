// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The tier solver: a worker that drives one tier to its fixed point, a
//! manager that orders tiers topologically, and the message contract for
//! running workers remotely.

pub mod manager;
mod percolation;
pub mod remote;
mod scan;
pub mod worker;

pub use {
    manager::{SolveReport, TierManager},
    worker::{SolveOutcome, TierWorker},
};
