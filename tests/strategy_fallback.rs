mod common;

use common::TicTacToe;
use std::sync::Arc;
use test_log::test;
use tierbase::{SolveContext, SolveOptions, TierManager};

// Enough for records + counters (6 bytes per position of 19 683), not
// enough for the frontier on top
const TIGHT_MEMLIMIT: u64 = 150_000;

/// With a memory limit below what frontier percolation needs, the worker
/// falls back to the frontier-less strategy and produces identical records.
#[test]
fn memlimit_falls_back_to_rescanning() -> tierbase::Result<()> {
    let roomy_folder = tempfile::tempdir()?;
    let tight_folder = tempfile::tempdir()?;

    let roomy_ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: true,
        }),
        SolveOptions::new(roomy_folder.path()).memlimit(1 << 30),
    )?;
    let tight_ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: true,
        }),
        SolveOptions::new(tight_folder.path()).memlimit(TIGHT_MEMLIMIT),
    )?;

    assert!(TierManager::new(&roomy_ctx).solve_all()?.all_solved());
    assert!(TierManager::new(&tight_ctx).solve_all()?.all_solved());

    let roomy_bytes = roomy_ctx.db().open_tier("0")?.read_all()?;
    let tight_bytes = tight_ctx.db().open_tier("0")?.read_all()?;

    assert_eq!(roomy_bytes, tight_bytes);

    Ok(())
}

/// Without native parent enumeration the frontier-less strategy is
/// unavailable, so the same limit fails the tier; the manager reports it
/// and finishes.
#[test]
fn memlimit_without_native_parents_fails_the_tier() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;

    let ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: false,
        }),
        SolveOptions::new(folder.path()).memlimit(TIGHT_MEMLIMIT),
    )?;

    let report = TierManager::new(&ctx).solve_all()?;

    assert!(!report.all_solved());
    assert_eq!(vec![0], report.failed);
    assert!(report.solved.is_empty());

    Ok(())
}
