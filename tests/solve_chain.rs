mod common;

use common::ChainGame;
use std::sync::Arc;
use test_log::test;
use tierbase::{Probe, SolveContext, SolveOptions, TierManager, TierPosition, TierStatus, Value};

#[test]
fn chain_solves_bottom_up() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;
    let ctx = SolveContext::new(Arc::new(ChainGame), SolveOptions::new(folder.path()))?;

    let report = TierManager::new(&ctx).solve_all()?;

    assert!(report.all_solved());
    assert_eq!(vec![0, 1], report.solved);
    assert_eq!(TierStatus::Solved, ctx.db().tier_status("0"));
    assert_eq!(TierStatus::Solved, ctx.db().tier_status("1"));

    let mut probe = Probe::new(&ctx);

    assert_eq!(Value::Lose, probe.value(TierPosition::new(0, 0)));
    assert_eq!(0, probe.remoteness(TierPosition::new(0, 0)));

    assert_eq!(Value::Win, probe.value(TierPosition::new(1, 0)));
    assert_eq!(1, probe.remoteness(TierPosition::new(1, 0)));

    Ok(())
}

#[test]
fn chain_record_files_hold_expected_bytes() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;
    let ctx = SolveContext::new(Arc::new(ChainGame), SolveOptions::new(folder.path()))?;

    TierManager::new(&ctx).solve_all()?;

    // lose(0) packs as 0x1000, win(1) as 0x4001, little-endian on disk
    let mut t0 = ctx.db().open_tier("0")?;
    assert_eq!(1, t0.record_count());
    assert_eq!(vec![0x00, 0x10], t0.read_all()?);

    let mut t1 = ctx.db().open_tier("1")?;
    assert_eq!(1, t1.record_count());
    assert_eq!(vec![0x01, 0x40], t1.read_all()?);

    Ok(())
}

#[test]
fn chain_skip_and_force_resolve() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;

    let ctx = SolveContext::new(Arc::new(ChainGame), SolveOptions::new(folder.path()))?;
    let report = TierManager::new(&ctx).solve_all()?;
    assert_eq!(2, report.solved.len());

    let before = (
        std::fs::read(ctx.db().tier_path("0"))?,
        std::fs::read(ctx.db().tier_path("1"))?,
    );

    // Existing record files are reused
    let again = TierManager::new(&ctx).solve_all()?;
    assert!(again.solved.is_empty());
    assert_eq!(vec![0, 1], again.skipped);

    // force re-solves and reproduces the identical files
    let forced_ctx = SolveContext::new(
        Arc::new(ChainGame),
        SolveOptions::new(folder.path()).force(true),
    )?;
    let forced = TierManager::new(&forced_ctx).solve_all()?;
    assert_eq!(vec![0, 1], forced.solved);

    let after = (
        std::fs::read(forced_ctx.db().tier_path("0"))?,
        std::fs::read(forced_ctx.db().tier_path("1"))?,
    );

    assert_eq!(before, after);

    Ok(())
}
