mod common;

use common::{MirrorGame, MirrorTierGame};
use std::sync::Arc;
use test_log::test;
use tierbase::{Probe, SolveContext, SolveOptions, TierManager, TierPosition, Value};

/// Non-canonical positions answer through their canonical representative;
/// their cells in the record file stay undecided.
#[test]
fn position_symmetry_canonical_agreement() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;
    let ctx = SolveContext::new(Arc::new(MirrorGame), SolveOptions::new(folder.path()))?;

    let report = TierManager::new(&ctx).solve_all()?;
    assert!(report.all_solved());

    // Only the two canonical positions count
    assert_eq!(2, report.totals.legal);
    assert_eq!(1, report.totals.primitive);

    let mut probe = Probe::new(&ctx);

    // 3 mirrors 0 (primitive loss), 2 mirrors 1 (win in one)
    for (position, mirror) in [(0, 3), (1, 2)] {
        let a = probe.record(TierPosition::new(0, position))?;
        let b = probe.record(TierPosition::new(0, mirror))?;
        assert_eq!(a, b, "mirror of {position} disagrees");
    }

    assert_eq!(Value::Lose, probe.value(TierPosition::new(0, 3)));
    assert_eq!(Value::Win, probe.value(TierPosition::new(0, 2)));
    assert_eq!(1, probe.remoteness(TierPosition::new(0, 2)));

    // The file itself only stores the canonical representatives
    let bytes = ctx.db().open_tier("0")?.read_all()?;
    assert_eq!(vec![0, 0, 0, 0], bytes[4..8].to_vec());

    Ok(())
}

/// A tier symmetric to a canonical one is never solved; probes into it are
/// remapped across tiers.
#[test]
fn tier_symmetry_probes_through_canonical_tier() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;
    let ctx = SolveContext::new(Arc::new(MirrorTierGame), SolveOptions::new(folder.path()))?;

    let report = TierManager::new(&ctx).solve_all()?;
    assert!(report.all_solved());

    // Tier 1 is non-canonical: only tiers 0 and 2 get record files
    assert_eq!(vec![0, 2], report.solved);
    assert!(ctx.db().tier_path("0").try_exists()?);
    assert!(!ctx.db().tier_path("1").try_exists()?);
    assert!(ctx.db().tier_path("2").try_exists()?);

    let mut probe = Probe::new(&ctx);

    assert_eq!(Value::Lose, probe.value(TierPosition::new(0, 0)));
    assert_eq!(Value::Lose, probe.value(TierPosition::new(1, 0)));
    assert_eq!(Value::Win, probe.value(TierPosition::new(2, 0)));
    assert_eq!(1, probe.remoteness(TierPosition::new(2, 0)));

    Ok(())
}
