mod common;

use common::TicTacToe;
use std::sync::Arc;
use test_log::test;
use tierbase::{Probe, SolveContext, SolveOptions, TierManager, TierPosition, Value};

#[test]
fn tic_tac_toe_single_tier() -> tierbase::Result<()> {
    let folder = tempfile::tempdir()?;

    let ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: true,
        }),
        SolveOptions::new(folder.path()).memlimit(1 << 30),
    )?;

    let report = TierManager::new(&ctx).solve_all()?;

    assert!(report.all_solved());
    assert_eq!(vec![0], report.solved);

    assert_eq!(5_478, report.totals.legal);
    assert_eq!(958, report.totals.primitive);
    assert_eq!(2_836, report.totals.wins);
    assert_eq!(1_574, report.totals.loses);
    assert_eq!(1_068, report.totals.ties);
    assert_eq!(0, report.totals.draws);
    assert_eq!(9, report.totals.max_remoteness);

    let mut probe = Probe::new(&ctx);

    // All blanks: optimal play ties after nine plies
    assert_eq!(Value::Tie, probe.value(TierPosition::new(0, 0)));
    assert_eq!(9, probe.remoteness(TierPosition::new(0, 0)));

    // X X . / O O . / . . .  with X to move: X completes the top row
    let win_in_one = TicTacToe::position(&[1, 1, 0, 2, 2, 0, 0, 0, 0]);
    assert_eq!(Value::Win, probe.value(TierPosition::new(0, win_in_one)));
    assert_eq!(1, probe.remoteness(TierPosition::new(0, win_in_one)));

    // X O . / . X . / . . O  with X to move: a double threat wins in three
    let fork = TicTacToe::position(&[1, 2, 0, 0, 1, 0, 0, 0, 2]);
    assert_eq!(Value::Win, probe.value(TierPosition::new(0, fork)));
    assert_eq!(3, probe.remoteness(TierPosition::new(0, fork)));

    // X X X / O O . / . . .  is terminal: the mover (O) already lost
    let x_won = TicTacToe::position(&[1, 1, 1, 2, 2, 0, 0, 0, 0]);
    assert_eq!(Value::Lose, probe.value(TierPosition::new(0, x_won)));
    assert_eq!(0, probe.remoteness(TierPosition::new(0, x_won)));

    Ok(())
}

#[test]
fn reverse_graph_matches_native_parents() -> tierbase::Result<()> {
    let native_folder = tempfile::tempdir()?;
    let retro_folder = tempfile::tempdir()?;

    let native_ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: true,
        }),
        SolveOptions::new(native_folder.path()).memlimit(1 << 30),
    )?;
    let retro_ctx = SolveContext::new(
        Arc::new(TicTacToe {
            native_parents: false,
        }),
        SolveOptions::new(retro_folder.path()).memlimit(1 << 30),
    )?;

    assert!(TierManager::new(&native_ctx).solve_all()?.all_solved());
    assert!(TierManager::new(&retro_ctx).solve_all()?.all_solved());

    // Same records regardless of how parents are enumerated
    let native_bytes = native_ctx.db().open_tier("0")?.read_all()?;
    let retro_bytes = retro_ctx.db().open_tier("0")?.read_all()?;

    assert_eq!(native_bytes, retro_bytes);

    Ok(())
}
