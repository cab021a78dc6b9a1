mod common;

use common::scene;
use gemshare_sync::host::mock::MemoryHost;
use gemshare_sync::reconcile::{apply_batch, sample};
use gemshare_sync::{MergeState, ReconcileAction, Reconciler, Suppression, WalletAccess};
use gemshare_types::NodeId;
use pretty_assertions::assert_eq;

fn wallets(host: &MemoryHost, values: &[i64]) -> Vec<NodeId> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let node = host.spawn(format!("Wallet {i}"), None);
            host.set_wallet(node, *v);
            node
        })
        .collect()
}

fn values(host: &MemoryHost, nodes: &[NodeId]) -> Vec<i64> {
    nodes.iter().map(|n| host.wallet(*n).unwrap()).collect()
}

// ── Merge ────────────────────────────────────────────────────────

#[test]
fn first_positive_cycle_merges_to_sum() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0]);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.action, ReconcileAction::Merged { sum: 50 });
    assert_eq!(outcome.writes, 1);
    assert_eq!(values(&host, &nodes), vec![50, 50]);
    assert_eq!(r.state(), MergeState::Converging);
}

#[test]
fn merge_adds_every_positive_wallet() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[30, 45, 5]);
    let mut r = Reconciler::new();

    r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(values(&host, &nodes), vec![80, 80, 80]);
}

#[test]
fn negative_wallets_count_as_zero_in_merge() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[-10, 20]);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.action, ReconcileAction::Merged { sum: 20 });
    assert_eq!(values(&host, &nodes), vec![10, 20]);
}

#[test]
fn all_zero_wallets_wait_for_a_positive_one() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[0, 0]);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.action, ReconcileAction::InSync { value: 0 });
    assert_eq!(r.state(), MergeState::NotYetMerged);
    assert!(host.writes().is_empty());
}

#[test]
fn merge_happens_only_once() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0]);
    let mut r = Reconciler::new();
    let s = Suppression::new();

    r.tick(&host, &s, &nodes);
    host.apply_wallet_delta(nodes[0], 20).unwrap();
    let outcome = r.tick(&host, &s, &nodes);

    assert_eq!(outcome.action, ReconcileAction::Aligned { target: 70 });
    assert_eq!(values(&host, &nodes), vec![70, 70]);
}

#[test]
fn reset_rearms_merge() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0]);
    let mut r = Reconciler::new();
    let s = Suppression::new();
    r.tick(&host, &s, &nodes);

    r.reset();
    assert_eq!(r.state(), MergeState::NotYetMerged);
    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.action, ReconcileAction::Merged { sum: 100 });
    assert_eq!(values(&host, &nodes), vec![100, 100]);
}

// ── Steady state ─────────────────────────────────────────────────

#[test]
fn converged_wallets_produce_no_writes() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0]);
    let mut r = Reconciler::new();
    let s = Suppression::new();
    r.tick(&host, &s, &nodes);
    host.clear_writes();

    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.action, ReconcileAction::InSync { value: 50 });
    assert_eq!(outcome.writes, 0);
    assert!(host.writes().is_empty());
}

#[test]
fn steady_state_never_lowers_a_wallet() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[10, 10]);
    let mut r = Reconciler::new();
    let s = Suppression::new();
    r.tick(&host, &s, &nodes);

    // Somebody spends.
    host.apply_wallet_delta(nodes[1], -15).unwrap();
    r.tick(&host, &s, &nodes);
    assert_eq!(values(&host, &nodes), vec![20, 20]);
}

#[test]
fn fewer_than_two_entities_is_skipped() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50]);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.action, ReconcileAction::Skipped);
    assert_eq!(r.state(), MergeState::NotYetMerged);
    assert!(r.tick(&host, &Suppression::new(), &[]).action == ReconcileAction::Skipped);
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn merge_waits_until_every_wallet_reads() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 30]);
    host.fail_reads(nodes[1], true);
    let mut r = Reconciler::new();
    let s = Suppression::new();

    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.action, ReconcileAction::MergeDeferred);
    assert_eq!(outcome.unknown, 1);
    assert_eq!(r.state(), MergeState::NotYetMerged);
    assert!(host.writes().is_empty());

    host.fail_reads(nodes[1], false);
    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.action, ReconcileAction::Merged { sum: 80 });
    assert_eq!(values(&host, &nodes), vec![80, 80]);
}

#[test]
fn unreadable_wallet_is_left_alone_after_merge() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0, 7]);
    let mut r = Reconciler::new();
    let s = Suppression::new();
    r.tick(&host, &s, &nodes);
    host.apply_wallet_delta(nodes[0], 10).unwrap();
    host.fail_reads(nodes[2], true);

    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.unknown, 1);
    assert_eq!(outcome.action, ReconcileAction::Aligned { target: 67 });
    assert_eq!(values(&host, &nodes), vec![67, 67, 57]);
}

#[test]
fn rejected_write_does_not_stop_the_batch() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0, 0]);
    host.reject_writes(nodes[1], true);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.writes, 1);
    assert_eq!(outcome.failures, 1);
    assert_eq!(values(&host, &nodes), vec![50, 0, 50]);
}

#[test]
fn rejected_writes_are_retried_next_cycle() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0]);
    host.reject_writes(nodes[1], true);
    let mut r = Reconciler::new();
    let s = Suppression::new();
    r.tick(&host, &s, &nodes);

    host.reject_writes(nodes[1], false);
    let outcome = r.tick(&host, &s, &nodes);
    assert_eq!(outcome.action, ReconcileAction::Aligned { target: 50 });
    assert_eq!(values(&host, &nodes), vec![50, 50]);
}

#[test]
fn dead_wallet_counts_as_unknown() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[50, 0, 0]);
    host.destroy(nodes[2]);
    let mut r = Reconciler::new();

    let outcome = r.tick(&host, &Suppression::new(), &nodes);
    assert_eq!(outcome.unknown, 1);
    assert_eq!(outcome.action, ReconcileAction::Merged { sum: 50 });
    assert_eq!(outcome.writes, 1);
}

// ── Helpers ──────────────────────────────────────────────────────

#[test]
fn sample_marks_failed_reads() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[3, -4]);
    host.fail_reads(nodes[0], true);

    let samples = sample(&host, &nodes);
    assert_eq!(samples[0].value, None);
    assert!(!samples[0].gone);
    assert_eq!(samples[0].clamped(), 0);
    assert_eq!(samples[1].value, Some(-4));
    assert_eq!(samples[1].clamped(), 0);
}

#[test]
fn batch_skips_zero_deltas_and_closes_window() {
    let host = MemoryHost::new();
    let nodes = wallets(&host, &[1, 1]);
    let s = Suppression::new();

    let (accepted, rejected) = apply_batch(&host, &s, &[(nodes[0], 0), (nodes[1], 4)]);
    assert_eq!((accepted, rejected), (1, 0));
    assert_eq!(host.writes().len(), 1);
    assert!(!s.is_active());
}

#[test]
fn reconcile_runs_over_scene_roots() {
    let s = scene(&[(0, 12), (1, 30)]);
    let mut r = Reconciler::new();

    r.tick(s.host.as_ref(), &Suppression::new(), &s.roots());
    assert_eq!(s.wallets(), vec![42, 42]);
}
