//! Wallet reconciliation.
//!
//! The first cycle that reads every wallet and sees a positive one merges:
//! every player ends up holding the sum of all positive wallets, so no one's
//! progress is lost when two saves join. While any live wallet fails to
//! read, the merge waits. After that the policy is max-convergence: laggards
//! are raised to the richest wallet and no wallet ever decreases.

use crate::error::HostError;
use crate::host::WalletAccess;
use crate::suppression::Suppression;
use gemshare_types::NodeId;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Merge state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MergeState {
    /// No merge applied since start or the last roster change.
    #[default]
    NotYetMerged,
    /// Merge applied; steady-state max-convergence.
    Converging,
}

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileAction {
    /// Fewer than two entities.
    Skipped,
    /// Merge pending until every live wallet can be read.
    MergeDeferred,
    /// First-contact merge to the sum of positive wallets.
    Merged { sum: i64 },
    /// Wallets raised to the maximum.
    Aligned { target: i64 },
    /// Every known wallet already equal.
    InSync { value: i64 },
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    /// Writes the host accepted.
    pub writes: usize,
    /// Writes the host rejected.
    pub failures: usize,
    /// Entities whose wallet could not be read.
    pub unknown: usize,
}

impl ReconcileOutcome {
    fn skipped() -> Self {
        Self {
            action: ReconcileAction::Skipped,
            writes: 0,
            failures: 0,
            unknown: 0,
        }
    }
}

/// One wallet reading. `None` when the read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSample {
    pub node: NodeId,
    pub value: Option<i64>,
    /// The read failed because the node no longer exists.
    pub gone: bool,
}

impl WalletSample {
    /// Value for arithmetic: unreadable or negative counts as zero.
    pub fn clamped(&self) -> i64 {
        self.value.unwrap_or(0).max(0)
    }
}

/// Reads every entity's wallet.
pub fn sample<H: WalletAccess + ?Sized>(host: &H, entities: &[NodeId]) -> Vec<WalletSample> {
    entities
        .iter()
        .map(|node| match host.read_wallet(*node) {
            Ok(value) => WalletSample {
                node: *node,
                value: Some(value),
                gone: false,
            },
            Err(e) => WalletSample {
                node: *node,
                value: None,
                gone: matches!(e, HostError::NodeGone(_)),
            },
        })
        .collect()
}

/// Applies deltas inside one suppression window. A rejected write does not
/// stop the rest. Returns `(accepted, rejected)`.
pub fn apply_batch<H: WalletAccess + ?Sized>(
    host: &H,
    suppression: &Suppression,
    deltas: &[(NodeId, i64)],
) -> (usize, usize) {
    let _window = suppression.engage();
    let mut accepted = 0;
    let mut rejected = 0;
    for (node, delta) in deltas {
        if *delta == 0 {
            continue;
        }
        match host.apply_wallet_delta(*node, *delta) {
            Ok(()) => accepted += 1,
            Err(e) => {
                rejected += 1;
                log_rejected(*node, *delta, &e);
            }
        }
    }
    (accepted, rejected)
}

fn log_rejected(node: NodeId, delta: i64, error: &HostError) {
    warn!("[WALLET] write of {delta:+} to {node} failed: {error}");
}

/// The reconciliation state machine.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    state: MergeState,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Back to `NotYetMerged`; the next fully readable cycle with a positive
    /// wallet merges.
    pub fn reset(&mut self) {
        self.state = MergeState::NotYetMerged;
    }

    /// Runs one cycle over `entities`.
    pub fn tick<H: WalletAccess + ?Sized>(
        &mut self,
        host: &H,
        suppression: &Suppression,
        entities: &[NodeId],
    ) -> ReconcileOutcome {
        if entities.len() < 2 {
            return ReconcileOutcome::skipped();
        }

        let samples = sample(host, entities);
        let unknown = samples.iter().filter(|s| s.value.is_none()).count();
        let known: Vec<&WalletSample> = samples.iter().filter(|s| s.value.is_some()).collect();

        if self.state == MergeState::NotYetMerged {
            let unreadable = samples.iter().filter(|s| s.value.is_none() && !s.gone).count();
            if unreadable > 0 {
                debug!(unreadable, "initial merge deferred, wallet reads failed");
                return ReconcileOutcome {
                    action: ReconcileAction::MergeDeferred,
                    writes: 0,
                    failures: 0,
                    unknown,
                };
            }
        }

        if self.state == MergeState::NotYetMerged
            && known.iter().any(|s| s.value.is_some_and(|v| v > 0))
        {
            let sum = known
                .iter()
                .map(|s| s.clamped())
                .fold(0i64, i64::saturating_add);
            let deltas: Vec<(NodeId, i64)> =
                known.iter().map(|s| (s.node, sum - s.clamped())).collect();
            let (writes, failures) = apply_batch(host, suppression, &deltas);
            self.state = MergeState::Converging;
            info!("[WALLET INIT] initial merge: sum={sum}, applied to all players.");
            return ReconcileOutcome {
                action: ReconcileAction::Merged { sum },
                writes,
                failures,
                unknown,
            };
        }

        let target = known
            .iter()
            .filter_map(|s| s.value)
            .max()
            .unwrap_or(0)
            .max(0);
        let mismatch = known.iter().any(|s| s.value != Some(target));
        if !mismatch {
            return ReconcileOutcome {
                action: ReconcileAction::InSync { value: target },
                writes: 0,
                failures: 0,
                unknown,
            };
        }

        let deltas: Vec<(NodeId, i64)> = known
            .iter()
            .map(|s| (s.node, target - s.clamped()))
            .collect();
        let (writes, failures) = apply_batch(host, suppression, &deltas);
        info!("[WALLET SYNC] aligned all players to {target}.");
        ReconcileOutcome {
            action: ReconcileAction::Aligned { target },
            writes,
            failures,
            unknown,
        }
    }
}
