//! Feedback interceptor: mirrors one player's wallet change to everyone
//! else as soon as the host reports it, without waiting for the next
//! reconciliation cycle.

use crate::host::WalletAccess;
use crate::reconcile::apply_batch;
use crate::suppression::Suppression;
use gemshare_types::{LabelTag, NodeId};
use serde::Serialize;
use tracing::info;

/// Result of one mirror pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MirrorOutcome {
    /// Node the host reported the mutation on.
    pub source: NodeId,
    /// Value every other wallet was moved to.
    pub value: i64,
    pub writes: usize,
    pub failures: usize,
}

/// Mirrors the source's wallet to every other entity under one suppression
/// window. Returns `None` when suppressed or when there is nobody to mirror
/// to.
///
/// `source_root` is the player root the source resolved to, if any; both it
/// and `source` are excluded from the targets.
pub fn mirror<H: WalletAccess + ?Sized>(
    host: &H,
    suppression: &Suppression,
    source: NodeId,
    source_root: Option<NodeId>,
    source_tag: LabelTag,
    entities: &[NodeId],
) -> Option<MirrorOutcome> {
    if suppression.covers_current_thread() || entities.len() <= 1 {
        return None;
    }

    let value = host
        .read_wallet(source)
        .or_else(|e| match source_root {
            Some(root) if root != source => host.read_wallet(root),
            _ => Err(e),
        })
        .unwrap_or(0)
        .max(0);

    let deltas: Vec<(NodeId, i64)> = entities
        .iter()
        .copied()
        .filter(|n| *n != source && Some(*n) != source_root)
        .map(|n| {
            let current = host.read_wallet(n).unwrap_or(0).max(0);
            (n, value - current)
        })
        .collect();

    let (writes, failures) = apply_batch(host, suppression, &deltas);
    info!("[WALLET MIRROR] {source_tag} all → {value}");
    Some(MirrorOutcome {
        source,
        value,
        writes,
        failures,
    })
}
