//! In-memory host for tests and the simulator.
//!
//! Models just enough of a game process: a named node tree with attached
//! capabilities, per-node wallets, object references, display text, and a
//! synchronous notification channel. Subscribers run after the world lock
//! is released so they may call back into the host.

use super::{Capability, HookKind, HostCallback, HostEvent, HostEvents, HostGraph, Member, MemberRef, WalletAccess};
use crate::error::{HostError, HostResult};
use gemshare_types::{HookId, HostValue, NodeId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One wallet write observed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletWrite {
    pub node: NodeId,
    pub delta: i64,
}

#[derive(Debug, Default)]
struct MemoryNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    capabilities: Vec<Capability>,
    values: HashMap<MemberRef, HostValue>,
    references: Vec<NodeId>,
    text: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryWorld {
    nodes: HashMap<NodeId, MemoryNode>,
    wallets: HashMap<NodeId, i64>,
    wallet_order: Vec<NodeId>,
    failing_reads: HashSet<NodeId>,
    rejecting_writes: HashSet<NodeId>,
    writes: Vec<WalletWrite>,
}

/// A host whose object graph lives entirely in memory.
#[derive(Default)]
pub struct MemoryHost {
    world: Mutex<MemoryWorld>,
    hooks: Mutex<Vec<(HookId, HookKind, HostCallback)>>,
    next_hook: AtomicU64,
}

impl MemoryHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Graph construction ───────────────────────────────────────

    /// Creates a node under `parent` (or as a graph root).
    pub fn spawn(&self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new();
        let mut world = self.world.lock().unwrap();
        let parent = parent.filter(|p| world.nodes.contains_key(p));
        if let Some(p) = parent {
            if let Some(parent_node) = world.nodes.get_mut(&p) {
                parent_node.children.push(id);
            }
        }
        world.nodes.insert(
            id,
            MemoryNode {
                name: name.into(),
                parent,
                ..Default::default()
            },
        );
        id
    }

    /// Destroys a node and its whole subtree.
    pub fn destroy(&self, node: NodeId) {
        let mut world = self.world.lock().unwrap();
        if let Some(parent) = world.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(p) = world.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != node);
            }
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = world.nodes.remove(&id) {
                stack.extend(removed.children);
            }
            world.wallets.remove(&id);
            world.wallet_order.retain(|w| *w != id);
        }
    }

    /// Attaches a capability to a node.
    pub fn attach(&self, node: NodeId, capability: Capability) {
        let mut world = self.world.lock().unwrap();
        if let Some(n) = world.nodes.get_mut(&node) {
            n.capabilities.push(capability);
        }
    }

    /// Attaches a one-member capability and sets its value.
    pub fn attach_member(
        &self,
        node: NodeId,
        capability: &str,
        member: Member,
        value: impl Into<HostValue>,
    ) {
        let cap = Capability::new(capability).with_member(member.clone());
        let member_ref = cap.member_ref(&member);
        self.attach(node, cap);
        self.set_member(node, &member_ref, value);
    }

    /// Sets the value a member reads as.
    pub fn set_member(&self, node: NodeId, member: &MemberRef, value: impl Into<HostValue>) {
        let mut world = self.world.lock().unwrap();
        if let Some(n) = world.nodes.get_mut(&node) {
            n.values.insert(member.clone(), value.into());
        }
    }

    /// Sets the object references a node's fields point at.
    pub fn set_references(&self, node: NodeId, references: Vec<NodeId>) {
        let mut world = self.world.lock().unwrap();
        if let Some(n) = world.nodes.get_mut(&node) {
            n.references = references;
        }
    }

    /// Sets a node's display text.
    pub fn set_text(&self, node: NodeId, text: impl Into<String>) {
        let mut world = self.world.lock().unwrap();
        if let Some(n) = world.nodes.get_mut(&node) {
            n.text = Some(text.into());
        }
    }

    // ── Wallets ──────────────────────────────────────────────────

    /// Seeds a wallet without notifying anyone.
    pub fn set_wallet(&self, node: NodeId, value: i64) {
        let mut world = self.world.lock().unwrap();
        if !world.wallets.contains_key(&node) {
            world.wallet_order.push(node);
        }
        world.wallets.insert(node, value);
    }

    /// Current wallet value, `None` if the node has no wallet.
    pub fn wallet(&self, node: NodeId) -> Option<i64> {
        self.world.lock().unwrap().wallets.get(&node).copied()
    }

    /// Makes wallet reads on `node` fail.
    pub fn fail_reads(&self, node: NodeId, fail: bool) {
        let mut world = self.world.lock().unwrap();
        if fail {
            world.failing_reads.insert(node);
        } else {
            world.failing_reads.remove(&node);
        }
    }

    /// Makes wallet writes on `node` fail.
    pub fn reject_writes(&self, node: NodeId, reject: bool) {
        let mut world = self.world.lock().unwrap();
        if reject {
            world.rejecting_writes.insert(node);
        } else {
            world.rejecting_writes.remove(&node);
        }
    }

    /// Every successful wallet write so far.
    pub fn writes(&self) -> Vec<WalletWrite> {
        self.world.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.world.lock().unwrap().writes.clear();
    }

    // ── Notifications ────────────────────────────────────────────

    /// Number of live hook registrations.
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().unwrap().len()
    }

    /// Simulates the player manager re-acquiring its players.
    pub fn fire_roster_changed(&self, manager: NodeId) {
        self.notify(&HostEvent::RosterChanged { manager });
    }

    /// Simulates a HUD element being initialized.
    pub fn fire_hud_initialized(&self, hud: NodeId, label: impl Into<String>) {
        self.notify(&HostEvent::HudInitialized {
            hud,
            label: label.into(),
        });
    }

    fn notify(&self, event: &HostEvent) {
        let kind = event.kind();
        let callbacks: Vec<HostCallback> = self
            .hooks
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl HostGraph for MemoryHost {
    fn is_alive(&self, node: NodeId) -> bool {
        self.world.lock().unwrap().nodes.contains_key(&node)
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.world.lock().unwrap().nodes.get(&node).map(|n| n.name.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.world.lock().unwrap().nodes.get(&node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.world
            .lock()
            .unwrap()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn capabilities(&self, node: NodeId) -> Vec<Capability> {
        self.world
            .lock()
            .unwrap()
            .nodes
            .get(&node)
            .map(|n| n.capabilities.clone())
            .unwrap_or_default()
    }

    fn read_member(&self, node: NodeId, member: &MemberRef) -> HostResult<HostValue> {
        let world = self.world.lock().unwrap();
        let n = world.nodes.get(&node).ok_or(HostError::NodeGone(node))?;
        n.values
            .get(member)
            .cloned()
            .ok_or_else(|| HostError::MemberNotFound {
                capability: member.capability.clone(),
                member: member.member.clone(),
            })
    }

    fn references(&self, object: NodeId) -> Vec<NodeId> {
        let world = self.world.lock().unwrap();
        world
            .nodes
            .get(&object)
            .map(|n| {
                n.references
                    .iter()
                    .copied()
                    .filter(|r| world.nodes.contains_key(r))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn display_text(&self, node: NodeId) -> Option<String> {
        self.world.lock().unwrap().nodes.get(&node).and_then(|n| n.text.clone())
    }
}

impl WalletAccess for MemoryHost {
    fn read_wallet(&self, node: NodeId) -> HostResult<i64> {
        let world = self.world.lock().unwrap();
        if !world.nodes.contains_key(&node) {
            return Err(HostError::NodeGone(node));
        }
        if world.failing_reads.contains(&node) {
            return Err(HostError::NotNumeric(format!("wallet on {node}")));
        }
        world
            .wallets
            .get(&node)
            .copied()
            .ok_or_else(|| HostError::Unsupported(format!("node {node} has no wallet")))
    }

    fn apply_wallet_delta(&self, node: NodeId, delta: i64) -> HostResult<()> {
        {
            let mut world = self.world.lock().unwrap();
            if !world.nodes.contains_key(&node) {
                return Err(HostError::NodeGone(node));
            }
            if world.rejecting_writes.contains(&node) {
                return Err(HostError::Rejected(format!("wallet on {node} is locked")));
            }
            let Some(wallet) = world.wallets.get_mut(&node) else {
                return Err(HostError::Unsupported(format!("node {node} has no wallet")));
            };
            *wallet = wallet.saturating_add(delta);
            world.writes.push(WalletWrite { node, delta });
        }
        self.notify(&HostEvent::WalletMutated {
            source: node,
            delta,
        });
        Ok(())
    }

    fn scan_wallet_holders(&self) -> Vec<NodeId> {
        let world = self.world.lock().unwrap();
        world
            .wallet_order
            .iter()
            .copied()
            .filter(|n| world.nodes.contains_key(n))
            .collect()
    }
}

impl HostEvents for MemoryHost {
    fn subscribe(&self, kind: HookKind, callback: HostCallback) -> HostResult<HookId> {
        let id = HookId::new(self.next_hook.fetch_add(1, Ordering::SeqCst));
        self.hooks.lock().unwrap().push((id, kind, callback));
        Ok(id)
    }

    fn unsubscribe(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.lock().unwrap();
        let before = hooks.len();
        hooks.retain(|(h, _, _)| *h != id);
        hooks.len() != before
    }
}
