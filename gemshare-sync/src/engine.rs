//! Sync engine: the single coordinator context.
//!
//! The engine is a pure state machine. It owns the label binder, the reader
//! cache, the merge state and the suppression flag, and takes the host by
//! reference on every call. It has no timers and does no scheduling; the
//! orchestrator decides when each operation runs.

use crate::binder::LabelBinder;
use crate::config::GemshareConfig;
use crate::discovery::{Discovery, DiscoveryRecord};
use crate::error::SyncResult;
use crate::host::{HostGraph, WalletAccess};
use crate::interceptor::{self, MirrorOutcome};
use crate::reconcile::{MergeState, ReconcileOutcome, Reconciler};
use crate::suppression::Suppression;
use gemshare_types::{Label, LabelTag, NodeId};
use tracing::{debug, info};

pub struct SyncEngine {
    config: GemshareConfig,
    binder: LabelBinder,
    discovery: Discovery,
    reconciler: Reconciler,
    suppression: Suppression,
}

impl SyncEngine {
    /// Creates an engine with its own suppression flag.
    pub fn new(config: GemshareConfig) -> SyncResult<Self> {
        Self::with_suppression(config, Suppression::new())
    }

    /// Creates an engine sharing an existing suppression flag, so hook
    /// callbacks outside the engine can observe the same window.
    pub fn with_suppression(config: GemshareConfig, suppression: Suppression) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            binder: LabelBinder::new(&config)?,
            discovery: Discovery::new(&config)?,
            reconciler: Reconciler::new(),
            suppression,
            config,
        })
    }

    pub fn config(&self) -> &GemshareConfig {
        &self.config
    }

    pub fn suppression(&self) -> &Suppression {
        &self.suppression
    }

    pub fn binder(&self) -> &LabelBinder {
        &self.binder
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn merge_state(&self) -> MergeState {
        self.reconciler.state()
    }

    /// Wallet entities for this moment: live active roots, or every wallet
    /// holder the host can find while no roots are known.
    pub fn entities<H>(&self, host: &H) -> Vec<NodeId>
    where
        H: HostGraph + WalletAccess + ?Sized,
    {
        let roots = self.binder.live_roots(host);
        if !roots.is_empty() {
            return roots;
        }
        host.scan_wallet_holders()
            .into_iter()
            .filter(|n| host.is_alive(*n))
            .collect()
    }

    /// Label of a root for logging.
    pub fn label_of(&self, node: NodeId) -> LabelTag {
        self.binder.label_of(node)
    }

    /// Label of any object, resolved to its owning root first.
    pub fn label_of_object<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> LabelTag {
        self.binder
            .resolve_root(host, node)
            .map_or(LabelTag::UNKNOWN, |root| self.binder.label_of(root))
    }

    // ── Operations ───────────────────────────────────────────────

    /// One discovery scan. Returns a record per newly bound root.
    pub fn discovery_tick<H: HostGraph + ?Sized>(&mut self, host: &H) -> Vec<DiscoveryRecord> {
        self.discovery.tick(host, &mut self.binder)
    }

    /// The host's player roster changed: re-derive the active roots from the
    /// manager's own references, rebuild labels and re-arm the merge.
    pub fn refresh_from_roster<H: HostGraph + ?Sized>(&mut self, host: &H, manager: NodeId) -> Vec<(Label, NodeId)> {
        self.binder.clear_active();
        self.reconciler.reset();
        if !host.is_alive(manager) {
            debug!(manager = %manager, "roster manager is gone");
            return Vec::new();
        }
        let references = host.references(manager);
        let bindings = self.binder.rebuild_from_enumeration(host, references);
        let stale: Vec<NodeId> = self
            .discovery
            .bound_nodes()
            .into_iter()
            .filter(|n| !self.binder.is_active(*n))
            .collect();
        self.discovery.forget(&stale);
        info!(
            "roster refreshed: {} active root(s), merge re-armed",
            self.binder.active_roots().len()
        );
        bindings
    }

    /// A HUD element named a player label.
    pub fn bind_hud<H: HostGraph + ?Sized>(&mut self, host: &H, label: &str, hud: NodeId) -> SyncResult<(Label, NodeId)> {
        self.binder.bind_by_hint(host, label, hud)
    }

    /// One reconciliation cycle.
    pub fn reconcile_tick<H>(&mut self, host: &H) -> ReconcileOutcome
    where
        H: HostGraph + WalletAccess + ?Sized,
    {
        let entities = self.entities(host);
        self.reconciler.tick(host, &self.suppression, &entities)
    }

    /// The host reported a wallet mutation on `source`.
    pub fn on_wallet_mutated<H>(&mut self, host: &H, source: NodeId, delta: i64) -> Option<MirrorOutcome>
    where
        H: HostGraph + WalletAccess + ?Sized,
    {
        if self.suppression.covers_current_thread() {
            return None;
        }
        debug!(source = %source, delta, "wallet mutation observed");
        let source_root = self.binder.resolve_root(host, source);
        let tag = source_root.map_or(LabelTag::UNKNOWN, |r| self.binder.label_of(r));
        let entities = self.entities(host);
        interceptor::mirror(host, &self.suppression, source, source_root, tag, &entities)
    }
}
