//! Simulated co-op session for the gemshare sync engine.
//!
//! Builds an in-memory scene shaped like the game's (an instantiation
//! boundary, player roots with indicator children, a player manager and
//! one HUD per player), runs the orchestrator against it and replays a
//! script of gem pickups and purchases.

use anyhow::{bail, Context, Result};
use gemshare_sync::host::mock::MemoryHost;
use gemshare_sync::{
    Capability, GemshareConfig, HostGraph, Member, Orchestrator, ReconcileAction, SyncEvent,
    WalletAccess,
};
use gemshare_types::{NodeId, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// One game-side wallet change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Offset from session start.
    pub at_ms: u64,
    /// Zero-based player slot.
    pub player: usize,
    /// Gems gained (positive) or spent (negative).
    pub delta: i64,
}

/// A pickup for every player in turn, then one purchase by the first player.
pub fn default_script(players: usize) -> Vec<ScriptStep> {
    let mut steps: Vec<ScriptStep> = (0..players)
        .map(|player| ScriptStep {
            at_ms: 3_000 + 1_500 * player as u64,
            player,
            delta: 20,
        })
        .collect();
    if players > 0 {
        steps.push(ScriptStep {
            at_ms: 3_000 + 1_500 * players as u64,
            player: 0,
            delta: -15,
        });
    }
    steps
}

/// Loads the engine configuration from a JSON file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<GemshareConfig> {
    let Some(path) = path else {
        return Ok(GemshareConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    GemshareConfig::from_json(&json)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Loads a script of wallet changes from a JSON array.
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file {}", path.display()))?;
    serde_json::from_str(&json).context("Failed to parse script")
}

/// In-memory game scene.
pub struct DemoWorld {
    pub host: Arc<MemoryHost>,
    pub manager: NodeId,
    pub roots: Vec<NodeId>,
    bodies: Vec<NodeId>,
}

impl DemoWorld {
    /// One player per starting wallet value.
    pub fn build(wallets: &[i64]) -> Self {
        let host = Arc::new(MemoryHost::new());
        let boundary = host.spawn("Instantiate Parent", None);
        let mut roots = Vec::with_capacity(wallets.len());
        let mut bodies = Vec::with_capacity(wallets.len());

        for (slot, wallet) in wallets.iter().enumerate() {
            let root = host.spawn(format!("Player({slot})"), Some(boundary));
            host.spawn("Player Number Indicator", Some(root));
            bodies.push(host.spawn("Body", Some(root)));

            let current = Member::property("CurrentHealth", ValueType::F32);
            let max = Member::property("MaxHealth", ValueType::F32);
            let health = Capability::new("Game.Player.PlayerHealth")
                .with_member(current.clone())
                .with_member(max.clone());
            let (current_ref, max_ref) = (health.member_ref(&current), health.member_ref(&max));
            host.attach(root, health);
            host.set_member(root, &current_ref, 100.0);
            host.set_member(root, &max_ref, 100.0);
            host.attach_member(
                root,
                "Game.Player.PlayerController",
                Member::field("playerIndex", ValueType::I32),
                slot as i64,
            );

            host.set_wallet(root, *wallet);
            roots.push(root);
        }

        let manager = host.spawn("PlayerManager", None);
        host.set_references(manager, roots.clone());

        Self {
            host,
            manager,
            roots,
            bodies,
        }
    }

    /// Fires the notifications the game raises once players have spawned:
    /// the roster change, then one HUD initialization per player.
    pub fn announce(&self) {
        self.host.fire_roster_changed(self.manager);
        for (slot, body) in self.bodies.iter().enumerate() {
            let hud = self.host.spawn(format!("PlayerHUD {}", slot + 1), None);
            self.host.set_references(hud, vec![*body]);
            self.host.fire_hud_initialized(hud, format!("P{}", slot + 1));
        }
    }

    /// Applies one scripted change as the game would.
    pub fn apply(&self, step: &ScriptStep) -> Result<()> {
        let Some(root) = self.roots.get(step.player) else {
            bail!("script names player {} but only {} exist", step.player, self.roots.len());
        };
        self.host
            .apply_wallet_delta(*root, step.delta)
            .with_context(|| format!("wallet change for player {}", step.player))
    }

    pub fn wallets(&self) -> Vec<i64> {
        self.roots
            .iter()
            .map(|r| self.host.wallet(*r).unwrap_or_default())
            .collect()
    }

    fn name(&self, node: NodeId) -> String {
        self.host.name(node).unwrap_or_else(|| node.to_string())
    }
}

/// Summary of a simulated session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimReport {
    pub final_wallets: Vec<i64>,
    pub merged: bool,
    pub players_bound: usize,
    pub mirrors: usize,
    pub reconcile_writes: usize,
    /// Label → root name, as last reported.
    pub labels: BTreeMap<String, String>,
}

impl SimReport {
    fn record(&mut self, world: &DemoWorld, event: &SyncEvent) {
        match event {
            SyncEvent::PlayerBound(_) => self.players_bound += 1,
            SyncEvent::RosterMapped(bindings) => {
                self.labels = bindings
                    .iter()
                    .map(|(label, root)| (label.to_string(), world.name(*root)))
                    .collect();
            }
            SyncEvent::HudMapped { label, root } => {
                self.labels.insert(label.to_string(), world.name(*root));
            }
            SyncEvent::Reconciled(outcome) => {
                if matches!(outcome.action, ReconcileAction::Merged { .. }) {
                    self.merged = true;
                }
                self.reconcile_writes += outcome.writes;
            }
            SyncEvent::Mirrored(_) => self.mirrors += 1,
        }
    }
}

/// One-line description of an executor event.
pub fn describe_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::PlayerBound(record) => {
            format!("bound {} at {} (level {}/{})", record.label, record.path, record.level, record.ceiling)
        }
        SyncEvent::RosterMapped(bindings) => format!("roster mapped {} player(s)", bindings.len()),
        SyncEvent::HudMapped { label, root } => format!("HUD mapped {label} to {root}"),
        SyncEvent::Reconciled(outcome) => match outcome.action {
            ReconcileAction::Merged { sum } => format!("merged wallets to {sum}"),
            ReconcileAction::Aligned { target } => {
                format!("aligned wallets to {target} ({} write(s))", outcome.writes)
            }
            ReconcileAction::InSync { value } => format!("in sync at {value}"),
            ReconcileAction::Skipped => "skipped".to_string(),
            ReconcileAction::MergeDeferred => {
                format!("merge deferred, {} wallet(s) unreadable", outcome.unknown)
            }
        },
        SyncEvent::Mirrored(outcome) => {
            format!("mirrored {} to {} other wallet(s)", outcome.value, outcome.writes)
        }
    }
}

/// Runs the orchestrator against `world` for `duration`, replaying `script`.
pub async fn run(
    world: &DemoWorld,
    config: GemshareConfig,
    script: &[ScriptStep],
    duration: Duration,
) -> Result<SimReport> {
    let mut handle = Orchestrator::spawn(world.host.clone(), config)?;
    world.announce();

    let start = Instant::now();
    let deadline = start + duration;
    let mut steps = script.to_vec();
    steps.sort_by_key(|s| s.at_ms);
    let mut steps = steps.into_iter().peekable();
    let mut report = SimReport::default();

    loop {
        let next_at = steps
            .peek()
            .map(|s| start + Duration::from_millis(s.at_ms))
            .filter(|at| *at < deadline);

        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => {
                    info!("{}", describe_event(&event));
                    report.record(world, &event);
                }
                None => break,
            },
            _ = sleep_until(next_at.unwrap_or(deadline)), if next_at.is_some() => {
                if let Some(step) = steps.next() {
                    info!("player {} changes wallet by {:+}", step.player + 1, step.delta);
                    world.apply(&step)?;
                }
            }
            _ = sleep_until(deadline) => break,
        }
    }

    while let Some(event) = handle.try_next_event() {
        report.record(world, &event);
    }
    handle.shutdown().await?;
    report.final_wallets = world.wallets();
    Ok(report)
}
