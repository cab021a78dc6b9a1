//! Shared scene fixtures for sync tests.

#![allow(dead_code)]

use gemshare_sync::host::mock::MemoryHost;
use gemshare_sync::{Capability, GemshareConfig, Member};
use gemshare_types::{NodeId, ValueType};
use std::sync::Arc;

pub const HEALTH_CAP: &str = "Game.Player.PlayerHealth";
pub const CONTROLLER_CAP: &str = "Game.Player.PlayerController";

/// One player character in a scene.
#[derive(Debug, Clone, Copy)]
pub struct PlayerNode {
    pub root: NodeId,
    pub indicator: NodeId,
    /// A leaf under the root, standing in for a wallet-carrying child.
    pub body: NodeId,
}

/// A co-op scene: an instantiation boundary with player roots below it and
/// a player manager referencing each root.
pub struct Scene {
    pub host: Arc<MemoryHost>,
    pub boundary: NodeId,
    pub players: Vec<PlayerNode>,
    pub manager: NodeId,
}

impl Scene {
    pub fn root(&self, i: usize) -> NodeId {
        self.players[i].root
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.players.iter().map(|p| p.root).collect()
    }

    pub fn wallets(&self) -> Vec<i64> {
        self.players
            .iter()
            .map(|p| self.host.wallet(p.root).unwrap_or_default())
            .collect()
    }

    /// A HUD node whose fields reference something owned by player `i`.
    pub fn hud_for(&self, i: usize) -> NodeId {
        let hud = self.host.spawn(format!("HUD {}", i + 1), None);
        self.host.set_references(hud, vec![self.players[i].body]);
        hud
    }
}

/// Builds a scene with one player per `(slot index, wallet)` pair.
pub fn scene(players: &[(i64, i64)]) -> Scene {
    let host = Arc::new(MemoryHost::new());
    let boundary = host.spawn("Instantiate Parent", None);
    let players: Vec<PlayerNode> = players
        .iter()
        .map(|(index, wallet)| add_player(&host, boundary, *index, *wallet))
        .collect();
    let manager = host.spawn("PlayerManager", None);
    host.set_references(manager, players.iter().map(|p| p.root).collect());
    Scene {
        host,
        boundary,
        players,
        manager,
    }
}

/// Adds a fully formed player root under `boundary`.
pub fn add_player(host: &MemoryHost, boundary: NodeId, index: i64, wallet: i64) -> PlayerNode {
    let root = host.spawn(format!("Player({index})"), Some(boundary));
    let indicator = host.spawn("Player Number Indicator", Some(root));
    let body = host.spawn("Body", Some(root));
    attach_health(host, root, 80.0, 100.0);
    host.attach_member(
        root,
        CONTROLLER_CAP,
        Member::field("playerIndex", ValueType::I32),
        index,
    );
    host.set_wallet(root, wallet);
    PlayerNode {
        root,
        indicator,
        body,
    }
}

/// Attaches a health capability with a current and a max property.
pub fn attach_health(host: &MemoryHost, node: NodeId, current: f64, max: f64) {
    let current_member = Member::property("CurrentHealth", ValueType::F32);
    let max_member = Member::property("MaxHealth", ValueType::F32);
    let cap = Capability::new(HEALTH_CAP)
        .with_member(current_member.clone())
        .with_member(max_member.clone());
    let current_ref = cap.member_ref(&current_member);
    let max_ref = cap.member_ref(&max_member);
    host.attach(node, cap);
    host.set_member(node, &current_ref, current);
    host.set_member(node, &max_ref, max);
}

/// Overwrites the current health of a node set up by [`attach_health`].
pub fn set_health(host: &MemoryHost, node: NodeId, current: f64) {
    let member = Member::property("CurrentHealth", ValueType::F32);
    let member_ref = Capability::new(HEALTH_CAP).member_ref(&member);
    host.set_member(node, &member_ref, current);
}

/// Default configuration with short periods for timer tests.
pub fn fast_config() -> GemshareConfig {
    GemshareConfig {
        discovery_period_ms: 200,
        reconcile_period_ms: 100,
        ..GemshareConfig::default()
    }
}
