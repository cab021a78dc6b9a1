//! Host collaborator abstraction.
//!
//! Defines the traits a game host implements so the sync core can observe
//! its object graph, read and write wallets, and receive lifecycle and
//! mutation notifications. The core never depends on how a host locates
//! objects (reflection, accessor tables, generated bindings); it only
//! queries capabilities through these traits.

use crate::error::HostResult;
use gemshare_types::{HookId, HostValue, NodeId, ValueType};
use std::sync::Arc;

pub mod mock;

/// How a member is exposed on a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Property with an optional getter.
    Property { readable: bool },
    /// Plain field.
    Field,
    /// Method taking `arity` arguments.
    Method { arity: usize },
}

/// A named, typed member of a capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub value_type: ValueType,
}

impl Member {
    pub fn property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property { readable: true },
            value_type,
        }
    }

    pub fn field(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            value_type,
        }
    }

    pub fn method(name: impl Into<String>, arity: usize, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method { arity },
            value_type,
        }
    }

    /// Whether the member can be read without arguments.
    pub fn is_readable(&self) -> bool {
        match self.kind {
            MemberKind::Property { readable } => readable,
            MemberKind::Field => true,
            MemberKind::Method { arity } => arity == 0,
        }
    }
}

/// A capability (component) attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    /// Short type name, e.g. `PlayerHealth`.
    pub type_name: String,
    /// Namespace-qualified type name, e.g. `Game.Player.PlayerHealth`.
    pub full_name: String,
    pub members: Vec<Member>,
}

impl Capability {
    /// Creates a capability; the short name is the last `.` segment.
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let type_name = full_name
            .rsplit('.')
            .next()
            .unwrap_or(full_name.as_str())
            .to_string();
        Self {
            type_name,
            full_name,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Reference to one of this capability's members.
    pub fn member_ref(&self, member: &Member) -> MemberRef {
        MemberRef {
            capability: self.full_name.clone(),
            member: member.name.clone(),
        }
    }
}

/// Address of a member: capability full name plus member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub capability: String,
    pub member: String,
}

/// Read-only view of the host's object graph.
pub trait HostGraph: Send + Sync {
    /// Whether the node still exists. Never cache the answer.
    fn is_alive(&self, node: NodeId) -> bool;

    /// The node's name, `None` if dead.
    fn name(&self, node: NodeId) -> Option<String>;

    /// The node's parent, `None` at the graph root or if dead.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Direct children in host order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Capabilities attached directly to the node, in host order.
    fn capabilities(&self, node: NodeId) -> Vec<Capability>;

    /// Reads one member's current value.
    fn read_member(&self, node: NodeId, member: &MemberRef) -> HostResult<HostValue>;

    /// Every object reference reachable through the object's own fields and
    /// properties, collections flattened, resolved to their owning nodes.
    fn references(&self, object: NodeId) -> Vec<NodeId>;

    /// Text shown by the node (caption, sprite name), if any.
    fn display_text(&self, node: NodeId) -> Option<String> {
        let _ = node;
        None
    }
}

/// Read/write access to the shared wallet.
pub trait WalletAccess: Send + Sync {
    /// Current wallet value of the node.
    fn read_wallet(&self, node: NodeId) -> HostResult<i64>;

    /// Applies a signed delta through the host's own mutator. Hosts fire
    /// `HostEvent::WalletMutated` synchronously from inside this call.
    fn apply_wallet_delta(&self, node: NodeId, delta: i64) -> HostResult<()>;

    /// Every wallet-carrying node the host knows of. Used only when no
    /// player roots have been discovered yet.
    fn scan_wallet_holders(&self) -> Vec<NodeId> {
        Vec::new()
    }
}

/// Hook categories the core subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// The host's player manager re-acquired its player objects.
    RosterChanged,
    /// A HUD element was initialized for a player.
    HudInitialized,
    /// Any wallet changed, whatever the cause.
    WalletMutated,
}

/// A notification delivered to a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    RosterChanged { manager: NodeId },
    HudInitialized { hud: NodeId, label: String },
    WalletMutated { source: NodeId, delta: i64 },
}

impl HostEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            Self::RosterChanged { .. } => HookKind::RosterChanged,
            Self::HudInitialized { .. } => HookKind::HudInitialized,
            Self::WalletMutated { .. } => HookKind::WalletMutated,
        }
    }
}

/// Callback invoked synchronously by the host, on the thread that caused the
/// notification and with none of the host's own locks held.
pub type HostCallback = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Subscription side of the host's notification channel.
pub trait HostEvents: Send + Sync {
    /// Registers a callback for one hook kind.
    fn subscribe(&self, kind: HookKind, callback: HostCallback) -> HostResult<HookId>;

    /// Removes a registration. Returns false if it was not registered.
    fn unsubscribe(&self, id: HookId) -> bool;
}

/// Everything the orchestrator needs from a host.
pub trait Host: HostGraph + WalletAccess + HostEvents {}

impl<T: HostGraph + WalletAccess + HostEvents + ?Sized> Host for T {}
