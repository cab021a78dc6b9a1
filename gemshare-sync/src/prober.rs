//! Structural prober.
//!
//! Locates a "resource level" reading and an optional "resource ceiling"
//! reading on an opaque entity by matching capability member names. The
//! search is an explicit ordered chain:
//!
//! 1. capabilities ranked health-named type → player namespace → others
//!    (stable within a rank);
//! 2. inside one capability: properties, then fields, then zero-argument
//!    methods as a fallback.
//!
//! First match wins per role and is never overwritten. The ranking is a
//! heuristic carried over from how game code tends to be organized, not a
//! guarantee that the right member is picked.

use crate::classifier::name_contains;
use crate::config::{MarkerConfig, ProbeConfig};
use crate::error::{compile_pattern, HostError, SyncError, SyncResult};
use crate::host::{Capability, HostGraph, Member, MemberKind, MemberRef};
use gemshare_types::{NodeId, UNKNOWN_READING};
use regex_lite::Regex;
use std::cmp::Reverse;
use tracing::debug;

/// A bound, lazily evaluated member read.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberReader {
    /// Node the capability is attached to (the entity or its parent).
    pub node: NodeId,
    pub member: MemberRef,
    pub kind: MemberKind,
}

impl MemberReader {
    /// Reads the member as a float; any failure reads as −1.
    pub fn read<H: HostGraph + ?Sized>(&self, host: &H) -> f64 {
        if !host.is_alive(self.node) {
            return UNKNOWN_READING;
        }
        host.read_member(self.node, &self.member)
            .map(|v| v.reading())
            .unwrap_or(UNKNOWN_READING)
    }
}

/// Level reader plus optional ceiling reader for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceReaders {
    pub level: MemberReader,
    pub ceiling: Option<MemberReader>,
}

impl ResourceReaders {
    pub fn read_level<H: HostGraph + ?Sized>(&self, host: &H) -> f64 {
        self.level.read(host)
    }

    /// Ceiling reading, −1 when no ceiling member was found.
    pub fn read_ceiling<H: HostGraph + ?Sized>(&self, host: &H) -> f64 {
        self.ceiling
            .as_ref()
            .map_or(UNKNOWN_READING, |reader| reader.read(host))
    }
}

#[derive(Default)]
struct Found {
    level: Option<MemberReader>,
    ceiling: Option<MemberReader>,
}

impl Found {
    fn complete(&self) -> bool {
        self.level.is_some() && self.ceiling.is_some()
    }
}

/// Finds resource readers on entities.
#[derive(Debug, Clone)]
pub struct Prober {
    level: Regex,
    ceiling: Regex,
    method_verbs: Vec<String>,
    resource_words: Vec<String>,
    health_type: String,
    player_namespace: String,
}

impl Prober {
    pub fn new(probe: &ProbeConfig, markers: &MarkerConfig) -> SyncResult<Self> {
        Ok(Self {
            level: compile_pattern(&probe.level_pattern)?,
            ceiling: compile_pattern(&probe.ceiling_pattern)?,
            method_verbs: probe.method_verbs.iter().map(|s| s.to_lowercase()).collect(),
            resource_words: probe.resource_words.iter().map(|s| s.to_lowercase()).collect(),
            health_type: markers.health_type.clone(),
            player_namespace: markers.player_namespace.clone(),
        })
    }

    /// Probes `node` for a level reader (required) and a ceiling reader.
    /// Falls back to the parent's capabilities when the node has none.
    pub fn probe<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> SyncResult<ResourceReaders> {
        if !host.is_alive(node) {
            return Err(HostError::NodeGone(node).into());
        }

        let mut owner = node;
        let mut capabilities = host.capabilities(node);
        if capabilities.is_empty() {
            if let Some(parent) = host.parent(node) {
                owner = parent;
                capabilities = host.capabilities(parent);
            }
        }
        capabilities.sort_by_key(|cap| Reverse(self.rank(cap)));

        let mut found = Found::default();
        for capability in &capabilities {
            self.scan_capability(owner, capability, &mut found);
            if found.complete() {
                break;
            }
        }

        match found.level {
            Some(level) => {
                debug!(
                    node = %node,
                    level = %level.member.member,
                    ceiling = ?found.ceiling.as_ref().map(|c| &c.member.member),
                    "resource readers bound"
                );
                Ok(ResourceReaders {
                    level,
                    ceiling: found.ceiling,
                })
            }
            None => Err(SyncError::Probe(node)),
        }
    }

    fn rank(&self, capability: &Capability) -> u8 {
        if name_contains(&capability.type_name, &self.health_type) {
            2
        } else if name_contains(&capability.full_name, &self.player_namespace) {
            1
        } else {
            0
        }
    }

    fn scan_capability(&self, owner: NodeId, capability: &Capability, found: &mut Found) {
        let numeric = |m: &&Member| m.value_type.is_numeric() && m.is_readable();

        let properties = capability
            .members
            .iter()
            .filter(numeric)
            .filter(|m| matches!(m.kind, MemberKind::Property { .. }));
        let fields = capability
            .members
            .iter()
            .filter(numeric)
            .filter(|m| m.kind == MemberKind::Field);

        for member in properties.chain(fields) {
            if found.complete() {
                return;
            }
            let role = if self.ceiling.is_match(&member.name) {
                Role::Ceiling
            } else if self.level.is_match(&member.name) {
                Role::Level
            } else {
                continue;
            };
            found.offer(role, owner, capability, member);
        }

        let methods = capability
            .members
            .iter()
            .filter(numeric)
            .filter(|m| matches!(m.kind, MemberKind::Method { .. }));
        for member in methods {
            if found.complete() {
                return;
            }
            if let Some(role) = self.method_role(&member.name) {
                found.offer(role, owner, capability, member);
            }
        }
    }

    fn method_role(&self, name: &str) -> Option<Role> {
        let lower = name.to_lowercase();
        if !self.resource_words.iter().any(|w| lower.contains(w.as_str())) {
            return None;
        }
        if lower.contains("max") {
            Some(Role::Ceiling)
        } else if self.method_verbs.iter().any(|v| lower.contains(v.as_str())) {
            Some(Role::Level)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Level,
    Ceiling,
}

impl Found {
    fn offer(&mut self, role: Role, owner: NodeId, capability: &Capability, member: &Member) {
        let slot = match role {
            Role::Level => &mut self.level,
            Role::Ceiling => &mut self.ceiling,
        };
        if slot.is_none() {
            *slot = Some(MemberReader {
                node: owner,
                member: capability.member_ref(member),
                kind: member.kind,
            });
        }
    }
}
