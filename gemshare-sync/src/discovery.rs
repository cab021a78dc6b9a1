//! Discovery of resource readers for active player roots.
//!
//! Each tick binds readers for roots that do not have them yet. Readers are
//! cached until the root dies; a root whose probe fails is simply retried on
//! the next tick. Roots that already have readers are re-read against their
//! last baseline and level changes are traced at debug level.

use crate::binder::LabelBinder;
use crate::config::GemshareConfig;
use crate::error::{SyncError, SyncResult};
use crate::host::HostGraph;
use crate::prober::{Prober, ResourceReaders};
use gemshare_types::{LabelTag, NodeId, UNKNOWN_READING};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Baseline resource reading taken when a root is first bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub level: f64,
    pub ceiling: f64,
}

/// A bound root whose level or ceiling moved since the last reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelChange {
    pub node: NodeId,
    pub previous: Baseline,
    pub current: Baseline,
}

/// Emitted once per newly bound root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryRecord {
    pub node: NodeId,
    #[serde(serialize_with = "serialize_tag")]
    pub label: LabelTag,
    pub path: String,
    pub level: f64,
    pub ceiling: f64,
}

fn serialize_tag<S: serde::Serializer>(tag: &LabelTag, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(tag)
}

/// Slash-separated names from the graph root down to `node`.
pub fn node_path<H: HostGraph + ?Sized>(host: &H, node: NodeId) -> String {
    let mut names = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        match host.name(n) {
            Some(name) => names.push(name),
            None => break,
        }
        current = host.parent(n);
    }
    names.reverse();
    names.join("/")
}

/// `name (path: a/b/name)`, or `<gone>` for dead nodes.
pub fn describe<H: HostGraph + ?Sized>(host: &H, node: NodeId) -> String {
    match host.name(node) {
        Some(name) => format!("{} (path: {})", name, node_path(host, node)),
        None => "<gone>".to_string(),
    }
}

/// Reader cache and per-tick binding of newly active roots.
#[derive(Debug, Clone)]
pub struct Discovery {
    prober: Prober,
    readers: HashMap<NodeId, ResourceReaders>,
    baselines: HashMap<NodeId, Baseline>,
}

impl Discovery {
    pub fn new(config: &GemshareConfig) -> SyncResult<Self> {
        Ok(Self {
            prober: Prober::new(&config.probe, &config.markers)?,
            readers: HashMap::new(),
            baselines: HashMap::new(),
        })
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    pub fn readers(&self, node: NodeId) -> Option<&ResourceReaders> {
        self.readers.get(&node)
    }

    pub fn baseline(&self, node: NodeId) -> Option<Baseline> {
        self.baselines.get(&node).copied()
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.readers.contains_key(&node)
    }

    /// Number of roots with cached readers.
    pub fn bound_count(&self) -> usize {
        self.readers.len()
    }

    /// Nodes with cached readers, in no particular order.
    pub fn bound_nodes(&self) -> Vec<NodeId> {
        self.readers.keys().copied().collect()
    }

    /// Drops cached state for the given nodes.
    pub fn forget(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.readers.remove(node);
            self.baselines.remove(node);
        }
    }

    /// One discovery pass over the binder's active roots.
    pub fn tick<H: HostGraph + ?Sized>(&mut self, host: &H, binder: &mut LabelBinder) -> Vec<DiscoveryRecord> {
        let pruned = binder.prune(host);
        self.forget(&pruned);
        let dead: Vec<NodeId> = self
            .readers
            .keys()
            .copied()
            .filter(|n| !host.is_alive(*n))
            .collect();
        self.forget(&dead);

        if binder.active_roots().is_empty() {
            return Vec::new();
        }
        self.watch(host, binder);

        let mut records = Vec::new();
        for root in binder.active_roots().to_vec() {
            if !host.is_alive(root) || self.readers.contains_key(&root) {
                continue;
            }
            match self.bind_root(host, binder, root) {
                Ok(record) => records.push(record),
                Err(SyncError::Probe(node)) => {
                    debug!(node = %node, "no resource readers yet, retrying next scan");
                }
                Err(e) => warn!("discovery failed for {}: {}", root, e),
            }
        }
        records
    }

    /// Re-reads every bound root and updates its baseline. Unknown level
    /// readings leave the baseline untouched.
    pub fn watch<H: HostGraph + ?Sized>(&mut self, host: &H, binder: &LabelBinder) -> Vec<LevelChange> {
        let mut changes = Vec::new();
        for (node, readers) in &self.readers {
            let Some(previous) = self.baselines.get(node).copied() else {
                continue;
            };
            let current = Baseline {
                level: readers.read_level(host),
                ceiling: readers.read_ceiling(host),
            };
            if current.level == UNKNOWN_READING || current == previous {
                continue;
            }
            let tag = binder.label_of(*node);
            if current.level < previous.level {
                debug!("[DMG] {tag} {} → {} / {}", previous.level, current.level, current.ceiling);
            } else if current.level > previous.level {
                debug!("[HEAL] {tag} {} → {} / {}", previous.level, current.level, current.ceiling);
            } else {
                debug!("[MAX] {tag} ceiling {} → {}", previous.ceiling, current.ceiling);
            }
            changes.push(LevelChange {
                node: *node,
                previous,
                current,
            });
        }
        for change in &changes {
            self.baselines.insert(change.node, change.current);
        }
        changes
    }

    fn bind_root<H: HostGraph + ?Sized>(
        &mut self,
        host: &H,
        binder: &mut LabelBinder,
        root: NodeId,
    ) -> SyncResult<DiscoveryRecord> {
        let readers = self.prober.probe(host, root)?;

        if binder.label_for(root).is_none() {
            let inferred = binder
                .index_label(host, root)
                .or_else(|| binder.classifier().infer_indicator_label(host, root));
            if let Some(label) = inferred {
                if !binder.bind_inferred(label, root) {
                    debug!(root = %root, label = %label, "inferred label already taken");
                }
            }
        }

        let baseline = Baseline {
            level: readers.read_level(host),
            ceiling: readers.read_ceiling(host),
        };
        let label = binder.label_of(root);
        let record = DiscoveryRecord {
            node: root,
            label,
            path: node_path(host, root),
            level: baseline.level,
            ceiling: baseline.ceiling,
        };

        info!(
            "[PLAYER BOUND] {} {}: level {}/{}",
            label,
            describe(host, root),
            baseline.level,
            baseline.ceiling
        );

        self.readers.insert(root, readers);
        self.baselines.insert(root, baseline);
        Ok(record)
    }
}
