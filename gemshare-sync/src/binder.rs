//! Label binder.
//!
//! Authoritative mapping between player labels and the roots currently
//! bound to them, plus the active root set. Bindings come from two sources:
//!
//! - **Inferred**: discovery ordering roots by their slot index.
//! - **Hinted**: an explicit HUD initialization naming a label.
//!
//! Hinted bindings override inferred ones and survive rebuilds for as long
//! as their root is alive. Both directions of the mapping are updated
//! together so reverse lookups always resolve.

use crate::classifier::{is_descendant_of, Classifier};
use crate::config::GemshareConfig;
use crate::error::{compile_pattern, SyncError, SyncResult};
use crate::host::{HostGraph, MemberKind};
use gemshare_types::{Label, LabelTag, NodeId};
use regex_lite::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Where a binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSource {
    Inferred,
    Hinted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    root: NodeId,
    source: BindingSource,
}

/// Maintains label ↔ root bindings and the active root set.
#[derive(Debug, Clone)]
pub struct LabelBinder {
    classifier: Classifier,
    index_pattern: Regex,
    max_players: usize,
    resolve_depth: usize,
    /// Active roots, first-seen order, no duplicates.
    active: Vec<NodeId>,
    by_label: BTreeMap<Label, Binding>,
    by_root: HashMap<NodeId, Label>,
}

impl LabelBinder {
    pub fn new(config: &GemshareConfig) -> SyncResult<Self> {
        Ok(Self {
            classifier: Classifier::new(&config.markers),
            index_pattern: compile_pattern(&config.probe.index_pattern)?,
            max_players: config.max_players,
            resolve_depth: config.resolve_depth,
            active: Vec::new(),
            by_label: BTreeMap::new(),
            by_root: HashMap::new(),
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Active roots, including ones that may have died since the last prune.
    pub fn active_roots(&self) -> &[NodeId] {
        &self.active
    }

    /// Active roots that are alive right now.
    pub fn live_roots<H: HostGraph + ?Sized>(&self, host: &H) -> Vec<NodeId> {
        self.active.iter().copied().filter(|r| host.is_alive(*r)).collect()
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.active.contains(&node)
    }

    pub fn root_for(&self, label: Label) -> Option<NodeId> {
        self.by_label.get(&label).map(|b| b.root)
    }

    pub fn label_for(&self, root: NodeId) -> Option<Label> {
        self.by_root.get(&root).copied()
    }

    pub fn source_of(&self, label: Label) -> Option<BindingSource> {
        self.by_label.get(&label).map(|b| b.source)
    }

    /// All bindings in label order.
    pub fn bindings(&self) -> Vec<(Label, NodeId)> {
        self.by_label.iter().map(|(l, b)| (*l, b.root)).collect()
    }

    /// Label of a node for logging: direct lookup, then a reverse scan of
    /// the label table, then `[P?]`.
    pub fn label_of(&self, node: NodeId) -> LabelTag {
        if let Some(label) = self.by_root.get(&node) {
            return LabelTag::from(*label);
        }
        self.by_label
            .iter()
            .find(|(_, b)| b.root == node)
            .map(|(l, _)| LabelTag::from(*l))
            .unwrap_or(LabelTag::UNKNOWN)
    }

    // ── Index inference ──────────────────────────────────────────

    /// First non-negative integer field or property, across the root's
    /// capabilities, whose name matches the index pattern. Fields are
    /// checked before properties within a capability. When several members
    /// match with different values, enumeration order decides.
    pub fn player_index<H: HostGraph + ?Sized>(&self, host: &H, root: NodeId) -> Option<i64> {
        for capability in host.capabilities(root) {
            let fields = capability
                .members
                .iter()
                .filter(|m| m.kind == MemberKind::Field);
            let properties = capability
                .members
                .iter()
                .filter(|m| matches!(m.kind, MemberKind::Property { readable: true }));
            for member in fields.chain(properties) {
                if !member.value_type.is_integer() || !self.index_pattern.is_match(&member.name) {
                    continue;
                }
                let value = host
                    .read_member(root, &capability.member_ref(member))
                    .ok()
                    .and_then(|v| v.as_i64());
                if let Some(index) = value.filter(|i| *i >= 0) {
                    return Some(index);
                }
            }
        }
        None
    }

    /// Label implied by the root's slot index, if within `max_players`.
    pub fn index_label<H: HostGraph + ?Sized>(&self, host: &H, root: NodeId) -> Option<Label> {
        let index = usize::try_from(self.player_index(host, root)?).ok()?;
        if index < self.max_players {
            Label::from_index(index)
        } else {
            None
        }
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Forgets the active set. Bindings are untouched.
    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    /// Rebuilds the active set from a host enumeration and re-assigns
    /// inferred labels by slot index. Live hinted bindings are kept and
    /// their roots are skipped when handing out labels.
    pub fn rebuild_from_enumeration<H, I>(&mut self, host: &H, candidates: I) -> Vec<(Label, NodeId)>
    where
        H: HostGraph + ?Sized,
        I: IntoIterator<Item = NodeId>,
    {
        self.by_label
            .retain(|_, b| b.source == BindingSource::Hinted && host.is_alive(b.root));
        self.by_root = self.by_label.iter().map(|(l, b)| (b.root, *l)).collect();

        self.active.clear();
        for candidate in candidates {
            if let Some(root) = self.classifier.classify_root(host, candidate) {
                if !self.active.contains(&root) {
                    self.active.push(root);
                }
            }
        }

        let mut ordered: Vec<(i64, NodeId)> = self
            .active
            .iter()
            .map(|r| (self.player_index(host, *r).unwrap_or(i64::MAX), *r))
            .collect();
        ordered.sort_by_key(|(index, _)| *index);

        let free: Vec<Label> = Label::first_n(self.max_players)
            .filter(|l| !self.by_label.contains_key(l))
            .collect();
        let unbound = ordered
            .into_iter()
            .map(|(_, root)| root)
            .filter(|root| !self.by_root.contains_key(root));
        for (label, root) in free.into_iter().zip(unbound.collect::<Vec<_>>()) {
            self.bind(label, root, BindingSource::Inferred);
        }

        let bindings = self.bindings();
        for (label, root) in &bindings {
            info!(
                "[ROSTER MAP] {} → {}",
                label,
                host.name(*root).unwrap_or_else(|| root.to_string())
            );
        }
        bindings
    }

    /// Binds `label` to `root` as inferred, but only if neither side is
    /// already bound elsewhere. Returns whether the binding is in place.
    pub fn bind_inferred(&mut self, label: Label, root: NodeId) -> bool {
        match (self.by_label.get(&label), self.by_root.get(&root)) {
            (Some(b), _) if b.root == root => true,
            (None, None) => {
                self.bind(label, root, BindingSource::Inferred);
                true
            }
            _ => false,
        }
    }

    /// Binds a label named by an external event to the active root that owns
    /// one of the context object's references, or the context itself.
    /// Overrides any existing binding on either side.
    pub fn bind_by_hint<H: HostGraph + ?Sized>(
        &mut self,
        host: &H,
        label_text: &str,
        context: NodeId,
    ) -> SyncResult<(Label, NodeId)> {
        let label = label_text
            .parse::<Label>()
            .ok()
            .or_else(|| Label::extract(label_text))
            .ok_or_else(|| {
                warn!("[HUD MAP] {label_text:?} is not a player label");
                SyncError::Resolution {
                    label: label_text.to_string(),
                    reason: "not a player label".to_string(),
                }
            })?;

        let mut references = host.references(context);
        if references.is_empty() {
            debug!(context = %context, label = %label, "hint context holds no references");
        }
        references.push(context);

        let roots = self.live_roots(host);
        for reference in references {
            if let Some(root) = roots
                .iter()
                .copied()
                .find(|root| is_descendant_of(host, reference, *root))
            {
                self.bind(label, root, BindingSource::Hinted);
                info!(
                    "[HUD MAP] {} → {}",
                    label,
                    host.name(root).unwrap_or_else(|| root.to_string())
                );
                return Ok((label, root));
            }
        }

        warn!("[HUD MAP] not mapped: {label}");
        Err(SyncError::Resolution {
            label: label_text.to_string(),
            reason: "no active root owns the referenced objects".to_string(),
        })
    }

    /// Resolves any object to its player root: first by climbing to an
    /// active root, then by climbing to anything shaped like a player root.
    pub fn resolve_root<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> Option<NodeId> {
        let ancestors = self.ancestors(host, node);
        ancestors
            .iter()
            .copied()
            .find(|n| self.is_active(*n))
            .or_else(|| {
                ancestors
                    .iter()
                    .copied()
                    .find(|n| self.classifier.is_player_root(host, *n))
            })
    }

    /// Drops dead roots from the active set and from both maps.
    pub fn prune<H: HostGraph + ?Sized>(&mut self, host: &H) -> Vec<NodeId> {
        let mut removed: Vec<NodeId> = self
            .active
            .iter()
            .copied()
            .filter(|r| !host.is_alive(*r))
            .collect();
        self.active.retain(|r| !removed.contains(r));

        let dead_labels: Vec<Label> = self
            .by_label
            .iter()
            .filter(|(_, b)| !host.is_alive(b.root))
            .map(|(l, _)| *l)
            .collect();
        for label in dead_labels {
            if let Some(binding) = self.by_label.remove(&label) {
                self.by_root.remove(&binding.root);
                if !removed.contains(&binding.root) {
                    removed.push(binding.root);
                }
                debug!(label = %label, root = %binding.root, "binding pruned");
            }
        }
        removed
    }

    fn ancestors<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.resolve_depth);
        let mut current = host.is_alive(node).then_some(node);
        while let Some(n) = current {
            if out.len() >= self.resolve_depth {
                break;
            }
            out.push(n);
            current = host.parent(n);
        }
        out
    }

    fn bind(&mut self, label: Label, root: NodeId, source: BindingSource) {
        if let Some(previous) = self.by_label.remove(&label) {
            self.by_root.remove(&previous.root);
        }
        if let Some(previous_label) = self.by_root.remove(&root) {
            self.by_label.remove(&previous_label);
        }
        self.by_label.insert(label, Binding { root, source });
        self.by_root.insert(root, label);
    }
}
