//! Player root classification.
//!
//! A player root is the node directly below the character instantiation
//! boundary that carries a player indicator child. Everything here is a pure
//! function of the graph at call time and tolerates nodes vanishing between
//! calls.

use crate::config::MarkerConfig;
use crate::host::HostGraph;
use gemshare_types::{Label, NodeId};
use tracing::debug;

/// Upper bound on ancestor walks, guards against malformed hosts.
const MAX_ANCESTRY: usize = 1024;

/// Upper bound on nodes visited when reading an indicator subtree.
const MAX_INDICATOR_NODES: usize = 256;

/// Case-insensitive substring test.
pub(crate) fn name_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether `node` is `ancestor` or lies anywhere below it.
pub fn is_descendant_of<H: HostGraph + ?Sized>(host: &H, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(node);
    for _ in 0..MAX_ANCESTRY {
        match current {
            Some(n) if n == ancestor => return true,
            Some(n) => current = host.parent(n),
            None => return false,
        }
    }
    false
}

/// Decides which graph nodes are player roots.
#[derive(Debug, Clone)]
pub struct Classifier {
    boundary: String,
    indicator: String,
    indicator_fallback: String,
}

impl Classifier {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            boundary: markers.boundary.clone(),
            indicator: markers.player_indicator.clone(),
            indicator_fallback: markers.indicator_fallback.clone(),
        }
    }

    /// Climbs from `node` to the child just below the instantiation
    /// boundary. Without a boundary the node itself is the candidate.
    pub fn character_root<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> Option<NodeId> {
        if !host.is_alive(node) {
            return None;
        }
        let mut current = node;
        for _ in 0..MAX_ANCESTRY {
            let Some(parent) = host.parent(current) else {
                return Some(node);
            };
            if host
                .name(parent)
                .is_some_and(|name| name_contains(&name, &self.boundary))
            {
                return Some(current);
            }
            current = parent;
        }
        Some(node)
    }

    /// A candidate qualifies iff one of its direct children is named like
    /// the player indicator.
    pub fn is_player_root<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> bool {
        host.children(node).into_iter().any(|child| {
            host.name(child)
                .is_some_and(|name| name_contains(&name, &self.indicator))
        })
    }

    /// Resolves any node to its player root, if it belongs to one.
    pub fn classify_root<H: HostGraph + ?Sized>(&self, host: &H, node: NodeId) -> Option<NodeId> {
        let candidate = self.character_root(host, node)?;
        self.is_player_root(host, candidate).then_some(candidate)
    }

    /// The indicator child: exact name first, then the looser marker.
    pub fn indicator_child<H: HostGraph + ?Sized>(&self, host: &H, root: NodeId) -> Option<NodeId> {
        let named: Vec<(NodeId, String)> = host
            .children(root)
            .into_iter()
            .filter_map(|c| host.name(c).map(|n| (c, n)))
            .collect();
        named
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(&self.indicator))
            .or_else(|| {
                named
                    .iter()
                    .find(|(_, name)| name_contains(name, &self.indicator_fallback))
            })
            .map(|(id, _)| *id)
    }

    /// Reads a label off the indicator's visible text or sprite names.
    pub fn infer_indicator_label<H: HostGraph + ?Sized>(&self, host: &H, root: NodeId) -> Option<Label> {
        let indicator = self.indicator_child(host, root)?;
        let mut stack = vec![indicator];
        let mut visited = 0;
        while let Some(node) = stack.pop() {
            visited += 1;
            if visited > MAX_INDICATOR_NODES {
                break;
            }
            if let Some(label) = host.display_text(node).as_deref().and_then(Label::extract) {
                debug!(root = %root, label = %label, "label read from indicator");
                return Some(label);
            }
            let mut children = host.children(node);
            children.reverse();
            stack.extend(children);
        }
        None
    }
}
