use serde::{Deserialize, Serialize};

use crate::model::tree::{NodeId, NodeMap};

#[derive(Copy, Clone, Debug)]
pub enum TreeEvent {
    AddedToForest(NodeId),
    AddedToParent(NodeId),
    RemovingFromParent(NodeId),
    RemovedFromForest(NodeId),
}

/// Remembers, for every container, which child subtree was visited last.
///
/// Pointers are kept per container and updated by walking up from the marked
/// node, so following [`MruTracker::most_recent_child`] from any container
/// leads back down to the most recently marked leaf below it.
#[derive(Default, Serialize, Deserialize)]
pub struct MruTracker {
    nodes: slotmap::SecondaryMap<NodeId, NodeId>,
}

impl MruTracker {
    /// The child most recently marked, or the first child if none was.
    pub fn most_recent_child(&self, map: &NodeMap, node: NodeId) -> Option<NodeId> {
        self.recorded_child(map, node).or_else(|| node.first_child(map))
    }

    /// The explicitly recorded child, if it is still a child of `node`.
    pub fn recorded_child(&self, map: &NodeMap, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).copied().filter(|c| c.parent(map) == Some(node))
    }

    pub fn most_recent_leaf(&self, map: &NodeMap, node: NodeId) -> NodeId {
        let mut node = node;
        while let Some(child) = self.most_recent_child(map, node) {
            node = child;
        }
        node
    }

    /// Marks `node` as most recent in every ancestor up to the root.
    pub fn mark_most_recent(&mut self, map: &NodeMap, node: NodeId) {
        let mut node = node;
        while let Some(parent) = node.parent(map) {
            self.nodes.insert(parent, node);
            node = parent;
        }
    }

    /// Points the parent of `from` at `to` if it pointed at `from`. Used when
    /// `to` takes over the position of `from`.
    pub fn inherit(&mut self, map: &NodeMap, to: NodeId, from: NodeId) {
        let Some(parent) = to.parent(map) else { return };
        if self.nodes.get(parent) == Some(&from) {
            self.nodes.insert(parent, to);
        }
    }

    pub fn handle_event(&mut self, map: &NodeMap, event: TreeEvent) {
        use TreeEvent::*;
        match event {
            AddedToForest(_) | AddedToParent(_) => {}
            RemovingFromParent(node) => {
                let Some(parent) = node.parent(map) else { return };
                if self.nodes.get(parent) == Some(&node) {
                    self.nodes.remove(parent);
                }
            }
            RemovedFromForest(node) => {
                self.nodes.remove(node);
            }
        }
    }
}
