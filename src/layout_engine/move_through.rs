use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::layout_engine::{
    Direction, LayoutKind, LayoutResult, Orientation, TilingTree, WindowId,
};
use crate::model::tree::NodeId;

/// What a [`TilingTree::move_through`] call did to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Exchanged places with a neighbouring window.
    Swapped { with: NodeId },
    /// Entered a container that was laid out along the direction of the move.
    MovedInto { container: NodeId },
    /// Descended to a window and joined it in a new container.
    WrappedWith { leaf: NodeId, container: NodeId },
    /// Left its container for an ancestor laid out along the direction.
    MovedOut { into: NodeId },
    /// Nothing along the axis; the workspace root got wrapped in a new
    /// container oriented along the direction.
    WrappedRoot { container: NodeId },
    NoOp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Plan {
    Swap(NodeId),
    MoveInto(NodeId),
    WrapWith(NodeId),
    MoveOut { ancestor: NodeId, beside: NodeId },
    WrapRoot(NodeId),
    NoOp,
}

impl TilingTree {
    /// Moves a window one step in `direction`, restructuring the tree where
    /// no neighbour exists along that axis.
    pub fn move_through(
        &mut self,
        wid: WindowId,
        direction: Direction,
    ) -> LayoutResult<MoveOutcome> {
        let node = self.window_node(wid)?;
        let plan = self.plan_move(node, direction);
        debug!(?wid, ?direction, ?plan, "Moving window");

        let outcome = match plan {
            Plan::NoOp => return Ok(MoveOutcome::NoOp),
            Plan::Swap(sibling) => {
                self.tree.map.swap_positions(node, sibling);
                MoveOutcome::Swapped { with: sibling }
            }
            Plan::MoveInto(container) => {
                let index = if direction.is_forward() {
                    0
                } else {
                    container.child_count(self.map())
                };
                node.detach(&mut self.tree).insert_at(container, index).finish();
                MoveOutcome::MovedInto { container }
            }
            Plan::WrapWith(leaf) => {
                let container = self.wrap_with(node, leaf, direction)?;
                MoveOutcome::WrappedWith { leaf, container }
            }
            Plan::MoveOut { ancestor, beside } => {
                let index = beside.index_in_parent(self.map()).unwrap_or(0)
                    + usize::from(direction.is_forward());
                node.detach(&mut self.tree).insert_at(ancestor, index).finish();
                MoveOutcome::MovedOut { into: ancestor }
            }
            Plan::WrapRoot(root) => {
                let container = self.wrap_root(node, root, direction);
                MoveOutcome::WrappedRoot { container }
            }
        };

        // The move may leave the root wrapping a single container.
        if let Some(root) = self.workspace_of(node).and_then(|ws| self.root_container(ws)) {
            self.normalize_container(root);
        }
        self.focus_window(wid)?;
        if cfg!(debug_assertions) {
            self.verify_invariants();
        }
        Ok(outcome)
    }

    /// Decides what a move would do without touching the tree.
    fn plan_move(&self, node: NodeId, direction: Direction) -> Plan {
        let map = self.map();
        let axis = direction.orientation();
        let Some(parent) = node.parent(map) else {
            return Plan::NoOp;
        };

        if self.orientation(parent) == Some(axis)
            && let Some(sibling) = self.sibling_towards(node, direction)
        {
            if self.window_at(sibling).is_some() {
                return Plan::Swap(sibling);
            }
            let target = self.descend_to_target(sibling, axis);
            return if self.window_at(target).is_some() {
                Plan::WrapWith(target)
            } else {
                Plan::MoveInto(target)
            };
        }

        let climb = parent
            .ancestors_with_parent(map)
            .find(|&(_, ancestor)| ancestor.is_some_and(|a| self.orientation(a) == Some(axis)));
        if let Some((beside, Some(ancestor))) = climb {
            return Plan::MoveOut { ancestor, beside };
        }

        let Some(root) = parent.ancestors(map).find(|&n| self.is_root_container(n)) else {
            return Plan::NoOp;
        };
        if self.windows_under(root).len() <= 1 {
            trace!(?root, "Only window in workspace");
            return Plan::NoOp;
        }
        if parent == root && self.orientation(root) == Some(axis) {
            trace!(?root, "Already at the edge of the workspace");
            return Plan::NoOp;
        }
        Plan::WrapRoot(root)
    }

    fn sibling_towards(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        let parent = node.parent(self.map())?;
        let index = node.index_in_parent(self.map())?;
        let target = index.checked_add_signed(direction.sibling_offset())?;
        parent.child_at(self.map(), target)
    }

    /// Follows the most recently used path down from `node` and stops at the
    /// first container laid out along `axis`, or at a window.
    fn descend_to_target(&self, node: NodeId, axis: Orientation) -> NodeId {
        let mut node = node;
        while self.orientation(node).is_some_and(|o| o != axis)
            && let Some(child) = self.most_recent_child(node)
        {
            node = child;
        }
        node
    }

    /// Puts `node` and `leaf` side by side in a new container replacing
    /// `leaf`, with `node` on the side it came from.
    fn wrap_with(
        &mut self,
        node: NodeId,
        leaf: NodeId,
        direction: Direction,
    ) -> LayoutResult<NodeId> {
        let leaf_parent = leaf.parent(self.map());
        let kind = LayoutKind::tiles(direction.orientation());
        let container = self.wrap_in_container(leaf, kind)?;
        let index = if direction.is_forward() { 0 } else { 1 };
        node.detach(&mut self.tree).insert_at(container, index).finish();
        if let Some(parent) = leaf_parent {
            self.normalize_container(parent);
        }
        Ok(container)
    }

    /// Replaces the root container of the workspace by a new root laid out
    /// along the direction, holding the old root and `node`.
    fn wrap_root(&mut self, node: NodeId, root: NodeId, direction: Direction) -> NodeId {
        let kind = LayoutKind::tiles(direction.orientation());
        let container = self
            .tree
            .mk_node()
            .with(|id, tree| tree.data.set_kind(id, super::NodeKind::TilingContainer(kind)))
            .insert_before(root);
        self.tree.data.mru.inherit(&self.tree.map, container, root);
        root.detach(&mut self.tree).push_back(container).finish();
        let index = if direction.is_forward() { 1 } else { 0 };
        node.detach(&mut self.tree).insert_at(container, index).finish();
        // The old root is an ordinary container now.
        self.normalize_container(root);
        trace!(?container, ?root, "Wrapped workspace root");
        container
    }
}
