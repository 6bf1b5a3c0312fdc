use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use tracing::trace;

use crate::common::collections::HashMap;
use crate::layout_engine::weights::Weights;
use crate::layout_engine::{LayoutError, LayoutKind, LayoutMode, LayoutResult, Orientation};
use crate::model::mru::{MruTracker, TreeEvent};
use crate::model::tree::{self, NodeId, NodeMap, OwnedNode, Tree};

/// Opaque handle of a window, owned by whoever embeds the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    pub fn new(id: u32) -> Self { WindowId(id) }
}

slotmap::new_key_type! {
    pub struct WorkspaceId;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Window(WindowId),
    TilingContainer(LayoutKind),
    Workspace(WorkspaceId),
}

/// The tiling trees of every workspace.
///
/// Each workspace node has exactly one child, its root tiling container.
/// Windows are always leaves, containers always have a container or a
/// workspace as parent.
#[derive(Serialize, Deserialize)]
pub struct TilingTree {
    pub(super) tree: Tree<Components>,
    workspaces: SlotMap<WorkspaceId, WorkspaceRoot>,
}

#[derive(Serialize, Deserialize)]
struct WorkspaceRoot {
    node: OwnedNode,
    focused: Option<WindowId>,
}

impl Default for TilingTree {
    fn default() -> Self {
        Self {
            tree: Tree::with_observer(Components::default()),
            workspaces: Default::default(),
        }
    }
}

impl Drop for TilingTree {
    fn drop(&mut self) {
        for (_, root) in self.workspaces.drain() {
            std::mem::forget(root.node);
        }
    }
}

impl TilingTree {
    pub fn new() -> Self { Self::default() }

    pub fn create_workspace(&mut self, root: LayoutKind) -> WorkspaceId {
        let tree = &mut self.tree;
        self.workspaces.insert_with_key(|ws| {
            let node = tree
                .mk_node()
                .with(|id, tree| tree.data.set_kind(id, NodeKind::Workspace(ws)))
                .make_root("workspace");
            tree.mk_node()
                .with(|id, tree| tree.data.set_kind(id, NodeKind::TilingContainer(root)))
                .push_back(node.id());
            WorkspaceRoot { node, focused: None }
        })
    }

    /// Deletes the workspace and everything in it, returning the windows
    /// that were dropped.
    pub fn remove_workspace(&mut self, ws: WorkspaceId) -> Vec<WindowId> {
        let Some(mut root) = self.workspaces.remove(ws) else {
            return Vec::new();
        };
        let windows = self.windows_under(root.node.id());
        root.node.remove(&mut self.tree);
        windows
    }

    pub fn workspaces(&self) -> impl Iterator<Item = WorkspaceId> + '_ { self.workspaces.keys() }

    pub fn workspace_node(&self, ws: WorkspaceId) -> Option<NodeId> {
        self.workspaces.get(ws).map(|root| root.node.id())
    }

    pub fn root_container(&self, ws: WorkspaceId) -> Option<NodeId> {
        self.workspace_node(ws).and_then(|node| node.first_child(self.map()))
    }

    pub fn workspace_of(&self, node: NodeId) -> Option<WorkspaceId> {
        let top = node.ancestors(self.map()).last()?;
        match self.kind(top) {
            Some(NodeKind::Workspace(ws)) => Some(ws),
            _ => None,
        }
    }

    pub fn map(&self) -> &NodeMap { &self.tree.map }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { node.parent(self.map()) }

    pub fn children(&self, node: NodeId) -> &[NodeId] { node.children(self.map()) }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> { node.index_in_parent(self.map()) }

    pub fn layout_mode(&self, node: NodeId) -> Option<LayoutMode> {
        self.layout(node).map(LayoutKind::mode)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> { self.tree.data.kinds.get(node).copied() }

    pub fn layout(&self, node: NodeId) -> Option<LayoutKind> { self.tree.data.layout(node) }

    pub fn orientation(&self, node: NodeId) -> Option<Orientation> {
        self.layout(node).map(LayoutKind::orientation)
    }

    pub fn window_at(&self, node: NodeId) -> Option<WindowId> {
        match self.kind(node) {
            Some(NodeKind::Window(wid)) => Some(wid),
            _ => None,
        }
    }

    pub fn node_for_window(&self, wid: WindowId) -> Option<NodeId> {
        self.tree.data.windows.get(&wid).copied()
    }

    pub(super) fn window_node(&self, wid: WindowId) -> LayoutResult<NodeId> {
        self.node_for_window(wid).ok_or(LayoutError::WindowNotFound(wid))
    }

    /// Whether `node` is the tiling container directly under a workspace.
    pub fn is_root_container(&self, node: NodeId) -> bool {
        self.layout(node).is_some()
            && node.parent(self.map()).is_some_and(|p| self.tree.data.is_workspace(p))
    }

    pub fn windows_under(&self, node: NodeId) -> Vec<WindowId> {
        node.traverse_preorder(self.map()).filter_map(|n| self.window_at(n)).collect()
    }

    pub fn windows_in(&self, ws: WorkspaceId) -> Vec<WindowId> {
        self.workspace_node(ws).map(|n| self.windows_under(n)).unwrap_or_default()
    }

    pub fn contains_window(&self, wid: WindowId) -> bool {
        self.tree.data.windows.contains_key(&wid)
    }

    fn check_container(&self, node: NodeId) -> LayoutResult<LayoutKind> {
        self.layout(node).ok_or(LayoutError::NotAContainer(node))
    }

    fn check_movable(&self, node: NodeId) -> LayoutResult<()> {
        match self.kind(node) {
            None | Some(NodeKind::Workspace(_)) => Err(LayoutError::NotAContainer(node)),
            Some(NodeKind::TilingContainer(_)) if self.is_root_container(node) => {
                Err(LayoutError::RootContainer(node))
            }
            _ => Ok(()),
        }
    }

    pub fn insert_window(
        &mut self,
        parent: NodeId,
        index: usize,
        wid: WindowId,
    ) -> LayoutResult<NodeId> {
        self.check_container(parent)?;
        if self.contains_window(wid) {
            return Err(LayoutError::DuplicateWindow(wid));
        }
        let len = parent.child_count(self.map());
        if index > len {
            return Err(LayoutError::InvalidIndex { index, len });
        }
        let node = self
            .tree
            .mk_node()
            .with(|id, tree| tree.data.set_kind(id, NodeKind::Window(wid)))
            .insert_at(parent, index);
        trace!(?wid, ?node, ?parent, index, "Inserted window");
        Ok(node)
    }

    /// Creates an empty container. Callers are expected to fill it; empty
    /// non-root containers are removed as soon as anything leaves them.
    pub fn insert_container(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: LayoutKind,
    ) -> LayoutResult<NodeId> {
        self.check_container(parent)?;
        let len = parent.child_count(self.map());
        if index > len {
            return Err(LayoutError::InvalidIndex { index, len });
        }
        Ok(self
            .tree
            .mk_node()
            .with(|id, tree| tree.data.set_kind(id, NodeKind::TilingContainer(kind)))
            .insert_at(parent, index))
    }

    /// Adds a window next to the most recently used window of the workspace,
    /// or into the root container if the workspace is empty.
    pub fn add_window(&mut self, ws: WorkspaceId, wid: WindowId) -> LayoutResult<NodeId> {
        let root = self.root_container(ws).ok_or(LayoutError::UnknownWorkspace(ws))?;
        let leaf = self.most_recent_leaf(root);
        match (self.window_at(leaf), leaf.parent(self.map())) {
            (Some(_), Some(parent)) => {
                let index = leaf.index_in_parent(self.map()).map_or(0, |i| i + 1);
                self.insert_window(parent, index, wid)
            }
            _ => {
                let index = leaf.child_count(self.map());
                self.insert_window(leaf, index, wid)
            }
        }
    }

    pub fn remove_window(&mut self, wid: WindowId) -> LayoutResult<()> {
        let node = self.window_node(wid)?;
        let ws = self.workspace_of(node);
        node.detach(&mut self.tree).remove();
        if let Some(ws) = ws
            && self.workspaces[ws].focused == Some(wid)
        {
            let next = self
                .root_container(ws)
                .map(|root| self.most_recent_leaf(root))
                .and_then(|leaf| self.window_at(leaf));
            self.workspaces[ws].focused = next;
        }
        Ok(())
    }

    /// Moves `node` to `index` of `parent`, interpreted after the node has
    /// left its old position. The old parent is normalized afterwards.
    pub fn move_node(&mut self, node: NodeId, parent: NodeId, index: usize) -> LayoutResult<()> {
        self.check_movable(node)?;
        self.check_container(parent)?;
        let map = self.map();
        if parent.is_descendant_of(node, map) {
            return Err(LayoutError::WouldCreateCycle { node, parent });
        }
        let len = parent.child_count(map) - usize::from(node.parent(map) == Some(parent));
        if index > len {
            return Err(LayoutError::InvalidIndex { index, len });
        }
        node.detach(&mut self.tree).insert_at(parent, index).finish();
        Ok(())
    }

    /// Exchanges the positions of two siblings. Weights stay with the nodes.
    pub fn swap_nodes(&mut self, a: NodeId, b: NodeId) -> LayoutResult<()> {
        let map = self.map();
        match (a.parent(map), b.parent(map)) {
            (Some(pa), Some(pb)) if pa == pb && self.layout(pa).is_some() => {
                self.tree.map.swap_positions(a, b);
                Ok(())
            }
            _ => Err(LayoutError::NotSiblings(a, b)),
        }
    }

    /// Replaces `node` in its parent by a new container of `kind` that holds
    /// `node` as its only child. The container takes over the weight and
    /// MRU position of `node`.
    pub fn wrap_in_container(&mut self, node: NodeId, kind: LayoutKind) -> LayoutResult<NodeId> {
        self.check_movable(node)?;
        let (Some(parent), Some(index)) =
            (node.parent(self.map()), node.index_in_parent(self.map()))
        else {
            return Err(LayoutError::RootContainer(node));
        };
        let container = self.insert_container(parent, index, kind)?;
        self.replace_in_parent(node, container)?;
        node.detach(&mut self.tree).push_back(container).finish();
        trace!(?node, ?container, ?kind, "Wrapped node");
        Ok(container)
    }

    /// Moves `new` into the slot of `old`, handing over the weight along the
    /// parent's axis and the MRU pointer. `old` stays right after it; if `new`
    /// came out of `old`, the usual normalization applies to `old`.
    pub fn replace_in_parent(&mut self, old: NodeId, new: NodeId) -> LayoutResult<()> {
        self.check_movable(old)?;
        self.check_movable(new)?;
        take_slot(&mut self.tree, old, new);
        Ok(())
    }

    /// Applies the normalization rules to `container`: removes it if empty,
    /// or replaces it by its only child. Root containers are only replaced
    /// when that child is a container.
    pub fn normalize_container(&mut self, container: NodeId) {
        if self.tree.map.contains(container) {
            <Components as tree::Observer>::removed_child(&mut self.tree, container);
        }
    }

    pub fn set_layout(&mut self, container: NodeId, kind: LayoutKind) -> LayoutResult<()> {
        let old = self.check_container(container)?;
        if old == kind {
            return Ok(());
        }
        self.tree.data.kinds.insert(container, NodeKind::TilingContainer(kind));
        for &child in container.children(&self.tree.map) {
            self.tree.data.weights.joined(child, container, kind);
        }
        Ok(())
    }

    pub fn most_recent_child(&self, node: NodeId) -> Option<NodeId> {
        self.tree.data.mru.most_recent_child(self.map(), node)
    }

    pub fn most_recent_leaf(&self, node: NodeId) -> NodeId {
        self.tree.data.mru.most_recent_leaf(self.map(), node)
    }

    pub fn mark_most_recent(&mut self, node: NodeId) {
        self.tree.data.mru.mark_most_recent(&self.tree.map, node);
    }

    pub fn focus_window(&mut self, wid: WindowId) -> LayoutResult<()> {
        let node = self.window_node(wid)?;
        self.mark_most_recent(node);
        if let Some(ws) = self.workspace_of(node) {
            self.workspaces[ws].focused = Some(wid);
        }
        Ok(())
    }

    pub fn focused_window(&self, ws: WorkspaceId) -> Option<WindowId> {
        self.workspaces.get(ws).and_then(|root| root.focused)
    }

    pub fn weight(&self, node: NodeId, orientation: Orientation) -> f64 {
        self.tree.data.weights.weight(node, orientation)
    }

    pub fn raw_weight(&self, node: NodeId, orientation: Orientation) -> Option<f64> {
        self.tree.data.weights.get(node, orientation)
    }

    /// Sets the weight of `node` along the axis of its parent.
    pub fn set_weight(
        &mut self,
        node: NodeId,
        orientation: Orientation,
        value: f64,
    ) -> LayoutResult<()> {
        if !(value.is_finite() && value > 0.0) {
            return Err(LayoutError::InvalidWeight(value));
        }
        let parent_axis = node.parent(self.map()).and_then(|p| self.orientation(p));
        if parent_axis != Some(orientation) {
            return Err(LayoutError::WeightAxisMismatch { node, orientation });
        }
        self.tree.data.weights.set(node, orientation, value);
        Ok(())
    }

    /// Share of its parent's extent that `node` gets. Accordion children
    /// each span the whole parent.
    pub fn proportion(&self, node: NodeId) -> Option<f64> {
        let parent = node.parent(self.map())?;
        let kind = self.layout(parent)?;
        if !kind.is_tiles() {
            return Some(1.0);
        }
        let axis = kind.orientation();
        let total: f64 = parent.children(self.map()).iter().map(|&c| self.weight(c, axis)).sum();
        Some(self.weight(node, axis) / total)
    }

    /// Resets every weight below `container` to the default.
    pub fn balance(&mut self, container: NodeId) -> LayoutResult<()> {
        self.check_container(container)?;
        let nodes: Vec<_> = container.traverse_preorder(&self.tree.map).collect();
        for node in nodes {
            let Some(axis) = self.orientation(node) else { continue };
            for &child in node.children(&self.tree.map) {
                self.tree.data.weights.set(child, axis, super::weights::DEFAULT_WEIGHT);
            }
        }
        Ok(())
    }

    /// Non-root containers with fewer than two children, and root containers
    /// whose only child is another container.
    pub fn degenerate_containers(&self) -> Vec<NodeId> {
        let map = self.map();
        let mut out = Vec::new();
        for root in self.workspaces.values() {
            for node in root.node.id().traverse_preorder(map) {
                if self.layout(node).is_none() {
                    continue;
                }
                let degenerate = if self.is_root_container(node) {
                    matches!(node.children(map), [only] if self.layout(*only).is_some())
                } else {
                    node.child_count(map) < 2
                };
                if degenerate {
                    out.push(node);
                }
            }
        }
        out
    }

    /// Panics if the structure or any of the components is inconsistent.
    pub fn verify_invariants(&self) {
        let map = self.map();
        for (ws, root) in &self.workspaces {
            let ws_node = root.node.id();
            assert_eq!(None, ws_node.parent(map), "workspace node has a parent");
            assert_eq!(Some(NodeKind::Workspace(ws)), self.kind(ws_node));
            let [root_container] = ws_node.children(map) else {
                panic!("workspace {ws:?} must hold exactly one root container");
            };
            assert!(
                self.layout(*root_container).is_some(),
                "root of workspace {ws:?} is not a container"
            );
            for node in ws_node.traverse_preorder(map) {
                for &child in node.children(map) {
                    assert_eq!(Some(node), child.parent(map), "broken parent link");
                }
                if let Some(child) = self.tree.data.mru.recorded_child(map, node) {
                    assert_eq!(Some(node), child.parent(map));
                }
                match self.kind(node) {
                    Some(NodeKind::Window(wid)) => {
                        assert!(node.is_empty(map), "window {wid:?} has children");
                        assert_eq!(Some(node), self.node_for_window(wid));
                        assert!(
                            node.parent(map).is_some_and(|p| self.layout(p).is_some()),
                            "window {wid:?} is not inside a container"
                        );
                    }
                    Some(NodeKind::TilingContainer(_)) => {
                        if node != *root_container {
                            assert!(!node.is_empty(map), "empty container {node:?}");
                            assert!(
                                node.parent(map).is_some_and(|p| self.layout(p).is_some()),
                                "container {node:?} is not inside a container"
                            );
                        }
                    }
                    Some(NodeKind::Workspace(_)) => {
                        assert_eq!(ws_node, node, "workspace nested in workspace {ws:?}");
                    }
                    None => panic!("node {node:?} has no kind"),
                }
            }
            if let Some(focused) = root.focused {
                let node = self.node_for_window(focused);
                assert_eq!(
                    Some(ws),
                    node.and_then(|n| self.workspace_of(n)),
                    "focused window {focused:?} is not in workspace {ws:?}"
                );
            }
        }
        for (&wid, &node) in &self.tree.data.windows {
            assert_eq!(Some(NodeKind::Window(wid)), self.kind(node));
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
pub(super) struct Components {
    pub(super) mru: MruTracker,
    pub(super) kinds: SecondaryMap<NodeId, NodeKind>,
    weights: Weights,
    windows: HashMap<WindowId, NodeId>,
}

impl Components {
    fn layout(&self, node: NodeId) -> Option<LayoutKind> {
        match self.kinds.get(node) {
            Some(NodeKind::TilingContainer(kind)) => Some(*kind),
            _ => None,
        }
    }

    fn is_workspace(&self, node: NodeId) -> bool {
        matches!(self.kinds.get(node), Some(NodeKind::Workspace(_)))
    }

    pub(super) fn set_kind(&mut self, node: NodeId, kind: NodeKind) {
        if let NodeKind::Window(wid) = kind {
            let existing = self.windows.insert(wid, node);
            assert!(
                existing.is_none(),
                "Attempted to add window {wid:?} twice: {existing:?} and {node:?}"
            );
        }
        self.kinds.insert(node, kind);
    }

    pub(super) fn weights(&self) -> &Weights { &self.weights }

    fn dispatch_event(&mut self, map: &NodeMap, event: TreeEvent) {
        self.mru.handle_event(map, event);
        match event {
            TreeEvent::AddedToParent(node) => {
                if let Some(parent) = node.parent(map)
                    && let Some(kind) = self.layout(parent)
                {
                    self.weights.joined(node, parent, kind);
                }
            }
            TreeEvent::RemovingFromParent(node) => {
                if let Some(kind) = node.parent(map).and_then(|p| self.layout(p)) {
                    self.weights.left(node, kind.orientation());
                }
            }
            TreeEvent::RemovedFromForest(node) => {
                self.weights.forget(node);
                if let Some(NodeKind::Window(wid)) = self.kinds.remove(node)
                    && self.windows.get(&wid) == Some(&node)
                {
                    self.windows.remove(&wid);
                }
            }
            TreeEvent::AddedToForest(_) => {}
        }
    }
}

impl tree::Observer for Components {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::AddedToForest(node))
    }

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::AddedToParent(node))
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovingFromParent(node))
    }

    fn removed_child(tree: &mut Tree<Self>, parent: NodeId) {
        if tree.data.layout(parent).is_none() {
            return;
        }
        let Some(grandparent) = parent.parent(&tree.map) else { return };
        // Root containers may be empty or hold a single window. A root
        // wrapping a single container hands the workspace over to it.
        if tree.data.layout(grandparent).is_none() {
            if parent.child_count(&tree.map) == 1
                && let Some(child) = parent.first_child(&tree.map)
                && tree.data.layout(child).is_some()
            {
                trace!(?parent, ?child, "Promoting only child to workspace root");
                take_slot(tree, parent, child);
                parent.detach(tree).remove();
                Self::removed_child(tree, child);
            }
            return;
        }
        if parent.is_empty(&tree.map) {
            trace!(?parent, "Removing empty container");
            parent.detach(tree).remove();
        } else if parent.child_count(&tree.map) == 1
            && let Some(child) = parent.first_child(&tree.map)
        {
            trace!(?parent, ?child, "Flattening single-child container");
            take_slot(tree, parent, child);
        }
    }

    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovedFromForest(node))
    }
}

fn take_slot(tree: &mut Tree<Components>, old: NodeId, new: NodeId) {
    let axis = old.parent(&tree.map).and_then(|p| tree.data.layout(p)).map(LayoutKind::orientation);
    new.detach(tree)
        .insert_before(old)
        .with(|new, tree| {
            if let Some(axis) = axis {
                tree.data.weights.assume_weight_of(new, old, axis);
            }
            tree.data.mru.inherit(&tree.map, new, old);
        })
        .finish();
}
