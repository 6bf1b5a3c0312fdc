use std::ops::{Deref, DerefMut, Index, IndexMut};

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// N-ary tree with ordered children, stored in an arena.
///
/// Parents own their children through the child list; children only keep the
/// id of their parent, so upward walks never create ownership cycles.
#[derive(Serialize, Deserialize)]
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl Tree<()> {
    pub fn new() -> Self { Self::with_observer(()) }
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::new(), data } }

    pub fn mk_node(&mut self) -> UnattachedNode<'_, O> {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        UnattachedNode { id, tree: self }
    }
}

/// Map that holds the structure of the tree.
///
/// Several trees (one per workspace) live in the same map, which makes moving
/// branches between them a matter of relinking.
#[derive(Serialize, Deserialize)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

/// Represents ownership of a root node.
///
/// Nodes must be removed manually, because removal requires a reference to the
/// tree. If a value of this type is dropped without [`OwnedNode::remove`]
/// being called, it will panic in debug builds.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnedNode(Option<NodeId>, String);

impl OwnedNode {
    /// Creates a new root node.
    pub fn new_root_in(tree: &mut Tree<impl Observer>, name: &'static str) -> Self {
        let node = tree.mk_node();
        Self::own(node.id, name)
    }

    /// Marks an existing parentless node as owned.
    pub fn own(node: NodeId, name: &'static str) -> Self { OwnedNode(Some(node), name.to_owned()) }

    pub fn id(&self) -> NodeId { self.0.expect("OwnedNode::id called on removed OwnedNode") }

    #[track_caller]
    pub fn remove(&mut self, tree: &mut Tree<impl Observer>) {
        if let Some(id) = self.0.take() {
            id.remove_root(tree);
        }
    }
}

impl Deref for OwnedNode {
    type Target = NodeId;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref().expect("OwnedNode deref on removed OwnedNode")
    }
}

impl DerefMut for OwnedNode {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().expect("OwnedNode deref_mut on removed OwnedNode")
    }
}

impl Drop for OwnedNode {
    fn drop(&mut self) {
        if cfg!(debug_assertions) {
            if let Some(node) = self.0 {
                panic!(
                    "OwnedNode {name:?} dropped without OwnedNode::remove being called: {node:?}",
                    name = self.1,
                );
            }
        }
    }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    #[track_caller]
    pub fn detach<'a, O: Observer>(self, tree: &'a mut Tree<O>) -> DetachedNode<'a, O> {
        DetachedNode { id: self, tree }
    }

    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    /// Children in visual order. Empty for leaves and unknown ids.
    pub fn children(self, map: &NodeMap) -> &[NodeId] {
        map.map.get(self).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_count(self, map: &NodeMap) -> usize { self.children(map).len() }

    pub fn child_at(self, map: &NodeMap, index: usize) -> Option<NodeId> {
        self.children(map).get(index).copied()
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        self.children(map).first().copied()
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> {
        self.children(map).last().copied()
    }

    pub fn is_empty(self, map: &NodeMap) -> bool { self.children(map).is_empty() }

    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map).iter().position(|&c| c == self)
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let parent = self.parent(map)?;
        let index = self.index_in_parent(map)?;
        parent.child_at(map, index + 1)
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let parent = self.parent(map)?;
        let index = self.index_in_parent(map)?;
        index.checked_sub(1).and_then(|i| parent.child_at(map, i))
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| n.parent(map));
            node
        })
    }

    /// Like [`NodeId::ancestors`], but also yields the parent of each node.
    pub fn ancestors_with_parent(
        self,
        map: &NodeMap,
    ) -> impl Iterator<Item = (NodeId, Option<NodeId>)> + '_ {
        self.ancestors(map).map(|node| (node, node.parent(map)))
    }

    pub fn is_descendant_of(self, ancestor: NodeId, map: &NodeMap) -> bool {
        self.ancestors(map).any(|a| a == ancestor)
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children(map).iter().rev().copied());
            Some(node)
        })
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![(self, false)];
        std::iter::from_fn(move || {
            while let Some((node, expanded)) = stack.pop() {
                if expanded || node.is_empty(map) {
                    return Some(node);
                }
                stack.push((node, true));
                stack.extend(node.children(map).iter().rev().map(|&c| (c, false)));
            }
            None
        })
    }

    #[track_caller]
    pub fn remove_root<O: Observer>(self, tree: &mut Tree<O>) {
        assert!(
            self.parent(&tree.map).is_none(),
            "remove_root called on non-root node"
        );
        if let Some(node) = tree.map.map.remove(self) {
            node.delete_recursive(tree, self);
        }
    }
}

pub trait Observer
where Self: Sized {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    /// Called once a node has left `parent` for good, after it has been
    /// attached to its new location (if any). This is where empty or
    /// single-child containers get cleaned up.
    fn removed_child(tree: &mut Tree<Self>, parent: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removed_child(_tree: &mut Tree<Self>, _parent: NodeId) {}

    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}

#[must_use = "Unattached nodes should be inserted into the tree or created as a root with OwnedNode"]
pub struct UnattachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> UnattachedNode<'a, O> {
    pub fn make_root(self, name: &'static str) -> OwnedNode { OwnedNode::own(self.id, name) }

    /// Consumes this unattached node and returns its `NodeId` without
    /// creating an `OwnedNode` root guard. The node remains in the forest
    /// as a root until attached or explicitly removed.
    pub fn into_id(self) -> NodeId { self.id }

    /// Runs `f` before the node is attached, e.g. to give it a kind that the
    /// observer needs to see when the node joins its parent.
    pub fn with(self, f: impl FnOnce(NodeId, &mut Tree<O>)) -> Self {
        f(self.id, self.tree);
        self
    }

    #[track_caller]
    pub fn push_back(self, parent: NodeId) -> NodeId {
        let index = parent.child_count(&self.tree.map);
        self.insert_at(parent, index)
    }

    #[track_caller]
    pub fn insert_at(self, parent: NodeId, index: usize) -> NodeId {
        self.tree.map.link_at(self.id, parent, index);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }

    #[track_caller]
    pub fn insert_before(self, sibling: NodeId) -> NodeId {
        let (parent, index) = sibling_slot(&self.tree.map, sibling, 0);
        self.insert_at(parent, index)
    }

    #[track_caller]
    pub fn insert_after(self, sibling: NodeId) -> NodeId {
        let (parent, index) = sibling_slot(&self.tree.map, sibling, 1);
        self.insert_at(parent, index)
    }

    pub fn remove(self) {
        debug_assert!(self.id.parent(&self.tree.map).is_none());
        if let Some(node) = self.tree.map.map.remove(self.id) {
            node.delete_recursive(self.tree, self.id);
        }
    }
}

#[must_use = "Detached nodes should be reattached to the tree or removed"]
pub struct DetachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> DetachedNode<'a, O> {
    #[track_caller]
    pub fn push_back(self, parent: NodeId) -> ReattachedNode<'a, O> {
        self.attach_with(parent, |map, id| {
            let len = parent.children(map).len();
            map.link_at(id, parent, len)
        })
    }

    /// Inserts the node at `index` of `parent`. The index is interpreted
    /// after the node has been unlinked from its old position.
    #[track_caller]
    pub fn insert_at(self, parent: NodeId, index: usize) -> ReattachedNode<'a, O> {
        self.attach_with(parent, |map, id| map.link_at(id, parent, index))
    }

    #[track_caller]
    pub fn insert_before(self, sibling: NodeId) -> ReattachedNode<'a, O> {
        let new_parent = sibling
            .parent(&self.tree.map)
            .expect("cannot make a sibling of a root node or invalid sibling");
        self.attach_with(new_parent, |map, id| {
            let (parent, index) = sibling_slot(map, sibling, 0);
            map.link_at(id, parent, index)
        })
    }

    #[track_caller]
    pub fn insert_after(self, sibling: NodeId) -> ReattachedNode<'a, O> {
        let new_parent = sibling
            .parent(&self.tree.map)
            .expect("cannot make a sibling of a root node or invalid sibling");
        self.attach_with(new_parent, |map, id| {
            let (parent, index) = sibling_slot(map, sibling, 1);
            map.link_at(id, parent, index)
        })
    }

    /// Unlinks the node and deletes it together with its subtree.
    pub fn remove(self) {
        if let Some(parent) = self.id.parent(&self.tree.map) {
            self.tree.data.removing_from_parent(&self.tree.map, self.id);
            self.tree.map.unlink(self.id);
            if let Some(node) = self.tree.map.map.remove(self.id) {
                node.delete_recursive(self.tree, self.id);
            }
            O::removed_child(self.tree, parent);
        } else if let Some(node) = self.tree.map.map.remove(self.id) {
            node.delete_recursive(self.tree, self.id);
        }
    }

    fn attach_with(
        self,
        new_parent: NodeId,
        attach: impl FnOnce(&mut NodeMap, NodeId),
    ) -> ReattachedNode<'a, O> {
        let map = &self.tree.map;
        if new_parent.is_descendant_of(self.id, map) {
            // Linking a node under itself would create a cycle.
            return ReattachedNode { detached: self, old_parent: None, new_parent };
        }
        let old_parent = self.id.parent(map);
        let changes_parent = old_parent != Some(new_parent);
        if changes_parent && old_parent.is_some() {
            self.tree.data.removing_from_parent(&self.tree.map, self.id);
        }
        self.tree.map.unlink(self.id);
        attach(&mut self.tree.map, self.id);
        if changes_parent {
            self.tree.data.added_to_parent(&self.tree.map, self.id);
        }
        ReattachedNode { detached: self, old_parent, new_parent }
    }
}

/// A node that was moved. When dropped, the old parent is told it lost a
/// child, which may collapse it.
pub struct ReattachedNode<'a, O: Observer> {
    detached: DetachedNode<'a, O>,
    old_parent: Option<NodeId>,
    new_parent: NodeId,
}

impl<'a, O: Observer> ReattachedNode<'a, O> {
    pub fn with(self, f: impl FnOnce(NodeId, &mut Tree<O>)) -> Self {
        f(self.detached.id, self.detached.tree);
        self
    }

    pub fn finish(self) -> NodeId {
        self.detached.id
        // The old parent is cleaned up when self is dropped.
    }
}

impl<'a, O: Observer> Drop for ReattachedNode<'a, O> {
    fn drop(&mut self) {
        if let Some(old) = self.old_parent {
            if old != self.new_parent && self.detached.tree.map.contains(old) {
                O::removed_child(self.detached.tree, old);
            }
        }
    }
}

#[derive(Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[track_caller]
fn sibling_slot(map: &NodeMap, sibling: NodeId, offset: usize) -> (NodeId, usize) {
    let parent = sibling
        .parent(map)
        .expect("cannot make a sibling of a root node or invalid sibling");
    let index = sibling.index_in_parent(map).expect("sibling missing from its parent");
    (parent, index + offset)
}

impl NodeMap {
    #[track_caller]
    fn link_at(&mut self, id: NodeId, parent: NodeId, index: usize) {
        if id == parent || !self.contains(id) || !self.contains(parent) {
            return;
        }
        debug_assert!(self.map[id].parent.is_none(), "link_at on attached node {id:?}");
        let children = &mut self.map[parent].children;
        let index = index.min(children.len());
        children.insert(index, id);
        self.map[id].parent = Some(parent);
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.map.get_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.map.get_mut(parent) {
            parent_node.children.retain(|&c| c != id);
        }
    }

    /// Exchanges the positions of two siblings. No observer events are
    /// emitted since neither node changes parent.
    pub(crate) fn swap_positions(&mut self, a: NodeId, b: NodeId) {
        let (Some(parent), Some(other)) = (a.parent(self), b.parent(self)) else {
            return;
        };
        debug_assert_eq!(parent, other, "swap_positions on non-siblings {a:?} and {b:?}");
        if parent != other {
            return;
        }
        let (Some(ia), Some(ib)) = (a.index_in_parent(self), b.index_in_parent(self)) else {
            return;
        };
        self.map[parent].children.swap(ia, ib);
    }
}

impl Node {
    fn delete_recursive(&self, cx: &mut Tree<impl Observer>, id: NodeId) {
        cx.data.removed_from_forest(&cx.map, id);
        for &child in &self.children {
            if let Some(node) = cx.map.map.remove(child) {
                node.delete_recursive(cx, child);
            }
        }
    }
}
