use serde::{Deserialize, Serialize};

use crate::layout_engine::{
    LayoutError, LayoutKind, LayoutResult, NodeKind, TilingTree, WindowId, WorkspaceId,
};
use crate::model::tree::NodeId;

/// Shape of a subtree, without node identities. Weights are not part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDescription {
    Workspace(Vec<LayoutDescription>),
    HTiles(Vec<LayoutDescription>),
    VTiles(Vec<LayoutDescription>),
    HAccordion(Vec<LayoutDescription>),
    VAccordion(Vec<LayoutDescription>),
    Window(u32),
}

impl LayoutDescription {
    fn container(kind: LayoutKind, children: Vec<LayoutDescription>) -> Self {
        match kind {
            LayoutKind::HorizontalTiles => LayoutDescription::HTiles(children),
            LayoutKind::VerticalTiles => LayoutDescription::VTiles(children),
            LayoutKind::HorizontalAccordion => LayoutDescription::HAccordion(children),
            LayoutKind::VerticalAccordion => LayoutDescription::VAccordion(children),
        }
    }

    pub fn layout_kind(&self) -> Option<LayoutKind> {
        match self {
            LayoutDescription::HTiles(_) => Some(LayoutKind::HorizontalTiles),
            LayoutDescription::VTiles(_) => Some(LayoutKind::VerticalTiles),
            LayoutDescription::HAccordion(_) => Some(LayoutKind::HorizontalAccordion),
            LayoutDescription::VAccordion(_) => Some(LayoutKind::VerticalAccordion),
            LayoutDescription::Workspace(_) | LayoutDescription::Window(_) => None,
        }
    }

    pub fn children(&self) -> &[LayoutDescription] {
        match self {
            LayoutDescription::Workspace(c)
            | LayoutDescription::HTiles(c)
            | LayoutDescription::VTiles(c)
            | LayoutDescription::HAccordion(c)
            | LayoutDescription::VAccordion(c) => c,
            LayoutDescription::Window(_) => &[],
        }
    }
}

impl TilingTree {
    pub fn describe(&self, node: NodeId) -> LayoutDescription {
        let children = || self.children(node).iter().map(|&c| self.describe(c)).collect();
        match self.kind(node) {
            Some(NodeKind::Window(wid)) => LayoutDescription::Window(wid.0),
            Some(NodeKind::TilingContainer(kind)) => LayoutDescription::container(kind, children()),
            Some(NodeKind::Workspace(_)) | None => LayoutDescription::Workspace(children()),
        }
    }

    pub fn describe_workspace(&self, ws: WorkspaceId) -> Option<LayoutDescription> {
        self.workspace_node(ws).map(|node| self.describe(node))
    }

    /// Appends the described subtrees to `parent`, in order. Nothing is
    /// built if any part of the description is invalid.
    pub fn build_in(&mut self, parent: NodeId, children: &[LayoutDescription]) -> LayoutResult<()> {
        check_buildable(children)?;
        self.build_checked(parent, children)
    }

    fn build_checked(&mut self, parent: NodeId, children: &[LayoutDescription]) -> LayoutResult<()> {
        for child in children {
            let index = self.children(parent).len();
            match (child, child.layout_kind()) {
                (LayoutDescription::Window(id), _) => {
                    self.insert_window(parent, index, WindowId(*id))?;
                }
                (_, Some(kind)) => {
                    let container = self.insert_container(parent, index, kind)?;
                    self.build_checked(container, child.children())?;
                }
                (_, None) => return Err(LayoutError::InvalidDescription("nested workspace")),
            }
        }
        Ok(())
    }

    pub fn draw_tree(&self, ws: WorkspaceId) -> String {
        let Some(node) = self.workspace_node(ws) else {
            return String::new();
        };
        let tree = self.get_ascii_tree(node);
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &tree).unwrap();
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let status = match node.parent(self.map()) {
            None => "",
            Some(parent) if self.tree.data.mru.recorded_child(self.map(), parent) == Some(node) => {
                "☒ "
            }
            _ => "☐ ",
        };
        let weights = self.tree.data.weights().debug(node);
        let desc = match self.kind(node) {
            Some(NodeKind::Window(wid)) => format!("{status}{node:?} {wid:?} {weights}"),
            Some(NodeKind::TilingContainer(kind)) => format!("{status}{node:?} {kind:?} {weights}"),
            Some(NodeKind::Workspace(ws)) => format!("{node:?} {ws:?}"),
            None => format!("{status}{node:?}"),
        };
        let children: Vec<_> = self.children(node).iter().map(|&c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}

fn check_buildable(children: &[LayoutDescription]) -> LayoutResult<()> {
    for child in children {
        match child {
            LayoutDescription::Window(_) => {}
            LayoutDescription::Workspace(_) => {
                return Err(LayoutError::InvalidDescription("nested workspace"));
            }
            container if container.children().is_empty() => {
                return Err(LayoutError::InvalidDescription("empty container"));
            }
            container => check_buildable(container.children())?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::LayoutDescription::*;
    use super::*;

    #[test]
    fn build_and_describe_agree() {
        let mut tree = TilingTree::new();
        let ws = tree.create_workspace(LayoutKind::HorizontalTiles);
        let root = tree.root_container(ws).unwrap();
        let shape = vec![Window(1), VAccordion(vec![Window(2), HTiles(vec![Window(3), Window(4)])])];
        tree.build_in(root, &shape).unwrap();

        assert_eq!(HTiles(shape.clone()), tree.describe(root));
        assert_eq!(Some(Workspace(vec![HTiles(shape)])), tree.describe_workspace(ws));
        tree.verify_invariants();
    }

    #[test]
    fn invalid_descriptions_build_nothing() {
        let mut tree = TilingTree::new();
        let ws = tree.create_workspace(LayoutKind::HorizontalTiles);
        let root = tree.root_container(ws).unwrap();

        assert_eq!(
            Err(LayoutError::InvalidDescription("nested workspace")),
            tree.build_in(root, &[Window(1), Workspace(vec![Window(2)])])
        );
        assert_eq!(
            Err(LayoutError::InvalidDescription("empty container")),
            tree.build_in(root, &[Window(1), VTiles(vec![Window(2), HTiles(vec![])])])
        );
        assert!(tree.children(root).is_empty());
        assert!(!tree.contains_window(WindowId(1)));
        tree.verify_invariants();
    }

    #[test]
    fn draw_tree_marks_most_recent_child() {
        let mut tree = TilingTree::new();
        let ws = tree.create_workspace(LayoutKind::VerticalTiles);
        let root = tree.root_container(ws).unwrap();
        tree.build_in(root, &[Window(1), Window(2)]).unwrap();
        tree.focus_window(WindowId(2)).unwrap();

        let drawing = tree.draw_tree(ws);
        let marked: Vec<_> = drawing.lines().filter(|l| l.contains('☒')).collect();
        assert_eq!(2, marked.len(), "{drawing}");
        assert!(marked[1].contains("WindowId(2)"), "{drawing}");
        assert!(drawing.contains("VerticalTiles"));
    }
}
