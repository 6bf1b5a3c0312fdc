use thiserror::Error;

use crate::layout_engine::{Orientation, WindowId, WorkspaceId};
use crate::model::tree::NodeId;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Invalid direction: {0:?}")]
    InvalidDirection(String),
    #[error("Window not found: {0:?}")]
    WindowNotFound(WindowId),
    #[error("Window already in the tree: {0:?}")]
    DuplicateWindow(WindowId),
    #[error("Node is not a tiling container: {0:?}")]
    NotAContainer(NodeId),
    #[error("Workspace root containers cannot be moved or wrapped: {0:?}")]
    RootContainer(NodeId),
    #[error("Unknown workspace: {0:?}")]
    UnknownWorkspace(WorkspaceId),
    #[error("Nodes {0:?} and {1:?} do not share a parent")]
    NotSiblings(NodeId, NodeId),
    #[error("Cannot move {node:?} into its own subtree at {parent:?}")]
    WouldCreateCycle { node: NodeId, parent: NodeId },
    #[error("Invalid layout description: {0}")]
    InvalidDescription(&'static str),
    #[error("Index {index} out of bounds for container with {len} children")]
    InvalidIndex { index: usize, len: usize },
    #[error("Parent of {node:?} is not laid out along {orientation:?}")]
    WeightAxisMismatch { node: NodeId, orientation: Orientation },
    #[error("Weight must be positive and finite, got {0}")]
    InvalidWeight(f64),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
