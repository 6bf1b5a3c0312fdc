mod description;
pub mod engine;
mod error;
pub(crate) mod graph;
mod move_through;
mod tiling;
mod weights;

pub use description::LayoutDescription;
pub use engine::{EventResponse, LayoutCommand, LayoutEngine, LayoutEvent};
pub use error::{LayoutError, LayoutResult};
pub use graph::{Direction, LayoutKind, LayoutMode, Orientation};
pub use move_through::MoveOutcome;
pub use tiling::{NodeKind, TilingTree, WindowId, WorkspaceId};
pub use weights::DEFAULT_WEIGHT;

#[cfg(test)]
mod tests;
