//! Layout tree of a tiling window manager.
//!
//! Windows are leaves of a tree of tiling containers, one tree per
//! workspace. [`layout_engine::TilingTree::move_through`] moves a window one
//! step in a direction, restructuring the containers around it as needed.

pub mod common;
pub mod layout_engine;
pub mod model;
