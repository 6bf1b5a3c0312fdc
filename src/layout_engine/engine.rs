use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Direction, LayoutKind, LayoutMode, MoveOutcome, TilingTree, WindowId, WorkspaceId};
use crate::common::collections::BTreeMap;
use crate::common::config::Settings;

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MoveThrough(Direction),
    ToggleOrientation,
    ToggleLayoutMode,
    Balance,
    ResizeBy { amount: f64 },
    SwitchToWorkspace(String),
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum LayoutEvent {
    /// A new window appeared on the named workspace.
    WindowAdded(String, WindowId),
    WindowRemoved(WindowId),
    WindowFocused(WindowId),
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    /// Windows whose geometry must be re-applied by the host.
    pub raise_windows: Vec<WindowId>,
    pub focus_window: Option<WindowId>,
}

#[derive(Serialize, Deserialize)]
pub struct LayoutEngine {
    tree: TilingTree,
    workspaces: BTreeMap<String, WorkspaceId>,
    active_workspace: Option<String>,
    #[serde(skip)]
    settings: Settings,
}

impl LayoutEngine {
    pub fn new(settings: &Settings) -> Self {
        LayoutEngine {
            tree: TilingTree::new(),
            workspaces: BTreeMap::new(),
            active_workspace: None,
            settings: settings.clone(),
        }
    }

    pub fn set_settings(&mut self, settings: &Settings) { self.settings = settings.clone(); }

    pub fn tree(&self) -> &TilingTree { &self.tree }

    pub fn workspace(&self, name: &str) -> Option<WorkspaceId> {
        self.workspaces.get(name).copied()
    }

    pub fn active_workspace(&self) -> Option<WorkspaceId> {
        self.active_workspace.as_deref().and_then(|name| self.workspace(name))
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.active_workspace().and_then(|ws| self.tree.focused_window(ws))
    }

    fn workspace_name(&self, ws: WorkspaceId) -> Option<&str> {
        self.workspaces.iter().find(|&(_, &id)| id == ws).map(|(name, _)| name.as_str())
    }

    fn ensure_workspace(&mut self, name: &str) -> WorkspaceId {
        if let Some(ws) = self.workspace(name) {
            return ws;
        }
        let ws = self.tree.create_workspace(self.settings.root_layout());
        info!(name, ?ws, "Created workspace");
        self.workspaces.insert(name.to_owned(), ws);
        ws
    }

    pub fn debug_tree(&self, ws: WorkspaceId) { self.debug_tree_desc(ws, "", false); }

    pub fn debug_tree_desc(&self, ws: WorkspaceId, desc: &'static str, print: bool) {
        if print {
            println!("Tree {desc}\n{}", self.tree.draw_tree(ws).trim());
        } else {
            debug!("Tree {desc}\n{}", self.tree.draw_tree(ws).trim());
        }
    }

    fn response_for(&self, ws: WorkspaceId) -> EventResponse {
        EventResponse {
            raise_windows: self.tree.windows_in(ws),
            focus_window: self.tree.focused_window(ws),
        }
    }

    pub fn handle_event(&mut self, event: LayoutEvent) -> EventResponse {
        debug!(?event);
        match event {
            LayoutEvent::WindowAdded(name, wid) => {
                let ws = self.ensure_workspace(&name);
                if let Err(e) = self.tree.add_window(ws, wid) {
                    warn!("Could not add window {wid:?}: {e}");
                    return EventResponse::default();
                }
                if let Err(e) = self.tree.focus_window(wid) {
                    warn!("Could not focus new window {wid:?}: {e}");
                }
                self.active_workspace = Some(name);
                self.debug_tree(ws);
                self.response_for(ws)
            }
            LayoutEvent::WindowRemoved(wid) => {
                let ws = self.tree.node_for_window(wid).and_then(|n| self.tree.workspace_of(n));
                if let Err(e) = self.tree.remove_window(wid) {
                    warn!("Could not remove window {wid:?}: {e}");
                    return EventResponse::default();
                }
                match ws {
                    Some(ws) => {
                        self.debug_tree(ws);
                        self.response_for(ws)
                    }
                    None => EventResponse::default(),
                }
            }
            LayoutEvent::WindowFocused(wid) => {
                if let Err(e) = self.tree.focus_window(wid) {
                    warn!("Could not focus window {wid:?}: {e}");
                    return EventResponse::default();
                }
                let ws = self.tree.node_for_window(wid).and_then(|n| self.tree.workspace_of(n));
                if let Some(name) = ws.and_then(|ws| self.workspace_name(ws)) {
                    self.active_workspace = Some(name.to_owned());
                }
                EventResponse::default()
            }
        }
    }

    pub fn handle_command(&mut self, command: LayoutCommand) -> EventResponse {
        debug!(?command);
        if let LayoutCommand::SwitchToWorkspace(name) = &command {
            let ws = self.ensure_workspace(name);
            self.active_workspace = Some(name.clone());
            return self.response_for(ws);
        }

        let Some(ws) = self.active_workspace() else {
            debug!("No active workspace");
            return EventResponse::default();
        };
        let Some(wid) = self.tree.focused_window(ws) else {
            debug!(?ws, "No focused window");
            return EventResponse::default();
        };
        let Some(node) = self.tree.node_for_window(wid) else {
            return EventResponse::default();
        };

        match command {
            LayoutCommand::MoveThrough(direction) => {
                match self.tree.move_through(wid, direction) {
                    Ok(MoveOutcome::NoOp) => return EventResponse::default(),
                    Ok(outcome) => debug!(?outcome),
                    Err(e) => {
                        warn!("Move failed: {e}");
                        return EventResponse::default();
                    }
                }
                if self.settings.verify_invariants_after_moves {
                    self.tree.verify_invariants();
                }
            }
            LayoutCommand::ToggleOrientation | LayoutCommand::ToggleLayoutMode => {
                let Some(parent) = self.tree.parent(node) else {
                    return EventResponse::default();
                };
                let Some(kind) = self.tree.layout(parent) else {
                    return EventResponse::default();
                };
                let new_kind = if command == LayoutCommand::ToggleOrientation {
                    kind.with_orientation(kind.orientation().perpendicular())
                } else {
                    let mode = match kind.mode() {
                        LayoutMode::Tiles => LayoutMode::Accordion,
                        LayoutMode::Accordion => LayoutMode::Tiles,
                    };
                    LayoutKind::new(kind.orientation(), mode)
                };
                if let Err(e) = self.tree.set_layout(parent, new_kind) {
                    warn!("Could not change layout: {e}");
                }
            }
            LayoutCommand::Balance => {
                if let Some(root) = self.tree.root_container(ws)
                    && let Err(e) = self.tree.balance(root)
                {
                    warn!("Could not balance: {e}");
                }
            }
            LayoutCommand::ResizeBy { amount } => {
                let Some(axis) = self.tree.parent(node).and_then(|p| self.tree.orientation(p))
                else {
                    return EventResponse::default();
                };
                let weight = (self.tree.weight(node, axis) + amount).max(self.settings.minimum_weight);
                if let Err(e) = self.tree.set_weight(node, axis, weight) {
                    warn!("Could not resize {wid:?}: {e}");
                    return EventResponse::default();
                }
            }
            LayoutCommand::SwitchToWorkspace(_) => {}
        }

        self.debug_tree(ws);
        self.response_for(ws)
    }

    pub fn load(path: PathBuf) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(&path)
            .with_context(|| format!("opening layout file {}", path.display()))?
            .read_to_string(&mut buf)?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(&path)
            .with_context(|| format!("creating layout file {}", path.display()))?
            .write_all(self.serialize_to_string()?.as_bytes())?;
        Ok(())
    }

    pub fn serialize_to_string(&self) -> anyhow::Result<String> { Ok(ron::ser::to_string(&self)?) }
}
