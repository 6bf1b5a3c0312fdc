use serde::{Deserialize, Serialize};

use crate::layout_engine::{LayoutKind, Orientation};
use crate::model::tree::NodeId;

pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct AxisWeight {
    value: Option<f64>,
    /// Container instance that assigned `value` while the node is its member.
    owner: Option<NodeId>,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct WeightInfo {
    horizontal: AxisWeight,
    vertical: AxisWeight,
}

impl WeightInfo {
    fn axis(&self, orientation: Orientation) -> &AxisWeight {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    fn axis_mut(&mut self, orientation: Orientation) -> &mut AxisWeight {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }
}

/// Per-axis proportional weights of every attached node.
#[derive(Default, Serialize, Deserialize)]
pub struct Weights {
    info: slotmap::SecondaryMap<NodeId, WeightInfo>,
}

impl Weights {
    pub fn get(&self, node: NodeId, orientation: Orientation) -> Option<f64> {
        self.info.get(node).and_then(|info| info.axis(orientation).value)
    }

    pub fn weight(&self, node: NodeId, orientation: Orientation) -> f64 {
        self.get(node, orientation).unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn set(&mut self, node: NodeId, orientation: Orientation, value: f64) {
        if let Some(info) = self.entry(node) {
            info.axis_mut(orientation).value = Some(value);
        }
    }

    /// `node` became a child of `parent`, laid out as `kind`.
    ///
    /// Tiles containers hand out a fresh unit weight along their axis to
    /// newcomers. The perpendicular axis keeps whatever it had.
    pub fn joined(&mut self, node: NodeId, parent: NodeId, kind: LayoutKind) {
        let axis = kind.orientation();
        let Some(info) = self.entry(node) else { return };
        let along = info.axis_mut(axis);
        if kind.is_tiles() && along.owner != Some(parent) {
            along.value = Some(DEFAULT_WEIGHT);
        } else {
            along.value.get_or_insert(DEFAULT_WEIGHT);
        }
        along.owner = Some(parent);
        info.axis_mut(axis.perpendicular()).value.get_or_insert(DEFAULT_WEIGHT);
    }

    /// `node` is leaving a container laid out along `orientation`.
    pub fn left(&mut self, node: NodeId, orientation: Orientation) {
        if let Some(info) = self.info.get_mut(node) {
            info.axis_mut(orientation).owner = None;
        }
    }

    /// Gives `new` the weight `old` had along `orientation`. Used when `new`
    /// takes over the slot of `old`.
    pub fn assume_weight_of(&mut self, new: NodeId, old: NodeId, orientation: Orientation) {
        let value = self.weight(old, orientation);
        self.set(new, orientation, value);
    }

    pub fn forget(&mut self, node: NodeId) { self.info.remove(node); }

    pub fn debug(&self, node: NodeId) -> String {
        match self.info.get(node) {
            Some(info) => format!(
                "[h {} v {}]",
                fmt_weight(info.horizontal.value),
                fmt_weight(info.vertical.value)
            ),
            None => String::new(),
        }
    }

    fn entry(&mut self, node: NodeId) -> Option<&mut WeightInfo> {
        self.info.entry(node).map(|entry| entry.or_default())
    }
}

fn fmt_weight(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_owned())
}
