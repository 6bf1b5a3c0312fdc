use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::layout_engine::{LayoutError, LayoutResult};

#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether moving this way increases the index along the axis.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn parse(s: &str) -> LayoutResult<Direction> {
        s.trim().parse().map_err(|_| LayoutError::InvalidDirection(s.to_owned()))
    }

    /// Index offset from a node to its neighbour in this direction.
    pub(crate) fn sibling_offset(self) -> isize { if self.is_forward() { 1 } else { -1 } }
}

/// How a container arranges its children along its orientation.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Tiles,
    Accordion,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    HorizontalTiles,
    VerticalTiles,
    HorizontalAccordion,
    VerticalAccordion,
}

impl LayoutKind {
    pub fn new(orientation: Orientation, mode: LayoutMode) -> Self {
        use LayoutKind::*;
        match (orientation, mode) {
            (Orientation::Horizontal, LayoutMode::Tiles) => HorizontalTiles,
            (Orientation::Vertical, LayoutMode::Tiles) => VerticalTiles,
            (Orientation::Horizontal, LayoutMode::Accordion) => HorizontalAccordion,
            (Orientation::Vertical, LayoutMode::Accordion) => VerticalAccordion,
        }
    }

    pub fn tiles(orientation: Orientation) -> Self { Self::new(orientation, LayoutMode::Tiles) }

    pub fn orientation(self) -> Orientation {
        use LayoutKind::*;
        match self {
            HorizontalTiles | HorizontalAccordion => Orientation::Horizontal,
            VerticalTiles | VerticalAccordion => Orientation::Vertical,
        }
    }

    pub fn mode(self) -> LayoutMode {
        use LayoutKind::*;
        match self {
            HorizontalTiles | VerticalTiles => LayoutMode::Tiles,
            HorizontalAccordion | VerticalAccordion => LayoutMode::Accordion,
        }
    }

    pub fn is_tiles(self) -> bool { self.mode() == LayoutMode::Tiles }

    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self::new(orientation, self.mode())
    }
}
