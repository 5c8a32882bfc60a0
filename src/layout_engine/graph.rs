use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Axis of an internal node. A vertical split places its children side by
/// side (the dividing line is vertical); a horizontal split stacks them.
/// `Optimal` is resolved from the node's aspect ratio the next time its
/// region is computed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Split {
    Vertical,
    Horizontal,
    #[default]
    Optimal,
}

impl Split {
    pub fn toggled(self) -> Split {
        match self {
            Split::Vertical => Split::Horizontal,
            Split::Horizontal => Split::Vertical,
            Split::Optimal => Split::Optimal,
        }
    }

    /// Vertical when the area is at least `threshold` times wider than it is
    /// tall, horizontal otherwise.
    pub fn optimal_for(width: f64, height: f64, threshold: f64) -> Split {
        if height <= 0.0 || width / height >= threshold {
            Split::Vertical
        } else {
            Split::Horizontal
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    #[strum(serialize = "north", serialize = "up")]
    North,
    #[strum(serialize = "east", serialize = "right")]
    East,
    #[strum(serialize = "south", serialize = "down")]
    South,
    #[strum(serialize = "west", serialize = "left")]
    West,
}

impl Direction {
    /// The split whose dividing line a move in this direction crosses.
    pub fn crossed_split(self) -> Split {
        match self {
            Direction::East | Direction::West => Split::Vertical,
            Direction::North | Direction::South => Split::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Whether this direction points toward the second child of a split.
    pub fn is_forward(self) -> bool { matches!(self, Direction::East | Direction::South) }
}

/// Tiling behaviour of a virtual space.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SpaceMode {
    #[default]
    Bsp,
    Monocle,
    Float,
}
